use dotenvy::dotenv;
use migration::{Migrator, MigratorTrait};
use tracing::{error, info};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Up,
    Down,
    Status,
}

impl Command {
    fn parse(arg: Option<&str>) -> Option<Self> {
        match arg.unwrap_or("up") {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "status" => Some(Self::Status),
            _ => None,
        }
    }
}

fn init_logging(cfg: Option<&configs::AppConfig>) {
    let json = cfg.is_some_and(|c| c.logging.format == configs::LogFormat::Json);
    common::utils::logging::init_logging(json);
    info!(service = "catalog-migrate", event = "logger_init", json, "tracing subscriber initialized");
}

async fn run(command: Command, cfg: &configs::AppConfig) -> anyhow::Result<()> {
    let db = models::db::connect_with_config(&cfg.database).await?;
    match command {
        Command::Up => Migrator::up(&db, None).await?,
        // one step at a time
        Command::Down => Migrator::down(&db, Some(1)).await?,
        Command::Status => Migrator::status(&db).await?,
    }
    Ok(())
}

fn main() -> std::process::ExitCode {
    // before config and logging so RUST_LOG and DATABASE_URL are visible
    dotenv().ok();
    let cfg = configs::AppConfig::load_or_env();
    init_logging(cfg.as_ref().ok());

    let run_id = Uuid::new_v4();
    let arg = std::env::args().nth(1);
    let Some(command) = Command::parse(arg.as_deref()) else {
        error!(service = "catalog-migrate", event = "bad_args", arg = ?arg, "usage: catalog-migrate [up|down|status]");
        return std::process::ExitCode::from(2);
    };
    let cfg = match cfg {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(service = "catalog-migrate", event = "config_invalid", error = %e, "failed to load configuration");
            return std::process::ExitCode::FAILURE;
        }
    };

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(service = "catalog-migrate", event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return std::process::ExitCode::FAILURE;
        }
    };

    info!(service = "catalog-migrate", event = "start", %run_id, ?command, version = env!("CARGO_PKG_VERSION"), "running migrations");
    match rt.block_on(run(command, &cfg)) {
        Ok(()) => {
            info!(service = "catalog-migrate", event = "done", %run_id, ?command, "migrations finished");
            std::process::ExitCode::SUCCESS
        }
        Err(e) => {
            error!(service = "catalog-migrate", event = "failed", %run_id, error = %e, "migration run failed");
            std::process::ExitCode::FAILURE
        }
    }
}
