use migration::MigratorTrait;
use sea_orm::DatabaseConnection;
use tokio::sync::OnceCell;

use crate::db::connect;



// Ensure migrations run only once across the entire test process
static MIGRATED: OnceCell<()> = OnceCell::const_new();

/// Tests need a reachable Postgres; skip when none is configured.
pub(crate) fn skip_db_tests() -> bool {
    std::env::var("SKIP_DB_TESTS").is_ok() || !crate::db::database_configured()
}

/// Migrate once with a throwaway connection, then hand out a fresh one for
/// the calling test's runtime.
pub(crate) async fn setup_test_db() -> anyhow::Result<DatabaseConnection> {
    MIGRATED
        .get_or_try_init(|| async {
            let db = connect().await?;
            migration::Migrator::up(&db, None).await?;
            drop(db);
            Ok::<(), anyhow::Error>(())
        })
        .await?;
    connect().await
}
