pub mod seaorm;

pub use seaorm::SeaOrmCatalogRepository;
