//! Service layer providing the marketplace catalog on top of models.
//! - Separates business logic from data access behind `CatalogRepository`.
//! - Reuses validation and entity definitions in `models` crate.
//! - Provides clear error types and documented interfaces.

pub mod errors;
pub mod pagination;
pub mod catalog;
pub mod user_service;
#[cfg(test)]
pub mod test_support;
