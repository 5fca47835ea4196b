//! Listing catalog: domain, repository seam, Postgres store and service.
//!
//! Rentals, services and packages share one listing type; pagination,
//! category-type resolution and rating aggregation live here.

pub mod domain;
pub mod rating;
pub mod repository;
pub mod repo;
pub mod service;

pub use service::CatalogService;
