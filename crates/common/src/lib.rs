//! Shared runtime utilities for the marketplace crates.

pub mod utils;
