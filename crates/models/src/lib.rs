pub mod errors;
pub mod db;
pub mod types;
pub mod user;
pub mod category_type;
pub mod item;
pub mod review;

#[cfg(test)]
mod tests;
