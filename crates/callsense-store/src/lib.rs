pub mod businesses;
pub mod database;
pub mod error;
pub mod objections;
pub mod pain_points;
pub mod row_helpers;
pub mod schema;
pub mod sessions;

pub use database::Database;
pub use error::StoreError;
