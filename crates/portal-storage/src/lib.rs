//! Affiliate Portal Storage Layer
//!
//! Durable key-value storage that survives restarts. Backed by SQLite so the
//! session and any other component can persist small string values.

mod database;
mod error;
mod migrations;

pub use database::Database;
pub use error::StorageError;

pub type Result<T> = std::result::Result<T, StorageError>;
