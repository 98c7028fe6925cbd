// Transcache Infrastructure - SQLite Adapter
// Implements: KeyValueStore, DocumentSource, Maintenance

mod connection;
mod document_source;
mod error;
mod kv_store;
mod maintenance_impl;
mod migration;

pub use connection::create_pool;
pub use document_source::SqliteDocumentSource;
pub use kv_store::SqliteKeyValueStore;
pub use maintenance_impl::SqliteMaintenance;
pub use migration::run_migrations;

// Note: sqlx::Error conversion is handled by error::map_sqlx_error
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)
