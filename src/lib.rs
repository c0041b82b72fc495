//! Duet Server Library
//!
//! Backend of a two-participant listening experiment: participants classify
//! tracks from their own library, then take turns picking tracks for each
//! other across phases of increasing self-disclosure.

pub mod catalog_api;
pub mod config;
pub mod disclosure;
pub mod experiment;
pub mod library;
pub mod oauth;
pub mod server;
pub mod sqlite_persistence;
pub mod store;

// Re-export commonly used types for convenience
pub use catalog_api::{CatalogApi, HttpCatalogApi};
pub use server::{make_app, run_server, RequestsLoggingLevel, ServerConfig};
pub use store::{FullStore, SqliteStore};
