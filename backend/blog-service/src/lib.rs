/// Blog Service Library
///
/// Posts stored in PostgreSQL, cached in Redis and searchable through
/// Elasticsearch.
///
/// # Modules
///
/// - `cache`: cache-aside post snapshots over Redis or an in-process map
/// - `config`: environment configuration
/// - `db`: store of record (posts and activity log)
/// - `error`: error types and HTTP mapping
/// - `handlers`: HTTP route table and handlers
/// - `metrics`: Prometheus collectors
/// - `models`: data structures
/// - `openapi`: OpenAPI document
/// - `search`: full-text index gateway
/// - `services`: post orchestration
/// - `timeout`: deadlines for backend calls
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod openapi;
pub mod search;
pub mod services;
pub mod timeout;

pub use config::Config;
pub use error::{AppError, Result};
