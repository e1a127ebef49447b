//! HTTP server for the Praxis clinic record system.
//!
//! Wires the storage backend, the access guard, the transfer coordinator,
//! the session versioner, and the audit trail into one axum application.

pub mod access;
pub mod audit;
pub mod config;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod server;
pub mod sessions;
pub mod state;
pub mod subject;
pub mod transfer;

pub use config::{AppConfig, load_config};
pub use observability::{apply_logging_level, init_tracing, shutdown_tracing};
pub use server::{PraxisServer, ServerBuilder, build_app};
pub use state::AppState;
