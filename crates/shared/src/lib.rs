//! Shared configuration and plumbing for Receipta.
//!
//! This crate provides common pieces used across the workspace:
//! - Configuration management
//! - Tracing subscriber setup
//! - Pagination types for list queries

pub mod config;
pub mod telemetry;
pub mod types;

pub use config::{AppConfig, DatabaseConfig, LedgerConfig, LoggingConfig, SeedConfig};
pub use telemetry::init_tracing;
pub use types::{PageRequest, PageResponse};
