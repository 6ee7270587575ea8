//! Shared types, error model, and configuration for the matrikkel workspace.
//!
//! This crate is the foundation depended on by all other crates.
//! It provides:
//! - [`MatrikkelError`], the unified error type
//! - Domain types ([`PropertyRecord`], [`RecordSet`], [`DataSource`], [`RunStatistics`])
//! - Column-name constants ([`columns`])
//! - Configuration ([`AppConfig`], config loading)

pub mod columns;
pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, PathsConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from,
};
pub use error::{MatrikkelError, Result};
pub use types::{
    CACHE_VERSION, DataSource, PropertyRecord, RecordSet, RunStatistics, is_missing_str,
    is_missing_token, value_as_f64, value_as_int, value_to_string,
};
