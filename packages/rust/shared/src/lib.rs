//! Shared types, error model, and configuration for TenderPilot.
//!
//! This crate is the foundation depended on by all other TenderPilot crates.
//! It provides:
//! - [`TenderPilotError`] — the unified error type
//! - Domain types ([`Tender`], [`TenderTable`], [`ColumnRole`], [`ColumnMap`])
//! - Configuration ([`AppConfig`], [`AiConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AiConfig, AiProvider, AppConfig, BROWSER_USER_AGENT, DEFAULT_DATASET_URL, DatasetConfig,
    DisplayConfig, ProfileConfig, StorageConfig, config_dir, config_file_path, db_path,
    init_config, load_config, load_config_from, resolve_api_key,
};
pub use error::{Result, TenderPilotError};
pub use types::{
    ColumnMap, ColumnRole, NO_DESCRIPTION, NOT_SPECIFIED, Tender, TenderTable, UNCATEGORIZED,
    UNKNOWN_AUTHORITY, UNKNOWN_STATUS, UNTITLED,
};
