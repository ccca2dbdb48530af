//! Settings consumed by the export pipeline.
//!
//! This module contains every configuration structure the exporter reads:
//! - `ConnectionConfig`: target MySQL connection and table
//! - `SourceConfig`: Gravity Forms REST API endpoint and credentials
//! - `ExporterSettings`: the complete, validated settings for one run
//!
//! Settings are loaded once per command and passed by reference into each
//! component; nothing reads process-wide state after loading.

mod connection;
mod secret;
mod settings;

pub use connection::{ConnectionConfig, DEFAULT_MYSQL_PORT};
pub use secret::Secret;
pub use settings::{
    DEFAULT_PAGE_SIZE, ENV_PREFIX, ExporterSettings, FormSelection, MAX_PAGE_SIZE,
    RetentionConfig, SourceConfig, StorageConfig,
};
