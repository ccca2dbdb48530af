//! Core pipeline for exporting Gravity Forms entries into an external MySQL
//! table.
//!
//! Entries are read page by page from a WordPress site's Gravity Forms REST
//! API and inserted into a pre-existing table, one column per form field.
//! Rows already present are left untouched, so re-running an export only
//! adds what is new.
//!
//! # Guarantees
//! - The entry source is read-only; only the target table is written
//! - Passwords, consumer secrets and CA text never appear in logs or errors
//! - A form whose fields do not fit the table is skipped as a whole
//!
//! # Architecture
//! - [`source::EntrySource`] and [`target::EntryTarget`] are the two seams;
//!   the export and purge loops are generic over both
//! - Settings are loaded once and passed by reference
//! - Everything runs in sequence over a single target connection

pub mod certificate;
pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod mapping;
pub mod purge;
pub mod results;
pub mod schema;
pub mod source;
pub mod target;

// Re-export commonly used types
pub use certificate::CertificateStore;
pub use config::{ConnectionConfig, ExporterSettings, Secret, SourceConfig};
pub use error::{ExporterError, Result};
pub use export::{ExportOptions, Exporter};
pub use mapping::{FieldMapping, derive_mapping};
pub use results::{ExportReport, ExportResult, PurgeResult, SchemaError, UpsertOutcome};
pub use source::{Entry, EntrySource, Form, FormField, GravityFormsClient, SearchCriteria};
pub use target::{EntryTarget, MySqlTarget, Row};
