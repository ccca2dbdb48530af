//! Library module for entries-exporter
//!
//! The command-line definition and summary rendering live here so that they
//! can be tested; `main.rs` wires them to the core pipeline.

pub mod summary;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Default settings file, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "entries-exporter.toml";

#[derive(Debug, Parser)]
#[command(name = "entries-exporter")]
#[command(about = "Export Gravity Forms entries into an external MySQL table")]
#[command(version)]
#[command(long_about = "
Entries Exporter - copy form entries into an external MySQL table

Entries are read from the Gravity Forms REST API of a WordPress site and
inserted into a pre-existing table with one column per form field. Column
names are derived from field labels: lower-cased, with spaces and the
characters ? : ( ) . _ , removed. Every table also needs the columns
entryid, entrydate and leadsourceurl.

Rows already present are never overwritten, so an export can be re-run
safely.

EXAMPLES:
  entries-exporter test-connection
  entries-exporter export --form-ids 1,4 --start-date-time 2024-01-01
  entries-exporter -c /etc/entries-exporter.toml purge --dry-run
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Export entries into the target table
    Export(ExportArgs),
    /// Delete target rows older than the retention window
    Purge(PurgeArgs),
    /// Check the target database connection
    TestConnection,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Earliest entry creation date
    #[arg(
        long,
        value_name = "DATE_TIME",
        help = "Only entries created at or after this time (YYYY-MM-DD, YYYY-MM-DD HH:MM:SS or RFC 3339)"
    )]
    pub start_date_time: Option<String>,

    /// Latest entry creation date
    #[arg(
        long,
        value_name = "DATE_TIME",
        help = "Only entries created at or before this time (YYYY-MM-DD, YYYY-MM-DD HH:MM:SS or RFC 3339)"
    )]
    pub end_date_time: Option<String>,

    /// Forms to export
    #[arg(
        long,
        value_delimiter = ',',
        help = "Comma-separated form ids (defaults to the configured forms)"
    )]
    pub form_ids: Vec<u32>,

    /// Entries per page
    #[arg(
        long,
        value_parser = clap::value_parser!(u32).range(1..=1000),
        help = "Entries requested per page (defaults to the configured page size)"
    )]
    pub page_size: Option<u32>,

    /// Exit non-zero when a form is skipped for missing columns
    #[arg(long, help = "Fail the run when any form is skipped for missing columns")]
    pub fail_on_schema_error: bool,
}

impl ExportArgs {
    /// Form ids given on the command line, if any.
    pub fn form_ids(&self) -> Option<Vec<u32>> {
        if self.form_ids.is_empty() {
            None
        } else {
            Some(self.form_ids.clone())
        }
    }
}

#[derive(Debug, Args)]
pub struct PurgeArgs {
    /// Report what would be deleted without deleting
    #[arg(long, help = "Count matching rows without deleting them")]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(
        short,
        long,
        global = true,
        help = "Suppress all output except errors"
    )]
    pub quiet: bool,

    /// Settings file
    #[arg(
        short,
        long,
        global = true,
        env = "ENTRIES_EXPORTER_CONFIG",
        default_value = DEFAULT_CONFIG_FILE,
        value_name = "FILE",
        help = "Path to the TOML settings file"
    )]
    pub config: PathBuf,
}
