//! Command-line parsing tests.

#![allow(clippy::unwrap_used)]

use clap::{CommandFactory, Parser};
use entries_exporter::{Cli, Command, DEFAULT_CONFIG_FILE};
use std::path::PathBuf;

#[test]
fn test_cli_definition_is_valid() {
    Cli::command().debug_assert();
}

#[test]
fn test_export_defaults() {
    let cli = Cli::try_parse_from(["entries-exporter", "export"]).unwrap();

    assert_eq!(cli.global.verbose, 0);
    assert!(!cli.global.quiet);
    let Command::Export(args) = cli.command else {
        panic!("expected export");
    };
    assert_eq!(args.form_ids(), None);
    assert_eq!(args.page_size, None);
    assert!(args.start_date_time.is_none());
    assert!(!args.fail_on_schema_error);
}

#[test]
fn test_export_with_all_options() {
    let cli = Cli::try_parse_from([
        "entries-exporter",
        "-vv",
        "export",
        "--start-date-time",
        "2024-01-01",
        "--end-date-time",
        "2024-01-31 23:00:00",
        "--form-ids",
        "1,4,7",
        "--page-size",
        "50",
        "--fail-on-schema-error",
    ])
    .unwrap();

    assert_eq!(cli.global.verbose, 2);
    let Command::Export(args) = cli.command else {
        panic!("expected export");
    };
    assert_eq!(args.form_ids(), Some(vec![1, 4, 7]));
    assert_eq!(args.page_size, Some(50));
    assert_eq!(args.start_date_time.as_deref(), Some("2024-01-01"));
    assert_eq!(args.end_date_time.as_deref(), Some("2024-01-31 23:00:00"));
    assert!(args.fail_on_schema_error);
}

#[test]
fn test_page_size_is_bounded() {
    for size in ["0", "1001"] {
        let result = Cli::try_parse_from(["entries-exporter", "export", "--page-size", size]);
        assert!(result.is_err(), "page size {} accepted", size);
    }
}

#[test]
fn test_invalid_form_id_is_rejected() {
    let result = Cli::try_parse_from(["entries-exporter", "export", "--form-ids", "1,x"]);
    assert!(result.is_err());
}

#[test]
fn test_purge_dry_run() {
    let cli = Cli::try_parse_from(["entries-exporter", "purge", "--dry-run"]).unwrap();
    assert!(matches!(cli.command, Command::Purge(ref args) if args.dry_run));
}

#[test]
fn test_config_flag_after_subcommand() {
    let cli = Cli::try_parse_from([
        "entries-exporter",
        "test-connection",
        "--config",
        "/etc/entries-exporter.toml",
        "-q",
    ])
    .unwrap();

    assert!(matches!(cli.command, Command::TestConnection));
    assert_eq!(
        cli.global.config,
        PathBuf::from("/etc/entries-exporter.toml")
    );
    assert!(cli.global.quiet);
}

#[test]
fn test_config_default() {
    temp_env::with_var_unset("ENTRIES_EXPORTER_CONFIG", || {
        let cli = Cli::try_parse_from(["entries-exporter", "test-connection"]).unwrap();
        assert_eq!(cli.global.config, PathBuf::from(DEFAULT_CONFIG_FILE));
    });
}

#[test]
fn test_subcommand_is_required() {
    assert!(Cli::try_parse_from(["entries-exporter"]).is_err());
}
