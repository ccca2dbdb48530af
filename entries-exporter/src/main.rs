//! Gravity Forms entries exporter.
//!
//! This binary loads the settings file, connects to the target MySQL
//! database and runs one command: an export, a retention purge or a
//! connection test.
//!
//! # Guarantees
//! - The entry source is only read, never written
//! - Existing target rows are never overwritten
//! - No credentials are logged or printed

use anyhow::Context;
use clap::Parser;
use entries_exporter::{Cli, Command, ExportArgs, PurgeArgs, summary};
use entries_exporter_core::{
    CertificateStore, ExportOptions, Exporter, ExporterSettings, GravityFormsClient, MySqlTarget,
    SearchCriteria, logging::init_logging, purge::purge, target::test_connection,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.global.verbose, cli.global.quiet) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    let config = &cli.global.config;
    let settings = match cli.command {
        Command::TestConnection => ExporterSettings::load_database(config),
        Command::Export(_) | Command::Purge(_) => ExporterSettings::load(config),
    }
    .with_context(|| format!("Unable to load {}", config.display()))?;

    match &cli.command {
        Command::Export(args) => export(&settings, args).await,
        Command::Purge(args) => purge_old_rows(&settings, args).await,
        Command::TestConnection => {
            let ca_path = sync_certificate(&settings)?;
            info!("Testing connection to {}", settings.database);
            test_connection(&settings.database, ca_path.as_deref()).await?;
            println!("Successfully connected!");
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Writes or removes the CA file and returns its path when TLS is on.
fn sync_certificate(settings: &ExporterSettings) -> anyhow::Result<Option<PathBuf>> {
    let store = CertificateStore::from_settings(&settings.storage);
    let ca_path = store
        .sync(&settings.database)
        .context("Unable to place the CA certificate")?;
    Ok(ca_path)
}

async fn connect_target(settings: &ExporterSettings) -> anyhow::Result<MySqlTarget> {
    let ca_path = sync_certificate(settings)?;
    let target = MySqlTarget::connect(&settings.database, ca_path.as_deref()).await?;
    info!("Connected to {}", settings.database);
    Ok(target)
}

async fn export(settings: &ExporterSettings, args: &ExportArgs) -> anyhow::Result<ExitCode> {
    let search = SearchCriteria::parse(
        args.start_date_time.as_deref(),
        args.end_date_time.as_deref(),
    )?;
    let options = ExportOptions::from_settings(settings, args.form_ids(), search, args.page_size)?;
    let source = GravityFormsClient::new(&settings.source)?;

    let mut target = connect_target(settings).await?;
    let report = Exporter::new(&source, &mut target).run(&options).await;
    target.close().await;
    let report = report?;

    println!("{}", summary::export_table(&report));
    if let Some(table) = summary::schema_error_table(&report) {
        println!("Forms skipped for missing columns:");
        println!("{}", table);
    }

    if args.fail_on_schema_error && report.has_schema_errors() {
        warn!(
            "{} form(s) skipped for missing columns",
            report.schema_errors.len()
        );
        eprintln!("Error: export finished with schema errors");
        return Ok(ExitCode::FAILURE);
    }

    println!("Export complete!");
    Ok(ExitCode::SUCCESS)
}

async fn purge_old_rows(settings: &ExporterSettings, args: &PurgeArgs) -> anyhow::Result<ExitCode> {
    let source = GravityFormsClient::new(&settings.source)?;
    let now = chrono::Utc::now().naive_utc();

    let mut target = connect_target(settings).await?;
    let results = purge(settings, &source, &mut target, now, args.dry_run).await;
    target.close().await;
    let results = results?;

    println!("{}", summary::purge_table(&results, args.dry_run));
    if args.dry_run {
        println!("Dry run: no rows were deleted.");
    } else {
        println!("Purge complete!");
    }
    Ok(ExitCode::SUCCESS)
}
