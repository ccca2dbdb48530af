//! The export loop: forms, then pages, then entries, all in sequence.
//!
//! For each selected form the column mapping is derived from the form's
//! fields and checked against the target table. A form whose mapping does
//! not fit is skipped and reported; the run carries on with the next form.
//! Entries of a fitting form are paged from the source and each one is
//! inserted unless a row with its entry id already exists.
//!
//! The existence check and the insert are two statements. Two runs working
//! on overlapping entries at the same time can both see "absent" and both
//! insert; the primary key on `entryid` then rejects the second insert and
//! it is counted as an error.

use crate::config::{ExporterSettings, MAX_PAGE_SIZE};
use crate::error::ExporterError;
use crate::mapping::{FieldMapping, derive_mapping};
use crate::results::{ExportReport, ExportResult, SchemaError, UpsertOutcome};
use crate::schema;
use crate::source::{Entry, EntrySource, Paging, SearchCriteria};
use crate::target::{EntryTarget, Row};
use crate::Result;
use std::collections::HashSet;

/// What to export in one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Forms in processing order
    pub form_ids: Vec<u32>,
    /// Creation-date bounds
    pub search: SearchCriteria,
    /// Entries per page
    pub page_size: u32,
}

impl ExportOptions {
    /// Combines command-line choices with the configured defaults.
    ///
    /// # Errors
    /// Returns error if the page size is outside `1..=1000`.
    pub fn from_settings(
        settings: &ExporterSettings,
        form_ids: Option<Vec<u32>>,
        search: SearchCriteria,
        page_size: Option<u32>,
    ) -> Result<Self> {
        let page_size = page_size.unwrap_or(settings.forms.page_size);
        validate_page_size(page_size)?;

        Ok(Self {
            form_ids: form_ids.unwrap_or_else(|| settings.forms.export.clone()),
            search,
            page_size,
        })
    }
}

pub(crate) fn validate_page_size(page_size: u32) -> Result<()> {
    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        return Err(ExporterError::configuration(format!(
            "page size must be between 1 and {}, got {}",
            MAX_PAGE_SIZE, page_size
        )));
    }
    Ok(())
}

/// Walks a form's entries page by page.
///
/// Page `n` is requested at offset `n × page_size` until the number of
/// entries seen reaches the count reported up front. An empty page ends the
/// walk early. A page that overshoots the count is returned whole.
#[derive(Debug)]
pub struct EntryPages<'a, S: ?Sized> {
    source: &'a S,
    form_id: u32,
    search: SearchCriteria,
    page_size: u32,
    total: u64,
    seen: u64,
    index: u64,
}

impl<'a, S: EntrySource + ?Sized> EntryPages<'a, S> {
    pub fn new(
        source: &'a S,
        form_id: u32,
        search: SearchCriteria,
        page_size: u32,
        total: u64,
    ) -> Self {
        Self {
            source,
            form_id,
            search,
            page_size,
            total,
            seen: 0,
            index: 0,
        }
    }

    /// Fetches the next page, or `None` when the walk is over.
    ///
    /// # Errors
    /// Returns the source error of a failed page request.
    pub async fn next_page(&mut self) -> Result<Option<Vec<Entry>>> {
        if self.seen >= self.total {
            return Ok(None);
        }

        let paging = Paging::page(self.index, self.page_size);
        tracing::debug!(
            "Form {}: fetching page {} (offset {})",
            self.form_id,
            self.index,
            paging.offset
        );

        let entries = self
            .source
            .get_entries(self.form_id, &self.search, paging)
            .await?;
        self.index += 1;

        if entries.is_empty() {
            tracing::warn!(
                "Form {}: empty page at offset {} after {} of {} entries",
                self.form_id,
                paging.offset,
                self.seen,
                self.total
            );
            self.seen = self.total;
            return Ok(None);
        }

        self.seen += entries.len() as u64;
        Ok(Some(entries))
    }
}

/// Inserts an entry unless its id is already present.
pub async fn upsert<T>(target: &mut T, entry: &Entry, mapping: &FieldMapping) -> UpsertOutcome
where
    T: EntryTarget + ?Sized,
{
    let Some(entry_id) = entry.id() else {
        tracing::warn!("Entry without a usable id skipped");
        return UpsertOutcome::Error;
    };

    match target.entry_exists(entry_id).await {
        Ok(true) => return UpsertOutcome::Skipped,
        Ok(false) => {}
        Err(e) => {
            tracing::warn!("Entry {}: {}", entry_id, e);
            return UpsertOutcome::Error;
        }
    }

    let row = Row::from_entry(entry, mapping);
    match target.insert_row(&row).await {
        Ok(()) => UpsertOutcome::Written,
        Err(e) => {
            tracing::warn!("Entry {}: {}", entry_id, e);
            UpsertOutcome::Error
        }
    }
}

/// Reads the target's columns, failing when the table is absent.
pub(crate) async fn require_table_columns<T>(target: &mut T) -> Result<HashSet<String>>
where
    T: EntryTarget + ?Sized,
{
    let columns = target.table_columns().await?;
    if columns.is_empty() {
        return Err(ExporterError::configuration(
            "target table does not exist or has no columns; check database.name and database.table",
        ));
    }
    Ok(columns)
}

/// Drives one export run.
pub struct Exporter<'a, S: ?Sized, T: ?Sized> {
    source: &'a S,
    target: &'a mut T,
}

impl<'a, S, T> Exporter<'a, S, T>
where
    S: EntrySource + ?Sized,
    T: EntryTarget + ?Sized,
{
    pub fn new(source: &'a S, target: &'a mut T) -> Self {
        Self { source, target }
    }

    /// Exports every selected form.
    ///
    /// # Errors
    /// Returns error if the target table is missing or a source request
    /// fails. Schema mismatches and row failures are reported, not raised.
    pub async fn run(&mut self, options: &ExportOptions) -> Result<ExportReport> {
        let mut report = ExportReport::default();

        if options.form_ids.is_empty() {
            tracing::warn!("No forms selected for export");
            return Ok(report);
        }

        let columns = require_table_columns(&mut *self.target).await?;
        tracing::debug!("Target table has {} columns", columns.len());

        for &form_id in &options.form_ids {
            self.export_form(form_id, &columns, options, &mut report)
                .await?;
        }

        Ok(report)
    }

    async fn export_form(
        &mut self,
        form_id: u32,
        columns: &HashSet<String>,
        options: &ExportOptions,
        report: &mut ExportReport,
    ) -> Result<()> {
        let form = self.source.get_form(form_id).await?;
        let mapping = derive_mapping(&form.fields);

        let check = schema::verify(columns, &mapping);
        if !check.ok {
            tracing::warn!(
                "Form {} ({}) skipped, missing columns: {}",
                form.id,
                form.title,
                check.missing.join(", ")
            );
            report.schema_errors.push(SchemaError {
                form_id: form.id,
                form_title: form.title,
                missing: check.missing,
            });
            return Ok(());
        }

        let total = self
            .source
            .count_entries(form_id, &options.search)
            .await?;
        tracing::info!("Exporting form {} ({}): {} entries", form.id, form.title, total);

        let mut result = ExportResult::new(form.id, form.title, total);
        let mut pages = EntryPages::new(
            self.source,
            form_id,
            options.search,
            options.page_size,
            total,
        );

        while let Some(entries) = pages.next_page().await? {
            for entry in &entries {
                let outcome = upsert(&mut *self.target, entry, &mapping).await;
                result.record(outcome);
            }
        }

        tracing::info!(
            "Form {}: {} written, {} skipped, {} errors",
            result.form_id,
            result.written,
            result.skipped,
            result.errors
        );
        report.results.push(result);

        Ok(())
    }
}
