//! Per-form tallies collected while a command runs.

use serde::Serialize;

/// Classification of one entry by the upsert step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    /// Row inserted
    Written,
    /// A row with the same entry id already existed
    Skipped,
    /// No usable id, or the existence check or insert failed
    Error,
}

/// Export counts for one form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportResult {
    pub form_id: u32,
    pub form_title: String,
    /// Entry count reported by the source before paging
    pub total_count: u64,
    pub processed: u64,
    pub written: u64,
    pub skipped: u64,
    pub errors: u64,
}

impl ExportResult {
    pub fn new(form_id: u32, form_title: impl Into<String>, total_count: u64) -> Self {
        Self {
            form_id,
            form_title: form_title.into(),
            total_count,
            ..Self::default()
        }
    }

    /// Counts one processed entry.
    pub fn record(&mut self, outcome: UpsertOutcome) {
        self.processed += 1;
        match outcome {
            UpsertOutcome::Written => self.written += 1,
            UpsertOutcome::Skipped => self.skipped += 1,
            UpsertOutcome::Error => self.errors += 1,
        }
    }
}

/// A form skipped because the target table lacks mapped columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaError {
    pub form_id: u32,
    pub form_title: String,
    pub missing: Vec<String>,
}

/// Everything an export run produced, in form order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    pub results: Vec<ExportResult>,
    pub schema_errors: Vec<SchemaError>,
}

impl ExportReport {
    /// Sum of every form's counts. The total's `form_id` is 0.
    pub fn totals(&self) -> ExportResult {
        self.results
            .iter()
            .fold(ExportResult::new(0, "Total", 0), |mut acc, r| {
                acc.total_count += r.total_count;
                acc.processed += r.processed;
                acc.written += r.written;
                acc.skipped += r.skipped;
                acc.errors += r.errors;
                acc
            })
    }

    pub fn has_schema_errors(&self) -> bool {
        !self.schema_errors.is_empty()
    }
}

/// Purge counts for one form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PurgeResult {
    pub form_id: u32,
    pub form_title: String,
    /// Source entries at or before the cutoff
    pub matched: u64,
    /// Target rows removed, or that would be removed in a dry run
    pub deleted: u64,
    pub errors: u64,
}

impl PurgeResult {
    pub fn new(form_id: u32, form_title: impl Into<String>) -> Self {
        Self {
            form_id,
            form_title: form_title.into(),
            ..Self::default()
        }
    }
}
