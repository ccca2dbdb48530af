//! Retention purge: removes target rows for entries older than the
//! retention window.
//!
//! Only the configured forms are considered. Their source entries created
//! at or before the cutoff are paged exactly as the export does, and each
//! entry's row is deleted from the target table when present. The source is
//! never modified.

use crate::config::ExporterSettings;
use crate::error::ExporterError;
use crate::export::{EntryPages, require_table_columns, validate_page_size};
use crate::results::PurgeResult;
use crate::source::{Entry, EntrySource, SearchCriteria};
use crate::target::EntryTarget;
use crate::Result;
use chrono::{Duration, NaiveDateTime};

/// Creation date at or before which entries are purged.
///
/// # Errors
/// Returns error if `retain_days` is zero.
pub fn cutoff(now: NaiveDateTime, retain_days: u32) -> Result<NaiveDateTime> {
    if retain_days == 0 {
        return Err(ExporterError::configuration(
            "retention.retain_days must be greater than 0",
        ));
    }

    now.checked_sub_signed(Duration::days(i64::from(retain_days)))
        .ok_or_else(|| ExporterError::configuration("retention window is out of range"))
}

/// Purges every configured form.
///
/// With `dry_run` set, rows are counted but nothing is deleted.
///
/// # Errors
/// Returns error if the retention window is invalid, the target table is
/// missing or a source request fails. Individual row failures are counted.
pub async fn purge<S, T>(
    settings: &ExporterSettings,
    source: &S,
    target: &mut T,
    now: NaiveDateTime,
    dry_run: bool,
) -> Result<Vec<PurgeResult>>
where
    S: EntrySource + ?Sized,
    T: EntryTarget + ?Sized,
{
    let cutoff = cutoff(now, settings.retention.retain_days)?;
    let page_size = settings.forms.page_size;
    validate_page_size(page_size)?;

    let mut results = Vec::new();
    if settings.forms.export.is_empty() {
        tracing::warn!("No forms configured; nothing to purge");
        return Ok(results);
    }

    require_table_columns(target).await?;

    let search = SearchCriteria {
        start_date: None,
        end_date: Some(cutoff),
    };
    tracing::info!(
        "Purging entries created on or before {}{}",
        cutoff,
        if dry_run { " (dry run)" } else { "" }
    );

    for &form_id in &settings.forms.export {
        let form = source.get_form(form_id).await?;
        let total = source.count_entries(form_id, &search).await?;
        let mut result = PurgeResult::new(form.id, form.title);

        let mut pages = EntryPages::new(source, form_id, search, page_size, total);
        while let Some(entries) = pages.next_page().await? {
            for entry in &entries {
                purge_entry(target, entry, dry_run, &mut result).await;
            }
        }

        tracing::info!(
            "Form {}: {} matched, {} deleted, {} errors",
            result.form_id,
            result.matched,
            result.deleted,
            result.errors
        );
        results.push(result);
    }

    Ok(results)
}

async fn purge_entry<T>(target: &mut T, entry: &Entry, dry_run: bool, result: &mut PurgeResult)
where
    T: EntryTarget + ?Sized,
{
    let Some(entry_id) = entry.id() else {
        tracing::warn!("Entry without a usable id skipped");
        result.errors += 1;
        return;
    };
    result.matched += 1;

    match target.entry_exists(entry_id).await {
        Ok(true) => {}
        Ok(false) => return,
        Err(e) => {
            tracing::warn!("Entry {}: {}", entry_id, e);
            result.errors += 1;
            return;
        }
    }

    if dry_run {
        result.deleted += 1;
        return;
    }

    match target.delete_entry(entry_id).await {
        Ok(removed) => result.deleted += removed,
        Err(e) => {
            tracing::warn!("Entry {}: {}", entry_id, e);
            result.errors += 1;
        }
    }
}
