//! In-memory source and target used by the pipeline tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDateTime;
use entries_exporter_core::{
    Entry, EntrySource, EntryTarget, ExporterError, Form, FormField, Result, Row, SearchCriteria,
    source::Paging,
};
use serde_json::json;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Source serving fixed forms and entries, filtering by creation date the
/// way the REST API does.
#[derive(Default)]
pub struct FakeSource {
    forms: HashMap<u32, Form>,
    entries: HashMap<u32, Vec<Entry>>,
    count_overrides: HashMap<u32, u64>,
    pub requests: Mutex<Vec<(u32, Paging)>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_form(mut self, id: u32, title: &str, labels: &[&str], entries: Vec<Entry>) -> Self {
        let fields = labels
            .iter()
            .enumerate()
            .map(|(i, label)| FormField::new((i + 1).to_string(), *label))
            .collect();
        self.forms.insert(
            id,
            Form {
                id,
                title: title.to_string(),
                fields,
            },
        );
        self.entries.insert(id, entries);
        self
    }

    /// Makes `count_entries` report `count` regardless of the entries held.
    pub fn with_count(mut self, form_id: u32, count: u64) -> Self {
        self.count_overrides.insert(form_id, count);
        self
    }

    pub fn offsets(&self, form_id: u32) -> Vec<u64> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == form_id)
            .map(|(_, paging)| paging.offset)
            .collect()
    }

    fn matching(&self, form_id: u32, search: &SearchCriteria) -> Vec<Entry> {
        self.entries
            .get(&form_id)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|entry| within(entry, search))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn within(entry: &Entry, search: &SearchCriteria) -> bool {
    let created = entry
        .get("date_created")
        .and_then(|v| v.as_str())
        .and_then(|s| NaiveDateTime::parse_from_str(s, DATE_FORMAT).ok());

    let Some(created) = created else {
        return search.is_unbounded();
    };

    search.start_date.is_none_or(|start| created >= start)
        && search.end_date.is_none_or(|end| created <= end)
}

#[async_trait]
impl EntrySource for FakeSource {
    async fn get_form(&self, form_id: u32) -> Result<Form> {
        self.forms
            .get(&form_id)
            .cloned()
            .ok_or_else(|| ExporterError::source_rejected(format!("form {} not found", form_id)))
    }

    async fn count_entries(&self, form_id: u32, search: &SearchCriteria) -> Result<u64> {
        if let Some(count) = self.count_overrides.get(&form_id) {
            return Ok(*count);
        }
        Ok(self.matching(form_id, search).len() as u64)
    }

    async fn get_entries(
        &self,
        form_id: u32,
        search: &SearchCriteria,
        paging: Paging,
    ) -> Result<Vec<Entry>> {
        self.requests.lock().unwrap().push((form_id, paging));

        Ok(self
            .matching(form_id, search)
            .into_iter()
            .skip(paging.offset as usize)
            .take(paging.page_size as usize)
            .collect())
    }
}

/// Target table held in memory, keyed by entry id.
#[derive(Debug, Default)]
pub struct FakeTarget {
    pub columns: HashSet<String>,
    pub rows: BTreeMap<i64, Row>,
    pub rejected_ids: HashSet<i64>,
    pub inserts: usize,
}

impl FakeTarget {
    pub fn with_columns(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            ..Self::default()
        }
    }

    /// Pre-populates a row holding only the entry id.
    pub fn with_existing(mut self, entry_id: i64) -> Self {
        self.rows.insert(entry_id, Row::default());
        self
    }

    /// Makes inserts of this entry id fail.
    pub fn rejecting(mut self, entry_id: i64) -> Self {
        self.rejected_ids.insert(entry_id);
        self
    }
}

#[async_trait]
impl EntryTarget for FakeTarget {
    async fn table_columns(&mut self) -> Result<HashSet<String>> {
        Ok(self.columns.clone())
    }

    async fn entry_exists(&mut self, entry_id: i64) -> Result<bool> {
        Ok(self.rows.contains_key(&entry_id))
    }

    async fn insert_row(&mut self, row: &Row) -> Result<()> {
        let entry_id: i64 = row
            .get("entryid")
            .and_then(|id| id.parse().ok())
            .ok_or_else(|| ExporterError::configuration("row without entryid"))?;

        if self.rejected_ids.contains(&entry_id) || self.rows.contains_key(&entry_id) {
            return Err(ExporterError::query_failed(
                "Insert failed",
                std::io::Error::other("duplicate or rejected row"),
            ));
        }

        self.inserts += 1;
        self.rows.insert(entry_id, row.clone());
        Ok(())
    }

    async fn delete_entry(&mut self, entry_id: i64) -> Result<u64> {
        Ok(u64::from(self.rows.remove(&entry_id).is_some()))
    }
}

/// Columns for a single-field form labelled "Name".
pub const NAME_TABLE: [&str; 4] = ["name", "entryid", "entrydate", "leadsourceurl"];

/// Entry `id` created at `date_created` with a value for field `1`.
pub fn entry(id: i64, date_created: &str) -> Entry {
    Entry::from(json!({
        "id": id.to_string(),
        "date_created": date_created,
        "source_url": "https://www.example.edu/apply",
        "1": format!("person-{}", id),
    }))
}

/// `count` entries with ids starting at `first`, all created on one day.
pub fn entries(first: i64, count: i64) -> Vec<Entry> {
    (first..first + count)
        .map(|id| entry(id, "2024-05-01 09:00:00"))
        .collect()
}
