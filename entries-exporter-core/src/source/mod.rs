//! Entry source abstraction.
//!
//! The exporter reads form definitions and pages of entries from an
//! [`EntrySource`]. The production implementation is the Gravity Forms REST
//! API client in [`rest`]; tests drive the pipeline with in-memory sources.
//!
//! # Module Structure
//! - `rest`: Gravity Forms REST API v2 client

pub mod rest;

use crate::error::ExporterError;
use crate::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

pub use rest::GravityFormsClient;

/// Format the source expects for date bounds.
pub const SOURCE_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A form definition.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Form {
    /// Form id
    #[serde(deserialize_with = "id_from_number_or_string")]
    pub id: u32,
    /// Human title
    #[serde(default)]
    pub title: String,
    /// Fields in display order
    #[serde(default)]
    pub fields: Vec<FormField>,
}

/// One field of a form.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FormField {
    /// Field identifier, the key of the field's value in an entry
    #[serde(deserialize_with = "key_from_number_or_string")]
    pub id: String,
    /// Human label the column name is derived from
    #[serde(default)]
    pub label: String,
    /// Field type, e.g. `text` or `email`
    #[serde(default, rename = "type")]
    pub field_type: Option<String>,
}

impl FormField {
    /// Creates a field with no type.
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            field_type: None,
        }
    }
}

/// One submitted record, keyed by field identifier.
///
/// Besides the numbered form fields an entry carries `id`, `date_created`
/// and `source_url`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Entry(Map<String, Value>);

impl Entry {
    /// Wraps a JSON object.
    pub fn new(values: Map<String, Value>) -> Self {
        Self(values)
    }

    /// Value for a field identifier.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Entry id, accepted as a JSON number or a numeric string.
    pub fn id(&self) -> Option<i64> {
        match self.0.get("id")? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl From<Value> for Entry {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }
}

/// Optional creation-date bounds applied to count and page requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchCriteria {
    /// Earliest creation date
    pub start_date: Option<NaiveDateTime>,
    /// Latest creation date
    pub end_date: Option<NaiveDateTime>,
}

impl SearchCriteria {
    /// Parses optional command-line bounds.
    ///
    /// A date without a time covers the whole day: the start bound becomes
    /// midnight and the end bound 23:59:59.
    ///
    /// # Errors
    /// Returns error if a bound cannot be parsed or start is after end.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self> {
        let start_date = start
            .map(|s| parse_date_time(s, NaiveTime::MIN))
            .transpose()?;
        let end_date = end
            .map(|s| parse_date_time(s, end_of_day()))
            .transpose()?;

        if let (Some(start), Some(end)) = (start_date, end_date)
            && start > end
        {
            return Err(ExporterError::configuration(
                "start date-time must not be after end date-time",
            ));
        }

        Ok(Self {
            start_date,
            end_date,
        })
    }

    /// True when neither bound is set.
    pub fn is_unbounded(&self) -> bool {
        self.start_date.is_none() && self.end_date.is_none()
    }

    /// The JSON `search` object sent to the source.
    pub fn to_search_json(&self) -> Value {
        let mut search = Map::new();
        if let Some(start) = self.start_date {
            search.insert(
                "start_date".to_string(),
                Value::String(start.format(SOURCE_DATE_FORMAT).to_string()),
            );
        }
        if let Some(end) = self.end_date {
            search.insert(
                "end_date".to_string(),
                Value::String(end.format(SOURCE_DATE_FORMAT).to_string()),
            );
        }
        Value::Object(search)
    }
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
}

/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` and
/// RFC 3339. Offsets are converted to UTC.
fn parse_date_time(value: &str, date_only_time: NaiveTime) -> Result<NaiveDateTime> {
    let value = value.trim();

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(value) {
        return Ok(dt.naive_utc());
    }
    for format in [SOURCE_DATE_FORMAT, "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(dt);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date.and_time(date_only_time));
    }

    Err(ExporterError::configuration(format!(
        "Unrecognized date-time '{}': use YYYY-MM-DD, YYYY-MM-DD HH:MM:SS or RFC 3339",
        value
    )))
}

/// Offset-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    /// Entries to skip
    pub offset: u64,
    /// Entries to return
    pub page_size: u32,
}

impl Paging {
    /// Page `index` (zero based) of `page_size` entries.
    pub fn page(index: u64, page_size: u32) -> Self {
        Self {
            offset: index.saturating_mul(u64::from(page_size)),
            page_size,
        }
    }
}

/// Read access to forms and their entries.
///
/// Implementations must return entries in a stable order so that successive
/// offsets do not overlap.
#[async_trait]
pub trait EntrySource: Send + Sync {
    /// Fetches a form definition.
    ///
    /// # Errors
    /// Returns error if the form does not exist or the request fails.
    async fn get_form(&self, form_id: u32) -> Result<Form>;

    /// Counts the entries of a form matching the search criteria.
    async fn count_entries(&self, form_id: u32, search: &SearchCriteria) -> Result<u64>;

    /// Fetches one page of entries.
    async fn get_entries(
        &self,
        form_id: u32,
        search: &SearchCriteria,
        paging: Paging,
    ) -> Result<Vec<Entry>>;
}

fn id_from_number_or_string<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let key = key_from_number_or_string(deserializer)?;
    key.parse().map_err(serde::de::Error::custom)
}

fn key_from_number_or_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a number or string id, got {}",
            other
        ))),
    }
}
