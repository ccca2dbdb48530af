//! Target table abstraction.
//!
//! The export and purge loops write through an [`EntryTarget`]. The
//! production implementation is [`mysql::MySqlTarget`], which holds one
//! connection for the whole run.
//!
//! # Module Structure
//! - `mysql`: connector and MySQL target

pub mod mysql;

use crate::mapping::FieldMapping;
use crate::source::Entry;
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;

pub use mysql::{MySqlTarget, connect, test_connection};

/// Row to insert: target columns with nullable text values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    values: Vec<(String, Option<String>)>,
}

impl Row {
    /// Builds the row for an entry. Mapped keys missing from the entry are
    /// NULL.
    pub fn from_entry(entry: &Entry, mapping: &FieldMapping) -> Self {
        let values = mapping
            .iter()
            .map(|field| {
                let value = entry.get(&field.source_key).and_then(value_to_text);
                (field.column.clone(), value)
            })
            .collect();
        Self { values }
    }

    /// Column names in order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(c, _)| c.as_str())
    }

    /// Values in column order.
    pub fn values(&self) -> impl Iterator<Item = Option<&str>> {
        self.values.iter().map(|(_, v)| v.as_deref())
    }

    /// Value of one column.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(c, _)| c == column)
            .and_then(|(_, v)| v.as_deref())
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Text bound for a JSON value. Strings bind as-is, scalars as their textual
/// form, arrays and objects as JSON text, `null` as NULL.
fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

/// Write access to the target table.
///
/// Methods take `&mut self`: a target owns a single session and every call
/// is made in sequence.
#[async_trait]
pub trait EntryTarget: Send {
    /// Column names of the target table. Empty when the table does not exist.
    async fn table_columns(&mut self) -> Result<HashSet<String>>;

    /// True when a row with this entry id exists.
    async fn entry_exists(&mut self, entry_id: i64) -> Result<bool>;

    /// Inserts one row.
    async fn insert_row(&mut self, row: &Row) -> Result<()>;

    /// Deletes the row with this entry id, returning the number of rows
    /// removed.
    async fn delete_entry(&mut self, entry_id: i64) -> Result<u64>;
}

/// Quotes a MySQL identifier with backticks, doubling embedded backticks.
pub fn quote_identifier(identifier: &str) -> String {
    format!("`{}`", identifier.replace('`', "``"))
}
