//! Pre-flight check that the target table can hold every mapped column.

use crate::mapping::FieldMapping;
use std::collections::HashSet;

/// Outcome of verifying a mapping against the target table's columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaCheck {
    /// True when every mapped column exists
    pub ok: bool,
    /// Mapped columns missing from the table, in mapping order
    pub missing: Vec<String>,
}

/// Compares mapped columns with the table's columns.
///
/// MySQL column names are case-insensitive, so both sides are compared in
/// lower case. `table_columns` may be given in any case.
pub fn verify(table_columns: &HashSet<String>, mapping: &FieldMapping) -> SchemaCheck {
    let known: HashSet<String> = table_columns.iter().map(|c| c.to_lowercase()).collect();

    let missing: Vec<String> = mapping
        .columns()
        .filter(|column| !known.contains(&column.to_lowercase()))
        .map(str::to_string)
        .collect();

    SchemaCheck {
        ok: missing.is_empty(),
        missing,
    }
}
