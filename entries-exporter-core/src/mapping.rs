//! Column mapping derived from a form's fields.
//!
//! Each field label is turned into a column name by lower-casing it and
//! dropping spaces and the punctuation `? : ( ) . _ ,`. Three synthetic
//! mappings for entry metadata are always appended.

use crate::source::FormField;

/// Characters removed from labels when deriving column names.
const STRIPPED_CHARS: [char; 8] = [' ', '?', ':', '(', ')', '.', '_', ','];

/// Entry keys and columns that every mapping carries.
pub const SYNTHETIC_MAPPINGS: [(&str, &str); 3] = [
    ("id", ENTRY_ID_COLUMN),
    ("date_created", "entrydate"),
    ("source_url", "leadsourceurl"),
];

/// Primary key column of the target table.
pub const ENTRY_ID_COLUMN: &str = "entryid";

/// One source key mapped to one target column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedField {
    /// Key of the value in an entry
    pub source_key: String,
    /// Label the column was derived from
    pub label: String,
    /// Target column name
    pub column: String,
}

/// Ordered mapping from entry keys to target columns.
///
/// Column names are unique: inserting a mapping for a column that is already
/// mapped replaces the earlier mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMapping {
    fields: Vec<MappedField>,
}

impl FieldMapping {
    /// Adds a mapping, replacing any earlier mapping to the same column.
    pub fn insert(
        &mut self,
        source_key: impl Into<String>,
        label: impl Into<String>,
        column: impl Into<String>,
    ) {
        let field = MappedField {
            source_key: source_key.into(),
            label: label.into(),
            column: column.into(),
        };

        if let Some(pos) = self.fields.iter().position(|f| f.column == field.column) {
            let replaced = self.fields.remove(pos);
            tracing::warn!(
                "Column '{}' mapped from '{}' is replaced by '{}'",
                field.column,
                replaced.label,
                field.label
            );
        }

        self.fields.push(field);
    }

    /// Mappings in order.
    pub fn iter(&self) -> impl Iterator<Item = &MappedField> {
        self.fields.iter()
    }

    /// Target column names in order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.column.as_str())
    }

    /// Column mapped from an entry key.
    pub fn column_for(&self, source_key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.source_key == source_key)
            .map(|f| f.column.as_str())
    }

    /// Number of mapped columns.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when nothing is mapped.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Derives the column name for a field label.
///
/// # Example
/// ```rust
/// use entries_exporter_core::mapping::column_name;
///
/// assert_eq!(column_name("Email Address?"), "emailaddress");
/// assert_eq!(column_name("First_Name"), "firstname");
/// ```
pub fn column_name(label: &str) -> String {
    label
        .to_lowercase()
        .chars()
        .filter(|c| !STRIPPED_CHARS.contains(c))
        .collect()
}

/// Builds the mapping for a form's fields followed by the synthetic entry
/// metadata mappings.
pub fn derive_mapping(fields: &[FormField]) -> FieldMapping {
    let mut mapping = FieldMapping::default();

    for field in fields {
        mapping.insert(field.id.clone(), field.label.clone(), column_name(&field.label));
    }

    for (source_key, column) in SYNTHETIC_MAPPINGS {
        mapping.insert(source_key, source_key, column);
    }

    mapping
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> Vec<FormField> {
        vec![
            FormField::new("1", "First_Name"),
            FormField::new("2", "Email Address?"),
            FormField::new("3", "Program (Graduate), Term: Fall."),
        ]
    }

    #[test]
    fn test_column_name_strips_punctuation() {
        assert_eq!(column_name("Email Address?"), "emailaddress");
        assert_eq!(column_name("First_Name"), "firstname");
        assert_eq!(
            column_name("Program (Graduate), Term: Fall."),
            "programgraduatetermfall"
        );
        assert_eq!(column_name("Phone-Number"), "phone-number");
    }

    #[test]
    fn test_derive_mapping_order_and_synthetics() {
        let mapping = derive_mapping(&fields());
        let columns: Vec<&str> = mapping.columns().collect();

        assert_eq!(
            columns,
            vec![
                "firstname",
                "emailaddress",
                "programgraduatetermfall",
                "entryid",
                "entrydate",
                "leadsourceurl"
            ]
        );
        assert_eq!(mapping.column_for("2"), Some("emailaddress"));
    }

    #[test]
    fn test_synthetics_present_without_fields() {
        let mapping = derive_mapping(&[]);

        assert_eq!(mapping.len(), 3);
        assert_eq!(mapping.column_for("id"), Some("entryid"));
        assert_eq!(mapping.column_for("date_created"), Some("entrydate"));
        assert_eq!(mapping.column_for("source_url"), Some("leadsourceurl"));
    }

    #[test]
    fn test_derive_mapping_is_deterministic() {
        assert_eq!(derive_mapping(&fields()), derive_mapping(&fields()));
    }

    #[test]
    fn test_synthetic_replaces_colliding_field() {
        let mapping = derive_mapping(&[
            FormField::new("5", "Entry ID"),
            FormField::new("6", "Name"),
        ]);

        assert_eq!(mapping.len(), 4);
        assert_eq!(mapping.column_for("5"), None);
        assert_eq!(mapping.column_for("id"), Some("entryid"));
    }

    #[test]
    fn test_duplicate_labels_last_write_wins() {
        let mapping = derive_mapping(&[
            FormField::new("1", "Name"),
            FormField::new("9", "name"),
        ]);

        assert_eq!(mapping.column_for("1"), None);
        assert_eq!(mapping.column_for("9"), Some("name"));
        assert_eq!(mapping.columns().filter(|c| *c == "name").count(), 1);
    }
}
