//! Generic schema snapshot.
//!
//! A snapshot maps table names to their columns and declared data types. It
//! is built in one introspection pass and never patched afterwards; a new
//! attach produces a new snapshot that replaces the old one.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Column name → declared data type.
pub type ColumnTypes = BTreeMap<String, String>;

/// Table name → columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaSnapshot {
    tables: BTreeMap<String, ColumnTypes>,
}

impl SchemaSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a table, replacing any previous definition with the same name.
    pub fn insert_table(&mut self, name: impl Into<String>, columns: ColumnTypes) {
        self.tables.insert(name.into(), columns);
    }

    /// Get the columns of a table.
    pub fn table(&self, name: &str) -> Option<&ColumnTypes> {
        self.tables.get(name)
    }

    /// Get the declared type of a column.
    pub fn column_type(&self, table: &str, column: &str) -> Option<&str> {
        self.tables
            .get(table)
            .and_then(|cols| cols.get(column))
            .map(String::as_str)
    }

    /// Iterate tables in name order.
    pub fn tables(&self) -> impl Iterator<Item = (&str, &ColumnTypes)> {
        self.tables.iter().map(|(name, cols)| (name.as_str(), cols))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl FromIterator<(String, ColumnTypes)> for SchemaSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, ColumnTypes)>>(iter: I) -> Self {
        Self {
            tables: iter.into_iter().collect(),
        }
    }
}

/// One line per table: `accounts(id integer, owner text)`.
impl fmt::Display for SchemaSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (table, columns)) in self.tables.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            let cols = columns
                .iter()
                .map(|(name, ty)| format!("{} {}", name, ty))
                .collect::<Vec<_>>()
                .join(", ");
            write!(f, "{}({})", table, cols)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn columns(pairs: &[(&str, &str)]) -> ColumnTypes {
        pairs
            .iter()
            .map(|(c, t)| (c.to_string(), t.to_string()))
            .collect()
    }

    #[test]
    fn test_insert_replaces_table() {
        let mut schema = SchemaSnapshot::new();
        schema.insert_table("t1", columns(&[("c1", "text")]));
        schema.insert_table("t1", columns(&[("c2", "integer")]));

        assert_eq!(schema.len(), 1);
        assert_eq!(schema.column_type("t1", "c1"), None);
        assert_eq!(schema.column_type("t1", "c2"), Some("integer"));
    }

    #[test]
    fn test_display_is_ordered() {
        let schema: SchemaSnapshot = vec![
            ("users".to_string(), columns(&[("name", "text"), ("id", "integer")])),
            ("accounts".to_string(), columns(&[("id", "integer")])),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            schema.to_string(),
            "accounts(id integer)\nusers(id integer, name text)"
        );
    }

    #[test]
    fn test_serializes_as_nested_map() {
        let mut schema = SchemaSnapshot::new();
        schema.insert_table("t1", columns(&[("c1", "text")]));

        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(json, serde_json::json!({"t1": {"c1": "text"}}));
    }
}
