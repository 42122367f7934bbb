//! SAS-102: Rows and datasets.
//!
//! A [`Row`] is an insertion-ordered set of named values. A [`Dataset`]
//! holds rows plus the declared column order used for listings. Rows are
//! allowed to carry different column sets; absent columns display as
//! missing.

use serde::{Deserialize, Serialize};

use crate::value::Value;

// ---------------------------------------------------------------------------
// Row
// ---------------------------------------------------------------------------

/// One observation: variable name to value, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from name/value pairs. Later duplicates overwrite earlier ones.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut row = Self::new();
        for (k, v) in pairs {
            row.set(k, v.into());
        }
        row
    }

    /// Value of a column, if present.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Value of a column, or missing when absent.
    pub fn value(&self, name: &str) -> Value {
        self.get(name).cloned().unwrap_or(Value::Missing)
    }

    /// Whether the column is present.
    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|(k, _)| k == name)
    }

    /// Set a column, appending it when new.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.columns.iter_mut().find(|(k, _)| *k == name) {
            Some((_, slot)) => *slot = value,
            None => self.columns.push((name, value)),
        }
    }

    /// Remove a column, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let pos = self.columns.iter().position(|(k, _)| k == name)?;
        Some(self.columns.remove(pos).1)
    }

    /// Keep only the columns for which `keep` returns `true`.
    pub fn retain_columns(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.columns.retain(|(k, _)| keep(k));
    }

    /// Column names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(k, _)| k.as_str())
    }

    /// Name/value pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Name of the first column, if any.
    pub fn first_column(&self) -> Option<&str> {
        self.columns.first().map(|(k, _)| k.as_str())
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Dataset
// ---------------------------------------------------------------------------

/// A named, ordered collection of rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Dataset name as written in the program (may be library-qualified).
    pub name: String,
    /// Declared columns in print/output order.
    pub column_order: Vec<String>,
    /// Observations in insertion order.
    pub rows: Vec<Row>,
}

impl Dataset {
    /// Create an empty dataset.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_order: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Create a dataset from rows, deriving the column order from them.
    pub fn with_rows(name: impl Into<String>, rows: Vec<Row>) -> Self {
        let mut ds = Self::new(name);
        for row in rows {
            ds.add_row(row);
        }
        ds
    }

    /// Append a row, extending the column order with any new variables.
    pub fn add_row(&mut self, row: Row) {
        self.declare_columns(&row);
        self.rows.push(row);
    }

    /// Extend the column order with the row's columns that are not yet declared.
    pub fn declare_columns(&mut self, row: &Row) {
        for name in row.names() {
            self.declare_column(name);
        }
    }

    /// Declare a single column (no-op if already declared).
    pub fn declare_column(&mut self, name: &str) {
        if !self.column_order.iter().any(|c| c == name) {
            self.column_order.push(name.to_string());
        }
    }

    /// Replace all rows, keeping the declared column order.
    pub fn replace_rows(&mut self, rows: Vec<Row>) {
        self.rows.clear();
        for row in rows {
            self.add_row(row);
        }
    }

    /// Remove every row and column declaration.
    pub fn clear(&mut self) {
        self.rows.clear();
        self.column_order.clear();
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset has no observations.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_set_preserves_insertion_order() {
        let mut row = Row::new();
        row.set("x", Value::Number(1.0));
        row.set("y", Value::Number(2.0));
        row.set("x", Value::Number(3.0));
        let names: Vec<&str> = row.names().collect();
        assert_eq!(names, vec!["x", "y"]);
        assert_eq!(row.get("x"), Some(&Value::Number(3.0)));
        assert_eq!(row.first_column(), Some("x"));
    }

    #[test]
    fn test_row_remove_and_value() {
        let mut row = Row::from_pairs([("a", 1.0), ("b", 2.0)]);
        assert_eq!(row.remove("a"), Some(Value::Number(1.0)));
        assert_eq!(row.remove("a"), None);
        assert_eq!(row.value("a"), Value::Missing);
        assert_eq!(row.len(), 1);
    }

    #[test]
    fn test_row_retain_columns() {
        let mut row = Row::from_pairs([("a", 1.0), ("b", 2.0), ("c", 3.0)]);
        row.retain_columns(|name| name != "b");
        assert_eq!(row.names().collect::<Vec<_>>(), vec!["a", "c"]);
    }

    #[test]
    fn test_dataset_column_order_grows() {
        let mut ds = Dataset::new("out");
        ds.add_row(Row::from_pairs([("x", 1.0)]));
        ds.add_row(Row::from_pairs([("x", 2.0), ("y", 5.0)]));
        assert_eq!(ds.column_order, vec!["x", "y"]);
        assert_eq!(ds.len(), 2);
    }

    #[test]
    fn test_dataset_replace_rows_keeps_columns() {
        let mut ds = Dataset::with_rows("a", vec![Row::from_pairs([("k", 1.0), ("v", 2.0)])]);
        ds.replace_rows(vec![Row::from_pairs([("v", 3.0)])]);
        assert_eq!(ds.column_order, vec!["k", "v"]);
        assert_eq!(ds.rows.len(), 1);
    }
}
