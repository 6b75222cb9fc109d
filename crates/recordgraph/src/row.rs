//! Row representation for recordsets.
//!
//! Rows share their column metadata with every other row of the same
//! recordset, and share their value buffer with every slice cut from them.
//! One-to-one splitting relies on this: slicing a row into parent and child
//! ranges never copies column values.
//!
//! ```text
//! Row {
//!     values: Arc<[SqlValue]> ──► [v0, v1, v2, v3, ...]   (shared by slices)
//!     start: usize             ──► first value of this row/slice
//!     metadata: Arc<ColMetaData> ► [Column definitions for the slice...]
//! }
//! ```

use std::ops::Range;
use std::sync::Arc;

use recordgraph_types::{FromSql, SqlValue, TypeError};

/// Column metadata describing a recordset column.
///
/// This struct is marked `#[non_exhaustive]` to allow adding new fields
/// without breaking callers. Use [`Column::new()`] and the builder methods to
/// construct instances.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Column index (0-based) within its recordset or slice.
    pub index: usize,
    /// Type name reported by the source (e.g., "INT", "NVARCHAR").
    pub type_name: String,
    /// Whether the column allows NULL values.
    pub nullable: bool,
}

impl Column {
    /// Create a new column with basic metadata.
    pub fn new(name: impl Into<String>, index: usize, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index,
            type_name: type_name.into(),
            nullable: true,
        }
    }

    /// Set whether the column is nullable.
    #[must_use]
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }
}

/// Shared column metadata for a recordset.
///
/// This is shared across all rows in the recordset to avoid duplicating
/// metadata per row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColMetaData {
    /// Column definitions.
    pub columns: Arc<[Column]>,
}

impl ColMetaData {
    /// Create new column metadata from a list of columns.
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns: columns.into(),
        }
    }

    /// Create metadata from bare column names, typed as `SQL_VARIANT`.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            names
                .into_iter()
                .enumerate()
                .map(|(i, name)| Column::new(name, i, "SQL_VARIANT"))
                .collect(),
        )
    }

    /// Get the number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if there are no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Get a column by index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Find a column index by name (case-insensitive).
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Iterate over the column names in ordinal order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Case-folded signature of the column layout.
    ///
    /// Two recordsets with the same signature bind to a destination type in
    /// the same way, so the signature keys the binding cache.
    #[must_use]
    pub fn signature(&self) -> String {
        let mut signature = String::new();
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                signature.push('\u{1f}');
            }
            signature.push_str(&column.name.to_ascii_lowercase());
        }
        signature
    }

    /// Metadata for a contiguous range of columns, re-indexed from zero.
    ///
    /// Returns `None` if the range is out of bounds.
    #[must_use]
    pub fn slice(&self, range: Range<usize>) -> Option<Self> {
        let columns = self.columns.get(range)?;
        Some(Self::new(
            columns
                .iter()
                .enumerate()
                .map(|(i, c)| Column {
                    index: i,
                    ..c.clone()
                })
                .collect(),
        ))
    }
}

/// A row from a recordset.
///
/// # Access Patterns
///
/// - **Borrowed:** `get_raw()`, `get_raw_by_name()`, `values()`
/// - **Type-converting:** `get::<T>()` uses the `FromSql` trait
/// - **Slicing:** `project()` views a contiguous column range without copying
#[derive(Clone)]
pub struct Row {
    /// Shared value buffer (may be wider than this row when sliced).
    values: Arc<[SqlValue]>,
    /// Offset of this row's first value in `values`.
    start: usize,
    /// Column metadata (shared across the recordset or slice).
    metadata: Arc<ColMetaData>,
}

impl Row {
    /// Create a row from shared metadata and its values.
    ///
    /// Missing trailing values read as NULL; extra values are ignored.
    pub fn new(metadata: Arc<ColMetaData>, values: Vec<SqlValue>) -> Self {
        let mut values = values;
        values.resize(metadata.len(), SqlValue::Null);
        Self {
            values: values.into(),
            start: 0,
            metadata,
        }
    }

    /// Create a row from column definitions and values.
    pub fn from_values(columns: Vec<Column>, values: Vec<SqlValue>) -> Self {
        Self::new(Arc::new(ColMetaData::new(columns)), values)
    }

    /// View a contiguous range of this row's columns as its own row.
    ///
    /// `metadata` must describe the columns starting at `start`, as produced
    /// by [`ColMetaData::slice`]. Returns `None` if it does not fit.
    #[must_use]
    pub fn project(&self, metadata: Arc<ColMetaData>, start: usize) -> Option<Self> {
        if start + metadata.len() > self.len() {
            return None;
        }
        Some(Self {
            values: Arc::clone(&self.values),
            start: self.start + start,
            metadata,
        })
    }

    /// Get a value by column index with type conversion.
    pub fn get<T: FromSql>(&self, index: usize) -> Result<T, TypeError> {
        let value = self.get_raw(index).unwrap_or(&SqlValue::Null);
        T::from_sql(value)
    }

    /// Get a value by column name (case-insensitive) with type conversion.
    pub fn get_by_name<T: FromSql>(&self, name: &str) -> Result<T, TypeError> {
        match self.metadata.find_by_name(name) {
            Some(index) => self.get(index),
            None => Err(TypeError::TypeMismatch {
                expected: "existing column",
                actual: format!("column '{name}' not found"),
            }),
        }
    }

    /// Try to get a value by index, returning `None` on NULL or error.
    pub fn try_get<T: FromSql>(&self, index: usize) -> Option<T> {
        self.get_raw(index)
            .filter(|v| !v.is_null())
            .and_then(|v| T::from_sql(v).ok())
    }

    /// Try to get a value by name, returning `None` on NULL, error or a
    /// missing column.
    pub fn try_get_by_name<T: FromSql>(&self, name: &str) -> Option<T> {
        self.metadata
            .find_by_name(name)
            .and_then(|index| self.try_get(index))
    }

    /// Get the raw value by index.
    #[must_use]
    pub fn get_raw(&self, index: usize) -> Option<&SqlValue> {
        self.values().get(index)
    }

    /// Get the raw value by name (case-insensitive).
    #[must_use]
    pub fn get_raw_by_name(&self, name: &str) -> Option<&SqlValue> {
        self.metadata
            .find_by_name(name)
            .and_then(|index| self.get_raw(index))
    }

    /// All values of this row in column order.
    #[must_use]
    pub fn values(&self) -> &[SqlValue] {
        &self.values[self.start..self.start + self.metadata.len()]
    }

    /// Get the number of columns in the row.
    #[must_use]
    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    /// Check if the row is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    /// Get the column metadata.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.metadata.columns
    }

    /// Get the shared column metadata.
    #[must_use]
    pub fn metadata(&self) -> &Arc<ColMetaData> {
        &self.metadata
    }

    /// Check if a column value is NULL.
    #[must_use]
    pub fn is_null(&self, index: usize) -> bool {
        self.get_raw(index).is_none_or(SqlValue::is_null)
    }

    /// Check if a column value is NULL by name.
    #[must_use]
    pub fn is_null_by_name(&self, name: &str) -> bool {
        self.get_raw_by_name(name).is_none_or(SqlValue::is_null)
    }

    /// Check if every value in the row is NULL.
    #[must_use]
    pub fn all_null(&self) -> bool {
        self.values().iter().all(SqlValue::is_null)
    }

    /// Iterate over the values in column order.
    pub fn iter(&self) -> std::slice::Iter<'_, SqlValue> {
        self.values().iter()
    }
}

impl std::fmt::Debug for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (column, value) in self.metadata.columns.iter().zip(self.values()) {
            map.entry(&column.name, value);
        }
        map.finish()
    }
}

impl<'a> IntoIterator for &'a Row {
    type Item = &'a SqlValue;
    type IntoIter = std::slice::Iter<'a, SqlValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> Row {
        Row::from_values(
            vec![
                Column::new("ParentID", 0, "INT"),
                Column::new("ParentName", 1, "NVARCHAR"),
                Column::new("ChildID", 2, "INT"),
                Column::new("ChildName", 3, "NVARCHAR"),
            ],
            vec![
                SqlValue::Int(1),
                SqlValue::String("Parent".into()),
                SqlValue::Int(11),
                SqlValue::Null,
            ],
        )
    }

    #[test]
    fn test_col_metadata_find_by_name() {
        let meta = ColMetaData::from_names(["Id", "UserName"]);
        assert_eq!(meta.find_by_name("id"), Some(0));
        assert_eq!(meta.find_by_name("USERNAME"), Some(1));
        assert_eq!(meta.find_by_name("missing"), None);
    }

    #[test]
    fn test_signature_is_case_folded() {
        let a = ColMetaData::from_names(["Id", "Name"]);
        let b = ColMetaData::from_names(["ID", "name"]);
        let c = ColMetaData::from_names(["Name", "Id"]);
        assert_eq!(a.signature(), b.signature());
        assert_ne!(a.signature(), c.signature());
    }

    #[test]
    fn test_row_get_by_name() {
        let row = sample();
        assert_eq!(row.get_by_name::<i32>("parentid").unwrap(), 1);
        assert_eq!(row.get_by_name::<String>("PARENTNAME").unwrap(), "Parent");
        assert!(row.get_by_name::<i32>("Nope").is_err());
        assert_eq!(row.try_get_by_name::<String>("ChildName"), None);
    }

    #[test]
    fn test_row_project_shares_values() {
        let row = sample();
        let child_meta = Arc::new(row.metadata().slice(2..4).unwrap());
        let child = row.project(child_meta, 2).unwrap();

        assert_eq!(child.len(), 2);
        assert_eq!(child.columns()[0].name, "ChildID");
        assert_eq!(child.columns()[0].index, 0);
        assert_eq!(child.get::<i32>(0).unwrap(), 11);
        assert!(child.is_null(1));
        assert!(!child.all_null());
    }

    #[test]
    fn test_row_project_out_of_bounds() {
        let row = sample();
        let meta = Arc::new(ColMetaData::from_names(["a", "b", "c"]));
        assert!(row.project(meta, 2).is_none());
    }

    #[test]
    fn test_row_pads_missing_values() {
        let meta = Arc::new(ColMetaData::from_names(["a", "b"]));
        let row = Row::new(meta, vec![SqlValue::Int(1)]);
        assert_eq!(row.values().len(), 2);
        assert!(row.is_null(1));
    }

    #[test]
    fn test_row_debug_lists_columns() {
        let row = sample();
        let debug = format!("{row:?}");
        assert!(debug.contains("ParentName"));
    }
}
