//! Dynamic rows: case-insensitive ordered maps of column values.
//!
//! A [`DynamicRow`] is the destination for recordsets whose shape is not
//! known at compile time. Every column becomes a key; lookups ignore ASCII
//! case but keys keep the spelling they were first inserted with.

use indexmap::IndexMap;
use indexmap::map::Entry;
use recordgraph_types::{FromSql, SqlValue, TypeError};

use crate::descriptor::TypeDescriptor;
use crate::error::Result;
use crate::from_row::FromRow;
use crate::mapper::BoundRow;
use crate::to_fields::{NamedValue, ToFields};

/// An ordered, case-insensitive map of column name to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DynamicRow {
    /// Lowercased key -> (original name, value).
    entries: IndexMap<String, (String, SqlValue)>,
}

impl DynamicRow {
    /// Create an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from an object's fields.
    pub fn from_fields<F: ToFields + ?Sized>(fields: &F) -> std::result::Result<Self, TypeError> {
        let mut row = Self::new();
        row.mutate(fields)?;
        Ok(row)
    }

    /// Get a value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(|(_, value)| value)
    }

    /// Get a value by name with type conversion.
    ///
    /// A missing key converts like NULL, so `Option<T>` yields `None`.
    pub fn get_as<T: FromSql>(&self, name: &str) -> std::result::Result<T, TypeError> {
        T::from_sql(self.get(name).unwrap_or(&SqlValue::Null))
    }

    /// Check if a key is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    /// Set a value.
    ///
    /// Overriding an existing key keeps its position and original spelling;
    /// a new key is appended. Returns the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: SqlValue) -> Option<SqlValue> {
        let name = name.into();
        match self.entries.entry(name.to_ascii_lowercase()) {
            Entry::Occupied(mut entry) => Some(std::mem::replace(&mut entry.get_mut().1, value)),
            Entry::Vacant(entry) => {
                entry.insert((name, value));
                None
            }
        }
    }

    /// Remove a key, keeping the order of the rest.
    pub fn remove(&mut self, name: &str) -> Option<SqlValue> {
        self.entries
            .shift_remove(&name.to_ascii_lowercase())
            .map(|(_, value)| value)
    }

    /// Return a copy of this row with an object's fields merged in.
    ///
    /// Later keys override earlier ones.
    pub fn expand<F: ToFields + ?Sized>(&self, fields: &F) -> std::result::Result<Self, TypeError> {
        let mut expanded = self.clone();
        expanded.mutate(fields)?;
        Ok(expanded)
    }

    /// Merge an object's fields into this row in place.
    pub fn mutate<F: ToFields + ?Sized>(
        &mut self,
        fields: &F,
    ) -> std::result::Result<(), TypeError> {
        for NamedValue { name, value } in fields.to_fields()? {
            self.insert(name, value);
        }
        Ok(())
    }

    /// Return a row holding only the renamed keys.
    ///
    /// Each `(from, to)` pair copies `from`'s value under `to`; pairs whose
    /// `from` key is absent are skipped.
    #[must_use]
    pub fn transform(&self, renames: &[(&str, &str)]) -> Self {
        let mut transformed = Self::new();
        for (from, to) in renames {
            if let Some(value) = self.get(from) {
                transformed.insert(*to, value.clone());
            }
        }
        transformed
    }

    /// Keys in order, with their original spelling.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(|(name, _)| name.as_str())
    }

    /// Iterate over `(name, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.entries
            .values()
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the row has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromRow for DynamicRow {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::dynamic("DynamicRow")
    }

    fn from_row(row: &BoundRow<'_>) -> Result<Self> {
        let row = row.row();
        let mut entries = IndexMap::with_capacity(row.len());
        for (column, value) in row.columns().iter().zip(row.iter()) {
            entries
                .entry(column.name.to_ascii_lowercase())
                .or_insert_with(|| (column.name.clone(), value.clone()));
        }
        Ok(Self { entries })
    }
}

impl ToFields for DynamicRow {
    fn to_fields(&self) -> std::result::Result<Vec<NamedValue>, TypeError> {
        Ok(self
            .iter()
            .map(|(name, value)| NamedValue::new(name, value.clone()))
            .collect())
    }

    fn field_count(&self) -> Option<usize> {
        Some(self.len())
    }
}

impl<S: Into<String>> FromIterator<(S, SqlValue)> for DynamicRow {
    fn from_iter<I: IntoIterator<Item = (S, SqlValue)>>(iter: I) -> Self {
        let mut row = Self::new();
        for (name, value) in iter {
            row.insert(name, value);
        }
        row
    }
}
