//! ToFields trait for turning objects into named values.
//!
//! `ToFields` is the inverse of [`FromRow`](crate::FromRow): it flattens an
//! object into `(name, value)` pairs. Dynamic rows use it to merge an object's
//! members into a row (`DynamicRow::expand` and friends).
//!
//! ## Derive Macro
//!
//! ```rust,ignore
//! use recordgraph::ToFields;
//!
//! #[derive(ToFields)]
//! struct Audit {
//!     #[record(rename = "ModifiedBy")]
//!     user: String,
//!     version: i32,
//! }
//!
//! let row = row.expand(&Audit { user: "ada".into(), version: 3 })?;
//! ```
//!
//! ## Supported Attributes
//!
//! - `#[record(rename = "name")]` - Use a different field name
//! - `#[record(skip)]` - Skip this field

use recordgraph_types::{SqlValue, ToSql, TypeError};

/// A named value.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedValue {
    /// Field name.
    pub name: String,
    /// Field value.
    pub value: SqlValue,
}

impl NamedValue {
    /// Create a new named value.
    pub fn new<S: Into<String>>(name: S, value: SqlValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// Create a named value from a value implementing `ToSql`.
    pub fn from_value<S: Into<String>, T: ToSql + ?Sized>(
        name: S,
        value: &T,
    ) -> Result<Self, TypeError> {
        Ok(Self {
            name: name.into(),
            value: value.to_sql()?,
        })
    }
}

/// Trait for types that can be flattened into named values.
///
/// Usually derived; a manual impl lists its fields:
///
/// ```rust
/// use recordgraph::{NamedValue, ToFields, TypeError};
///
/// struct Audit {
///     user: String,
///     version: i32,
/// }
///
/// impl ToFields for Audit {
///     fn to_fields(&self) -> Result<Vec<NamedValue>, TypeError> {
///         Ok(vec![
///             NamedValue::from_value("user", &self.user)?,
///             NamedValue::from_value("version", &self.version)?,
///         ])
///     }
/// }
/// ```
pub trait ToFields {
    /// Flatten this value into named values, in field order.
    ///
    /// # Errors
    ///
    /// Returns an error if any field value cannot be converted.
    fn to_fields(&self) -> Result<Vec<NamedValue>, TypeError>;

    /// Number of fields produced, `None` if dynamic.
    fn field_count(&self) -> Option<usize> {
        None
    }
}

impl ToFields for [NamedValue] {
    fn to_fields(&self) -> Result<Vec<NamedValue>, TypeError> {
        Ok(self.to_vec())
    }

    fn field_count(&self) -> Option<usize> {
        Some(self.len())
    }
}

impl<const N: usize> ToFields for [NamedValue; N] {
    fn to_fields(&self) -> Result<Vec<NamedValue>, TypeError> {
        Ok(self.to_vec())
    }

    fn field_count(&self) -> Option<usize> {
        Some(N)
    }
}

impl ToFields for Vec<NamedValue> {
    fn to_fields(&self) -> Result<Vec<NamedValue>, TypeError> {
        Ok(self.clone())
    }

    fn field_count(&self) -> Option<usize> {
        Some(self.len())
    }
}
