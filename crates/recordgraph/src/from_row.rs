//! FromRow trait for row-to-struct mapping.
//!
//! ## Derive Macro
//!
//! The recommended way to implement `FromRow` is via the derive macro from
//! `recordgraph-derive`:
//!
//! ```rust,ignore
//! use recordgraph::FromRow;
//!
//! #[derive(Default, FromRow)]
//! struct User {
//!     id: i32,
//!     #[record(rename = "user_name")]
//!     name: String,
//!     email: Option<String>,
//!     #[record(skip)]
//!     posts: Vec<Post>,
//! }
//! ```
//!
//! ## Supported Attributes
//!
//! - `#[record(rename = "column_name")]` - Bind field to a different column
//! - `#[record(skip)]` - Never bind the field; it keeps its default value
//! - `#[record(serializer = "name")]` - Decode the column through a serializer
//! - `#[record(ctor)]` - Pass the field as a constructor parameter
//! - `#[record(rename_all = "...")]` / `#[record(constructor = "fn")]` on the struct

use std::marker::PhantomData;

use crate::descriptor::TypeDescriptor;
use crate::error::Result;
use crate::mapper::{BoundRow, RowMapper};
use crate::row::Row;

/// Trait for types that can be materialized from a row.
///
/// The descriptor tells the binder which columns feed which members; the
/// mapping function then reads the bound values through [`BoundRow`].
///
/// # Example
///
/// ```rust
/// use recordgraph::{BoundRow, FromRow, Result, TypeDescriptor};
///
/// #[derive(Default)]
/// struct User {
///     id: i32,
///     name: String,
/// }
///
/// impl FromRow for User {
///     fn descriptor() -> TypeDescriptor {
///         TypeDescriptor::builder("User")
///             .member("id")
///             .typed::<i32>()
///             .member("name")
///             .typed::<String>()
///             .build()
///     }
///
///     fn from_row(row: &BoundRow<'_>) -> Result<Self> {
///         let mut user = User::default();
///         if let Some(id) = row.value(0)? {
///             user.id = id;
///         }
///         if let Some(name) = row.value(1)? {
///             user.name = name;
///         }
///         Ok(user)
///     }
/// }
/// ```
pub trait FromRow: Sized + Send + 'static {
    /// Describe the members and constructors of this type.
    ///
    /// Called once per process; the result is cached.
    fn descriptor() -> TypeDescriptor;

    /// Construct an instance from a bound row.
    ///
    /// # Errors
    ///
    /// Returns an error if a bound column value cannot be converted to its
    /// member type, or if construction is otherwise impossible.
    fn from_row(row: &BoundRow<'_>) -> Result<Self>;
}

/// Extension trait for mapping an iterator of rows into typed values.
///
/// Implemented for any iterator of `Result<Row>`.
pub trait RowIteratorExt: Iterator<Item = Result<Row>> + Sized {
    /// Map each row through a prepared mapper.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let mapper = RowMapper::<User>::new(&metadata, &config)?;
    /// let users = rows.map_rows(&mapper).collect::<Result<Vec<_>>>()?;
    /// ```
    fn map_rows<T: FromRow>(self, mapper: &RowMapper<T>) -> MapRows<'_, Self, T>;
}

impl<I: Iterator<Item = Result<Row>>> RowIteratorExt for I {
    fn map_rows<T: FromRow>(self, mapper: &RowMapper<T>) -> MapRows<'_, Self, T> {
        MapRows {
            inner: self,
            mapper,
            _marker: PhantomData,
        }
    }
}

/// Iterator adapter that maps rows to typed values.
pub struct MapRows<'m, I, T> {
    inner: I,
    mapper: &'m RowMapper<T>,
    _marker: PhantomData<fn() -> T>,
}

impl<I, T> Iterator for MapRows<'_, I, T>
where
    I: Iterator<Item = Result<Row>>,
    T: FromRow,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|result| result.and_then(|row| self.mapper.map(&row)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
