//! # recordgraph
//!
//! Materialize the recordsets returned by a query into typed object graphs.
//!
//! Whatever executed the query hands over a forward-only reader (a
//! [`RecordsetSource`] or [`AsyncRecordsetSource`]); this crate turns its
//! rows into objects, stitches parents and children together, and binds
//! each recordset to a declared result position.
//!
//! ## Features
//!
//! - **Row mapping**: case-insensitive column-to-member binding, resolved once
//!   per column layout and cached process-wide
//! - **Constructors**: the widest constructor the columns can satisfy is used
//! - **Custom serializers**: per-member or per-type column decoding
//! - **Graph assembly**: one-to-one splits, grouped one-to-many, and
//!   key-correlated child recordsets
//! - **Result contracts**: every declared position is populated, even when
//!   the query returned fewer recordsets
//! - **Cursors**: blocking and async, with exactly-once source release
//!
//! ## Pipeline
//!
//! ```text
//! source ──► RecordsetCursor ──► rows ──► RowMapper / materializers ──► ResultShape ──► Results
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use recordgraph::{ChildKey, FromRow, MapperConfig, ResultShape, SqlValue, query_multiple};
//!
//! #[derive(Debug, Default, FromRow)]
//! struct Customer {
//!     id: i32,
//!     name: String,
//!     #[record(skip)]
//!     orders: Vec<Order>,
//! }
//!
//! #[derive(Debug, Default, FromRow)]
//! struct Order {
//!     #[record(rename = "OrderId")]
//!     id: i32,
//!     customer_id: i32,
//! }
//!
//! let shape = ResultShape::new()
//!     .returns::<Customer>()
//!     .then_children::<Order, _, _, _>(
//!         |c: &Customer| SqlValue::Int(c.id),
//!         ChildKey::column("CustomerId"),
//!         |c: &mut Customer, orders| c.orders = orders,
//!     );
//!
//! let mut results = query_multiple(source, &shape, &MapperConfig::default())?;
//! let customers: Vec<Customer> = results.take(0)?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod assemble;
pub mod binding;
pub mod config;
pub mod cursor;
pub mod descriptor;
pub mod dynamic;
pub mod error;
pub mod from_row;
pub mod mapper;
pub mod query;
pub mod row;
pub mod serializer;
pub mod shape;
pub mod source;
pub mod to_fields;

// Re-export commonly used types
pub use assemble::{
    ChildKey, GroupBy, Grouped, OneToOne, Plain, PreparedRow, RowMaterializer, SetMaterializer,
    Split, correlate, correlate_keyed,
};
pub use binding::{BindingCache, ColumnBinding, resolve_binding};
pub use config::MapperConfig;
pub use cursor::{AsyncRecordsetCursor, CursorState, RecordsetCursor, Rows};
pub use descriptor::{
    ConstructorDescriptor, MemberDescriptor, TypeDescriptor, TypeDescriptorBuilder, descriptor_of,
};
pub use dynamic::DynamicRow;
pub use error::{Error, Result};
pub use from_row::{FromRow, MapRows, RowIteratorExt};
pub use mapper::{BoundRow, RowMapper};
pub use query::{
    query, query_async, query_first, query_first_async, query_first_or_default, query_multiple,
    query_multiple_async, query_single, query_single_async,
};
pub use recordgraph_types::{
    FromSql, GroupKey, KeyPolicy, SerializerError, SqlValue, ToSql, TypeError,
};
pub use row::{ColMetaData, Column, Row};
#[cfg(feature = "json")]
pub use serializer::JsonSerializer;
pub use serializer::{ColumnSerializer, FnSerializer, SerializationRules, Utf8Serializer};
pub use shape::{ResultShape, Results};
pub use source::{AsyncRecordsetSource, MemorySource, RecordsetSource, ResultSet};
pub use to_fields::{NamedValue, ToFields};

// Derive macros share their names with the traits they implement.
#[cfg(feature = "derive")]
pub use recordgraph_derive::{FromRow, ToFields};
