//! # recordgraph-types
//!
//! Column values and conversions used when materializing recordsets into
//! typed object graphs.
//!
//! This crate provides the value model shared by every recordset source, the
//! bidirectional conversions between column values and Rust types, and the
//! normalized keys used to correlate parent and child rows.
//!
//! ## Features
//!
//! - `chrono` (default): Enable date/time values via chrono
//! - `uuid` (default): Enable UUID values
//! - `decimal` (default): Enable decimal values via rust_decimal
//! - `json`: Enable JSON values via serde_json
//!
//! ## Type Mappings
//!
//! | Column Type | Rust Type |
//! |-----------------|-----------|
//! | `BIT` | `bool` |
//! | `TINYINT` | `u8` |
//! | `SMALLINT` | `i16` |
//! | `INT` | `i32` |
//! | `BIGINT` | `i64` |
//! | `REAL` | `f32` |
//! | `FLOAT` | `f64` |
//! | `DECIMAL`/`NUMERIC` | `rust_decimal::Decimal` |
//! | `NVARCHAR` and friends | `String` |
//! | `DATE` | `chrono::NaiveDate` |
//! | `TIME` | `chrono::NaiveTime` |
//! | `DATETIME2` | `chrono::NaiveDateTime` |
//! | `UNIQUEIDENTIFIER` | `uuid::Uuid` |
//!
//! ## Group Keys
//!
//! [`GroupKey`] turns a [`SqlValue`] into a hashable key under an explicit
//! [`KeyPolicy`]. Under [`KeyPolicy::Textual`] an integer parent key `1`
//! correlates with a text child key `"1"`; under [`KeyPolicy::Strict`] only
//! integer widths are unified.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod from_sql;
pub mod key;
pub mod to_sql;
pub mod value;

pub use error::{SerializerError, TypeError};
pub use from_sql::FromSql;
pub use key::{GroupKey, KeyPolicy};
pub use to_sql::ToSql;
pub use value::SqlValue;
