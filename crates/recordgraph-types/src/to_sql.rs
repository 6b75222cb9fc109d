//! Trait for converting Rust types to column values.

use crate::error::TypeError;
use crate::value::SqlValue;

/// Trait for types that can be converted to column values.
///
/// Used by key extractors when correlating parents and children, and by
/// `ToFields` implementations when an object is turned into a dynamic row.
pub trait ToSql {
    /// Convert this value to a column value.
    fn to_sql(&self) -> Result<SqlValue, TypeError>;

    /// Get the SQL type name for this value.
    fn sql_type(&self) -> &'static str;
}

macro_rules! impl_to_sql {
    ($ty:ty, $variant:ident, $sql:literal) => {
        impl ToSql for $ty {
            fn to_sql(&self) -> Result<SqlValue, TypeError> {
                Ok(SqlValue::$variant(*self))
            }

            fn sql_type(&self) -> &'static str {
                $sql
            }
        }
    };
}

impl_to_sql!(bool, Bool, "BIT");
impl_to_sql!(u8, TinyInt, "TINYINT");
impl_to_sql!(i16, SmallInt, "SMALLINT");
impl_to_sql!(i32, Int, "INT");
impl_to_sql!(i64, BigInt, "BIGINT");
impl_to_sql!(f32, Float, "REAL");
impl_to_sql!(f64, Double, "FLOAT");

#[cfg(feature = "uuid")]
impl_to_sql!(uuid::Uuid, Uuid, "UNIQUEIDENTIFIER");
#[cfg(feature = "decimal")]
impl_to_sql!(rust_decimal::Decimal, Decimal, "DECIMAL");
#[cfg(feature = "chrono")]
impl_to_sql!(chrono::NaiveDate, Date, "DATE");
#[cfg(feature = "chrono")]
impl_to_sql!(chrono::NaiveTime, Time, "TIME");
#[cfg(feature = "chrono")]
impl_to_sql!(chrono::NaiveDateTime, DateTime, "DATETIME2");
#[cfg(feature = "chrono")]
impl_to_sql!(chrono::DateTime<chrono::FixedOffset>, DateTimeOffset, "DATETIMEOFFSET");

impl ToSql for SqlValue {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(self.clone())
    }

    fn sql_type(&self) -> &'static str {
        self.type_name()
    }
}

impl ToSql for str {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(SqlValue::String(self.to_owned()))
    }

    fn sql_type(&self) -> &'static str {
        "NVARCHAR"
    }
}

impl ToSql for String {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(SqlValue::String(self.clone()))
    }

    fn sql_type(&self) -> &'static str {
        "NVARCHAR"
    }
}

impl ToSql for [u8] {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(SqlValue::Binary(bytes::Bytes::copy_from_slice(self)))
    }

    fn sql_type(&self) -> &'static str {
        "VARBINARY"
    }
}

impl ToSql for Vec<u8> {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(SqlValue::Binary(bytes::Bytes::copy_from_slice(self)))
    }

    fn sql_type(&self) -> &'static str {
        "VARBINARY"
    }
}

impl<T: ToSql> ToSql for Option<T> {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        match self {
            Some(v) => v.to_sql(),
            None => Ok(SqlValue::Null),
        }
    }

    fn sql_type(&self) -> &'static str {
        match self {
            Some(v) => v.sql_type(),
            None => "NULL",
        }
    }
}

impl<T: ToSql + ?Sized> ToSql for &T {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        (*self).to_sql()
    }

    fn sql_type(&self) -> &'static str {
        (*self).sql_type()
    }
}

#[cfg(feature = "json")]
impl ToSql for serde_json::Value {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(SqlValue::Json(self.clone()))
    }

    fn sql_type(&self) -> &'static str {
        "NVARCHAR(MAX)"
    }
}
