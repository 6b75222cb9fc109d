//! Member conversions: which column values a Rust member type accepts.
//!
//! Every impl follows the same contract. NULL is an
//! [`UnexpectedNull`](TypeError::UnexpectedNull) error unless the member is an
//! `Option`, and a value of the wrong kind is a
//! [`TypeMismatch`](TypeError::TypeMismatch) naming the column's type.
//! Integer members accept any narrower integer column.

use crate::error::TypeError;
use crate::value::SqlValue;

/// Conversion from a column value into a member's type.
///
/// The row mapper calls this for every bound member, after any column
/// serializer has run.
pub trait FromSql: Sized {
    /// Convert a non-optional column value.
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError>;

    /// Convert a column value, mapping NULL to `None`.
    fn from_sql_nullable(value: &SqlValue) -> Result<Option<Self>, TypeError> {
        if value.is_null() {
            Ok(None)
        } else {
            Self::from_sql(value).map(Some)
        }
    }
}

/// Run `pick` on a non-NULL value, reporting a mismatch when it declines.
fn accept<T>(
    value: &SqlValue,
    expected: &'static str,
    pick: impl FnOnce(&SqlValue) -> Option<T>,
) -> Result<T, TypeError> {
    if value.is_null() {
        return Err(TypeError::UnexpectedNull);
    }
    pick(value).ok_or_else(|| TypeError::TypeMismatch {
        expected,
        actual: value.type_name().to_string(),
    })
}

impl FromSql for SqlValue {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        Ok(value.clone())
    }
}

impl<T: FromSql> FromSql for Option<T> {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        T::from_sql_nullable(value)
    }
}

impl FromSql for bool {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        // Flag columns are often stored as small integers.
        accept(value, "bool", |v| match v {
            SqlValue::Bool(b) => Some(*b),
            other => other.as_i32().map(|n| n != 0),
        })
    }
}

impl FromSql for u8 {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        accept(value, "u8", |v| match v {
            SqlValue::TinyInt(n) => Some(*n),
            _ => None,
        })
    }
}

impl FromSql for i16 {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        accept(value, "i16", |v| match v {
            SqlValue::SmallInt(n) => Some(*n),
            SqlValue::TinyInt(n) => Some(i16::from(*n)),
            _ => None,
        })
    }
}

impl FromSql for i32 {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        // Aggregates such as COUNT_BIG report BIGINT even for small counts.
        if let SqlValue::BigInt(n) = value {
            return i32::try_from(*n).map_err(|_| TypeError::OutOfRange { target_type: "i32" });
        }
        accept(value, "i32", SqlValue::as_i32)
    }
}

impl FromSql for i64 {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        accept(value, "i64", SqlValue::as_i64)
    }
}

impl FromSql for f32 {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        accept(value, "f32", |v| match v {
            SqlValue::Float(n) => Some(*n),
            _ => None,
        })
    }
}

impl FromSql for f64 {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        accept(value, "f64", SqlValue::as_f64)
    }
}

impl FromSql for String {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        accept(value, "String", |v| v.as_str().map(str::to_owned))
    }
}

impl FromSql for Vec<u8> {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        accept(value, "Vec<u8>", |v| v.as_bytes().map(<[u8]>::to_vec))
    }
}

impl FromSql for bytes::Bytes {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        accept(value, "Bytes", |v| match v {
            SqlValue::Binary(b) => Some(b.clone()),
            _ => None,
        })
    }
}

#[cfg(feature = "uuid")]
impl FromSql for uuid::Uuid {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::String(s) => s.parse().map_err(|e| TypeError::InvalidUuid(format!("{e}"))),
            other => accept(other, "Uuid", |v| match v {
                SqlValue::Uuid(u) => Some(*u),
                SqlValue::Binary(b) => uuid::Uuid::from_slice(b).ok(),
                _ => None,
            }),
        }
    }
}

#[cfg(feature = "decimal")]
impl FromSql for rust_decimal::Decimal {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::String(s) => s
                .parse()
                .map_err(|e| TypeError::InvalidDecimal(format!("{e}"))),
            other => accept(other, "Decimal", |v| match v {
                SqlValue::Decimal(d) => Some(*d),
                n => n.as_i64().map(rust_decimal::Decimal::from),
            }),
        }
    }
}

#[cfg(feature = "chrono")]
impl FromSql for chrono::NaiveDate {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        accept(value, "NaiveDate", |v| match v {
            SqlValue::Date(d) => Some(*d),
            SqlValue::DateTime(dt) => Some(dt.date()),
            _ => None,
        })
    }
}

#[cfg(feature = "chrono")]
impl FromSql for chrono::NaiveTime {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        accept(value, "NaiveTime", |v| match v {
            SqlValue::Time(t) => Some(*t),
            SqlValue::DateTime(dt) => Some(dt.time()),
            _ => None,
        })
    }
}

#[cfg(feature = "chrono")]
impl FromSql for chrono::NaiveDateTime {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        accept(value, "NaiveDateTime", |v| match v {
            SqlValue::DateTime(dt) => Some(*dt),
            SqlValue::DateTimeOffset(dt) => Some(dt.naive_utc()),
            _ => None,
        })
    }
}

#[cfg(feature = "chrono")]
impl FromSql for chrono::DateTime<chrono::FixedOffset> {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        accept(value, "DateTime<FixedOffset>", |v| match v {
            SqlValue::DateTimeOffset(dt) => Some(*dt),
            _ => None,
        })
    }
}

/// JSON members take NULL as `Value::Null` and parse text columns.
#[cfg(feature = "json")]
impl FromSql for serde_json::Value {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Null => Ok(serde_json::Value::Null),
            SqlValue::Json(v) => Ok(v.clone()),
            SqlValue::String(s) => serde_json::from_str(s).map_err(|e| TypeError::TypeMismatch {
                expected: "JSON",
                actual: format!("invalid JSON: {e}"),
            }),
            other => accept(other, "JSON", |_| None),
        }
    }
}
