//! Column values as produced by a recordset source.
//!
//! A row handed to the materializer is an ordered list of [`SqlValue`]s, one
//! per column. Members read them through [`FromSql`](crate::FromSql); keys
//! read them through [`GroupKey`](crate::GroupKey).

use bytes::Bytes;

/// One column value of one row.
///
/// `Null` is the default, which is also what the materializer reports for
/// positions and scalars a query never produced. The variant records the
/// column's storage kind, which decides the member types it converts into.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SqlValue {
    /// Absent value. Only `Option` members accept it.
    #[default]
    Null,
    /// Bit flag.
    Bool(bool),
    /// Unsigned byte.
    TinyInt(u8),
    /// 16-bit integer.
    SmallInt(i16),
    /// 32-bit integer. Typical identity key.
    Int(i32),
    /// 64-bit integer; also what aggregate counts come back as.
    BigInt(i64),
    /// Single-precision float.
    Float(f32),
    /// Double-precision float.
    Double(f64),
    /// Character data of any width.
    String(String),
    /// Raw bytes. Custom serializers usually start from this.
    Binary(Bytes),
    /// Exact numeric.
    #[cfg(feature = "decimal")]
    Decimal(rust_decimal::Decimal),
    /// Globally unique identifier.
    #[cfg(feature = "uuid")]
    Uuid(uuid::Uuid),
    /// Calendar date.
    #[cfg(feature = "chrono")]
    Date(chrono::NaiveDate),
    /// Time of day.
    #[cfg(feature = "chrono")]
    Time(chrono::NaiveTime),
    /// Date and time without zone.
    #[cfg(feature = "chrono")]
    DateTime(chrono::NaiveDateTime),
    /// Date and time with a UTC offset.
    #[cfg(feature = "chrono")]
    DateTimeOffset(chrono::DateTime<chrono::FixedOffset>),
    /// Parsed JSON document.
    #[cfg(feature = "json")]
    Json(serde_json::Value),
    /// XML document text. Reads like a string.
    Xml(String),
}

impl SqlValue {
    /// Check if the value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The flag, if this is a bit column.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Any integer width that fits in an `i32`.
    #[must_use]
    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            Self::Int(v) => Some(v),
            Self::SmallInt(v) => Some(v.into()),
            Self::TinyInt(v) => Some(v.into()),
            _ => None,
        }
    }

    /// Any integer width, widened. Integer keys compare through this.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::BigInt(v) => Some(v),
            _ => self.as_i32().map(i64::from),
        }
    }

    /// Either float width, widened.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Double(v) => Some(v),
            Self::Float(v) => Some(v.into()),
            _ => None,
        }
    }

    /// Character data, including XML text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) | Self::Xml(v) => Some(v),
            _ => None,
        }
    }

    /// Raw bytes of a binary column.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Binary(v) => Some(v),
            _ => None,
        }
    }

    /// Column type name, as reported in mapping errors and tagged keys.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Bool(_) => "BIT",
            Self::TinyInt(_) => "TINYINT",
            Self::SmallInt(_) => "SMALLINT",
            Self::Int(_) => "INT",
            Self::BigInt(_) => "BIGINT",
            Self::Float(_) => "REAL",
            Self::Double(_) => "FLOAT",
            Self::String(_) => "NVARCHAR",
            Self::Binary(_) => "VARBINARY",
            #[cfg(feature = "decimal")]
            Self::Decimal(_) => "DECIMAL",
            #[cfg(feature = "uuid")]
            Self::Uuid(_) => "UNIQUEIDENTIFIER",
            #[cfg(feature = "chrono")]
            Self::Date(_) => "DATE",
            #[cfg(feature = "chrono")]
            Self::Time(_) => "TIME",
            #[cfg(feature = "chrono")]
            Self::DateTime(_) => "DATETIME2",
            #[cfg(feature = "chrono")]
            Self::DateTimeOffset(_) => "DATETIMEOFFSET",
            #[cfg(feature = "json")]
            Self::Json(_) => "JSON",
            Self::Xml(_) => "XML",
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for SqlValue {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    u8 => TinyInt,
    i16 => SmallInt,
    i32 => Int,
    i64 => BigInt,
    f32 => Float,
    f64 => Double,
    String => String,
    Bytes => Binary,
}

#[cfg(feature = "uuid")]
impl_from! { uuid::Uuid => Uuid }

#[cfg(feature = "decimal")]
impl_from! { rust_decimal::Decimal => Decimal }

#[cfg(feature = "chrono")]
impl_from! {
    chrono::NaiveDate => Date,
    chrono::NaiveTime => Time,
    chrono::NaiveDateTime => DateTime,
}

#[cfg(feature = "json")]
impl_from! { serde_json::Value => Json }

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Binary(Bytes::from(v))
    }
}

/// `None` becomes NULL.
impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}
