//! Normalized keys for correlating parent and child rows.
//!
//! Parent keys usually come from a mapped field (an `i32` id) while child
//! keys come straight from a column, which may have a different type than
//! the parent's field. [`KeyPolicy`] decides how the two are compared.

use bytes::Bytes;

use crate::value::SqlValue;

/// How column values are normalized before keys are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyPolicy {
    /// Every value is reduced to its canonical text, so `Int(1)`,
    /// `BigInt(1)`, `Double(1.0)` and `String("1")` are the same key.
    #[default]
    Textual,
    /// Integer widths are unified; every other type only equals itself.
    Strict,
}

/// A hashable, comparable key built from one or more column values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    /// NULL key.
    Null,
    /// Boolean key.
    Bool(bool),
    /// Any integer width.
    Int(i64),
    /// Floating point key, stored as normalized `f64` bits.
    Float(u64),
    /// Text key. Under [`KeyPolicy::Textual`] every scalar ends up here.
    Text(String),
    /// Binary key.
    Bytes(Bytes),
    /// A value type without a natural key form, compared by type and text.
    Tagged {
        /// Column type name.
        tag: &'static str,
        /// Canonical text of the value.
        text: String,
    },
    /// Several values compared position by position.
    Composite(Vec<GroupKey>),
}

impl GroupKey {
    /// Build a key from a single column value.
    #[must_use]
    pub fn from_value(value: &SqlValue, policy: KeyPolicy) -> Self {
        if value.is_null() {
            return Self::Null;
        }
        match policy {
            KeyPolicy::Textual => Self::Text(canonical_text(value)),
            KeyPolicy::Strict => strict_key(value),
        }
    }

    /// Build a composite key from several column values.
    #[must_use]
    pub fn composite<'a, I>(values: I, policy: KeyPolicy) -> Self
    where
        I: IntoIterator<Item = &'a SqlValue>,
    {
        Self::Composite(
            values
                .into_iter()
                .map(|v| Self::from_value(v, policy))
                .collect(),
        )
    }

    /// Check if this key is NULL.
    ///
    /// A composite key is never NULL, even when all of its parts are.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

fn strict_key(value: &SqlValue) -> GroupKey {
    if let Some(v) = value.as_i64() {
        return GroupKey::Int(v);
    }
    match value {
        SqlValue::Bool(v) => GroupKey::Bool(*v),
        SqlValue::Float(v) => GroupKey::Float(float_bits(f64::from(*v))),
        SqlValue::Double(v) => GroupKey::Float(float_bits(*v)),
        SqlValue::String(v) | SqlValue::Xml(v) => GroupKey::Text(v.clone()),
        SqlValue::Binary(v) => GroupKey::Bytes(v.clone()),
        other => GroupKey::Tagged {
            tag: other.type_name(),
            text: canonical_text(other),
        },
    }
}

fn float_bits(v: f64) -> u64 {
    // -0.0 and 0.0 must hash alike.
    if v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() }
}

/// Shortest round-trip text in the value's own width, so `REAL 1.1` prints
/// `1.1`. Signed zero prints as `0`.
fn float_text<F: Into<f64> + ToString + Copy>(v: F) -> String {
    if Into::<f64>::into(v) == 0.0 { "0".to_owned() } else { v.to_string() }
}

/// Canonical text of a value as used by [`KeyPolicy::Textual`].
///
/// Integers and integral floats print without a fraction, decimals are
/// normalized (`1.50` → `1.5`), binary prints as lowercase hex.
#[must_use]
pub fn canonical_text(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => String::new(),
        SqlValue::Bool(v) => v.to_string(),
        SqlValue::TinyInt(v) => v.to_string(),
        SqlValue::SmallInt(v) => v.to_string(),
        SqlValue::Int(v) => v.to_string(),
        SqlValue::BigInt(v) => v.to_string(),
        SqlValue::Float(v) => float_text(*v),
        SqlValue::Double(v) => float_text(*v),
        SqlValue::String(v) | SqlValue::Xml(v) => v.clone(),
        SqlValue::Binary(v) => v.iter().map(|b| format!("{b:02x}")).collect(),
        #[cfg(feature = "decimal")]
        SqlValue::Decimal(v) => v.normalize().to_string(),
        #[cfg(feature = "uuid")]
        SqlValue::Uuid(v) => v.hyphenated().to_string(),
        #[cfg(feature = "chrono")]
        SqlValue::Date(v) => v.to_string(),
        #[cfg(feature = "chrono")]
        SqlValue::Time(v) => v.to_string(),
        #[cfg(feature = "chrono")]
        SqlValue::DateTime(v) => v.to_string(),
        #[cfg(feature = "chrono")]
        SqlValue::DateTimeOffset(v) => v.to_rfc3339(),
        #[cfg(feature = "json")]
        SqlValue::Json(v) => v.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_textual_int_matches_text() {
        let parent = GroupKey::from_value(&SqlValue::Int(1), KeyPolicy::Textual);
        let child = GroupKey::from_value(&SqlValue::String("1".into()), KeyPolicy::Textual);
        assert_eq!(parent, child);
    }

    #[test]
    fn test_strict_int_does_not_match_text() {
        let parent = GroupKey::from_value(&SqlValue::Int(1), KeyPolicy::Strict);
        let child = GroupKey::from_value(&SqlValue::String("1".into()), KeyPolicy::Strict);
        assert_ne!(parent, child);
    }

    #[test]
    fn test_strict_unifies_integer_widths() {
        let a = GroupKey::from_value(&SqlValue::TinyInt(3), KeyPolicy::Strict);
        let b = GroupKey::from_value(&SqlValue::BigInt(3), KeyPolicy::Strict);
        assert_eq!(a, b);
    }

    #[test]
    fn test_textual_integral_double() {
        let a = GroupKey::from_value(&SqlValue::Double(2.0), KeyPolicy::Textual);
        let b = GroupKey::from_value(&SqlValue::Int(2), KeyPolicy::Textual);
        assert_eq!(a, b);
    }

    #[test]
    fn test_null_key() {
        assert!(GroupKey::from_value(&SqlValue::Null, KeyPolicy::Textual).is_null());
        let composite = GroupKey::composite([&SqlValue::Null], KeyPolicy::Strict);
        assert!(!composite.is_null());
    }

    #[test]
    fn test_signed_zero() {
        let a = GroupKey::from_value(&SqlValue::Double(-0.0), KeyPolicy::Strict);
        let b = GroupKey::from_value(&SqlValue::Double(0.0), KeyPolicy::Strict);
        assert_eq!(a, b);
    }

    #[test]
    fn test_textual_real_uses_its_own_precision() {
        let real = GroupKey::from_value(&SqlValue::Float(1.1), KeyPolicy::Textual);
        assert_eq!(real, GroupKey::Text("1.1".into()));
        let double = GroupKey::from_value(&SqlValue::Double(1.1), KeyPolicy::Textual);
        let text = GroupKey::from_value(&SqlValue::String("1.1".into()), KeyPolicy::Textual);
        assert_eq!(real, double);
        assert_eq!(real, text);
    }

    #[test]
    fn test_textual_signed_zero() {
        let zero = GroupKey::from_value(&SqlValue::Int(0), KeyPolicy::Textual);
        for value in [SqlValue::Double(-0.0), SqlValue::Float(-0.0), SqlValue::Float(0.0)] {
            assert_eq!(GroupKey::from_value(&value, KeyPolicy::Textual), zero);
        }
    }

    #[test]
    fn test_binary_hex() {
        let value = SqlValue::Binary(Bytes::from_static(&[0x0a, 0xff]));
        assert_eq!(canonical_text(&value), "0aff");
    }
}
