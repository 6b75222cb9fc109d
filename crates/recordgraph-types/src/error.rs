//! Type conversion error types.

use thiserror::Error;

/// Errors that can occur during type conversion.
#[derive(Debug, Error)]
pub enum TypeError {
    /// Value is null when non-null was expected.
    #[error("unexpected null value")]
    UnexpectedNull,

    /// Type mismatch during conversion.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Expected type name.
        expected: &'static str,
        /// Actual type name.
        actual: String,
    },

    /// Value is out of range for target type.
    #[error("value out of range for {target_type}")]
    OutOfRange {
        /// Target type name.
        target_type: &'static str,
    },

    /// Invalid encoding in string data.
    #[error("invalid string encoding: {0}")]
    InvalidEncoding(String),

    /// Invalid decimal value.
    #[error("invalid decimal: {0}")]
    InvalidDecimal(String),

    /// Invalid UUID value.
    #[error("invalid UUID: {0}")]
    InvalidUuid(String),

    /// Unsupported type conversion.
    #[error("unsupported conversion from {from} to {to}")]
    UnsupportedConversion {
        /// Source type.
        from: String,
        /// Target type.
        to: &'static str,
    },
}

/// Errors raised by a custom column serializer while decoding a value.
#[derive(Debug, Error)]
pub enum SerializerError {
    /// The serializer does not accept this kind of value.
    #[error("serializer '{serializer}' cannot decode {actual} values")]
    Unsupported {
        /// Serializer name.
        serializer: String,
        /// Column value type name.
        actual: &'static str,
    },

    /// The value was accepted but its content is malformed.
    #[error("serializer '{serializer}' rejected value: {reason}")]
    Rejected {
        /// Serializer name.
        serializer: String,
        /// Reason reported by the serializer.
        reason: String,
    },
}

impl SerializerError {
    /// Create a rejection error for the named serializer.
    pub fn rejected(serializer: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            serializer: serializer.into(),
            reason: reason.into(),
        }
    }
}
