//! Materializer error types.

use thiserror::Error;

/// Errors that can occur while materializing recordsets.
#[derive(Debug, Error)]
pub enum Error {
    /// A column value could not be converted into a destination member.
    #[error("cannot map column '{column}' ({source_type}) to member '{member}': {reason}")]
    Mapping {
        /// Column name as reported by the source.
        column: String,
        /// Destination member, qualified with its type (`User.name`).
        member: String,
        /// Column value type name.
        source_type: &'static str,
        /// Conversion or serializer failure.
        reason: String,
    },

    /// The physical recordset layout does not fit the declared shape.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Operation not valid in the cursor's current state.
    #[error("cursor state error: {0}")]
    CursorState(String),

    /// No constructor of the destination type can be satisfied by the columns.
    #[error("cannot construct {type_name}: {reason}")]
    Construction {
        /// Destination type name.
        type_name: &'static str,
        /// Why every candidate constructor was rejected.
        reason: String,
    },

    /// A single-row read saw a different number of rows.
    #[error("expected {expected} row(s), found {actual}")]
    Cardinality {
        /// Expected row count description.
        expected: &'static str,
        /// Rows actually present.
        actual: usize,
    },

    /// Type conversion error from direct row access.
    #[error("type error: {0}")]
    Type(#[from] recordgraph_types::TypeError),

    /// The recordset source failed.
    #[error("source error: {0}")]
    Source(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A caller-supplied row callback failed.
    #[error("row callback failed: {0}")]
    Callback(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wrap a data source failure.
    pub fn from_source(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Source(err.into())
    }

    /// Wrap a row callback failure.
    pub fn callback(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Callback(err.into())
    }

    /// Check if this error came from converting a column into a member.
    #[must_use]
    pub fn is_mapping_error(&self) -> bool {
        matches!(self, Self::Mapping { .. } | Self::Type(_))
    }

    /// Check if this error was raised by the cursor state machine.
    #[must_use]
    pub fn is_cursor_error(&self) -> bool {
        matches!(self, Self::CursorState(_))
    }

    /// Check if this error originated in the recordset source.
    #[must_use]
    pub fn is_source_error(&self) -> bool {
        matches!(self, Self::Source(_))
    }
}

/// Result type for materializer operations.
pub type Result<T> = std::result::Result<T, Error>;
