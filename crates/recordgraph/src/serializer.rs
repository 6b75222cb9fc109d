//! Custom column serializers.
//!
//! A member that declares a serializer (or whose Rust type has a type-wide
//! rule) has its raw column value passed through [`ColumnSerializer::decode`]
//! before the usual `FromSql` conversion.
//!
//! Rules live in a [`SerializationRules`] set handed to each pipeline through
//! [`MapperConfig`](crate::MapperConfig), so tests and callers can scope rules
//! per pipeline. [`SerializationRules::shared_default`] is the convenience
//! instance holding the built-in serializers.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use recordgraph_types::{SerializerError, SqlValue};

use crate::descriptor::MemberDescriptor;

/// Decodes a raw column value into the value a member expects.
pub trait ColumnSerializer: Send + Sync {
    /// Name members use to refer to this serializer.
    fn name(&self) -> &str;

    /// Decode a raw column value.
    fn decode(&self, value: &SqlValue) -> Result<SqlValue, SerializerError>;
}

impl fmt::Debug for dyn ColumnSerializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ColumnSerializer").field(&self.name()).finish()
    }
}

/// Decodes UTF-8 text stored in a binary column.
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8Serializer;

impl ColumnSerializer for Utf8Serializer {
    fn name(&self) -> &str {
        "utf8"
    }

    fn decode(&self, value: &SqlValue) -> Result<SqlValue, SerializerError> {
        match value {
            SqlValue::Null | SqlValue::String(_) => Ok(value.clone()),
            SqlValue::Binary(bytes) => std::str::from_utf8(bytes)
                .map(|s| SqlValue::String(s.to_owned()))
                .map_err(|e| SerializerError::rejected(self.name(), e.to_string())),
            other => Err(SerializerError::Unsupported {
                serializer: self.name().to_owned(),
                actual: other.type_name(),
            }),
        }
    }
}

/// Parses JSON documents stored as text or binary.
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

#[cfg(feature = "json")]
impl ColumnSerializer for JsonSerializer {
    fn name(&self) -> &str {
        "json"
    }

    fn decode(&self, value: &SqlValue) -> Result<SqlValue, SerializerError> {
        let parsed = match value {
            SqlValue::Null | SqlValue::Json(_) => return Ok(value.clone()),
            SqlValue::String(s) => serde_json::from_str(s),
            SqlValue::Binary(b) => serde_json::from_slice(b),
            other => {
                return Err(SerializerError::Unsupported {
                    serializer: self.name().to_owned(),
                    actual: other.type_name(),
                });
            }
        };
        parsed
            .map(SqlValue::Json)
            .map_err(|e| SerializerError::rejected(self.name(), e.to_string()))
    }
}

/// Serializer backed by a closure.
pub struct FnSerializer<F> {
    name: String,
    decode: F,
}

impl<F> FnSerializer<F>
where
    F: Fn(&SqlValue) -> Result<SqlValue, SerializerError> + Send + Sync,
{
    /// Create a named serializer from a decode function.
    pub fn new(name: impl Into<String>, decode: F) -> Self {
        Self {
            name: name.into(),
            decode,
        }
    }
}

impl<F> ColumnSerializer for FnSerializer<F>
where
    F: Fn(&SqlValue) -> Result<SqlValue, SerializerError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn decode(&self, value: &SqlValue) -> Result<SqlValue, SerializerError> {
        (self.decode)(value)
    }
}

/// The serializer set a pipeline resolves member serializers against.
#[derive(Clone, Default)]
pub struct SerializationRules {
    /// Serializers by lowercased name.
    named: HashMap<String, Arc<dyn ColumnSerializer>>,
    /// Serializers applied to every member of a Rust type.
    by_type: HashMap<&'static str, Arc<dyn ColumnSerializer>>,
}

static SHARED_DEFAULT: Lazy<Arc<SerializationRules>> =
    Lazy::new(|| Arc::new(SerializationRules::with_builtins()));

impl SerializationRules {
    /// Create an empty rule set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a rule set holding the built-in serializers.
    #[must_use]
    pub fn with_builtins() -> Self {
        let rules = Self::new().register(Utf8Serializer);
        #[cfg(feature = "json")]
        let rules = rules.register(JsonSerializer);
        rules
    }

    /// The process-wide default rule set (built-ins only).
    #[must_use]
    pub fn shared_default() -> Arc<Self> {
        Arc::clone(&SHARED_DEFAULT)
    }

    /// Register a serializer under its own name, replacing any previous one.
    #[must_use]
    pub fn register(mut self, serializer: impl ColumnSerializer + 'static) -> Self {
        let serializer: Arc<dyn ColumnSerializer> = Arc::new(serializer);
        self.named
            .insert(serializer.name().to_ascii_lowercase(), serializer);
        self
    }

    /// Apply a serializer to every member whose Rust type is `T`.
    #[must_use]
    pub fn for_type<T: ?Sized>(mut self, serializer: impl ColumnSerializer + 'static) -> Self {
        self.by_type
            .insert(std::any::type_name::<T>(), Arc::new(serializer));
        self
    }

    /// Look up a serializer by name (case-insensitive).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn ColumnSerializer>> {
        self.named.get(&name.to_ascii_lowercase()).cloned()
    }

    /// Number of named serializers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.named.len()
    }

    /// Check if no named serializers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.named.is_empty()
    }

    /// Resolve the serializer for a member.
    ///
    /// A serializer named on the member wins over a type-wide rule.
    /// Returns `Err(name)` if the member names an unregistered serializer.
    pub fn resolve(
        &self,
        member: &MemberDescriptor,
    ) -> Result<Option<Arc<dyn ColumnSerializer>>, String> {
        if let Some(name) = member.serializer_name() {
            return self.get(name).map(Some).ok_or_else(|| name.to_owned());
        }
        Ok(self.by_type.get(member.type_name()).cloned())
    }
}

impl fmt::Debug for SerializationRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut named: Vec<&str> = self.named.keys().map(String::as_str).collect();
        named.sort_unstable();
        let mut typed: Vec<&str> = self.by_type.keys().copied().collect();
        typed.sort_unstable();
        f.debug_struct("SerializationRules")
            .field("named", &named)
            .field("by_type", &typed)
            .finish()
    }
}
