//! Per-recordset row mapping.
//!
//! A [`RowMapper`] is prepared once per recordset: it resolves the column
//! binding (through the binding cache) and each bound member's serializer.
//! Mapping a row then only reads values through the prepared [`BoundRow`].

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use recordgraph_types::{FromSql, SqlValue};

use crate::binding::ColumnBinding;
use crate::config::MapperConfig;
use crate::descriptor::{TypeDescriptor, descriptor_of, short_type_name};
use crate::error::{Error, Result};
use crate::from_row::FromRow;
use crate::row::{ColMetaData, Row};
use crate::serializer::ColumnSerializer;

/// Maps the rows of one recordset layout into `T`.
pub struct RowMapper<T> {
    metadata: Arc<ColMetaData>,
    descriptor: Arc<TypeDescriptor>,
    binding: Arc<ColumnBinding>,
    serializers: Vec<Option<Arc<dyn ColumnSerializer>>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: FromRow> RowMapper<T> {
    /// Prepare a mapper for a recordset layout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Construction`] if no constructor of `T` can be
    /// satisfied, or if a bound member names an unregistered serializer.
    pub fn new(metadata: &Arc<ColMetaData>, config: &MapperConfig) -> Result<Self> {
        let descriptor = descriptor_of::<T>();
        let binding = config.get_cache().resolve::<T>(metadata)?;

        let mut serializers = Vec::with_capacity(descriptor.members().len());
        for (index, member) in descriptor.members().iter().enumerate() {
            if binding.member_column(index).is_none() {
                serializers.push(None);
                continue;
            }
            let serializer = config.get_rules().resolve(member).map_err(|name| {
                Error::Construction {
                    type_name: descriptor.type_name(),
                    reason: format!(
                        "member '{}' uses unregistered serializer '{name}'",
                        member.name()
                    ),
                }
            })?;
            serializers.push(serializer);
        }

        Ok(Self {
            metadata: Arc::clone(metadata),
            descriptor,
            binding,
            serializers,
            _marker: PhantomData,
        })
    }

    /// Map one row.
    pub fn map(&self, row: &Row) -> Result<T> {
        T::from_row(&BoundRow {
            row,
            descriptor: &self.descriptor,
            binding: &self.binding,
            serializers: &self.serializers,
        })
    }

    /// Map every row in order, stopping at the first failure.
    pub fn map_all<'a, I>(&self, rows: I) -> Result<Vec<T>>
    where
        I: IntoIterator<Item = &'a Row>,
    {
        rows.into_iter().map(|row| self.map(row)).collect()
    }

    /// The layout this mapper was prepared for.
    #[must_use]
    pub fn metadata(&self) -> &Arc<ColMetaData> {
        &self.metadata
    }

    /// The resolved binding.
    #[must_use]
    pub fn binding(&self) -> &Arc<ColumnBinding> {
        &self.binding
    }
}

impl<T> fmt::Debug for RowMapper<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowMapper")
            .field("destination", &self.descriptor.type_name())
            .field("columns", &self.metadata.len())
            .field("binding", &self.binding)
            .finish()
    }
}

/// A row viewed through a resolved binding.
///
/// Handed to [`FromRow::from_row`]; members are addressed by their index in
/// the type's descriptor.
pub struct BoundRow<'a> {
    row: &'a Row,
    descriptor: &'a TypeDescriptor,
    binding: &'a ColumnBinding,
    serializers: &'a [Option<Arc<dyn ColumnSerializer>>],
}

impl<'a> BoundRow<'a> {
    /// Read a member's value.
    ///
    /// Returns `Ok(None)` if the member has no column in this recordset, so
    /// the member keeps its default. A NULL column converts through `V`'s
    /// `FromSql` impl, which accepts it only for `Option` types.
    pub fn value<V: FromSql>(&self, member: usize) -> Result<Option<V>> {
        let Some(ordinal) = self.binding.member_column(member) else {
            return Ok(None);
        };
        self.convert(member, ordinal).map(Some)
    }

    /// Read a required constructor parameter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Construction`] if the member is unbound, which cannot
    /// happen for parameters of the selected constructor.
    pub fn param<V: FromSql>(&self, member: usize) -> Result<V> {
        let Some(ordinal) = self.binding.member_column(member) else {
            return Err(Error::Construction {
                type_name: self.descriptor.type_name(),
                reason: format!(
                    "constructor parameter '{}' has no column",
                    self.descriptor.qualified(member)
                ),
            });
        };
        self.convert(member, ordinal)
    }

    /// Index of the selected constructor, `None` for default construction.
    #[must_use]
    pub fn constructor(&self) -> Option<usize> {
        self.binding.constructor()
    }

    /// The underlying row.
    #[must_use]
    pub fn row(&self) -> &'a Row {
        self.row
    }

    /// The destination's descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &'a TypeDescriptor {
        self.descriptor
    }

    fn convert<V: FromSql>(&self, member: usize, ordinal: usize) -> Result<V> {
        let raw = self.row.get_raw(ordinal).unwrap_or(&SqlValue::Null);

        let decoded;
        let value = match self.serializers.get(member).and_then(Option::as_ref) {
            Some(serializer) => {
                decoded = serializer
                    .decode(raw)
                    .map_err(|e| self.mapping_error(member, ordinal, raw, e.to_string()))?;
                &decoded
            }
            None => raw,
        };

        V::from_sql(value).map_err(|e| self.mapping_error(member, ordinal, raw, e.to_string()))
    }

    fn mapping_error(
        &self,
        member: usize,
        ordinal: usize,
        raw: &SqlValue,
        reason: String,
    ) -> Error {
        let column = self
            .row
            .columns()
            .get(ordinal)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| format!("#{ordinal}"));
        tracing::debug!(
            column = %column,
            destination = short_type_name(self.descriptor.type_name()),
            reason = %reason,
            "column conversion failed"
        );
        Error::Mapping {
            column,
            member: self.descriptor.qualified(member),
            source_type: raw.type_name(),
            reason,
        }
    }
}

impl fmt::Debug for BoundRow<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundRow")
            .field("destination", &self.descriptor.type_name())
            .field("row", self.row)
            .finish()
    }
}
