//! Result contracts.
//!
//! A [`ResultShape`] declares, in order, what each recordset of a query
//! becomes. Reading it through a cursor always produces a structurally
//! complete [`Results`]: positions the query did not return are filled with
//! empty sets, empty child collections and NULL scalars.
//!
//! # Example
//!
//! ```rust,ignore
//! let shape = ResultShape::new()
//!     .returns::<Customer>()
//!     .then_children::<Order, _, _, _>(
//!         |c: &Customer| SqlValue::Int(c.id),
//!         ChildKey::column("CustomerId"),
//!         |c: &mut Customer, orders| c.orders = orders,
//!     )
//!     .then_scalar("total", "TotalCount");
//!
//! let mut results = shape.read(&mut cursor, &config)?;
//! let customers: Vec<Customer> = results.take(0)?;
//! let total: Option<i64> = results.scalar("total")?;
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use recordgraph_types::{FromSql, SqlValue};

use crate::assemble::{
    ChildKey, Plain, RowMaterializer, SetMaterializer, correlate_keyed, materialize_keyed,
};
use crate::config::MapperConfig;
use crate::cursor::{AsyncRecordsetCursor, RecordsetCursor};
use crate::descriptor::short_type_name;
use crate::error::{Error, Result};
use crate::from_row::FromRow;
use crate::row::{ColMetaData, Row};
use crate::source::{AsyncRecordsetSource, RecordsetSource};

type AnySet = Box<dyn Any + Send>;

/// One fetched recordset, or `None` past the end of the query.
type Fetched = Option<(Arc<ColMetaData>, Vec<Row>)>;

trait SetStep: Send + Sync {
    fn materialize(
        &self,
        metadata: &Arc<ColMetaData>,
        rows: &[Row],
        config: &MapperConfig,
    ) -> Result<AnySet>;
    fn empty(&self) -> AnySet;
    fn type_name(&self) -> &'static str;
}

struct SetStepImpl<M>(M);

impl<M: SetMaterializer> SetStep for SetStepImpl<M> {
    fn materialize(
        &self,
        metadata: &Arc<ColMetaData>,
        rows: &[Row],
        config: &MapperConfig,
    ) -> Result<AnySet> {
        Ok(Box::new(self.0.materialize(metadata, rows, config)?))
    }

    fn empty(&self) -> AnySet {
        Box::new(Vec::<M::Output>::new())
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<M::Output>()
    }
}

trait ChildrenStep: Send + Sync {
    /// Attach the children of `fetched` (or nothing) to the parents in `set`.
    fn attach(
        &self,
        set: &mut AnySet,
        set_type: &'static str,
        fetched: &Fetched,
        config: &MapperConfig,
    ) -> Result<()>;
}

struct ChildrenStepImpl<P, M: RowMaterializer> {
    materializer: M,
    parent_key: Arc<dyn Fn(&P) -> SqlValue + Send + Sync>,
    child_key: ChildKey<M::Output>,
    attach: Arc<dyn Fn(&mut P, Vec<M::Output>) + Send + Sync>,
}

impl<P, M> ChildrenStep for ChildrenStepImpl<P, M>
where
    P: Send + 'static,
    M: RowMaterializer,
{
    fn attach(
        &self,
        set: &mut AnySet,
        set_type: &'static str,
        fetched: &Fetched,
        config: &MapperConfig,
    ) -> Result<()> {
        let parents = set.downcast_mut::<Vec<P>>().ok_or_else(|| {
            Error::ShapeMismatch(format!(
                "children expect parents of type {}, previous set holds {}",
                short_type_name(std::any::type_name::<P>()),
                short_type_name(set_type)
            ))
        })?;

        let children = match fetched {
            Some((metadata, rows)) => {
                materialize_keyed(&self.materializer, metadata, rows, &self.child_key, config)?
            }
            None => Vec::new(),
        };
        correlate_keyed(
            parents,
            children,
            |p| (self.parent_key)(p),
            |p, c| (self.attach)(p, c),
            config.get_key_policy(),
        );
        Ok(())
    }
}

enum Step {
    Set(Box<dyn SetStep>),
    Children(Box<dyn ChildrenStep>),
    Scalar { name: String, column: String },
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Set(step) => write!(f, "Set({})", short_type_name(step.type_name())),
            Self::Children(_) => f.write_str("Children"),
            Self::Scalar { name, column } => write!(f, "Scalar({name} <- {column})"),
        }
    }
}

/// Declared layout of a multi-recordset query.
///
/// Each step consumes one recordset, in order:
///
/// - set steps ([`returns`](Self::returns), [`then`](Self::then),
///   [`then_with`](Self::then_with)) produce a result slot;
/// - children steps ([`then_children`](Self::then_children)) attach their
///   recordset to the parents of the most recent set step;
/// - scalar steps ([`then_scalar`](Self::then_scalar)) read one column of the
///   first row.
#[derive(Debug, Default)]
pub struct ResultShape {
    steps: Vec<Step>,
}

impl ResultShape {
    /// Create an empty shape.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Map the next recordset to `T`.
    #[must_use]
    pub fn returns<T: FromRow>(self) -> Self {
        self.then_with(Plain::<T>::new())
    }

    /// Map the next recordset to `T`. Same as [`returns`](Self::returns).
    #[must_use]
    pub fn then<T: FromRow>(self) -> Self {
        self.returns::<T>()
    }

    /// Materialize the next recordset with a custom materializer.
    #[must_use]
    pub fn returns_with<M: SetMaterializer + 'static>(self, materializer: M) -> Self {
        self.then_with(materializer)
    }

    /// Materialize the next recordset with a custom materializer.
    #[must_use]
    pub fn then_with<M: SetMaterializer + 'static>(mut self, materializer: M) -> Self {
        self.steps.push(Step::Set(Box::new(SetStepImpl(materializer))));
        self
    }

    /// Attach the next recordset, mapped to `C`, to the previous set's parents.
    #[must_use]
    pub fn then_children<C, P, K, A>(self, parent_key: K, child_key: ChildKey<C>, attach: A) -> Self
    where
        C: FromRow,
        P: Send + 'static,
        K: Fn(&P) -> SqlValue + Send + Sync + 'static,
        A: Fn(&mut P, Vec<C>) + Send + Sync + 'static,
    {
        self.then_children_with(Plain::<C>::new(), parent_key, child_key, attach)
    }

    /// Attach the next recordset, materialized by `materializer`, to the
    /// previous set's parents.
    #[must_use]
    pub fn then_children_with<M, P, K, A>(
        mut self,
        materializer: M,
        parent_key: K,
        child_key: ChildKey<M::Output>,
        attach: A,
    ) -> Self
    where
        M: RowMaterializer + 'static,
        P: Send + 'static,
        K: Fn(&P) -> SqlValue + Send + Sync + 'static,
        A: Fn(&mut P, Vec<M::Output>) + Send + Sync + 'static,
    {
        self.steps.push(Step::Children(Box::new(ChildrenStepImpl {
            materializer,
            parent_key: Arc::new(parent_key),
            child_key,
            attach: Arc::new(attach),
        })));
        self
    }

    /// Read `column` of the next recordset's first row as the scalar `name`.
    #[must_use]
    pub fn then_scalar(mut self, name: impl Into<String>, column: impl Into<String>) -> Self {
        self.steps.push(Step::Scalar {
            name: name.into(),
            column: column.into(),
        });
        self
    }

    /// Number of recordsets this shape consumes.
    #[must_use]
    pub fn recordsets(&self) -> usize {
        self.steps.len()
    }

    /// Number of result slots this shape produces.
    #[must_use]
    pub fn sets(&self) -> usize {
        self.steps.iter().filter(|s| matches!(s, Step::Set(_))).count()
    }

    fn validate(&self) -> Result<()> {
        for (position, step) in self.steps.iter().enumerate() {
            match step {
                Step::Set(_) => return Ok(()),
                Step::Children(_) => {
                    return Err(Error::ShapeMismatch(format!(
                        "children step at position {position} has no preceding set"
                    )));
                }
                Step::Scalar { .. } => {}
            }
        }
        Ok(())
    }

    /// Read the recordsets following the cursor's position.
    ///
    /// A cursor that has not been advanced starts at its first recordset.
    pub fn read<S: RecordsetSource>(
        &self,
        cursor: &mut RecordsetCursor<S>,
        config: &MapperConfig,
    ) -> Result<Results> {
        self.validate()?;
        let mut results = Results::default();
        for (position, step) in self.steps.iter().enumerate() {
            let fetched = if cursor.next_result()? {
                let rows = cursor.read_all()?;
                Some((Arc::clone(cursor.metadata()), rows))
            } else {
                None
            };
            self.apply(position, step, fetched, &mut results, config)?;
        }
        self.finish(&results);
        Ok(results)
    }

    /// Read the recordsets following the cursor's position, suspending at
    /// fetch boundaries.
    pub async fn read_async<S: AsyncRecordsetSource>(
        &self,
        cursor: &mut AsyncRecordsetCursor<S>,
        config: &MapperConfig,
    ) -> Result<Results> {
        self.validate()?;
        let mut results = Results::default();
        for (position, step) in self.steps.iter().enumerate() {
            let fetched = if cursor.next_result().await? {
                let rows = cursor.read_all().await?;
                Some((Arc::clone(cursor.metadata()), rows))
            } else {
                None
            };
            self.apply(position, step, fetched, &mut results, config)?;
        }
        self.finish(&results);
        Ok(results)
    }

    fn apply(
        &self,
        position: usize,
        step: &Step,
        fetched: Fetched,
        results: &mut Results,
        config: &MapperConfig,
    ) -> Result<()> {
        if fetched.is_some() {
            results.recordsets_read += 1;
        }
        match step {
            Step::Set(set) => {
                let value = match &fetched {
                    Some((metadata, rows)) => set.materialize(metadata, rows, config)?,
                    None => set.empty(),
                };
                if let Some((_, rows)) = &fetched {
                    tracing::trace!(position, rows = rows.len(), "materialized set");
                }
                results.sets.push(Slot {
                    type_name: set.type_name(),
                    value,
                });
            }
            Step::Children(children) => {
                let slot = results.sets.last_mut().ok_or_else(|| {
                    Error::ShapeMismatch(format!(
                        "children step at position {position} has no preceding set"
                    ))
                })?;
                children.attach(&mut slot.value, slot.type_name, &fetched, config)?;
            }
            Step::Scalar { name, column } => {
                let value = match &fetched {
                    Some((metadata, rows)) => match (metadata.find_by_name(column), rows.first()) {
                        (Some(ordinal), Some(row)) => {
                            row.get_raw(ordinal).cloned().unwrap_or_default()
                        }
                        (None, Some(_)) => {
                            return Err(Error::ShapeMismatch(format!(
                                "scalar column '{column}' not found at position {position}"
                            )));
                        }
                        _ => SqlValue::Null,
                    },
                    None => SqlValue::Null,
                };
                results
                    .scalars
                    .insert(name.to_ascii_lowercase(), (name.clone(), value));
            }
        }
        Ok(())
    }

    fn finish(&self, results: &Results) {
        tracing::debug!(
            declared = self.steps.len(),
            read = results.recordsets_read,
            sets = results.sets.len(),
            "result shape read"
        );
    }
}

struct Slot {
    type_name: &'static str,
    value: AnySet,
}

/// The materialized output of a [`ResultShape`].
#[derive(Default)]
pub struct Results {
    sets: Vec<Slot>,
    scalars: IndexMap<String, (String, SqlValue)>,
    recordsets_read: usize,
}

impl Results {
    /// Number of result slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Check if there are no result slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Number of recordsets the query actually returned for this shape.
    #[must_use]
    pub fn recordsets_read(&self) -> usize {
        self.recordsets_read
    }

    /// Borrow the set at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] if there is no such slot or it holds a
    /// different type.
    pub fn set<T: 'static>(&self, index: usize) -> Result<&[T]> {
        let slot = self.slot(index)?;
        slot.value
            .downcast_ref::<Vec<T>>()
            .map(Vec::as_slice)
            .ok_or_else(|| wrong_type::<T>(index, slot.type_name))
    }

    /// Move the set at `index` out, leaving an empty set behind.
    pub fn take<T: 'static>(&mut self, index: usize) -> Result<Vec<T>> {
        let len = self.sets.len();
        let slot = self
            .sets
            .get_mut(index)
            .ok_or_else(|| no_slot(index, len))?;
        let type_name = slot.type_name;
        slot.value
            .downcast_mut::<Vec<T>>()
            .map(std::mem::take)
            .ok_or_else(|| wrong_type::<T>(index, type_name))
    }

    /// Read a scalar by name (case-insensitive).
    ///
    /// A missing or NULL scalar converts like NULL, so `Option<V>` yields
    /// `None`.
    pub fn scalar<V: FromSql>(&self, name: &str) -> Result<V> {
        let value = self
            .scalars
            .get(&name.to_ascii_lowercase())
            .map_or(&SqlValue::Null, |(_, value)| value);
        V::from_sql(value).map_err(Error::from)
    }

    /// Iterate over the scalars as `(name, value)` pairs.
    pub fn scalars(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.scalars.values().map(|(name, value)| (name.as_str(), value))
    }

    fn slot(&self, index: usize) -> Result<&Slot> {
        self.sets.get(index).ok_or_else(|| no_slot(index, self.sets.len()))
    }
}

fn no_slot(index: usize, len: usize) -> Error {
    Error::ShapeMismatch(format!("no result set at position {index} (shape has {len})"))
}

fn wrong_type<T>(index: usize, actual: &'static str) -> Error {
    Error::ShapeMismatch(format!(
        "result set {index} holds {}, not {}",
        short_type_name(actual),
        short_type_name(std::any::type_name::<T>())
    ))
}

impl fmt::Debug for Results {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sets: Vec<&str> = self.sets.iter().map(|s| short_type_name(s.type_name)).collect();
        f.debug_struct("Results")
            .field("sets", &sets)
            .field("scalars", &self.scalars.len())
            .field("recordsets_read", &self.recordsets_read)
            .finish()
    }
}
