//! Object graph assembly.
//!
//! Materializers are composable values describing how the rows of one
//! recordset become objects:
//!
//! - [`Plain`]: one `T` per row.
//! - [`OneToOne`]: split each row at a boundary column, map the left slice to
//!   the parent and the right slice to an optional child.
//! - [`Split`]: split each row at a boundary into a pair.
//! - [`Grouped`]: collapse joined rows into one parent per identity, with the
//!   remaining columns of its rows materialized as a child collection.
//!
//! Separate parent and child recordsets are stitched together by
//! [`correlate`], which buckets children by a normalized [`GroupKey`].
//!
//! ```text
//!  Id | Name | ChildId | Value          Grouped::new("ChildId", GroupBy::column("Id"), Plain::<Child>, ..)
//!  ---+------+---------+------   ──►
//!   1 | a    |   10    | x              Parent { id: 1, children: [10, 11] }
//!   1 | a    |   11    | y              Parent { id: 2, children: [] }
//!   2 | b    |  NULL   | NULL
//! ```

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use indexmap::IndexMap;
use indexmap::map::Entry;
use recordgraph_types::{GroupKey, KeyPolicy, SqlValue};

use crate::config::MapperConfig;
use crate::descriptor::short_type_name;
use crate::error::{Error, Result};
use crate::from_row::FromRow;
use crate::mapper::RowMapper;
use crate::row::{ColMetaData, Row};

/// Produces one output per row.
pub trait RowMaterializer: Send + Sync {
    /// Value produced for each row.
    type Output: Send + 'static;
    /// Per-recordset state.
    type Prepared: PreparedRow<Output = Self::Output>;

    /// Resolve bindings and boundaries for a recordset layout.
    fn prepare(&self, metadata: &Arc<ColMetaData>, config: &MapperConfig) -> Result<Self::Prepared>;
}

/// A row materializer prepared for one recordset layout.
pub trait PreparedRow {
    /// Value produced for each row.
    type Output;

    /// Map one row.
    fn map_row(&self, row: &Row) -> Result<Self::Output>;
}

impl<T: FromRow> PreparedRow for RowMapper<T> {
    type Output = T;

    fn map_row(&self, row: &Row) -> Result<T> {
        self.map(row)
    }
}

/// Produces a collection from a whole recordset.
///
/// Every [`RowMaterializer`] is a set materializer mapping each row in order.
pub trait SetMaterializer: Send + Sync {
    /// Element type of the produced collection.
    type Output: Send + 'static;

    /// Materialize the rows of one recordset.
    ///
    /// An empty recordset yields an empty collection without resolving any
    /// binding.
    fn materialize(
        &self,
        metadata: &Arc<ColMetaData>,
        rows: &[Row],
        config: &MapperConfig,
    ) -> Result<Vec<Self::Output>>;
}

impl<M: RowMaterializer> SetMaterializer for M {
    type Output = M::Output;

    fn materialize(
        &self,
        metadata: &Arc<ColMetaData>,
        rows: &[Row],
        config: &MapperConfig,
    ) -> Result<Vec<M::Output>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let prepared = self.prepare(metadata, config)?;
        rows.iter().map(|row| prepared.map_row(row)).collect()
    }
}

/// Index of the boundary column, searched from the second column on.
fn split_point(metadata: &ColMetaData, boundary: &str) -> Result<usize> {
    let found = metadata
        .columns
        .iter()
        .skip(1)
        .position(|c| c.name.eq_ignore_ascii_case(boundary))
        .map(|p| p + 1);

    found.ok_or_else(|| {
        let starts_at_first = metadata
            .get(0)
            .is_some_and(|c| c.name.eq_ignore_ascii_case(boundary));
        let columns: Vec<&str> = metadata.names().collect();
        if starts_at_first {
            Error::ShapeMismatch(format!(
                "split column '{boundary}' is the first column and would leave an empty left slice"
            ))
        } else {
            Error::ShapeMismatch(format!(
                "split column '{boundary}' not found in [{}]",
                columns.join(", ")
            ))
        }
    })
}

fn split_metadata(
    metadata: &ColMetaData,
    at: usize,
) -> Result<(Arc<ColMetaData>, Arc<ColMetaData>)> {
    let left = metadata.slice(0..at);
    let right = metadata.slice(at..metadata.len());
    match (left, right) {
        (Some(left), Some(right)) => Ok((Arc::new(left), Arc::new(right))),
        _ => Err(Error::ShapeMismatch(format!(
            "cannot split {} columns at {at}",
            metadata.len()
        ))),
    }
}

fn project(row: &Row, metadata: &Arc<ColMetaData>, start: usize) -> Result<Row> {
    row.project(Arc::clone(metadata), start).ok_or_else(|| {
        Error::ShapeMismatch(format!(
            "row with {} values is narrower than its recordset",
            row.len()
        ))
    })
}

/// Maps each row to `T`.
pub struct Plain<T>(PhantomData<fn() -> T>);

impl<T> Plain<T> {
    /// Create a plain materializer.
    #[must_use]
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for Plain<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Plain<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Plain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Plain<{}>", short_type_name(std::any::type_name::<T>()))
    }
}

impl<T: FromRow> RowMaterializer for Plain<T> {
    type Output = T;
    type Prepared = RowMapper<T>;

    fn prepare(&self, metadata: &Arc<ColMetaData>, config: &MapperConfig) -> Result<RowMapper<T>> {
        RowMapper::new(metadata, config)
    }
}

/// Maps a parent and an optional child from one row.
///
/// Columns before `split_on` feed the parent; `split_on` and everything after
/// feed the inner materializer. The child is `None` when all of its columns
/// are NULL.
pub struct OneToOne<P, C, F> {
    split_on: String,
    inner: C,
    attach: Arc<F>,
    _parent: PhantomData<fn() -> P>,
}

impl<P, C, F> OneToOne<P, C, F>
where
    C: RowMaterializer,
    F: Fn(&mut P, Option<C::Output>) + Send + Sync,
{
    /// Create a one-to-one materializer.
    pub fn new(split_on: impl Into<String>, inner: C, attach: F) -> Self {
        Self {
            split_on: split_on.into(),
            inner,
            attach: Arc::new(attach),
            _parent: PhantomData,
        }
    }
}

impl<P, C, F> fmt::Debug for OneToOne<P, C, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OneToOne")
            .field("parent", &short_type_name(std::any::type_name::<P>()))
            .field("split_on", &self.split_on)
            .finish_non_exhaustive()
    }
}

impl<P, C, F> RowMaterializer for OneToOne<P, C, F>
where
    P: FromRow,
    C: RowMaterializer,
    F: Fn(&mut P, Option<C::Output>) + Send + Sync,
{
    type Output = P;
    type Prepared = PreparedOneToOne<P, C::Prepared, F>;

    fn prepare(
        &self,
        metadata: &Arc<ColMetaData>,
        config: &MapperConfig,
    ) -> Result<Self::Prepared> {
        let at = split_point(metadata, &self.split_on)?;
        let (left, right) = split_metadata(metadata, at)?;
        Ok(PreparedOneToOne {
            parent: RowMapper::new(&left, config)?,
            child: self.inner.prepare(&right, config)?,
            left,
            right,
            at,
            attach: Arc::clone(&self.attach),
        })
    }
}

/// [`OneToOne`] prepared for a recordset layout.
pub struct PreparedOneToOne<P, C, F> {
    parent: RowMapper<P>,
    child: C,
    left: Arc<ColMetaData>,
    right: Arc<ColMetaData>,
    at: usize,
    attach: Arc<F>,
}

impl<P, C, F> PreparedRow for PreparedOneToOne<P, C, F>
where
    P: FromRow,
    C: PreparedRow,
    F: Fn(&mut P, Option<C::Output>),
{
    type Output = P;

    fn map_row(&self, row: &Row) -> Result<P> {
        let left = project(row, &self.left, 0)?;
        let right = project(row, &self.right, self.at)?;

        let mut parent = self.parent.map(&left)?;
        let child = if right.all_null() {
            None
        } else {
            Some(self.child.map_row(&right)?)
        };
        (self.attach)(&mut parent, child);
        Ok(parent)
    }
}

/// Maps each row to a pair split at a boundary column.
#[derive(Debug, Clone)]
pub struct Split<A, B> {
    split_on: String,
    left: A,
    right: B,
}

impl<A: RowMaterializer, B: RowMaterializer> Split<A, B> {
    /// Create a split materializer.
    pub fn new(split_on: impl Into<String>, left: A, right: B) -> Self {
        Self {
            split_on: split_on.into(),
            left,
            right,
        }
    }
}

impl<A: RowMaterializer, B: RowMaterializer> RowMaterializer for Split<A, B> {
    type Output = (A::Output, B::Output);
    type Prepared = PreparedSplit<A::Prepared, B::Prepared>;

    fn prepare(
        &self,
        metadata: &Arc<ColMetaData>,
        config: &MapperConfig,
    ) -> Result<Self::Prepared> {
        let at = split_point(metadata, &self.split_on)?;
        let (left_meta, right_meta) = split_metadata(metadata, at)?;
        Ok(PreparedSplit {
            left: self.left.prepare(&left_meta, config)?,
            right: self.right.prepare(&right_meta, config)?,
            left_meta,
            right_meta,
            at,
        })
    }
}

/// [`Split`] prepared for a recordset layout.
pub struct PreparedSplit<A, B> {
    left: A,
    right: B,
    left_meta: Arc<ColMetaData>,
    right_meta: Arc<ColMetaData>,
    at: usize,
}

impl<A: PreparedRow, B: PreparedRow> PreparedRow for PreparedSplit<A, B> {
    type Output = (A::Output, B::Output);

    fn map_row(&self, row: &Row) -> Result<Self::Output> {
        let left = project(row, &self.left_meta, 0)?;
        let right = project(row, &self.right_meta, self.at)?;
        Ok((self.left.map_row(&left)?, self.right.map_row(&right)?))
    }
}

/// How [`Grouped`] decides that two rows belong to the same parent.
pub enum GroupBy<P> {
    /// Every column of the parent slice.
    AllColumns,
    /// A single column (searched across the whole row).
    Column(String),
    /// A key extracted from the mapped parent.
    Key(Arc<dyn Fn(&P) -> SqlValue + Send + Sync>),
}

impl<P> GroupBy<P> {
    /// Group by one column.
    pub fn column(name: impl Into<String>) -> Self {
        Self::Column(name.into())
    }

    /// Group by a key read from the mapped parent.
    pub fn key<K>(key: K) -> Self
    where
        K: Fn(&P) -> SqlValue + Send + Sync + 'static,
    {
        Self::Key(Arc::new(key))
    }
}

impl<P> fmt::Debug for GroupBy<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllColumns => f.write_str("AllColumns"),
            Self::Column(name) => f.debug_tuple("Column").field(name).finish(),
            Self::Key(_) => f.write_str("Key(..)"),
        }
    }
}

/// Collapses joined rows into parents with child collections.
///
/// Parents appear in order of first appearance; each parent's children keep
/// source row order. Rows whose child slice is entirely NULL contribute no
/// child. The inner materializer can itself be [`Grouped`], so groupings nest.
pub struct Grouped<P, C, F> {
    split_on: String,
    group_by: GroupBy<P>,
    inner: C,
    attach: F,
}

impl<P, C, F> Grouped<P, C, F>
where
    C: SetMaterializer,
    F: Fn(&mut P, Vec<C::Output>) + Send + Sync,
{
    /// Create a grouping materializer.
    pub fn new(split_on: impl Into<String>, group_by: GroupBy<P>, inner: C, attach: F) -> Self {
        Self {
            split_on: split_on.into(),
            group_by,
            inner,
            attach,
        }
    }
}

impl<P, C, F> fmt::Debug for Grouped<P, C, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grouped")
            .field("parent", &short_type_name(std::any::type_name::<P>()))
            .field("split_on", &self.split_on)
            .field("group_by", &self.group_by)
            .finish_non_exhaustive()
    }
}

impl<P, C, F> SetMaterializer for Grouped<P, C, F>
where
    P: FromRow,
    C: SetMaterializer,
    F: Fn(&mut P, Vec<C::Output>) + Send + Sync,
{
    type Output = P;

    fn materialize(
        &self,
        metadata: &Arc<ColMetaData>,
        rows: &[Row],
        config: &MapperConfig,
    ) -> Result<Vec<P>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let at = split_point(metadata, &self.split_on)?;
        let (left, right) = split_metadata(metadata, at)?;
        let parents = RowMapper::<P>::new(&left, config)?;
        let policy = config.get_key_policy();

        let key_column = match &self.group_by {
            GroupBy::Column(name) => Some(metadata.find_by_name(name).ok_or_else(|| {
                Error::ShapeMismatch(format!("group column '{name}' not found"))
            })?),
            _ => None,
        };

        let mut groups: IndexMap<GroupKey, (P, Vec<Row>)> = IndexMap::new();
        for row in rows {
            let parent_row = project(row, &left, 0)?;
            let child_row = project(row, &right, at)?;

            let mut mapped = None;
            let key = match (&self.group_by, key_column) {
                (GroupBy::Column(_), Some(ordinal)) => {
                    GroupKey::from_value(row.get_raw(ordinal).unwrap_or(&SqlValue::Null), policy)
                }
                (GroupBy::Key(extract), _) => {
                    let parent = parents.map(&parent_row)?;
                    let key = GroupKey::from_value(&extract(&parent), policy);
                    mapped = Some(parent);
                    key
                }
                _ => GroupKey::composite(parent_row.iter(), policy),
            };

            let group = match groups.entry(key) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let parent = match mapped {
                        Some(parent) => parent,
                        None => parents.map(&parent_row)?,
                    };
                    entry.insert((parent, Vec::new()))
                }
            };
            if !child_row.all_null() {
                group.1.push(child_row);
            }
        }

        tracing::trace!(
            rows = rows.len(),
            parents = groups.len(),
            parent = short_type_name(std::any::type_name::<P>()),
            "grouped rows"
        );

        let mut out = Vec::with_capacity(groups.len());
        for (_, (mut parent, child_rows)) in groups {
            let children = self.inner.materialize(&right, &child_rows, config)?;
            (self.attach)(&mut parent, children);
            out.push(parent);
        }
        Ok(out)
    }
}

/// How a child's correlation key is read.
pub enum ChildKey<C> {
    /// Extracted from the mapped child.
    Field(Arc<dyn Fn(&C) -> SqlValue + Send + Sync>),
    /// Raw value of a column of the child recordset.
    Column(String),
}

impl<C> ChildKey<C> {
    /// Key read from the mapped child.
    pub fn field<K>(key: K) -> Self
    where
        K: Fn(&C) -> SqlValue + Send + Sync + 'static,
    {
        Self::Field(Arc::new(key))
    }

    /// Key read from a child recordset column.
    pub fn column(name: impl Into<String>) -> Self {
        Self::Column(name.into())
    }
}

impl<C> fmt::Debug for ChildKey<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(_) => f.write_str("Field(..)"),
            Self::Column(name) => f.debug_tuple("Column").field(name).finish(),
        }
    }
}

/// Materialize a child recordset together with each child's correlation key.
pub(crate) fn materialize_keyed<M: RowMaterializer>(
    materializer: &M,
    metadata: &Arc<ColMetaData>,
    rows: &[Row],
    key: &ChildKey<M::Output>,
    config: &MapperConfig,
) -> Result<Vec<(SqlValue, M::Output)>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let prepared = materializer.prepare(metadata, config)?;
    let column = match key {
        ChildKey::Column(name) => Some(metadata.find_by_name(name).ok_or_else(|| {
            Error::ShapeMismatch(format!("child key column '{name}' not found"))
        })?),
        ChildKey::Field(_) => None,
    };

    rows.iter()
        .map(|row| {
            let child = prepared.map_row(row)?;
            let value = match (key, column) {
                (ChildKey::Field(extract), _) => extract(&child),
                (ChildKey::Column(_), Some(ordinal)) => {
                    row.get_raw(ordinal).cloned().unwrap_or_default()
                }
                (ChildKey::Column(_), None) => SqlValue::Null,
            };
            Ok((value, child))
        })
        .collect()
}

/// Distribute keyed children over parents.
///
/// Children are bucketed by normalized key, keeping their order. Each parent
/// receives the bucket matching its key, or an empty `Vec`. Children whose
/// key is NULL or matches no parent are dropped. If two parents share a key,
/// the first one receives the bucket. Returns the number of dropped children.
pub fn correlate_keyed<P, C, K, A>(
    parents: &mut [P],
    children: Vec<(SqlValue, C)>,
    parent_key: K,
    attach: A,
    policy: KeyPolicy,
) -> usize
where
    K: Fn(&P) -> SqlValue,
    A: Fn(&mut P, Vec<C>),
{
    let total = children.len();
    let mut null_keys = 0;
    let mut buckets: HashMap<GroupKey, Vec<C>> = HashMap::new();
    for (value, child) in children {
        let key = GroupKey::from_value(&value, policy);
        if key.is_null() {
            null_keys += 1;
            continue;
        }
        buckets.entry(key).or_default().push(child);
    }

    let mut attached = 0;
    for parent in parents.iter_mut() {
        let key = GroupKey::from_value(&parent_key(parent), policy);
        let bucket = if key.is_null() {
            Vec::new()
        } else {
            buckets.remove(&key).unwrap_or_default()
        };
        attached += bucket.len();
        attach(parent, bucket);
    }

    let dropped = total - attached;
    if dropped > 0 {
        tracing::debug!(
            dropped,
            null_keys,
            "children without a matching parent were dropped"
        );
    }
    dropped
}

/// Distribute children over parents by key.
///
/// See [`correlate_keyed`]; the child key is read from each child.
pub fn correlate<P, C, K, CK, A>(
    parents: &mut [P],
    children: Vec<C>,
    parent_key: K,
    child_key: CK,
    attach: A,
    policy: KeyPolicy,
) -> usize
where
    K: Fn(&P) -> SqlValue,
    CK: Fn(&C) -> SqlValue,
    A: Fn(&mut P, Vec<C>),
{
    let keyed = children
        .into_iter()
        .map(|child| (child_key(&child), child))
        .collect();
    correlate_keyed(parents, keyed, parent_key, attach, policy)
}
