//! Column-to-member binding resolution and caching.
//!
//! Resolving which column feeds which member (and which constructor to use)
//! is done once per distinct `(column layout, destination type)` pair and
//! then reused for every row of every recordset with that layout.
//!
//! ## Lifecycle
//!
//! 1. The first recordset with a new layout resolves a [`ColumnBinding`]
//! 2. The binding is cached under the layout signature and the type's `TypeId`
//! 3. Later recordsets with the same layout hit the cache
//! 4. Entries are never evicted; [`BindingCache::clear`] exists for tests
//!
//! Concurrent first resolutions of the same key may both compute a binding;
//! only the first insert is kept and both callers get that entry.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::descriptor::{TypeDescriptor, descriptor_of, short_type_name};
use crate::error::{Error, Result};
use crate::from_row::FromRow;
use crate::row::ColMetaData;

/// The resolved wiring of one column layout to one destination type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnBinding {
    /// Column ordinal per descriptor member; `None` if the member is unbound.
    members: Vec<Option<usize>>,
    /// Index of the selected constructor, if the type declares any.
    constructor: Option<usize>,
    /// Columns no member consumes.
    ignored: Vec<usize>,
}

impl ColumnBinding {
    /// Column ordinal bound to a member.
    #[must_use]
    pub fn member_column(&self, member: usize) -> Option<usize> {
        self.members.get(member).copied().flatten()
    }

    /// Index of the selected constructor.
    #[must_use]
    pub fn constructor(&self) -> Option<usize> {
        self.constructor
    }

    /// Columns that feed nothing.
    #[must_use]
    pub fn ignored(&self) -> &[usize] {
        &self.ignored
    }

    /// Number of members with a bound column.
    #[must_use]
    pub fn bound_members(&self) -> usize {
        self.members.iter().filter(|m| m.is_some()).count()
    }
}

/// Resolve how a column layout binds to a destination type.
///
/// Names match case-insensitively; a member's source override replaces its
/// name. When several columns share a name the first one wins. Members
/// without a column stay unbound, columns without a member are ignored.
///
/// If the type declares constructors, the one with the most parameters whose
/// parameter members are all bound is selected. If none can be satisfied the
/// result is [`Error::Construction`].
pub fn resolve_binding(
    metadata: &ColMetaData,
    descriptor: &TypeDescriptor,
) -> Result<ColumnBinding> {
    if descriptor.is_dynamic() {
        return Ok(ColumnBinding {
            members: Vec::new(),
            constructor: None,
            ignored: Vec::new(),
        });
    }

    let members: Vec<Option<usize>> = descriptor
        .members()
        .iter()
        .map(|member| metadata.find_by_name(member.source_name()))
        .collect();

    let constructor = select_constructor(metadata, descriptor, &members)?;

    let ignored: Vec<usize> = (0..metadata.len())
        .filter(|ordinal| !members.contains(&Some(*ordinal)))
        .collect();

    for &ordinal in &ignored {
        if let Some(column) = metadata.get(ordinal) {
            tracing::trace!(
                column = %column.name,
                destination = short_type_name(descriptor.type_name()),
                "column has no matching member; ignored"
            );
        }
    }

    Ok(ColumnBinding {
        members,
        constructor,
        ignored,
    })
}

fn select_constructor(
    metadata: &ColMetaData,
    descriptor: &TypeDescriptor,
    members: &[Option<usize>],
) -> Result<Option<usize>> {
    let constructors = descriptor.constructors();
    if constructors.is_empty() {
        return Ok(None);
    }

    let mut best: Option<(usize, usize)> = None;
    for (index, constructor) in constructors.iter().enumerate() {
        let satisfied = constructor.params().iter().all(|param| {
            descriptor
                .member_index(param)
                .is_some_and(|member| members.get(member).copied().flatten().is_some())
        });
        if !satisfied {
            continue;
        }
        let arity = constructor.params().len();
        if best.is_none_or(|(_, current)| arity > current) {
            best = Some((index, arity));
        }
    }

    match best {
        Some((index, _)) => Ok(Some(index)),
        None => {
            let columns: Vec<&str> = metadata.names().collect();
            Err(Error::Construction {
                type_name: descriptor.type_name(),
                reason: format!(
                    "no constructor can be satisfied by columns [{}]",
                    columns.join(", ")
                ),
            })
        }
    }
}

/// Key of one cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BindingKey {
    signature: String,
    type_id: TypeId,
}

/// Process-wide cache of resolved bindings.
///
/// Safe for concurrent use; lookups take a read lock and only first
/// resolutions take the write lock.
#[derive(Debug, Default)]
pub struct BindingCache {
    entries: RwLock<HashMap<BindingKey, Arc<ColumnBinding>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

static GLOBAL: Lazy<Arc<BindingCache>> = Lazy::new(|| Arc::new(BindingCache::new()));

impl BindingCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache used by default configurations.
    #[must_use]
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL)
    }

    /// Get the binding of `T` for a column layout, resolving it on first use.
    ///
    /// Failed resolutions are not cached.
    pub fn resolve<T: FromRow>(&self, metadata: &ColMetaData) -> Result<Arc<ColumnBinding>> {
        let key = BindingKey {
            signature: metadata.signature(),
            type_id: TypeId::of::<T>(),
        };

        if let Some(binding) = self.entries.read().get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(binding));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let descriptor = descriptor_of::<T>();
        let binding = Arc::new(resolve_binding(metadata, &descriptor)?);

        tracing::trace!(
            destination = short_type_name(descriptor.type_name()),
            columns = metadata.len(),
            bound = binding.bound_members(),
            "binding resolved"
        );

        let mut entries = self.entries.write();
        Ok(Arc::clone(entries.entry(key).or_insert(binding)))
    }

    /// Number of cached bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Lookups answered from the cache.
    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Lookups that had to resolve a binding.
    #[must_use]
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Drop every entry and reset the counters.
    pub fn clear(&self) {
        self.entries.write().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mapper::BoundRow;

    fn user_descriptor() -> TypeDescriptor {
        TypeDescriptor::builder("User")
            .member("id")
            .member_from("name", "UserName")
            .member("email")
            .build()
    }

    #[test]
    fn test_resolve_case_insensitive_with_override() {
        let metadata = ColMetaData::from_names(["ID", "username", "Extra"]);
        let binding = resolve_binding(&metadata, &user_descriptor()).unwrap();

        assert_eq!(binding.member_column(0), Some(0));
        assert_eq!(binding.member_column(1), Some(1));
        assert_eq!(binding.member_column(2), None);
        assert_eq!(binding.ignored(), &[2]);
        assert_eq!(binding.constructor(), None);
    }

    #[test]
    fn test_first_duplicate_column_wins() {
        let metadata = ColMetaData::from_names(["Id", "Name", "Id"]);
        let binding = resolve_binding(&metadata, &user_descriptor()).unwrap();
        assert_eq!(binding.member_column(0), Some(0));
        assert_eq!(binding.ignored(), &[1, 2]);
    }

    #[test]
    fn test_widest_satisfiable_constructor_selected() {
        let descriptor = TypeDescriptor::builder("Point")
            .member("x")
            .member("y")
            .member("z")
            .constructor("origin", Vec::<String>::new())
            .constructor("new", ["x", "y"])
            .constructor("with_z", ["x", "y", "z"])
            .build();

        let metadata = ColMetaData::from_names(["Y", "X"]);
        let binding = resolve_binding(&metadata, &descriptor).unwrap();
        assert_eq!(binding.constructor(), Some(1));
        assert_eq!(binding.member_column(0), Some(1));
        assert_eq!(binding.member_column(1), Some(0));
        assert_eq!(binding.member_column(2), None);
    }

    #[test]
    fn test_unsatisfiable_constructor() {
        let descriptor = TypeDescriptor::builder("Point")
            .member("x")
            .member("y")
            .constructor("new", ["x", "y"])
            .build();
        let metadata = ColMetaData::from_names(["X"]);
        let err = resolve_binding(&metadata, &descriptor).unwrap_err();
        assert!(matches!(err, Error::Construction { type_name: "Point", .. }));
    }

    #[test]
    fn test_dynamic_binding_takes_everything() {
        let metadata = ColMetaData::from_names(["a", "b"]);
        let binding = resolve_binding(&metadata, &TypeDescriptor::dynamic("Row")).unwrap();
        assert!(binding.ignored().is_empty());
    }

    struct Cached;

    impl FromRow for Cached {
        fn descriptor() -> TypeDescriptor {
            TypeDescriptor::builder("Cached").member("id").build()
        }

        fn from_row(_row: &BoundRow<'_>) -> Result<Self> {
            Ok(Cached)
        }
    }

    #[test]
    fn test_cache_hits_after_first_resolution() {
        let cache = BindingCache::new();
        let metadata = ColMetaData::from_names(["Id"]);
        let same_layout = ColMetaData::from_names(["ID"]);

        let first = cache.resolve::<Cached>(&metadata).unwrap();
        let second = cache.resolve::<Cached>(&same_layout).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.hits(), 1);

        cache.resolve::<Cached>(&ColMetaData::from_names(["Id", "Other"])).unwrap();
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.hits(), 0);
    }
}
