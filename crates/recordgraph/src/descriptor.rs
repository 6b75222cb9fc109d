//! Destination type descriptors.
//!
//! A [`TypeDescriptor`] is the plain-data description of how a destination
//! type receives column values: its members, their source-name overrides
//! and serializers, and the constructors it can be built through. The
//! `#[derive(FromRow)]` macro generates one per type; hand-written `FromRow`
//! impls build one with [`TypeDescriptor::builder`].
//!
//! Descriptors are built once per type and kept in a process-wide registry
//! (see [`descriptor_of`]).

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::from_row::FromRow;

/// One assignable member of a destination type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDescriptor {
    name: String,
    source: Option<String>,
    type_name: &'static str,
    serializer: Option<String>,
}

impl MemberDescriptor {
    /// Create a member descriptor with the given member name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: None,
            type_name: "",
            serializer: None,
        }
    }

    /// Bind this member to a differently named column.
    #[must_use]
    pub fn rename(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Record the member's Rust type, used to look up type-wide serializer
    /// rules.
    #[must_use]
    pub fn typed<T: ?Sized>(mut self) -> Self {
        self.type_name = std::any::type_name::<T>();
        self
    }

    /// Decode this member's column through the named serializer.
    #[must_use]
    pub fn serializer(mut self, name: impl Into<String>) -> Self {
        self.serializer = Some(name.into());
        self
    }

    /// Member name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column name this member binds to: the override if any, else the
    /// member name.
    #[must_use]
    pub fn source_name(&self) -> &str {
        self.source.as_deref().unwrap_or(&self.name)
    }

    /// Rust type name recorded with [`typed`](Self::typed), empty if unknown.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Serializer name, if the member declares one.
    #[must_use]
    pub fn serializer_name(&self) -> Option<&str> {
        self.serializer.as_deref()
    }
}

/// A constructor whose parameters are filled from columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructorDescriptor {
    name: String,
    params: Vec<String>,
}

impl ConstructorDescriptor {
    /// Create a constructor descriptor.
    ///
    /// `params` are the member names passed as parameters, in call order.
    pub fn new<I, S>(name: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// Constructor name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter member names in call order.
    #[must_use]
    pub fn params(&self) -> &[String] {
        &self.params
    }
}

/// Plain-data description of a destination type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    type_name: &'static str,
    members: Vec<MemberDescriptor>,
    constructors: Vec<ConstructorDescriptor>,
    dynamic: bool,
}

impl TypeDescriptor {
    /// Start building a descriptor for a fixed destination type.
    #[must_use]
    pub fn builder(type_name: &'static str) -> TypeDescriptorBuilder {
        TypeDescriptorBuilder {
            descriptor: Self {
                type_name,
                members: Vec::new(),
                constructors: Vec::new(),
                dynamic: false,
            },
        }
    }

    /// Descriptor for a dynamic destination that takes every column.
    #[must_use]
    pub fn dynamic(type_name: &'static str) -> Self {
        Self {
            type_name,
            members: Vec::new(),
            constructors: Vec::new(),
            dynamic: true,
        }
    }

    /// Destination type name.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Assignable members in declaration order.
    #[must_use]
    pub fn members(&self) -> &[MemberDescriptor] {
        &self.members
    }

    /// Get a member by index.
    #[must_use]
    pub fn member(&self, index: usize) -> Option<&MemberDescriptor> {
        self.members.get(index)
    }

    /// Find a member index by its member name.
    #[must_use]
    pub fn member_index(&self, name: &str) -> Option<usize> {
        self.members.iter().position(|m| m.name == name)
    }

    /// Candidate constructors. Empty means default construction.
    #[must_use]
    pub fn constructors(&self) -> &[ConstructorDescriptor] {
        &self.constructors
    }

    /// Whether the destination takes every column as a dynamic key.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// Qualified member name used in error messages (`User.name`).
    #[must_use]
    pub fn qualified(&self, member: usize) -> String {
        match self.members.get(member) {
            Some(m) => format!("{}.{}", short_type_name(self.type_name), m.name),
            None => format!("{}.#{member}", short_type_name(self.type_name)),
        }
    }
}

/// Builder for [`TypeDescriptor`].
#[derive(Debug, Clone)]
pub struct TypeDescriptorBuilder {
    descriptor: TypeDescriptor,
}

impl TypeDescriptorBuilder {
    /// Add a member bound to the column of the same name.
    #[must_use]
    pub fn member(mut self, name: impl Into<String>) -> Self {
        self.descriptor.members.push(MemberDescriptor::new(name));
        self
    }

    /// Add a member bound to a differently named column.
    #[must_use]
    pub fn member_from(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.descriptor
            .members
            .push(MemberDescriptor::new(name).rename(source));
        self
    }

    /// Add a fully configured member.
    #[must_use]
    pub fn with_member(mut self, member: MemberDescriptor) -> Self {
        self.descriptor.members.push(member);
        self
    }

    /// Record the Rust type of the last added member.
    #[must_use]
    pub fn typed<T: ?Sized>(mut self) -> Self {
        if let Some(member) = self.descriptor.members.pop() {
            self.descriptor.members.push(member.typed::<T>());
        }
        self
    }

    /// Decode the last added member through the named serializer.
    #[must_use]
    pub fn serializer(mut self, name: impl Into<String>) -> Self {
        if let Some(member) = self.descriptor.members.pop() {
            self.descriptor.members.push(member.serializer(name));
        }
        self
    }

    /// Add a candidate constructor taking the named members as parameters.
    #[must_use]
    pub fn constructor<I, S>(mut self, name: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.descriptor
            .constructors
            .push(ConstructorDescriptor::new(name, params));
        self
    }

    /// Finish the descriptor.
    #[must_use]
    pub fn build(self) -> TypeDescriptor {
        self.descriptor
    }
}

/// Strip the module path from a `std::any::type_name` string.
pub(crate) fn short_type_name(name: &str) -> &str {
    let base = name.split('<').next().unwrap_or(name);
    match base.rfind("::") {
        Some(pos) => &name[pos + 2..],
        None => name,
    }
}

static REGISTRY: Lazy<RwLock<HashMap<TypeId, Arc<TypeDescriptor>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Get the process-wide descriptor of `T`, building it on first use.
pub fn descriptor_of<T: FromRow>() -> Arc<TypeDescriptor> {
    let key = TypeId::of::<T>();
    if let Some(descriptor) = REGISTRY.read().get(&key) {
        return Arc::clone(descriptor);
    }

    let built = Arc::new(T::descriptor());
    let mut registry = REGISTRY.write();
    Arc::clone(registry.entry(key).or_insert(built))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_source_name() {
        let plain = MemberDescriptor::new("name");
        let renamed = MemberDescriptor::new("name").rename("UserName");
        assert_eq!(plain.source_name(), "name");
        assert_eq!(renamed.source_name(), "UserName");
        assert_eq!(renamed.name(), "name");
    }

    #[test]
    fn test_builder_collects_members_and_constructors() {
        let descriptor = TypeDescriptor::builder("demo::User")
            .member("id")
            .typed::<i32>()
            .member_from("tags", "TagList")
            .serializer("csv")
            .with_member(MemberDescriptor::new("email").typed::<Option<String>>())
            .constructor("new", ["id"])
            .build();

        assert_eq!(descriptor.members().len(), 3);
        assert_eq!(descriptor.member(0).map(MemberDescriptor::type_name), Some("i32"));
        assert_eq!(descriptor.member(1).and_then(|m| m.serializer_name()), Some("csv"));
        assert_eq!(descriptor.member(1).map(MemberDescriptor::source_name), Some("TagList"));
        assert_eq!(descriptor.member_index("email"), Some(2));
        assert_eq!(descriptor.constructors()[0].params(), ["id".to_string()]);
        assert_eq!(descriptor.qualified(1), "User.tags");
        assert!(!descriptor.is_dynamic());
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("a::b::User"), "User");
        assert_eq!(short_type_name("User"), "User");
        assert_eq!(short_type_name("a::Wrapper<b::Inner>"), "Wrapper<b::Inner>");
    }
}
