//! Materialization pipeline configuration.

use std::sync::Arc;

use recordgraph_types::KeyPolicy;

use crate::binding::BindingCache;
use crate::serializer::SerializationRules;

/// Configuration shared by every mapping step of a pipeline.
///
/// # Example
///
/// ```rust
/// use recordgraph::{KeyPolicy, MapperConfig, SerializationRules};
///
/// let config = MapperConfig::new()
///     .key_policy(KeyPolicy::Strict)
///     .rules(SerializationRules::with_builtins());
/// assert_eq!(config.get_key_policy(), KeyPolicy::Strict);
/// ```
#[derive(Debug, Clone)]
pub struct MapperConfig {
    key_policy: KeyPolicy,
    rules: Arc<SerializationRules>,
    cache: Arc<BindingCache>,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            key_policy: KeyPolicy::default(),
            rules: SerializationRules::shared_default(),
            cache: BindingCache::global(),
        }
    }
}

impl MapperConfig {
    /// Create a configuration with the shared defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how parent and child keys are compared.
    #[must_use]
    pub fn key_policy(mut self, policy: KeyPolicy) -> Self {
        self.key_policy = policy;
        self
    }

    /// Set the serializer rules for this pipeline.
    #[must_use]
    pub fn rules(mut self, rules: SerializationRules) -> Self {
        self.rules = Arc::new(rules);
        self
    }

    /// Use an existing shared rule set.
    #[must_use]
    pub fn shared_rules(mut self, rules: Arc<SerializationRules>) -> Self {
        self.rules = rules;
        self
    }

    /// Use a private binding cache instead of the process-wide one.
    #[must_use]
    pub fn cache(mut self, cache: Arc<BindingCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Key comparison policy.
    #[must_use]
    pub fn get_key_policy(&self) -> KeyPolicy {
        self.key_policy
    }

    /// Serializer rules.
    #[must_use]
    pub fn get_rules(&self) -> &SerializationRules {
        &self.rules
    }

    /// Binding cache.
    #[must_use]
    pub fn get_cache(&self) -> &Arc<BindingCache> {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_share_process_wide_state() {
        let a = MapperConfig::default();
        let b = MapperConfig::new();
        assert!(Arc::ptr_eq(a.get_cache(), b.get_cache()));
        assert_eq!(a.get_key_policy(), KeyPolicy::Textual);
        assert!(a.get_rules().get("utf8").is_some());
    }

    #[test]
    fn test_private_cache() {
        let cache = Arc::new(BindingCache::new());
        let config = MapperConfig::new().cache(Arc::clone(&cache));
        assert!(Arc::ptr_eq(config.get_cache(), &cache));
        assert!(!Arc::ptr_eq(config.get_cache(), &BindingCache::global()));
    }
}
