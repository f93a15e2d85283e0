use crate::RawItem;
use async_trait::async_trait;
use sentinel_common::SentinelError;
use std::collections::HashMap;

/// A pluggable producer of [`RawItem`]s from one kind of upstream source,
/// per §4.1. Implementations own all source-specific I/O and must never let
/// a single malformed entry abort the whole fetch — only a network-level
/// failure should propagate.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable adapter name, used for logging and raw-store bookkeeping.
    fn name(&self) -> &str;

    /// Fetch and map upstream entries to [`RawItem`]s. A malformed upstream
    /// response that yields zero parseable entries is an empty list, not an
    /// error; a transport-level failure is an error so the scheduler may
    /// retry the whole fetch unit.
    async fn fetch(&self) -> Result<Vec<RawItem>, SentinelError>;
}

/// Process-wide name-to-adapter registry, per §4.1's "duck-typed adapter
/// plugin" redesign note: a small polymorphic registry standing in for a
/// dynamic name-to-constructor lookup.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Box<dyn SourceAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, adapter: Box<dyn SourceAdapter>) {
        self.adapters.insert(adapter.name().to_string(), adapter);
    }

    /// Look up an adapter by name. Returns [`SentinelError::UnknownAdapter`]
    /// for an unrecognised name — a programmer error, not retried.
    pub fn get(&self, name: &str) -> Result<&dyn SourceAdapter, SentinelError> {
        self.adapters
            .get(name)
            .map(|a| a.as_ref())
            .ok_or_else(|| SentinelError::UnknownAdapter(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.adapters.keys().map(|s| s.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubAdapter;

    #[async_trait]
    impl SourceAdapter for StubAdapter {
        fn name(&self) -> &str {
            "stub"
        }
        async fn fetch(&self) -> Result<Vec<RawItem>, SentinelError> {
            Ok(vec![])
        }
    }

    #[test]
    fn unknown_adapter_name_is_an_error() {
        let registry = AdapterRegistry::new();
        let err = registry.get("nope").unwrap_err();
        assert!(matches!(err, SentinelError::UnknownAdapter(_)));
    }

    #[test]
    fn registered_adapter_is_found_by_name() {
        let mut registry = AdapterRegistry::new();
        registry.register(Box::new(StubAdapter));
        assert!(registry.get("stub").is_ok());
    }
}
