//! Map-backed check registry.
//!
//! The registry is populated once at startup, then shared read-only
//! between every chain evaluation.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use super::{CheckId, CheckResolver, CheckUnit};

/// Registry of check units keyed by [`CheckId`].
#[derive(Clone, Default)]
pub struct CheckRegistry {
    checks: HashMap<CheckId, Arc<dyn CheckUnit>>,
}

impl std::fmt::Debug for CheckRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}

impl CheckRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `unit` under `id`, returning the unit it replaced.
    pub fn register(
        &mut self,
        id: impl Into<CheckId>,
        unit: Arc<dyn CheckUnit>,
    ) -> Option<Arc<dyn CheckUnit>> {
        let id = id.into();
        let previous = self.checks.insert(id.clone(), unit);
        if previous.is_some() {
            warn!(check = %id, "check re-registered, previous unit replaced");
        } else {
            debug!(check = %id, "check registered");
        }
        previous
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, id: impl Into<CheckId>, unit: Arc<dyn CheckUnit>) -> Self {
        self.register(id, unit);
        self
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: &CheckId) -> bool {
        self.checks.contains_key(id)
    }

    /// Registered identifiers, sorted.
    pub fn ids(&self) -> Vec<&CheckId> {
        let mut ids: Vec<&CheckId> = self.checks.keys().collect();
        ids.sort();
        ids
    }

    /// Number of registered checks.
    pub fn len(&self) -> usize {
        self.checks.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

impl CheckResolver for CheckRegistry {
    fn resolve(&self, id: &CheckId) -> Option<Arc<dyn CheckUnit>> {
        self.checks.get(id).map(Arc::clone)
    }
}
