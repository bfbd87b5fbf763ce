use std::sync::Arc;

use tracing::debug;

use super::key::Resource;
use super::store::CacheStore;

/// Clears a whole resource domain after a successful mutation. Pagination
/// and filters shift unpredictably on writes, so no finer targeting is tried.
#[derive(Clone)]
pub struct CacheInvalidator {
    store: Arc<CacheStore>,
}

impl CacheInvalidator {
    pub fn new(store: Arc<CacheStore>) -> Self {
        Self { store }
    }

    /// Synchronous: the domain is empty before this returns, so a re-fetch
    /// issued afterwards cannot be answered from the old snapshot.
    pub fn on_mutation_success(&self, resource: Resource) {
        let removed = self.store.clear_domain(resource);
        debug!(resource = %resource, removed, "Invalidated after mutation");
    }
}
