use std::future::Future;
use std::sync::Arc;

use tracing::{debug, warn};

use super::key::{CacheKey, Resource, ScopeParams};
use super::store::{CacheEntry, CacheStore};
use crate::api::Page;

/// Read-through loader shared by every resource view.
#[derive(Clone)]
pub struct FetchOrchestrator {
    store: Arc<CacheStore>,
}

impl FetchOrchestrator {
    pub fn new(store: Arc<CacheStore>) -> Self {
        Self { store }
    }

    /// Return the cached page for `(resource, scope)`, or run `fetcher` and
    /// cache its result. Failures are returned as-is and never cached.
    pub async fn load<T, E, F, Fut>(
        &self,
        resource: Resource,
        scope: ScopeParams,
        fetcher: F,
    ) -> Result<Page<T>, E>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Page<T>, E>>,
    {
        let key = CacheKey::new(resource, scope);

        if let Some(entry) = self.store.get(&key) {
            match entry.page::<T>() {
                Some(page) => {
                    debug!(resource = %resource, scope = ?key.scope, "Cache hit");
                    return Ok(page);
                }
                None => {
                    warn!(resource = %resource, "Cached entry holds a different record type, refetching");
                }
            }
        }

        debug!(resource = %resource, scope = ?key.scope, "Cache miss");
        let seen = self.store.generation(resource);
        let page = fetcher().await?;
        self.store.put_if_current(CacheEntry::new(key, &page), seen);
        Ok(page)
    }
}
