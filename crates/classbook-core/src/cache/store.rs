use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use super::key::{CacheKey, Resource};
use crate::api::{Page, Pagination};

type Records = Arc<dyn Any + Send + Sync>;

/// A fully built cache entry. Entries are replaced, never patched.
#[derive(Clone)]
pub struct CacheEntry {
    pub key: CacheKey,
    records: Records,
    pub pagination: Option<Pagination>,
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new<T: Send + Sync + 'static>(key: CacheKey, page: &Page<T>) -> Self {
        let records: Records = page.records.clone();
        Self {
            key,
            records,
            pagination: page.pagination,
            created_at: Utc::now(),
        }
    }

    /// The stored page, or `None` if it holds a different record type.
    pub fn page<T: Send + Sync + 'static>(&self) -> Option<Page<T>> {
        let records = Arc::clone(&self.records).downcast::<Vec<T>>().ok()?;
        Some(Page {
            records,
            pagination: self.pagination,
        })
    }
}

impl std::fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEntry")
            .field("key", &self.key)
            .field("pagination", &self.pagination)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Snapshot of a domain's invalidation count, taken before a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation {
    epoch: u64,
    domain: u64,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<CacheKey, CacheEntry>,
    domains: HashMap<Resource, u64>,
    epoch: u64,
}

impl Inner {
    fn generation(&self, resource: Resource) -> Generation {
        Generation {
            epoch: self.epoch,
            domain: self.domains.get(&resource).copied().unwrap_or(0),
        }
    }
}

/// Process-wide table of fetched collections. Share it behind an `Arc`.
#[derive(Default)]
pub struct CacheStore {
    inner: RwLock<Inner>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.inner.read().entries.get(key).cloned()
    }

    pub fn put(&self, entry: CacheEntry) {
        debug!(resource = %entry.key.resource, scope = ?entry.key.scope, "Cache put");
        self.inner.write().entries.insert(entry.key.clone(), entry);
    }

    pub fn generation(&self, resource: Resource) -> Generation {
        self.inner.read().generation(resource)
    }

    /// Store `entry` only if its domain has not been cleared since `seen`.
    /// Returns whether the entry was stored.
    pub fn put_if_current(&self, entry: CacheEntry, seen: Generation) -> bool {
        let mut inner = self.inner.write();
        if inner.generation(entry.key.resource) != seen {
            debug!(resource = %entry.key.resource, "Skipping stale cache put after invalidation");
            return false;
        }
        debug!(resource = %entry.key.resource, scope = ?entry.key.scope, "Cache put");
        inner.entries.insert(entry.key.clone(), entry);
        true
    }

    /// Drop every entry for `resource`, whatever its scope.
    pub fn clear_domain(&self, resource: Resource) -> usize {
        let mut inner = self.inner.write();
        let before = inner.entries.len();
        inner.entries.retain(|key, _| key.resource != resource);
        *inner.domains.entry(resource).or_insert(0) += 1;
        let removed = before - inner.entries.len();
        debug!(resource = %resource, removed, "Cleared cache domain");
        removed
    }

    pub fn clear_all(&self) {
        let mut inner = self.inner.write();
        inner.entries.clear();
        inner.epoch += 1;
        debug!("Cleared all cache entries");
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.inner.read().entries.contains_key(key)
    }
}
