//! In-memory read-through cache for fetched collections.
//!
//! This module provides:
//! - `CacheStore`: one process-wide table keyed by resource and view scope
//! - `FetchOrchestrator`: consults the store before calling the network
//! - `CacheInvalidator`: clears a resource's whole domain after a mutation
//!
//! Entries have no time-based expiry. They live until their domain is
//! invalidated or the session ends.

pub mod invalidator;
pub mod key;
pub mod orchestrator;
pub mod store;

pub use invalidator::CacheInvalidator;
pub use key::{CacheKey, Resource, ScopeParams};
pub use orchestrator::FetchOrchestrator;
pub use store::{CacheEntry, CacheStore, Generation};
