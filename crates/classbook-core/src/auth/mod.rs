//! Authentication module for managing the user session.
//!
//! This module provides:
//! - `SessionManager`: the active session and its two durable records
//! - `SessionStorage`: file, OS keychain, or in-memory record backends
//! - `ExpiryBroadcaster`: single-fire reaction to server-side invalidation

pub mod expiry;
pub mod session;
pub mod storage;

pub use expiry::{ExpiryBroadcaster, ExpiryNotice, ExpiryState};
pub use session::{Session, SessionManager, User};
pub use storage::{
    FileStorage, KeyringStorage, MemoryStorage, SessionStorage, StorageBackend,
};
