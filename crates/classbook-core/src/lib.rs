//! Client-side data access for the classbook record-management API.
//!
//! - `api`: request pipeline with token verification and session-expiry detection
//! - `auth`: session records and the single-fire expiry broadcaster
//! - `cache`: read-through cache of fetched collections, cleared per resource
//! - `service`: the `Classbook` facade tying them together

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod models;
pub mod service;

pub use api::{ApiClient, ApiError, Page, Pagination};
pub use auth::{ExpiryNotice, SessionManager, User};
pub use cache::{Resource, ScopeParams};
pub use config::Config;
pub use service::{Classbook, Registration};
