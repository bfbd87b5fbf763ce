//! REST API client module for the classbook server.
//!
//! This module provides the `ApiClient` and the request pipeline around it:
//! request and response interceptors, the token verifier, the response
//! envelope, and binary report downloads.
//!
//! The API uses bearer token authentication obtained from `/auth/login`.

pub mod client;
pub mod envelope;
pub mod error;
pub mod export;
pub mod interceptor;
pub mod request;
pub mod verifier;

pub use client::ApiClient;
pub use envelope::{Envelope, Page, Pagination};
pub use error::ApiError;
pub use export::{ExportFile, ExportParams};
pub use interceptor::{is_exempt, RequestInterceptor, ResponseInterceptor, EXEMPT_PATHS};
pub use request::{ApiRequest, RequestTag};
pub use verifier::{Verification, IDENTITY_PATH};
