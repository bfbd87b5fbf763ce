//! Outgoing request envelope.

use reqwest::{header, Method};
use serde::Serialize;
use serde_json::Value;

use super::ApiError;

/// Marks requests the pipeline issues on its own behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestTag {
    #[default]
    Standard,
    /// The verifier's identity check. Never verified itself.
    Verification,
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the configured base URL, e.g. `/classes`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: header::HeaderMap,
    /// Omitted from the wire when `None`.
    pub body: Option<Value>,
    pub tag: RequestTag,
    /// Session epoch the credentials were attached under, set by the
    /// request interceptor.
    pub(crate) session_epoch: Option<u64>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: header::HeaderMap::new(),
            body: None,
            tag: RequestTag::Standard,
            session_epoch: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    /// Attach a JSON body. A value that serializes to `null` leaves the body empty.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::Validation(format!("Failed to serialize request body: {}", e)))?;
        self.body = match value {
            Value::Null => None,
            other => Some(other),
        };
        Ok(self)
    }

    /// Set an explicit bearer credential. The request interceptor leaves it alone.
    pub fn bearer(mut self, token: &str) -> Result<Self, ApiError> {
        self.headers
            .insert(header::AUTHORIZATION, bearer_value(token)?);
        Ok(self)
    }

    pub fn tagged(mut self, tag: RequestTag) -> Self {
        self.tag = tag;
        self
    }

    pub fn has_authorization(&self) -> bool {
        self.headers.contains_key(header::AUTHORIZATION)
    }
}

pub(crate) fn bearer_value(token: &str) -> Result<header::HeaderValue, ApiError> {
    let mut value = header::HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|_| ApiError::Validation("Token contains invalid header characters".to_string()))?;
    value.set_sensitive(true);
    Ok(value)
}
