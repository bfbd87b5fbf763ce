//! Hooks every request passes through on its way out and back in.

use std::sync::Arc;

use reqwest::{header, StatusCode};
use tracing::debug;

use super::request::{bearer_value, ApiRequest, RequestTag};
use super::ApiError;
use crate::auth::{ExpiryBroadcaster, SessionManager};

/// Endpoints reachable without a session. They are never pre-flight verified.
pub const EXEMPT_PATHS: [&str; 5] = [
    "/auth/login",
    "/auth/register",
    "/auth/forgot-password",
    "/auth/verify-otp",
    "/auth/reset-password",
];

pub fn is_exempt(path: &str) -> bool {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let path = path.trim_end_matches('/');
    EXEMPT_PATHS.contains(&path)
}

/// Attaches credentials and decides whether the token needs a pre-flight check.
#[derive(Clone)]
pub struct RequestInterceptor {
    session: Arc<SessionManager>,
}

impl RequestInterceptor {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }

    /// Set the JSON content type and, when a session exists and the caller
    /// did not set one, the bearer credential. Returns the token to verify,
    /// if this request should be verified at all.
    pub fn prepare(&self, request: &mut ApiRequest) -> Result<Option<String>, ApiError> {
        request.headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let credentials = self.session.credentials();
        if let Some((ref token, epoch)) = credentials {
            if !request.has_authorization() {
                request
                    .headers
                    .insert(header::AUTHORIZATION, bearer_value(token)?);
            }
            request.session_epoch = Some(epoch);
        }

        if request.tag == RequestTag::Verification || is_exempt(&request.path) {
            return Ok(None);
        }
        Ok(credentials.map(|(token, _)| token))
    }
}

/// Sorts failed responses into the error taxonomy and routes the session
/// expiry sentinel to the broadcaster.
#[derive(Clone)]
pub struct ResponseInterceptor {
    sentinel: String,
    broadcaster: Arc<ExpiryBroadcaster>,
}

impl ResponseInterceptor {
    pub fn new(sentinel: impl Into<String>, broadcaster: Arc<ExpiryBroadcaster>) -> Self {
        Self {
            sentinel: sentinel.into(),
            broadcaster,
        }
    }

    /// Pass successes through untouched; turn everything else into an error.
    /// `session_epoch` is the session the request was sent under, if any.
    pub async fn inspect(
        &self,
        response: reqwest::Response,
        session_epoch: Option<u64>,
    ) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(self.classify(status, &body, session_epoch))
    }

    pub fn classify(&self, status: StatusCode, body: &str, session_epoch: Option<u64>) -> ApiError {
        let message = extract_message(body);
        if is_expiry_signal(status, &message, &self.sentinel) {
            match session_epoch {
                Some(epoch) => {
                    self.broadcaster.trigger(&message, epoch);
                }
                None => debug!("Expiry signal on a request sent without a session"),
            }
            return ApiError::SessionExpired(message);
        }
        debug!(status = status.as_u16(), "Request failed");
        ApiError::from_status(status, &message)
    }
}

/// Only 401 and 500 carrying the sentinel count as expiry.
pub fn is_expiry_signal(status: StatusCode, message: &str, sentinel: &str) -> bool {
    matches!(status.as_u16(), 401 | 500) && !sentinel.is_empty() && message.contains(sentinel)
}

/// The envelope's `msg` (or `message`) field, or the raw body when it is not JSON.
pub(crate) fn extract_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["msg", "message"]
                .iter()
                .find_map(|field| value.get(*field)?.as_str().map(str::to_string))
        })
        .unwrap_or_else(|| body.to_string())
}
