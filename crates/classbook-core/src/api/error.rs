use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// No response reached the client (connect failure, DNS, timeout).
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server reported that this session was invalidated elsewhere.
    #[error("Session expired: {0}")]
    SessionExpired(String),

    #[error("Access denied (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The server refused the request's content (400, 409, 422, ...).
    #[error("Request refused (HTTP {status}): {message}")]
    ClientError { status: u16, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error (HTTP {status}): {message}")]
    ServerFault { status: u16, message: String },

    /// A precondition failed before any request was issued.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// 2xx response whose envelope reports a failure code.
    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Session storage error: {0}")]
    Storage(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    /// Map a non-success status to a local error. Session expiry is decided
    /// by the response interceptor before this is reached.
    pub fn from_status(status: reqwest::StatusCode, message: &str) -> Self {
        let truncated = Self::truncate_body(message);
        match status.as_u16() {
            code @ (401 | 403) => ApiError::Rejected {
                status: code,
                message: truncated,
            },
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            code @ 400..=499 => ApiError::ClientError {
                status: code,
                message: truncated,
            },
            code @ 500..=599 => ApiError::ServerFault {
                status: code,
                message: truncated,
            },
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// Terminal: the caller should not retry, the user must log in again.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::SessionExpired(_))
    }

    /// Ordinary 401/403 without the expiry sentinel.
    pub fn is_auth_rejected(&self) -> bool {
        matches!(self, ApiError::Rejected { .. })
    }

    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Transport(e) => e.is_timeout() || e.is_connect(),
            ApiError::RateLimited => true,
            _ => false,
        }
    }
}
