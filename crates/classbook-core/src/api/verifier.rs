//! Pre-flight check that a token is still accepted by the server.

use tracing::{debug, warn};

use super::request::{ApiRequest, RequestTag};
use super::ApiClient;

/// Identity-confirmation endpoint used for the check.
pub const IDENTITY_PATH: &str = "/auth/me";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Valid,
    SessionInvalid,
    /// The check itself failed (network, server fault). Says nothing about the token.
    Inconclusive,
}

impl ApiClient {
    /// Confirm `token` with the server. Never fails: problems are logged and
    /// reported as `Inconclusive` so a flaky check cannot block a request.
    pub async fn verify(&self, token: &str) -> Verification {
        let mut request = match ApiRequest::get(IDENTITY_PATH)
            .tagged(RequestTag::Verification)
            .bearer(token)
        {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Could not build token verification request");
                return Verification::Inconclusive;
            }
        };
        if let Err(e) = self.prepare_unverified(&mut request) {
            warn!(error = %e, "Could not prepare token verification request");
            return Verification::Inconclusive;
        }

        match self.dispatch(request).await {
            Ok(_) => {
                debug!("Token verified");
                Verification::Valid
            }
            Err(e) if e.is_session_expired() || e.is_auth_rejected() => {
                warn!(error = %e, "Token rejected during pre-flight check");
                Verification::SessionInvalid
            }
            Err(e) => {
                warn!(error = %e, "Token pre-flight check failed");
                Verification::Inconclusive
            }
        }
    }
}
