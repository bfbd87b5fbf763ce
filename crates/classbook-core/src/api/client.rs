//! API client for the classbook REST API.
//!
//! Every request goes through the same pipeline: the request interceptor
//! attaches the bearer token and soft-awaits the token verifier, the
//! transport sends it, and the response interceptor sorts failures and
//! routes the session-expiry sentinel to the broadcaster.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::warn;
use url::Url;

use super::envelope::{Envelope, ListPayload, Page};
use super::interceptor::{RequestInterceptor, ResponseInterceptor};
use super::request::ApiRequest;
use super::ApiError;
use crate::auth::{ExpiryBroadcaster, SessionManager};
use crate::config::Config;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// API client for classbook.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    requests: RequestInterceptor,
    responses: ResponseInterceptor,
}

impl ApiClient {
    pub fn new(
        config: &Config,
        session: Arc<SessionManager>,
        broadcaster: Arc<ExpiryBroadcaster>,
    ) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            base_url: parse_base_url(&config.base_url)?,
            requests: RequestInterceptor::new(session),
            responses: ResponseInterceptor::new(config.expiry_sentinel.clone(), broadcaster),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::Validation(format!("Invalid request path {}: {}", path, e)))
    }

    /// Run a request through the full pipeline and return the raw response
    /// once it is known to be successful.
    pub async fn send(&self, mut request: ApiRequest) -> Result<reqwest::Response, ApiError> {
        if let Some(token) = self.requests.prepare(&mut request)? {
            // Advisory only: the request's own response is authoritative.
            self.verify(&token).await;
        }
        self.dispatch(request).await
    }

    /// Prepare a request that must never be verified itself.
    pub(crate) fn prepare_unverified(&self, request: &mut ApiRequest) -> Result<(), ApiError> {
        if self.requests.prepare(request)?.is_some() {
            return Err(ApiError::Validation(format!(
                "Request to {} would be verified recursively",
                request.path
            )));
        }
        Ok(())
    }

    /// Transport plus response inspection for an already prepared request.
    pub(crate) async fn dispatch(&self, request: ApiRequest) -> Result<reqwest::Response, ApiError> {
        let url = self.endpoint(&request.path)?;
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let mut builder = self
                .client
                .request(request.method.clone(), url.clone())
                .headers(request.headers.clone());
            if !request.query.is_empty() {
                builder = builder.query(&request.query);
            }
            if let Some(ref body) = request.body {
                builder = builder.json(body);
            }

            let response = builder.send().await?;
            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                retries += 1;
                if retries > MAX_RATE_LIMIT_RETRIES {
                    return Err(ApiError::RateLimited);
                }
                warn!(path = %request.path, retry = retries, backoff_ms, "Rate limited, backing off");
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms *= 2;
                continue;
            }

            return self.responses.inspect(response, request.session_epoch).await;
        }
    }

    /// Send and parse the `{code, msg, data}` envelope. The envelope's own
    /// code is checked by `Envelope::into_data`.
    pub async fn envelope<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<Envelope<T>, ApiError> {
        let path = request.path.clone();
        let response = self.send(request).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!(
                "Failed to parse response from {}: {} ({})",
                path,
                e,
                ApiError::truncate_body(&text)
            ))
        })
    }

    /// Send and return the envelope's `data`, which must be present.
    pub async fn data<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let path = request.path.clone();
        self.envelope::<T>(request)
            .await?
            .into_data()?
            .ok_or_else(|| ApiError::InvalidResponse(format!("Response from {} has no data", path)))
    }

    /// Send and return the envelope's message, ignoring any data.
    pub async fn message(&self, request: ApiRequest) -> Result<String, ApiError> {
        let envelope = self.envelope::<serde_json::Value>(request).await?;
        let message = envelope.message().to_string();
        envelope.into_data()?;
        Ok(message)
    }

    /// Fetch one page of a list endpoint. A `null` data field is an empty page.
    pub async fn list<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<Page<T>, ApiError> {
        let payload = self
            .envelope::<ListPayload<T>>(request)
            .await?
            .into_data()?;
        Ok(payload.map(ListPayload::into_page).unwrap_or_else(Page::empty))
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ApiError> {
    let mut url = Url::parse(raw)
        .map_err(|e| ApiError::Validation(format!("Invalid base URL {}: {}", raw, e)))?;
    // Url::join replaces the last segment unless the base ends in a slash.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_base_url_keeps_prefix() {
        let base = parse_base_url("https://sgk.example.vn/api").unwrap();
        assert_eq!(
            base.join("classes").unwrap().as_str(),
            "https://sgk.example.vn/api/classes"
        );

        let base = parse_base_url("https://sgk.example.vn/api/").unwrap();
        assert_eq!(
            base.join("auth/login").unwrap().as_str(),
            "https://sgk.example.vn/api/auth/login"
        );
    }

    #[test]
    fn test_parse_base_url_rejects_garbage() {
        assert!(matches!(
            parse_base_url("not a url"),
            Err(ApiError::Validation(_))
        ));
    }
}
