//! The `Classbook` facade: one place that wires the session, the expiry
//! broadcaster, the API client and the cache together.
//!
//! Reads go through the fetch orchestrator. Mutations go straight to the
//! API and clear their resource's cache domain before returning.

use std::sync::Arc;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::export::TEACHING_REPORT_PATH;
use crate::api::{ApiClient, ApiError, ApiRequest, ExportFile, ExportParams, Page};
use crate::auth::{ExpiryBroadcaster, ExpiryNotice, Session, SessionManager, SessionStorage, User};
use crate::cache::{CacheInvalidator, CacheStore, FetchOrchestrator, Resource, ScopeParams};
use crate::config::Config;
use crate::models::{SchoolClass, Subject, Teacher, TeachingRecord, Week};

const LOGIN_PATH: &str = "/auth/login";
const LOGOUT_PATH: &str = "/auth/logout";
const REGISTER_PATH: &str = "/auth/register";
const FORGOT_PASSWORD_PATH: &str = "/auth/forgot-password";
const VERIFY_OTP_PATH: &str = "/auth/verify-otp";
const RESET_PASSWORD_PATH: &str = "/auth/reset-password";
const CHANGE_PASSWORD_PATH: &str = "/auth/change-password";
const ME_PATH: &str = "/auth/me";

#[derive(Debug, Deserialize)]
struct LoginData {
    token: String,
    user: User,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub full_name: String,
    pub email: String,
    pub password: String,
}

pub struct Classbook {
    api: ApiClient,
    session: Arc<SessionManager>,
    expiry: Arc<ExpiryBroadcaster>,
    cache: Arc<CacheStore>,
    orchestrator: FetchOrchestrator,
    invalidator: CacheInvalidator,
}

impl Classbook {
    /// Build from configuration, opening the configured session backend and
    /// restoring any stored session.
    pub fn open(config: &Config) -> anyhow::Result<Self> {
        let storage = config.session_backend.open(config.session_dir()?);
        let classbook = Self::with_storage(config, storage)?;
        if let Err(e) = classbook.session.restore() {
            warn!(error = %e, "Failed to restore stored session");
        }
        Ok(classbook)
    }

    pub fn with_storage(config: &Config, storage: Box<dyn SessionStorage>) -> Result<Self, ApiError> {
        let cache = Arc::new(CacheStore::new());
        let session = Arc::new(SessionManager::new(storage, Arc::clone(&cache)));
        let expiry = Arc::new(ExpiryBroadcaster::new(
            Arc::clone(&session),
            config.expiry_countdown(),
        ));
        let api = ApiClient::new(config, Arc::clone(&session), Arc::clone(&expiry))?;

        Ok(Self {
            api,
            session,
            expiry,
            orchestrator: FetchOrchestrator::new(Arc::clone(&cache)),
            invalidator: CacheInvalidator::new(Arc::clone(&cache)),
            cache,
        })
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn expiry(&self) -> &ExpiryBroadcaster {
        &self.expiry
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Register the UI reaction to a server-side session invalidation.
    pub fn on_session_expired<F>(&self, callback: F)
    where
        F: Fn(ExpiryNotice) + Send + Sync + 'static,
    {
        self.expiry.on_expired(callback);
    }

    // ===== Session =====

    pub async fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let request = ApiRequest::post(LOGIN_PATH).json(&serde_json::json!({
            "email": email,
            "password": password,
        }))?;
        let data: LoginData = self.api.data(request).await?;

        // Nothing cached under a previous identity may survive a new login.
        self.cache.clear_all();
        self.session
            .establish(Session::new(data.token, data.user.clone()))
            .context("Failed to store session")
            .map_err(|e| ApiError::Storage(format!("{:#}", e)))?;
        self.expiry.rearm();

        info!(user = %data.user.email, "Logged in");
        Ok(data.user)
    }

    /// Tell the server (best effort), then drop the session locally.
    pub async fn logout(&self) -> Result<(), ApiError> {
        if self.session.is_authenticated() {
            if let Err(e) = self.api.message(ApiRequest::post(LOGOUT_PATH)).await {
                warn!(error = %e, "Server logout failed, clearing local session anyway");
            }
        }
        self.end_session()
    }

    fn end_session(&self) -> Result<(), ApiError> {
        self.session
            .destroy()
            .map_err(|e| ApiError::Storage(format!("{:#}", e)))
    }

    /// Ask the server who the current token belongs to.
    pub async fn current_user(&self) -> Result<User, ApiError> {
        self.api.data(ApiRequest::get(ME_PATH)).await
    }

    /// Changing credentials ends the session on success.
    pub async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> Result<String, ApiError> {
        let request = ApiRequest::put(CHANGE_PASSWORD_PATH).json(&serde_json::json!({
            "currentPassword": current_password,
            "newPassword": new_password,
        }))?;
        let message = self.api.message(request).await?;
        self.end_session()?;
        Ok(message)
    }

    // ===== Account flows (no session required) =====

    pub async fn register(&self, registration: &Registration) -> Result<String, ApiError> {
        self.api
            .message(ApiRequest::post(REGISTER_PATH).json(registration)?)
            .await
    }

    pub async fn forgot_password(&self, email: &str) -> Result<String, ApiError> {
        let request = ApiRequest::post(FORGOT_PASSWORD_PATH)
            .json(&serde_json::json!({ "email": email }))?;
        self.api.message(request).await
    }

    pub async fn verify_otp(&self, email: &str, otp: &str) -> Result<String, ApiError> {
        let request = ApiRequest::post(VERIFY_OTP_PATH)
            .json(&serde_json::json!({ "email": email, "otp": otp }))?;
        self.api.message(request).await
    }

    pub async fn reset_password(
        &self,
        email: &str,
        otp: &str,
        new_password: &str,
    ) -> Result<String, ApiError> {
        let request = ApiRequest::post(RESET_PASSWORD_PATH).json(&serde_json::json!({
            "email": email,
            "otp": otp,
            "newPassword": new_password,
        }))?;
        self.api.message(request).await
    }

    // ===== Cached reads =====

    /// One page of `resource` under `scope`, served from cache when possible.
    pub async fn list<T>(&self, resource: Resource, scope: ScopeParams) -> Result<Page<T>, ApiError>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        let api = &self.api;
        let request = ApiRequest::get(resource.path()).with_query(scope.to_query());
        self.orchestrator
            .load(resource, scope, move || api.list::<T>(request))
            .await
    }

    pub async fn classes(&self, scope: ScopeParams) -> Result<Page<SchoolClass>, ApiError> {
        self.list(Resource::Classes, scope).await
    }

    pub async fn teachers(&self, scope: ScopeParams) -> Result<Page<Teacher>, ApiError> {
        self.list(Resource::Teachers, scope).await
    }

    pub async fn subjects(&self, scope: ScopeParams) -> Result<Page<Subject>, ApiError> {
        self.list(Resource::Subjects, scope).await
    }

    pub async fn weeks(&self, scope: ScopeParams) -> Result<Page<Week>, ApiError> {
        self.list(Resource::Weeks, scope).await
    }

    pub async fn teaching_records(
        &self,
        scope: ScopeParams,
    ) -> Result<Page<TeachingRecord>, ApiError> {
        self.list(Resource::TeachingRecords, scope).await
    }

    // ===== Mutations =====

    /// Create a record. Returns the server's copy when it sends one back.
    pub async fn create<B, T>(&self, resource: Resource, body: &B) -> Result<Option<T>, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = ApiRequest::post(resource.path()).json(body)?;
        let created = self.api.envelope::<T>(request).await?.into_data()?;
        self.invalidator.on_mutation_success(resource);
        Ok(created)
    }

    pub async fn update<B, T>(
        &self,
        resource: Resource,
        id: &str,
        body: &B,
    ) -> Result<Option<T>, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = ApiRequest::put(resource.item_path(id)).json(body)?;
        let updated = self.api.envelope::<T>(request).await?.into_data()?;
        self.invalidator.on_mutation_success(resource);
        Ok(updated)
    }

    pub async fn delete(&self, resource: Resource, id: &str) -> Result<(), ApiError> {
        self.api.message(ApiRequest::delete(resource.item_path(id))).await?;
        self.invalidator.on_mutation_success(resource);
        Ok(())
    }

    // ===== Reports =====

    pub async fn export_teaching_report(&self, params: &ExportParams) -> Result<ExportFile, ApiError> {
        params.validate()?;
        let request = ApiRequest::get(TEACHING_REPORT_PATH).with_query(params.to_query());
        self.api.download(request).await
    }
}
