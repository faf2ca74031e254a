//! HTTP client for the upstream console API.
//!
//! ARCHITECTURE
//! ============
//! Every authenticated call flows through the same response-handling stage:
//! attach the bearer token, send, and on a 401 run the forced-logout effect
//! against the shared session before handing the call site an error. That
//! keeps the "any unauthorized response ends the session" rule in exactly
//! one place instead of scattered per-call checks.
//!
//! The state layer consumes this client through the [`AuthApi`],
//! [`RecordApi`], and [`AnalyticsApi`] traits so tests can substitute mocks.

#[cfg(test)]
#[path = "client_test.rs"]
mod client_test;

use std::sync::Arc;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::config::ConsoleConfig;
use crate::error::{AuthError, FetchError, SaveError, UploadError};
use crate::net::types::{
    ChartData, Dataset, Identity, LoginResponse, Record, RecordPage, RegisteredUser, Summary,
    UploadPart,
};
use crate::state::session::{FileTokenStore, SessionHandle, TokenStore};

/// Login and token-verification calls. These bypass the unauthorized
/// interceptor: a rejected login is the caller's error to display, not a
/// session-ending event.
#[async_trait::async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, AuthError>;
    async fn me(&self, token: &str) -> Result<Identity, AuthError>;
}

/// Paged record reads and batch saves.
#[async_trait::async_trait]
pub trait RecordApi: Send + Sync {
    async fn fetch_page(
        &self,
        dataset: Dataset,
        page: u32,
        page_size: u32,
    ) -> Result<RecordPage, FetchError>;

    /// Submit edited records in one batch; each record carries its `id`
    /// plus the changed fields.
    async fn save_batch(&self, dataset: Dataset, batch: &[Record]) -> Result<(), SaveError>;
}

/// Aggregate reads backing the summary cards and charts.
#[async_trait::async_trait]
pub trait AnalyticsApi: Send + Sync {
    async fn summary(&self, dataset: Dataset) -> Result<Summary, FetchError>;
    async fn pie_data(&self, dataset: Dataset) -> Result<ChartData, FetchError>;
    async fn bar_data(&self, dataset: Dataset) -> Result<ChartData, FetchError>;
}

/// Reqwest-backed client carrying the shared session for bearer attachment
/// and the durable store for the forced-logout effect.
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    session: SessionHandle,
    store: Arc<dyn TokenStore>,
}

impl ApiClient {
    /// Client with a file-backed token store per the config.
    #[must_use]
    pub fn new(config: &ConsoleConfig, session: SessionHandle) -> Self {
        let store = Arc::new(FileTokenStore::new(config.token_path.clone()));
        Self::with_store(config.base_url.clone(), session, store)
    }

    #[must_use]
    pub fn with_store(
        base_url: String,
        session: SessionHandle,
        store: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            http: reqwest::Client::new(),
            session,
            store,
        }
    }

    /// The durable token store this client shares with the session gate.
    #[must_use]
    pub fn store(&self) -> Arc<dyn TokenStore> {
        Arc::clone(&self.store)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Add the bearer token to an outbound request; no-op while
    /// unauthenticated.
    fn attach_credential(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.session.bearer_token() {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Interceptor stage: a 401 on any authenticated call ends the session
    /// before the call site sees the error.
    fn intercept_unauthorized(&self, status: StatusCode) -> bool {
        if status == StatusCode::UNAUTHORIZED {
            self.session.force_logout(self.store.as_ref());
            true
        } else {
            false
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, u32)],
    ) -> Result<T, FetchError> {
        let mut req = self.http.get(self.url(path));
        if !query.is_empty() {
            req = req.query(query);
        }
        let resp = self
            .attach_credential(req)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        let status = resp.status();
        if self.intercept_unauthorized(status) {
            return Err(FetchError::Unauthorized);
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        resp.json::<T>().await.map_err(|e| FetchError::Decode(e.to_string()))
    }

    async fn post_json_status(
        &self,
        path: &str,
        body: &impl serde::Serialize,
    ) -> Result<StatusCode, reqwest::Error> {
        let req = self.http.post(self.url(path)).json(body);
        let resp = self.attach_credential(req).send().await?;
        Ok(resp.status())
    }

    /// Submit a multipart file set; success/failure signal only.
    ///
    /// # Errors
    ///
    /// `UploadError` on network failure or a non-2xx response.
    ///
    /// # Panics
    ///
    /// Panics if the dataset has no upload endpoint.
    pub async fn upload_files(
        &self,
        dataset: Dataset,
        parts: Vec<UploadPart>,
    ) -> Result<(), UploadError> {
        let path = dataset
            .upload_path()
            .unwrap_or_else(|| panic!("dataset {dataset:?} has no upload endpoint"));
        let mut form = reqwest::multipart::Form::new();
        for part in parts {
            form = form.part(
                "files",
                reqwest::multipart::Part::bytes(part.bytes).file_name(part.file_name),
            );
        }
        let req = self.http.post(self.url(path)).multipart(form);
        let resp = self
            .attach_credential(req)
            .send()
            .await
            .map_err(|e| UploadError::Network(e.to_string()))?;
        let status = resp.status();
        if self.intercept_unauthorized(status) {
            return Err(UploadError::Unauthorized);
        }
        if !status.is_success() {
            return Err(UploadError::Status(status.as_u16()));
        }
        Ok(())
    }

    /// List all accounts (privileged).
    ///
    /// # Errors
    ///
    /// `FetchError` on network failure or a non-2xx response.
    pub async fn list_users(&self) -> Result<Vec<Identity>, FetchError> {
        self.get_json("/auth/users", &[]).await
    }

    /// Create an account with a server-generated password (privileged).
    ///
    /// # Errors
    ///
    /// `FetchError::Status` carries the server's rejection (e.g. the email
    /// is already registered).
    pub async fn register_user(&self, email: &str) -> Result<RegisteredUser, FetchError> {
        let req = self
            .http
            .post(self.url("/auth/register"))
            .json(&serde_json::json!({ "email": email }));
        let resp = self
            .attach_credential(req)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        let status = resp.status();
        if self.intercept_unauthorized(status) {
            return Err(FetchError::Unauthorized);
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        resp.json().await.map_err(|e| FetchError::Decode(e.to_string()))
    }

    /// Activate or deactivate an account (privileged).
    ///
    /// # Errors
    ///
    /// `FetchError` on network failure or a non-2xx response.
    pub async fn set_user_active(&self, user_id: i64, active: bool) -> Result<(), FetchError> {
        let action = if active { "activate" } else { "deactivate" };
        let path = format!("/auth/users/{user_id}/{action}");
        let req = self.http.post(self.url(&path));
        let resp = self
            .attach_credential(req)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        let status = resp.status();
        if self.intercept_unauthorized(status) {
            return Err(FetchError::Unauthorized);
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl AuthApi for ApiClient {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, AuthError> {
        let resp = self
            .http
            .post(self.url("/auth/login"))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;
        if resp.status().is_success() {
            return resp.json().await.map_err(|e| AuthError::Network(e.to_string()));
        }
        // Surface the server's reason when it gave one, e.g.
        // {"detail": "Incorrect email or password"}.
        #[derive(serde::Deserialize)]
        struct ErrorBody {
            detail: String,
        }
        match resp.json::<ErrorBody>().await {
            Ok(body) => Err(AuthError::InvalidCredentials(body.detail)),
            Err(_) => Err(AuthError::login_failed()),
        }
    }

    async fn me(&self, token: &str) -> Result<Identity, AuthError> {
        let resp = self
            .http
            .get(self.url("/auth/me"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(AuthError::InvalidToken);
        }
        if !status.is_success() {
            return Err(AuthError::Network(format!("unexpected status {status}")));
        }
        resp.json().await.map_err(|e| AuthError::Network(e.to_string()))
    }
}

#[async_trait::async_trait]
impl RecordApi for ApiClient {
    async fn fetch_page(
        &self,
        dataset: Dataset,
        page: u32,
        page_size: u32,
    ) -> Result<RecordPage, FetchError> {
        tracing::debug!(?dataset, page, page_size, "fetching record page");
        self.get_json(dataset.records_path(), &[("page", page), ("page_size", page_size)])
            .await
    }

    async fn save_batch(&self, dataset: Dataset, batch: &[Record]) -> Result<(), SaveError> {
        let path = dataset
            .save_path()
            .unwrap_or_else(|| panic!("dataset {dataset:?} has no save endpoint"));
        tracing::debug!(?dataset, records = batch.len(), "submitting batch save");
        let status = self
            .post_json_status(path, &batch)
            .await
            .map_err(|e| SaveError::Network(e.to_string()))?;
        if self.intercept_unauthorized(status) {
            return Err(SaveError::Unauthorized);
        }
        if !status.is_success() {
            return Err(SaveError::Status(status.as_u16()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl AnalyticsApi for ApiClient {
    async fn summary(&self, dataset: Dataset) -> Result<Summary, FetchError> {
        self.get_json(dataset.summary_path(), &[]).await
    }

    async fn pie_data(&self, dataset: Dataset) -> Result<ChartData, FetchError> {
        self.get_json(dataset.pie_path(), &[]).await
    }

    async fn bar_data(&self, dataset: Dataset) -> Result<ChartData, FetchError> {
        self.get_json(dataset.bar_path(), &[]).await
    }
}
