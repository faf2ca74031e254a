//! Error taxonomy for the console core.
//!
//! One enum per failure surface. `Unauthorized` variants exist on every
//! authenticated surface because the 401 interceptor still has to hand the
//! call site *some* error after it has forced the logout; callers treat it
//! like any other failed call rather than re-reporting it.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

/// Failures from login and token verification.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The server rejected the credentials; carries the server-supplied
    /// detail, or a generic message if the body had none.
    #[error("{0}")]
    InvalidCredentials(String),
    /// A stored token failed verification against `/auth/me`.
    #[error("session token rejected")]
    InvalidToken,
    #[error("network error: {0}")]
    Network(String),
}

impl AuthError {
    /// Generic credential failure used when the server gave no detail.
    #[must_use]
    pub fn login_failed() -> Self {
        Self::InvalidCredentials("Login failed".to_owned())
    }
}

/// Failures on any read endpoint (pages, summaries, chart data).
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("network error: {0}")]
    Network(String),
    #[error("malformed response body: {0}")]
    Decode(String),
}

/// Failures on the batch-save endpoint.
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("save rejected with status {0}")]
    Status(u16),
    #[error("network error: {0}")]
    Network(String),
}

/// Failures on multipart file submission.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("upload rejected with status {0}")]
    Status(u16),
    #[error("network error: {0}")]
    Network(String),
}
