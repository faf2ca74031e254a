//! Session state and the gate that mutates it.
//!
//! ARCHITECTURE
//! ============
//! The session is the one piece of state shared across components. It lives
//! behind [`SessionHandle`] (cheaply clonable, mutex-guarded) and is mutated
//! only by [`SessionGate`] operations and the HTTP client's unauthorized
//! interceptor. Everything else reads it: the route guard for navigability,
//! every outbound call for bearer attachment.
//!
//! The token is the sole credential. It is persisted under a single durable
//! key (the [`TokenStore`]) and re-validated against the server on restore;
//! the identity itself is never trusted from local storage.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::AuthError;
use crate::net::client::AuthApi;
use crate::net::types::Identity;

/// Authentication lifecycle status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionStatus {
    #[default]
    Unauthenticated,
    /// A stored token is being re-validated; views render a placeholder.
    Authenticating,
    Authenticated,
}

/// The current session: token, server-derived identity, and lifecycle status.
#[derive(Clone, Debug, Default)]
pub struct Session {
    pub token: Option<String>,
    pub identity: Option<Identity>,
    pub status: SessionStatus,
    wants_login_redirect: bool,
}

/// Shared, mutex-guarded handle to the process-wide [`Session`].
///
/// Lock scope never spans an await; mutations are synchronous so the
/// forced-logout effect lands before any later call reads the token.
#[derive(Clone, Debug, Default)]
pub struct SessionHandle {
    inner: Arc<Mutex<Session>>,
}

impl SessionHandle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        // Session mutations are infallible; a poisoned lock means a panic
        // already happened mid-mutation and the process is going down.
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.lock().status
    }

    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.lock().identity.clone()
    }

    /// Token to attach as a bearer credential; `None` unless authenticated.
    #[must_use]
    pub fn bearer_token(&self) -> Option<String> {
        let session = self.lock();
        match session.status {
            SessionStatus::Authenticated => session.token.clone(),
            _ => None,
        }
    }

    pub(crate) fn set_authenticating(&self) {
        self.lock().status = SessionStatus::Authenticating;
    }

    pub(crate) fn set_authenticated(&self, token: String, identity: Identity) {
        let mut session = self.lock();
        session.token = Some(token);
        session.identity = Some(identity);
        session.status = SessionStatus::Authenticated;
    }

    pub(crate) fn set_unauthenticated(&self) {
        let mut session = self.lock();
        session.token = None;
        session.identity = None;
        session.status = SessionStatus::Unauthenticated;
    }

    /// Interceptor entry point: same effect as logout, plus a pending
    /// redirect to the login view. Invoked by the HTTP client whenever an
    /// authenticated call comes back 401, regardless of the caller.
    pub fn force_logout(&self, store: &dyn TokenStore) {
        tracing::warn!("unauthorized response; forcing logout");
        store.clear();
        let mut session = self.lock();
        session.token = None;
        session.identity = None;
        session.status = SessionStatus::Unauthenticated;
        session.wants_login_redirect = true;
    }

    /// Consume the pending login redirect, if any. Returns `true` at most
    /// once per forced logout.
    pub fn take_login_redirect(&self) -> bool {
        let mut session = self.lock();
        std::mem::take(&mut session.wants_login_redirect)
    }
}

/// Durable storage for the session token: exactly one well-known key.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Option<String>;
    fn save(&self, token: &str);
    fn clear(&self);
}

/// Token persisted as a single file across process restarts.
///
/// Storage is best-effort, like browser local storage: IO failures are
/// logged and the session continues in-memory only.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<String> {
        let contents = std::fs::read_to_string(&self.path).ok()?;
        let token = contents.trim();
        if token.is_empty() { None } else { Some(token.to_owned()) }
    }

    fn save(&self, token: &str) {
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(e) = std::fs::write(&self.path, token) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to persist session token");
        }
    }

    fn clear(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to clear session token");
            }
        }
    }
}

/// In-memory store for tests and embedded use.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed a stored token, as if a prior process had saved one.
    #[must_use]
    pub fn with_token(token: &str) -> Self {
        Self { token: Mutex::new(Some(token.to_owned())) }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<String> {
        self.token.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }

    fn save(&self, token: &str) {
        *self.token.lock().unwrap_or_else(std::sync::PoisonError::into_inner) =
            Some(token.to_owned());
    }

    fn clear(&self) {
        *self.token.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = None;
    }
}

/// Owner of session transitions: login, restore, logout.
pub struct SessionGate {
    session: SessionHandle,
    store: Arc<dyn TokenStore>,
    auth: Arc<dyn AuthApi>,
}

impl SessionGate {
    pub fn new(session: SessionHandle, store: Arc<dyn TokenStore>, auth: Arc<dyn AuthApi>) -> Self {
        Self { session, store, auth }
    }

    /// The shared handle this gate mutates.
    #[must_use]
    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Authenticate with credentials. On success the token is persisted and
    /// the session becomes authenticated; on failure prior state is left
    /// untouched and the server's reason is returned. No retry.
    ///
    /// # Errors
    ///
    /// Returns the server-supplied rejection detail, or a network error.
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let resp = self.auth.login(email, password).await?;
        self.store.save(&resp.access_token);
        self.session.set_authenticated(resp.access_token, resp.user.clone());
        Ok(resp.user)
    }

    /// Rehydrate the session at process start by re-validating the durable
    /// token. Any failure (network or rejection) clears the durable token
    /// and lands on `Unauthenticated`; this never terminates while still
    /// `Authenticating`.
    pub async fn restore_session(&self) {
        let Some(token) = self.store.load() else {
            self.session.set_unauthenticated();
            return;
        };
        self.session.set_authenticating();
        match self.auth.me(&token).await {
            Ok(identity) => {
                tracing::debug!(email = %identity.email, "session restored");
                self.session.set_authenticated(token, identity);
            }
            Err(e) => {
                tracing::warn!(error = %e, "stored token failed verification");
                self.store.clear();
                self.session.set_unauthenticated();
            }
        }
    }

    /// Clear the durable token and in-memory identity. Idempotent.
    pub fn logout(&self) {
        self.store.clear();
        self.session.set_unauthenticated();
    }
}
