//! Route guard: what to render for a view that requires authentication.

#[cfg(test)]
#[path = "guard_test.rs"]
mod guard_test;

use crate::state::session::{SessionHandle, SessionStatus};

/// Outcome of guarding a protected view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteDecision {
    /// Session restore is still in flight; render a loading placeholder.
    ShowLoading,
    RedirectToLogin,
    /// A privileged-only view was requested by a non-privileged identity.
    RedirectToDefault,
    Render,
}

/// Decide navigability for a protected view against the current session.
#[must_use]
pub fn route_decision(session: &SessionHandle, requires_superuser: bool) -> RouteDecision {
    match session.status() {
        SessionStatus::Authenticating => RouteDecision::ShowLoading,
        SessionStatus::Unauthenticated => RouteDecision::RedirectToLogin,
        SessionStatus::Authenticated => {
            let privileged = session.identity().is_some_and(|user| user.is_superuser);
            if requires_superuser && !privileged {
                RouteDecision::RedirectToDefault
            } else {
                RouteDecision::Render
            }
        }
    }
}
