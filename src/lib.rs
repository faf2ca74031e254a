//! # txdash
//!
//! Client-side state core for the bank transaction operator console.
//! The presentation layer (routing, charts, forms) lives elsewhere; this
//! crate owns the three pieces with real invariants:
//!
//! - the session gate: login, session restore, logout, and the global
//!   forced-logout interceptor applied to every authenticated call,
//! - the loading barrier: one readiness signal over several independently
//!   resolving dashboard fetches,
//! - the editable paginated grid: per-page rows, a sparse edit overlay, and
//!   batch save orchestration.
//!
//! Network access goes through [`net::client::ApiClient`]; everything the
//! state layer needs from the wire is behind the `AuthApi` / `RecordApi` /
//! `AnalyticsApi` traits so tests can substitute mocks.

pub mod config;
pub mod error;
pub mod net;
pub mod state;
