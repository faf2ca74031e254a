//! Client-side state modules.
//!
//! DESIGN
//! ======
//! State is split by concern so each view depends on a small focused model:
//! `session` is the only process-wide piece (shared via [`session::SessionHandle`]);
//! `loading`, `grid`, and `dashboard` are owned by a single view instance
//! and die with it.

pub mod dashboard;
pub mod grid;
pub mod guard;
pub mod loading;
pub mod session;
