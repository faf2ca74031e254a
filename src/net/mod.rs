//! Wire types and the HTTP client for the upstream console API.

pub mod client;
pub mod types;
