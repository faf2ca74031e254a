//! Console configuration loaded from the environment.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::path::PathBuf;

/// Where the console finds the API and where it keeps its one durable key.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// Base URL of the upstream API, e.g. `http://localhost:8000`.
    pub base_url: String,
    /// Path of the single file holding the persisted session token.
    pub token_path: PathBuf,
}

impl ConsoleConfig {
    /// Load from `TXDASH_API_URL` and `TXDASH_TOKEN_PATH`, falling back to
    /// the development defaults. Reads a `.env` file if one is present.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let base_url = std::env::var("TXDASH_API_URL")
            .unwrap_or_else(|_| "http://localhost:8000".to_owned());
        let token_path = std::env::var("TXDASH_TOKEN_PATH")
            .map_or_else(|_| default_token_path(), PathBuf::from);
        Self { base_url, token_path }
    }
}

fn default_token_path() -> PathBuf {
    std::env::temp_dir().join("txdash-token")
}
