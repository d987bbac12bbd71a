//! Client configuration.
//!
//! Plain serde data; the terminal app layers file, environment and CLI
//! sources on top of `ClientConfig::default()`.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::MIN_TOKEN_LEN;
use crate::views::todos::ClearPolicy;

pub const DEFAULT_API_URL: &str = "http://localhost:5000";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the REST backend.
    pub api_url: String,
    /// OAuth client id for Google sign-in; absent or placeholder disables it.
    pub google_client_id: Option<String>,
    /// Where the token is persisted. Defaults to the platform data dir.
    pub storage_path: Option<PathBuf>,
    pub min_token_len: usize,
    pub clear_policy: ClearPolicy,
    pub request_timeout_secs: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            google_client_id: None,
            storage_path: None,
            min_token_len: MIN_TOKEN_LEN,
            clear_policy: ClearPolicy::default(),
            request_timeout_secs: None,
        }
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
