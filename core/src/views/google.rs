//! Google sign-in adapter.
//!
//! The identity widget itself is external; it hands us a credential, which
//! is exchanged with the backend for a regular session. When no usable
//! client id is configured the adapter renders an informational placeholder
//! instead of the widget.

use tracing::warn;

use crate::gateway::Gateway;
use crate::types::{AuthResponse, GoogleAuthRequest};

const PLACEHOLDER_CLIENT_ID: &str = "your-google-client-id.apps.googleusercontent.com";
const CLIENT_ID_SUFFIX: &str = ".apps.googleusercontent.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoogleControl {
    Widget { client_id: String },
    Placeholder,
}

#[derive(Clone)]
pub struct GoogleSignIn {
    client_id: Option<String>,
    gateway: Gateway,
}

impl GoogleSignIn {
    pub fn new(client_id: Option<String>, gateway: Gateway) -> Self {
        Self { client_id, gateway }
    }

    pub fn is_configured(&self) -> bool {
        is_configured_client_id(self.client_id.as_deref())
    }

    pub fn control(&self) -> GoogleControl {
        match &self.client_id {
            Some(id) if self.is_configured() => GoogleControl::Widget {
                client_id: id.clone(),
            },
            _ => GoogleControl::Placeholder,
        }
    }

    /// Trade the widget's credential for a session.
    pub fn exchange(&self, credential: &str) -> Result<AuthResponse, String> {
        let client = self.gateway.client();
        let input = GoogleAuthRequest {
            token: credential.to_string(),
        };
        let result = client
            .build_google_auth(&input)
            .and_then(|request| self.gateway.send(request))
            .and_then(|response| client.parse_google_auth(response));

        match result {
            Ok(auth) if !auth.access_token.is_empty() => Ok(auth),
            Ok(_) => Err("Failed to authenticate with Google".to_string()),
            Err(e) => {
                warn!(error = %e, "google credential exchange failed");
                Err(e
                    .backend_message()
                    .unwrap_or("Google authentication failed")
                    .to_string())
            }
        }
    }

    pub fn cancelled_message() -> &'static str {
        "Google login was cancelled or failed"
    }

    pub fn placeholder_message() -> &'static str {
        "Google OAuth is not configured. Set google_client_id to a client id ending in .apps.googleusercontent.com"
    }
}

pub fn is_configured_client_id(client_id: Option<&str>) -> bool {
    match client_id {
        Some(id) => id != PLACEHOLDER_CLIENT_ID && id.contains(CLIENT_ID_SUFFIX),
        None => false,
    }
}
