//! Login form view model.

use crate::auth::AuthStore;
use crate::types::AuthResponse;
use crate::validation::require;

#[derive(Debug, Default)]
pub struct LoginForm {
    /// Username or email; the backend accepts either.
    pub username: String,
    pub password: String,
    pub error: Option<String>,
    pub is_loading: bool,
}

impl LoginForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Any edit clears the previous error.
    pub fn edited(&mut self) {
        self.error = None;
    }

    /// Returns true when the session is now authenticated.
    pub fn submit(&mut self, auth: &AuthStore) -> bool {
        if self.is_loading {
            return false;
        }
        if let Err(e) = require(&self.username, "Username and password are required")
            .and_then(|_| require(&self.password, "Username and password are required"))
        {
            self.error = Some(e.to_string());
            return false;
        }

        self.error = None;
        self.is_loading = true;
        let result = auth.login(self.username.trim(), &self.password);
        self.is_loading = false;

        match result {
            Ok(_) => {
                self.password.clear();
                true
            }
            Err(failure) => {
                self.error = Some(failure.0);
                false
            }
        }
    }

    /// The Google adapter produced a session; adopt it.
    pub fn google_success(&mut self, auth: &AuthStore, payload: AuthResponse) -> bool {
        self.error = None;
        match auth.google_auth(payload) {
            Ok(_) => true,
            Err(failure) => {
                self.error = Some(failure.0);
                false
            }
        }
    }

    pub fn google_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;
    use crate::session::SessionStatus;
    use crate::storage::MemoryStorage;
    use crate::test_support::{auth_json, harness, VALID_TOKEN};

    #[test]
    fn blank_fields_never_reach_the_backend() {
        let h = harness(MemoryStorage::new());
        let mut form = LoginForm {
            username: "alice".to_string(),
            ..LoginForm::default()
        };

        assert!(!form.submit(&h.auth));
        assert_eq!(form.error.as_deref(), Some("Username and password are required"));
        assert_eq!(h.transport.calls(), 0);
    }

    #[test]
    fn successful_login_clears_password() {
        let h = harness(MemoryStorage::new());
        h.transport
            .reply(HttpMethod::Post, "/api/login", 200, &auth_json(VALID_TOKEN, 1, "alice"));
        let mut form = LoginForm {
            username: " alice ".to_string(),
            password: "secret1".to_string(),
            ..LoginForm::default()
        };

        assert!(form.submit(&h.auth));
        assert!(form.password.is_empty());
        assert!(!form.is_loading);
        assert_eq!(h.session.status(), SessionStatus::Authenticated);
        let body: serde_json::Value =
            serde_json::from_str(h.transport.requests()[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body["username"], "alice");
    }

    #[test]
    fn failed_login_shows_backend_error() {
        let h = harness(MemoryStorage::new());
        h.transport
            .reply(HttpMethod::Post, "/api/login", 401, r#"{"error":"Invalid credentials"}"#);
        let mut form = LoginForm {
            username: "alice".to_string(),
            password: "wrong".to_string(),
            ..LoginForm::default()
        };

        assert!(!form.submit(&h.auth));
        assert_eq!(form.error.as_deref(), Some("Invalid credentials"));

        form.edited();
        assert!(form.error.is_none());
    }
}
