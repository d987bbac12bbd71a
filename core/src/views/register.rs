//! Registration form view model.

use crate::auth::AuthStore;
use crate::types::AuthResponse;
use crate::validation::{
    require, validate_confirmation, validate_email, validate_password_length, ValidationError,
};

#[derive(Debug, Default)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub error: Option<String>,
    pub is_loading: bool,
}

impl RegisterForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn edited(&mut self) {
        self.error = None;
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require(&self.username, "Please enter a username")?;
        validate_email(&self.email)?;
        require(&self.password, "Please enter a password")?;
        validate_confirmation(&self.password, &self.confirm_password)?;
        validate_password_length(&self.password)
    }

    pub fn submit(&mut self, auth: &AuthStore) -> bool {
        if self.is_loading {
            return false;
        }
        if let Err(e) = self.validate() {
            self.error = Some(e.to_string());
            return false;
        }

        self.error = None;
        self.is_loading = true;
        let result = auth.register(self.username.trim(), self.email.trim(), &self.password);
        self.is_loading = false;

        match result {
            Ok(_) => {
                self.password.clear();
                self.confirm_password.clear();
                true
            }
            Err(failure) => {
                self.error = Some(failure.0);
                false
            }
        }
    }

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
    use crate::storage::MemoryStorage;
    use crate::test_support::{auth_json, harness, VALID_TOKEN};

    fn filled() -> RegisterForm {
        RegisterForm {
            username: "bob".to_string(),
            email: "bob@example.com".to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
            ..RegisterForm::default()
        }
    }

    #[test]
    fn mismatch_is_reported_before_length() {
        let h = harness(MemoryStorage::new());
        let mut form = RegisterForm {
            password: "abc".to_string(),
            confirm_password: "abd".to_string(),
            ..filled()
        };

        assert!(!form.submit(&h.auth));
        assert_eq!(form.error.as_deref(), Some("Passwords do not match"));
        assert_eq!(h.transport.calls(), 0);
    }

    #[test]
    fn short_password_is_rejected_locally() {
        let h = harness(MemoryStorage::new());
        let mut form = RegisterForm {
            password: "abc".to_string(),
            confirm_password: "abc".to_string(),
            ..filled()
        };

        assert!(!form.submit(&h.auth));
        assert_eq!(
            form.error.as_deref(),
            Some("Password must be at least 6 characters long")
        );
        assert_eq!(h.transport.calls(), 0);
    }

    #[test]
    fn malformed_email_is_rejected_locally() {
        let h = harness(MemoryStorage::new());
        let mut form = RegisterForm {
            email: "bob-at-example".to_string(),
            ..filled()
        };

        assert!(!form.submit(&h.auth));
        assert_eq!(form.error.as_deref(), Some("Please enter a valid email address"));
        assert_eq!(h.transport.calls(), 0);
    }

    #[test]
    fn valid_form_registers() {
        let h = harness(MemoryStorage::new());
        h.transport
            .reply(HttpMethod::Post, "/api/register", 201, &auth_json(VALID_TOKEN, 2, "bob"));
        let mut form = filled();

        assert!(form.submit(&h.auth));
        assert!(form.password.is_empty());
        assert!(form.confirm_password.is_empty());
        assert!(h.session.snapshot().is_authenticated());
    }

    #[test]
    fn duplicate_username_shows_backend_error() {
        let h = harness(MemoryStorage::new());
        h.transport.reply(
            HttpMethod::Post,
            "/api/register",
            400,
            r#"{"error":"Username already exists"}"#,
        );
        let mut form = filled();

        assert!(!form.submit(&h.auth));
        assert_eq!(form.error.as_deref(), Some("Username already exists"));
    }
}
