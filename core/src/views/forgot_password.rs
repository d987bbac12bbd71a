//! "Forgot password" form: asks the backend to email a reset link.

use tracing::warn;

use crate::gateway::Gateway;
use crate::types::ForgotPasswordRequest;
use crate::validation::validate_email;

const GENERIC_FAILURE: &str = "An error occurred. Please try again later.";

#[derive(Debug, Default)]
pub struct ForgotPasswordForm {
    pub email: String,
    pub error: Option<String>,
    pub message: Option<String>,
    pub email_sent: bool,
    pub is_loading: bool,
}

impl ForgotPasswordForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit(&mut self, gateway: &Gateway) -> bool {
        if self.is_loading {
            return false;
        }
        if let Err(e) = validate_email(&self.email) {
            self.error = Some(e.to_string());
            return false;
        }

        self.is_loading = true;
        self.error = None;
        self.message = None;

        let client = gateway.client();
        let input = ForgotPasswordRequest {
            email: self.email.trim().to_string(),
        };
        let result = client
            .build_forgot_password(&input)
            .and_then(|request| gateway.send(request))
            .and_then(|response| client.parse_forgot_password(response));
        self.is_loading = false;

        match result {
            Ok(response) => {
                self.message = Some(response.message);
                self.email_sent = true;
                self.email.clear();
                true
            }
            Err(e) => {
                warn!(error = %e, "forgot-password request failed");
                self.error = Some(e.backend_message().unwrap_or(GENERIC_FAILURE).to_string());
                false
            }
        }
    }

    /// Back to the empty form after a link was sent.
    pub fn try_again(&mut self) {
        self.email_sent = false;
        self.message = None;
        self.error = None;
    }
}
