//! Reset-password view: verify the emailed token, then set a new password.
//!
//! ```text
//! Verifying ──► Invalid            (terminal)
//!           └─► Ready ──► Submitting ──► Success   (terminal)
//!                 ▲            │
//!                 └── error ───┘
//! ```

use tracing::warn;

use crate::gateway::Gateway;
use crate::types::{ResetPasswordRequest, VerifyResetTokenRequest};
use crate::validation::{
    require, validate_confirmation, validate_password_length, ValidationError,
};

const MISSING_TOKEN: &str = "Invalid reset link. Please request a new password reset.";
const VERIFY_FAILED: &str = "Unable to verify reset token. Please try again.";
const RESET_FAILED: &str = "An error occurred while resetting your password. Please try again.";

/// Who the token belongs to, shown above the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetAccount {
    pub email: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetState {
    Verifying,
    Invalid { error: String },
    Ready {
        account: ResetAccount,
        error: Option<String>,
    },
    Submitting { account: ResetAccount },
    Success { message: String },
}

#[derive(Debug)]
pub struct ResetPasswordView {
    token: Option<String>,
    pub password: String,
    pub confirm_password: String,
    state: ResetState,
}

impl ResetPasswordView {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.is_empty()),
            password: String::new(),
            confirm_password: String::new(),
            state: ResetState::Verifying,
        }
    }

    pub fn state(&self) -> &ResetState {
        &self.state
    }

    /// The password form is rendered only once the token checked out.
    pub fn shows_form(&self) -> bool {
        matches!(
            self.state,
            ResetState::Ready { .. } | ResetState::Submitting { .. }
        )
    }

    /// Verify the token with the backend.
    pub fn mount(&mut self, gateway: &Gateway) -> &ResetState {
        let Some(token) = self.token.clone() else {
            self.state = ResetState::Invalid {
                error: MISSING_TOKEN.to_string(),
            };
            return &self.state;
        };

        self.state = ResetState::Verifying;
        let client = gateway.client();
        let result = client
            .build_verify_reset_token(&VerifyResetTokenRequest { token })
            .and_then(|request| gateway.send(request))
            .and_then(|response| client.parse_verify_reset_token(response));

        self.state = match result {
            Ok(verdict) if verdict.valid => ResetState::Ready {
                account: ResetAccount {
                    email: verdict.email,
                    username: verdict.username,
                },
                error: None,
            },
            Ok(verdict) => ResetState::Invalid {
                error: verdict
                    .error
                    .unwrap_or_else(|| "Invalid reset token".to_string()),
            },
            Err(e) => {
                warn!(error = %e, "reset token verification failed");
                ResetState::Invalid {
                    error: e.backend_message().unwrap_or(VERIFY_FAILED).to_string(),
                }
            }
        };
        &self.state
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require(&self.password, "Please enter a new password")?;
        validate_password_length(&self.password)?;
        validate_confirmation(&self.password, &self.confirm_password)
    }

    /// Submit the new password. Only acts in `Ready`.
    pub fn submit(&mut self, gateway: &Gateway) -> &ResetState {
        let ResetState::Ready { account, .. } = &self.state else {
            return &self.state;
        };
        let account = account.clone();
        let Some(token) = self.token.clone() else {
            return &self.state;
        };

        if let Err(e) = self.validate() {
            self.state = ResetState::Ready {
                account,
                error: Some(e.to_string()),
            };
            return &self.state;
        }

        self.state = ResetState::Submitting {
            account: account.clone(),
        };
        let client = gateway.client();
        let input = ResetPasswordRequest {
            token,
            password: self.password.clone(),
        };
        let result = client
            .build_reset_password(&input)
            .and_then(|request| gateway.send(request))
            .and_then(|response| client.parse_reset_password(response));

        self.state = match result {
            Ok(response) => {
                self.password.clear();
                self.confirm_password.clear();
                ResetState::Success {
                    message: response.message,
                }
            }
            Err(e) => {
                warn!(error = %e, "password reset failed");
                ResetState::Ready {
                    account,
                    error: Some(e.backend_message().unwrap_or(RESET_FAILED).to_string()),
                }
            }
        };
        &self.state
    }
}
