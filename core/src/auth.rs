//! Authentication state store.
//!
//! `AuthStore` drives the session lifecycle over the gateway: hydrate on
//! start, login/register/Google adoption, and logout. All state lives in the
//! `SessionStore`; this type only decides which transition to make.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::gateway::Gateway;
use crate::session::{EndReason, SessionStatus, SessionStore};
use crate::types::{AuthResponse, LoginRequest, RegisterRequest, User};

/// Persisted tokens shorter than this are treated as corrupted.
pub const MIN_TOKEN_LEN: usize = 50;

/// User-facing reason a login, registration or Google sign-in failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct AuthFailure(pub String);

impl AuthFailure {
    fn from_api(error: &ApiError, fallback: &str) -> Self {
        AuthFailure(error.backend_message().unwrap_or(fallback).to_string())
    }
}

#[derive(Clone)]
pub struct AuthStore {
    gateway: Gateway,
    session: SessionStore,
    min_token_len: usize,
}

impl AuthStore {
    pub fn new(gateway: Gateway, session: SessionStore) -> Self {
        Self {
            gateway,
            session,
            min_token_len: MIN_TOKEN_LEN,
        }
    }

    pub fn with_min_token_len(mut self, min_token_len: usize) -> Self {
        self.min_token_len = min_token_len;
        self
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// Rebuild the session from persisted storage.
    ///
    /// A 401/422 from `/api/me` logs out. Any other failure keeps the token
    /// and reports `Offline`.
    pub fn hydrate(&self) -> SessionStatus {
        self.session.begin_loading();

        let Some(token) = self.session.restore_token(self.min_token_len) else {
            self.session.finish_loading(false);
            return self.session.status();
        };

        let client = self.gateway.client();
        let result = self
            .gateway
            .send(client.build_me(&token))
            .and_then(|response| client.parse_me(response));

        match result {
            Ok(user) => {
                debug!(user_id = user.id, "hydrated session from persisted token");
                self.session.establish(&token, user);
            }
            // The expiry interceptor has already ended the session and kept its reason.
            Err(e) if e.is_auth() && self.session.token().is_none() => {
                info!(error = %e, "persisted token rejected");
            }
            Err(e) if e.is_auth() => {
                info!(error = %e, "persisted token rejected, logging out");
                self.logout();
            }
            Err(e) => {
                warn!(error = %e, "could not verify persisted token, keeping session offline");
                self.session.finish_loading(true);
            }
        }
        self.session.status()
    }

    pub fn login(&self, username: &str, password: &str) -> Result<User, AuthFailure> {
        let client = self.gateway.client();
        let input = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let result = client
            .build_login(&input)
            .and_then(|request| self.gateway.send(request))
            .and_then(|response| client.parse_login(response));

        match result {
            Ok(auth) => self.adopt(auth, "Login failed"),
            Err(e) => {
                warn!(error = %e, "login failed");
                Err(AuthFailure::from_api(&e, "Login failed"))
            }
        }
    }

    pub fn register(&self, username: &str, email: &str, password: &str) -> Result<User, AuthFailure> {
        let client = self.gateway.client();
        let input = RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let result = client
            .build_register(&input)
            .and_then(|request| self.gateway.send(request))
            .and_then(|response| client.parse_register(response));

        match result {
            Ok(auth) => self.adopt(auth, "Registration failed"),
            Err(e) => {
                warn!(error = %e, "registration failed");
                Err(AuthFailure::from_api(&e, "Registration failed"))
            }
        }
    }

    /// Adopt a session already issued by `/api/auth/google`. No network call.
    pub fn google_auth(&self, payload: AuthResponse) -> Result<User, AuthFailure> {
        self.adopt(payload, "Google authentication failed")
    }

    /// Best-effort backend notification, then unconditional local teardown.
    pub fn logout(&self) {
        if let Some(token) = self.session.token() {
            let client = self.gateway.client();
            let result = self
                .gateway
                .send(client.build_logout(&token))
                .and_then(|response| client.parse_logout(response));
            if let Err(e) = result {
                warn!(error = %e, "logout request failed, clearing local session anyway");
            }
        }
        self.session.end(EndReason::LoggedOut);
    }

    fn adopt(&self, auth: AuthResponse, fallback: &str) -> Result<User, AuthFailure> {
        if auth.access_token.is_empty() {
            return Err(AuthFailure(fallback.to_string()));
        }
        self.session.establish(&auth.access_token, auth.user.clone());
        Ok(auth.user)
    }
}
