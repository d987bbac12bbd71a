//! Top-level screen selection.

use std::borrow::Cow;

use crate::session::{SessionState, SessionStatus};

/// Which unauthenticated screen is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    Login,
    Register,
    ForgotPassword,
    ResetPassword,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Loading,
    Offline,
    Login,
    Register,
    ForgotPassword,
    ResetPassword { token: Option<String> },
    Todos,
}

#[derive(Debug, Clone, Default)]
pub struct Router {
    mode: AuthMode,
    reset_token: Option<String>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a query string such as `?token=abc`. A `token` parameter
    /// forces the reset-password screen.
    pub fn from_query(query: &str) -> Self {
        let reset_token = query
            .trim_start_matches('?')
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == "token")
            .map(|(_, value)| decode(value))
            .filter(|token| !token.is_empty());

        Self {
            mode: if reset_token.is_some() {
                AuthMode::ResetPassword
            } else {
                AuthMode::Login
            },
            reset_token,
        }
    }

    /// Start on the reset-password screen with an already-decoded token.
    pub fn for_reset(token: impl Into<String>) -> Self {
        Self {
            mode: AuthMode::ResetPassword,
            reset_token: Some(token.into()),
        }
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    pub fn reset_token(&self) -> Option<&str> {
        self.reset_token.as_deref()
    }

    pub fn show(&mut self, mode: AuthMode) {
        self.mode = mode;
    }

    pub fn route(&self, session: &SessionState) -> Route {
        match session.status() {
            SessionStatus::Loading => Route::Loading,
            SessionStatus::Authenticated => Route::Todos,
            SessionStatus::Offline => Route::Offline,
            SessionStatus::Unauthenticated => match self.mode {
                AuthMode::Login => Route::Login,
                AuthMode::Register => Route::Register,
                AuthMode::ForgotPassword => Route::ForgotPassword,
                AuthMode::ResetPassword => Route::ResetPassword {
                    token: self.reset_token.clone(),
                },
            },
        }
    }
}

fn decode(value: &str) -> String {
    let value = value.replace('+', " ");
    let decoded = urlencoding::decode(&value).map(Cow::into_owned).ok();
    decoded.unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::user;

    fn signed_out() -> SessionState {
        SessionState::default()
    }

    #[test]
    fn token_in_query_forces_reset_screen() {
        let router = Router::from_query("?foo=1&token=abc%2Fdef");
        assert_eq!(router.mode(), AuthMode::ResetPassword);
        assert_eq!(router.reset_token(), Some("abc/def"));
        assert_eq!(
            router.route(&signed_out()),
            Route::ResetPassword {
                token: Some("abc/def".to_string())
            }
        );
    }

    #[test]
    fn no_token_starts_at_login() {
        for query in ["", "?", "?token=", "?other=1"] {
            let router = Router::from_query(query);
            assert_eq!(router.mode(), AuthMode::Login, "query {query:?}");
            assert_eq!(router.route(&signed_out()), Route::Login);
        }
    }

    #[test]
    fn session_status_wins_over_mode() {
        let mut router = Router::new();
        router.show(AuthMode::Register);
        assert_eq!(router.route(&signed_out()), Route::Register);

        let loading = SessionState {
            loading: true,
            ..SessionState::default()
        };
        assert_eq!(router.route(&loading), Route::Loading);

        let offline = SessionState {
            token: Some("t".to_string()),
            offline: true,
            ..SessionState::default()
        };
        assert_eq!(router.route(&offline), Route::Offline);

        let authed = SessionState {
            token: Some("t".to_string()),
            user: Some(user(1, "alice")),
            ..SessionState::default()
        };
        assert_eq!(router.route(&authed), Route::Todos);
    }
}
