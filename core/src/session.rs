//! Single owner of the client session.
//!
//! # Design
//! `SessionStore` is the only writer of `SessionState`. Every mutation
//! publishes a fresh snapshot on a `tokio::sync::watch` channel so views can
//! subscribe instead of polling. Persistence goes through `TokenStorage`;
//! storage failures are logged and never block the in-memory transition, so
//! ending a session always succeeds locally.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::storage::{TokenStorage, TOKEN_KEY};
use crate::types::User;

/// Coarse session status derived from `SessionState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Hydration has not finished.
    Loading,
    Unauthenticated,
    Authenticated,
    /// A token is held but the backend could not be reached to resolve the user.
    Offline,
}

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndReason {
    LoggedOut,
    /// The backend rejected the token; carries its message.
    Expired(String),
    /// The persisted token was too short to be genuine.
    Corrupted,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub user: Option<User>,
    pub token: Option<String>,
    pub loading: bool,
    pub offline: bool,
    pub ended: Option<EndReason>,
}

/// Receiving end of the session channel, see `SessionStore::subscribe`.
pub type SessionWatch = watch::Receiver<SessionState>;

impl SessionState {
    /// The backend's reason when the last session ended because its token
    /// was rejected.
    pub fn expiry_message(&self) -> Option<&str> {
        match &self.ended {
            Some(EndReason::Expired(message)) => Some(message),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn status(&self) -> SessionStatus {
        if self.loading {
            SessionStatus::Loading
        } else if self.is_authenticated() {
            SessionStatus::Authenticated
        } else if self.offline && self.token.is_some() {
            SessionStatus::Offline
        } else {
            SessionStatus::Unauthenticated
        }
    }
}

struct SessionInner {
    storage: Arc<dyn TokenStorage>,
    state: watch::Sender<SessionState>,
}

/// Cheap-to-clone handle on the shared session.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionInner>,
}

impl SessionStore {
    /// A new store starts in `Loading` until hydration finishes.
    pub fn new(storage: Arc<dyn TokenStorage>) -> Self {
        let (state, _) = watch::channel(SessionState {
            loading: true,
            ..SessionState::default()
        });
        Self {
            inner: Arc::new(SessionInner { storage, state }),
        }
    }

    pub fn snapshot(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.state.borrow().status()
    }

    pub fn subscribe(&self) -> SessionWatch {
        self.inner.state.subscribe()
    }

    pub fn token(&self) -> Option<String> {
        self.inner.state.borrow().token.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.inner.state.borrow().user.clone()
    }

    /// Read the persisted token, discarding it when shorter than `min_len`.
    pub(crate) fn restore_token(&self, min_len: usize) -> Option<String> {
        let stored = match self.inner.storage.get(TOKEN_KEY) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "could not read persisted token");
                None
            }
        };
        match stored {
            Some(token) if token.len() < min_len => {
                warn!(len = token.len(), min_len, "discarding corrupted persisted token");
                self.remove_persisted();
                self.inner.state.send_modify(|state| {
                    state.token = None;
                    state.ended = Some(EndReason::Corrupted);
                });
                None
            }
            Some(token) => {
                self.inner.state.send_modify(|state| {
                    state.token = Some(token.clone());
                });
                Some(token)
            }
            None => {
                self.inner.state.send_modify(|state| {
                    state.token = None;
                });
                None
            }
        }
    }

    pub(crate) fn begin_loading(&self) {
        self.inner.state.send_modify(|state| {
            state.loading = true;
        });
    }

    /// Hydration finished without resolving a user.
    pub(crate) fn finish_loading(&self, offline: bool) {
        self.inner.state.send_modify(|state| {
            state.loading = false;
            state.offline = offline && state.token.is_some();
        });
    }

    /// Adopt a token/user pair and persist the token.
    pub fn establish(&self, token: &str, user: User) {
        if let Err(e) = self.inner.storage.set(TOKEN_KEY, token) {
            warn!(error = %e, "could not persist token; session will not survive a restart");
        }
        info!(user_id = user.id, username = %user.username, "session established");
        self.inner.state.send_replace(SessionState {
            user: Some(user),
            token: Some(token.to_string()),
            loading: false,
            offline: false,
            ended: None,
        });
    }

    /// Clear the token from storage and memory. Never fails.
    pub fn end(&self, reason: EndReason) {
        self.remove_persisted();
        let was_active = {
            let state = self.inner.state.borrow();
            state.token.is_some() || state.user.is_some()
        };
        if was_active {
            info!(?reason, "session ended");
        }
        self.inner.state.send_replace(SessionState {
            user: None,
            token: None,
            loading: false,
            offline: false,
            ended: Some(reason),
        });
    }

    fn remove_persisted(&self) {
        if let Err(e) = self.inner.storage.remove(TOKEN_KEY) {
            warn!(error = %e, "could not remove persisted token");
        }
    }
}
