//! In-memory backend state shared by the route handlers.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How long a password-reset token stays valid.
pub const RESET_TOKEN_TTL_SECS: i64 = 3600;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub profile_picture: Option<String>,
    pub auth_provider: String,
    pub created_at: NaiveDateTime,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub user_id: i64,
}

/// A message the server "sent". Nothing leaves the process.
#[derive(Clone, Debug, PartialEq)]
pub struct Mail {
    pub to: String,
    pub subject: String,
    pub reset_token: Option<String>,
}

struct Account {
    user: User,
    password: Option<String>,
}

struct Grant {
    user_id: i64,
    expired: bool,
}

struct ResetGrant {
    email: String,
    expires_at: NaiveDateTime,
}

#[derive(Default)]
pub(crate) struct Backend {
    accounts: Vec<Account>,
    grants: HashMap<String, Grant>,
    revoked: HashSet<String>,
    todos: Vec<Todo>,
    next_user_id: i64,
    next_todo_id: i64,
    resets: HashMap<String, ResetGrant>,
    outbox: Vec<Mail>,
    pub(crate) mail_configured: bool,
}

/// Why a bearer token was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenRejection {
    Unknown,
    Expired,
    Revoked,
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

fn access_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

impl Backend {
    pub(crate) fn user_by_name_or_email(&self, login: &str) -> Option<&User> {
        self.accounts
            .iter()
            .map(|a| &a.user)
            .find(|u| u.username == login || u.email == login)
    }

    pub(crate) fn user_by_email(&self, email: &str) -> Option<&User> {
        self.accounts.iter().map(|a| &a.user).find(|u| u.email == email)
    }

    pub(crate) fn user(&self, id: i64) -> Option<&User> {
        self.accounts.iter().map(|a| &a.user).find(|u| u.id == id)
    }

    pub(crate) fn username_taken(&self, username: &str) -> bool {
        self.accounts.iter().any(|a| a.user.username == username)
    }

    pub(crate) fn create_user(
        &mut self,
        username: &str,
        email: &str,
        password: Option<&str>,
        provider: &str,
    ) -> User {
        self.next_user_id += 1;
        let user = User {
            id: self.next_user_id,
            username: username.to_string(),
            email: email.to_string(),
            profile_picture: None,
            auth_provider: provider.to_string(),
            created_at: now(),
        };
        self.accounts.push(Account {
            user: user.clone(),
            password: password.map(str::to_string),
        });
        user
    }

    /// Google users have no password and never match.
    pub(crate) fn check_password(&self, user_id: i64, password: &str) -> bool {
        self.accounts
            .iter()
            .find(|a| a.user.id == user_id)
            .and_then(|a| a.password.as_deref())
            .is_some_and(|stored| stored == password)
    }

    pub(crate) fn set_password(&mut self, user_id: i64, password: &str) {
        if let Some(account) = self.accounts.iter_mut().find(|a| a.user.id == user_id) {
            account.password = Some(password.to_string());
        }
    }

    pub(crate) fn issue_token(&mut self, user_id: i64) -> String {
        let token = access_token();
        self.grants.insert(
            token.clone(),
            Grant {
                user_id,
                expired: false,
            },
        );
        token
    }

    pub(crate) fn resolve_token(&self, token: &str) -> Result<i64, TokenRejection> {
        if self.revoked.contains(token) {
            return Err(TokenRejection::Revoked);
        }
        match self.grants.get(token) {
            None => Err(TokenRejection::Unknown),
            Some(grant) if grant.expired => Err(TokenRejection::Expired),
            Some(grant) => Ok(grant.user_id),
        }
    }

    pub(crate) fn revoke(&mut self, token: &str) {
        self.revoked.insert(token.to_string());
    }

    /// Newest first, like the production ordering by `created_at desc`.
    pub(crate) fn todos_for(&self, user_id: i64) -> Vec<Todo> {
        self.todos
            .iter()
            .rev()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect()
    }

    pub(crate) fn create_todo(&mut self, user_id: i64, title: &str, description: &str) -> Todo {
        self.next_todo_id += 1;
        let stamp = now();
        let todo = Todo {
            id: self.next_todo_id,
            title: title.to_string(),
            description: Some(description.to_string()),
            completed: false,
            created_at: stamp,
            updated_at: stamp,
            user_id,
        };
        self.todos.push(todo.clone());
        todo
    }

    pub(crate) fn todo_mut(&mut self, user_id: i64, id: i64) -> Option<&mut Todo> {
        self.todos
            .iter_mut()
            .find(|t| t.id == id && t.user_id == user_id)
    }

    pub(crate) fn delete_todo(&mut self, user_id: i64, id: i64) -> bool {
        let before = self.todos.len();
        self.todos.retain(|t| !(t.id == id && t.user_id == user_id));
        self.todos.len() != before
    }

    pub(crate) fn issue_reset_token(&mut self, email: &str) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.resets.insert(
            token.clone(),
            ResetGrant {
                email: email.to_string(),
                expires_at: now() + Duration::seconds(RESET_TOKEN_TTL_SECS),
            },
        );
        token
    }

    /// The email a live reset token was issued for.
    pub(crate) fn reset_email(&self, token: &str) -> Option<String> {
        self.resets
            .get(token)
            .filter(|grant| grant.expires_at > now())
            .map(|grant| grant.email.clone())
    }

    pub(crate) fn consume_reset_token(&mut self, token: &str) {
        self.resets.remove(token);
    }

    /// Deliver `mail` if mail is configured; returns whether it was sent.
    pub(crate) fn send_mail(&mut self, mail: Mail) -> bool {
        if !self.mail_configured {
            return false;
        }
        self.outbox.push(mail);
        true
    }
}

/// Cheap handle on the backend, shared by the router and by tests that
/// need to reach behind the HTTP surface.
#[derive(Clone, Default)]
pub struct MockBackend {
    inner: Arc<Mutex<Backend>>,
}

impl MockBackend {
    pub fn new(mail_configured: bool) -> Self {
        let backend = MockBackend::default();
        backend.lock().mail_configured = mail_configured;
        backend
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Backend> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_mail_configured(&self, configured: bool) {
        self.lock().mail_configured = configured;
    }

    pub fn outbox(&self) -> Vec<Mail> {
        self.lock().outbox.clone()
    }

    /// The token from the most recent password-reset mail.
    pub fn last_reset_token(&self) -> Option<String> {
        self.lock()
            .outbox
            .iter()
            .rev()
            .find_map(|mail| mail.reset_token.clone())
    }

    /// Make an access token answer "Token has expired" from now on.
    pub fn expire_token(&self, token: &str) -> bool {
        match self.lock().grants.get_mut(token) {
            Some(grant) => {
                grant.expired = true;
                true
            }
            None => false,
        }
    }

    /// Age every outstanding reset token past its lifetime.
    pub fn expire_reset_tokens(&self) {
        let past = now() - Duration::seconds(1);
        for grant in self.lock().resets.values_mut() {
            grant.expires_at = past;
        }
    }
}
