//! Todo list view model.
//!
//! # Design
//! The view owns a cached copy of the user's todos and replaces it from
//! server responses: a wholesale replace on fetch, a prepend on create, and
//! a single-record replace on toggle/edit so server-side changes such as
//! `updated_at` are absorbed. Filtering and counts are pure functions of the
//! cache. Every request takes a `ScopeGuard`; after `unmount` late responses
//! are dropped.
//!
//! Failures are handled where they happen: auth failures notify and log
//! out, everything else shows a notice and leaves the session alone.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::auth::AuthStore;
use crate::client::ApiClient;
use crate::error::{ApiError, ErrorClass};
use crate::http::{HttpRequest, HttpResponse};
use crate::lifecycle::{ScopeGuard, ViewScope};
use crate::transport::TransportError;
use crate::types::{CreateTodo, EmailSummary, Todo, UpdateTodo};
use crate::validation::{require, ValidationError};
use crate::views::prompt::{Notice, Prompt};

pub const SESSION_EXPIRED: &str = "Session expired. Please login again.";

/// Concurrent deletions issued by `clear_completed`.
pub const CLEAR_WORKERS: usize = 4;

/// What `clear_completed` does when only some deletions succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearPolicy {
    /// Touch the cache only if every deletion succeeded.
    #[default]
    AllOrNothing,
    /// Drop the items the backend deleted, keep the rest.
    Reconcile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    All,
    Active,
    Completed,
}

impl Filter {
    pub fn matches(&self, todo: &Todo) -> bool {
        match self {
            Filter::All => true,
            Filter::Active => !todo.completed,
            Filter::Completed => todo.completed,
        }
    }

    pub fn empty_message(&self) -> &'static str {
        match self {
            Filter::All => "No todos yet. Add one above!",
            Filter::Active => "No active todos!",
            Filter::Completed => "No completed todos!",
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Filter::All => "all",
            Filter::Active => "active",
            Filter::Completed => "completed",
        })
    }
}

impl FromStr for Filter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Filter::All),
            "active" => Ok(Filter::Active),
            "completed" | "done" => Ok(Filter::Completed),
            other => Err(format!("unknown filter '{other}' (expected all, active or completed)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TodoStats {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
}

/// The single item currently being edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditBuffer {
    pub id: i64,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ClearReport {
    pub removed: Vec<i64>,
    pub failed: Vec<i64>,
}

#[derive(Debug, Error)]
pub enum ViewError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("not signed in")]
    SignedOut,
}

pub struct TodoView {
    auth: AuthStore,
    prompt: Arc<dyn Prompt>,
    scope: ViewScope,
    policy: ClearPolicy,
    todos: Vec<Todo>,
    filter: Filter,
    editing: Option<EditBuffer>,
    pub loading: bool,
    pub email_loading: bool,
}

impl TodoView {
    pub fn new(auth: AuthStore, prompt: Arc<dyn Prompt>) -> Self {
        Self {
            auth,
            prompt,
            scope: ViewScope::new(),
            policy: ClearPolicy::default(),
            todos: Vec::new(),
            filter: Filter::default(),
            editing: None,
            loading: false,
            email_loading: false,
        }
    }

    pub fn with_clear_policy(mut self, policy: ClearPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// A handle on this view's lifecycle, for code that tears it down.
    pub fn scope(&self) -> &ViewScope {
        &self.scope
    }

    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
    }

    pub fn filtered(&self) -> Vec<&Todo> {
        self.todos.iter().filter(|t| self.filter.matches(t)).collect()
    }

    pub fn stats(&self) -> TodoStats {
        let completed = self.todos.iter().filter(|t| t.completed).count();
        TodoStats {
            total: self.todos.len(),
            active: self.todos.len() - completed,
            completed,
        }
    }

    pub fn editing(&self) -> Option<&EditBuffer> {
        self.editing.as_ref()
    }

    pub fn edit_buffer_mut(&mut self) -> Option<&mut EditBuffer> {
        self.editing.as_mut()
    }

    /// Tear the view down; responses still in flight will be discarded.
    pub fn unmount(&mut self) {
        self.scope.cancel();
        self.editing = None;
    }

    pub fn fetch_todos(&mut self) -> Result<(), ViewError> {
        let token = self.token()?;
        let guard = self.scope.guard();
        self.loading = true;
        let request = self.client().build_list_todos(&token);
        let result = self.call(&guard, Ok(request), |c, r| c.parse_list_todos(r));
        if guard.is_current() {
            self.loading = false;
        }

        match result {
            Ok(todos) => {
                debug!(count = todos.len(), "fetched todos");
                self.todos = todos;
                Ok(())
            }
            Err(e) => {
                self.report(&e, "Failed to fetch todos. Please check your connection and try again.");
                Err(e.into())
            }
        }
    }

    pub fn create_todo(&mut self, title: &str, description: &str) -> Result<Todo, ViewError> {
        require(title, "Title is required")?;
        let token = self.token()?;
        let guard = self.scope.guard();
        let input = CreateTodo {
            title: title.trim().to_string(),
            description: description.trim().to_string(),
        };
        let request = self.client().build_create_todo(&token, &input);
        let result = self.call(&guard, request, |c, r| c.parse_create_todo(r));

        match result {
            Ok(created) => {
                match created.email_sent {
                    Some(true) => self.prompt.notify(Notice::success(
                        "Todo created and email notification sent successfully!",
                    )),
                    Some(false) => self.prompt.notify(Notice::warning(
                        "Todo created successfully! Email notification failed - please check email configuration.",
                    )),
                    None => {}
                }
                self.todos.insert(0, created.todo.clone());
                Ok(created.todo)
            }
            Err(e) => {
                self.report(&e, "Failed to create todo. Please try again.");
                Err(e.into())
            }
        }
    }

    /// Flip completion; the server's record replaces the cached one.
    pub fn toggle_todo(&mut self, id: i64, completed: bool) -> Result<Todo, ViewError> {
        let token = self.token()?;
        let guard = self.scope.guard();
        let request = self
            .client()
            .build_update_todo(&token, id, &UpdateTodo::completion(!completed));
        let result = self.call(&guard, request, |c, r| c.parse_update_todo(r));

        match result {
            Ok(todo) => {
                self.replace(todo.clone());
                Ok(todo)
            }
            Err(e) => {
                self.report(&e, "Failed to update todo. Please try again.");
                Err(e.into())
            }
        }
    }

    /// Start editing `id`, abandoning any other edit in progress.
    pub fn start_edit(&mut self, id: i64) -> bool {
        let Some(todo) = self.todos.iter().find(|t| t.id == id) else {
            return false;
        };
        self.editing = Some(EditBuffer {
            id,
            title: todo.title.clone(),
            description: todo.description.clone().unwrap_or_default(),
        });
        true
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Save the edit buffer. A blank title is a no-op and returns `Ok(None)`.
    pub fn save_edit(&mut self) -> Result<Option<Todo>, ViewError> {
        let Some(buffer) = self.editing.clone() else {
            return Ok(None);
        };
        if buffer.title.trim().is_empty() {
            return Ok(None);
        }
        let token = self.token()?;
        let guard = self.scope.guard();
        let request = self.client().build_update_todo(
            &token,
            buffer.id,
            &UpdateTodo::content(buffer.title, buffer.description),
        );
        let result = self.call(&guard, request, |c, r| c.parse_update_todo(r));

        match result {
            Ok(todo) => {
                self.replace(todo.clone());
                self.editing = None;
                Ok(Some(todo))
            }
            Err(e) => {
                self.report(&e, "Failed to update todo. Please try again.");
                Err(e.into())
            }
        }
    }

    /// Returns `Ok(false)` when the user declined the confirmation.
    pub fn delete_todo(&mut self, id: i64) -> Result<bool, ViewError> {
        if !self.prompt.confirm("Are you sure you want to delete this todo?") {
            return Ok(false);
        }
        let token = self.token()?;
        let guard = self.scope.guard();
        let request = self.client().build_delete_todo(&token, id);
        let result = self.call(&guard, Ok(request), |c, r| c.parse_delete_todo(r));

        match result {
            Ok(()) => {
                self.todos.retain(|t| t.id != id);
                if self.editing.as_ref().is_some_and(|b| b.id == id) {
                    self.editing = None;
                }
                Ok(true)
            }
            Err(e) => {
                self.report(&e, "Failed to delete todo. Please try again.");
                Err(e.into())
            }
        }
    }

    /// Delete every completed todo, at most `CLEAR_WORKERS` requests at a time.
    pub fn clear_completed(&mut self) -> Result<ClearReport, ViewError> {
        let ids: Vec<i64> = self
            .todos
            .iter()
            .filter(|t| t.completed)
            .map(|t| t.id)
            .collect();
        if ids.is_empty() {
            return Ok(ClearReport::default());
        }
        if !self
            .prompt
            .confirm(&format!("Delete {} completed todo(s)?", ids.len()))
        {
            return Ok(ClearReport::default());
        }

        let token = self.token()?;
        let guard = self.scope.guard();
        let gateway = self.auth.gateway();

        let next = AtomicUsize::new(0);
        let workers = ids.len().min(CLEAR_WORKERS);
        let mut outcomes: Vec<(i64, Result<(), ApiError>)> = thread::scope(|s| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    s.spawn(|| {
                        let client = gateway.client();
                        let mut done = Vec::new();
                        while let Some(&id) = ids.get(next.fetch_add(1, Ordering::Relaxed)) {
                            let outcome = gateway
                                .send(client.build_delete_todo(&token, id))
                                .and_then(|response| client.parse_delete_todo(response));
                            done.push((id, outcome));
                        }
                        done
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|handle| {
                    handle.join().unwrap_or_else(|_| {
                        warn!("deletion worker panicked");
                        Vec::new()
                    })
                })
                .collect()
        });
        // A panicked worker leaves ids without an outcome; count them as failed.
        for &id in &ids {
            if !outcomes.iter().any(|(done, _)| *done == id) {
                outcomes.push((
                    id,
                    Err(ApiError::Transport(TransportError::Connection(
                        "deletion worker panicked".to_string(),
                    ))),
                ));
            }
        }
        outcomes.sort_by_key(|(id, _)| ids.iter().position(|i| i == id));
        guard.check()?;

        let mut report = ClearReport::default();
        let mut auth_failure = None;
        for (id, outcome) in outcomes {
            match outcome {
                Ok(()) => report.removed.push(id),
                Err(e) => {
                    warn!(id, error = %e, "failed to delete completed todo");
                    if e.is_auth() && auth_failure.is_none() {
                        auth_failure = Some(e);
                    }
                    report.failed.push(id);
                }
            }
        }

        if report.failed.is_empty() {
            self.todos.retain(|t| !report.removed.contains(&t.id));
            return Ok(report);
        }

        match self.policy {
            ClearPolicy::AllOrNothing => {
                report.removed.clear();
                if let Some(e) = &auth_failure {
                    self.report(e, "");
                } else {
                    self.prompt.notify(Notice::error(
                        "Failed to clear completed todos. Please try again.",
                    ));
                }
            }
            ClearPolicy::Reconcile => {
                self.todos.retain(|t| !report.removed.contains(&t.id));
                if let Some(e) = &auth_failure {
                    self.report(e, "");
                } else {
                    self.prompt.notify(Notice::warning(format!(
                        "Deleted {} of {} completed todos; {} could not be deleted. Please try again.",
                        report.removed.len(),
                        report.removed.len() + report.failed.len(),
                        report.failed.len()
                    )));
                }
            }
        }
        Ok(report)
    }

    pub fn send_email_summary(&mut self) -> Result<EmailSummary, ViewError> {
        let token = self.token()?;
        let guard = self.scope.guard();
        self.email_loading = true;
        let request = self.client().build_send_email_summary(&token);
        let result = self.call(&guard, Ok(request), |c, r| c.parse_send_email_summary(r));
        if guard.is_current() {
            self.email_loading = false;
        }

        match result {
            Ok(summary) => {
                self.prompt.notify(Notice::success(format!(
                    "Email summary sent successfully!\nActive tasks: {}\nSent to: {}\nTime: {}",
                    summary.active_tasks_count,
                    summary.email,
                    summary.sent_at.format("%B %d, %Y at %I:%M %p")
                )));
                Ok(summary)
            }
            Err(e) if e.class() == ErrorClass::Domain && e.status() == Some(400) => {
                self.prompt.notify(Notice::error(
                    "Email configuration not set up. Please configure your email settings to send notifications.",
                ));
                Err(e.into())
            }
            Err(e) => {
                self.report(
                    &e,
                    "Failed to send email summary. Please check your email configuration and try again.",
                );
                Err(e.into())
            }
        }
    }

    /// The header's logout button. Returns whether the user logged out.
    pub fn logout_with_confirmation(&mut self) -> bool {
        if !self.prompt.confirm("Are you sure you want to logout?") {
            return false;
        }
        self.unmount();
        self.auth.logout();
        true
    }

    fn client(&self) -> &ApiClient {
        self.auth.gateway().client()
    }

    fn token(&self) -> Result<String, ViewError> {
        self.auth.session().token().ok_or(ViewError::SignedOut)
    }

    fn call<T>(
        &self,
        guard: &ScopeGuard,
        request: Result<HttpRequest, ApiError>,
        parse: impl FnOnce(&ApiClient, HttpResponse) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let gateway = self.auth.gateway();
        let result = request
            .and_then(|request| gateway.send(request))
            .and_then(|response| parse(gateway.client(), response));
        guard.check()?;
        result
    }

    fn replace(&mut self, todo: Todo) {
        if let Some(slot) = self.todos.iter_mut().find(|t| t.id == todo.id) {
            *slot = todo;
        }
    }

    fn report(&self, error: &ApiError, fallback: &str) {
        if matches!(error, ApiError::Cancelled) {
            return;
        }
        match error.class() {
            ErrorClass::Auth => {
                let message = error.backend_message().unwrap_or(SESSION_EXPIRED);
                self.prompt.notify(Notice::error(message));
                // Already ended by the expiry interceptor when the token is gone.
                if self.auth.session().token().is_some() {
                    self.auth.logout();
                }
            }
            ErrorClass::Domain | ErrorClass::Network => {
                warn!(error = %error, "todo request failed");
                self.prompt.notify(Notice::error(fallback));
            }
        }
    }
}
