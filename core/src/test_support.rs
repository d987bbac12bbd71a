//! Scripted transport and fixtures shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::auth::AuthStore;
use crate::client::ApiClient;
use crate::gateway::Gateway;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::interceptor::SessionExpiryInterceptor;
use crate::session::SessionStore;
use crate::storage::MemoryStorage;
use crate::transport::{Transport, TransportError};
use crate::types::User;

pub const BASE_URL: &str = "http://localhost:5000";

/// 64 characters, comfortably above the corruption threshold.
pub const VALID_TOKEN: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

enum Reply {
    Response(u16, String),
    Fail,
}

/// Replies are queued per (method, path) and consumed in order, so
/// concurrent requests to different paths get deterministic answers.
#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<HashMap<(HttpMethod, String), VecDeque<Reply>>>,
    requests: Mutex<Vec<HttpRequest>>,
    on_execute: Mutex<Option<Arc<dyn Fn() + Send + Sync>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, method: HttpMethod, path: &str, status: u16, body: &str) {
        self.push(method, path, Reply::Response(status, body.to_string()));
    }

    pub fn fail(&self, method: HttpMethod, path: &str) {
        self.push(method, path, Reply::Fail);
    }

    /// Run `hook` while each request is "in flight", before its reply is returned.
    pub fn on_execute(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.on_execute.lock().unwrap() = Some(Arc::new(hook));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn push(&self, method: HttpMethod, path: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
    }
}

impl Transport for MockTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        // Cloned out so concurrent requests do not serialize on the lock.
        let hook = self.on_execute.lock().unwrap().clone();
        if let Some(hook) = hook {
            hook();
        }
        let path = request
            .path
            .strip_prefix(BASE_URL)
            .unwrap_or(&request.path)
            .to_string();
        let reply = self
            .replies
            .lock()
            .unwrap()
            .get_mut(&(request.method, path.clone()))
            .and_then(|queue| queue.pop_front());
        match reply {
            Some(Reply::Response(status, body)) => Ok(HttpResponse {
                status,
                headers: Vec::new(),
                body,
            }),
            Some(Reply::Fail) => Err(TransportError::Connection("connection refused".to_string())),
            None => Err(TransportError::Connection(format!(
                "no scripted reply for {} {path}",
                request.method.as_str()
            ))),
        }
    }
}

pub struct Harness {
    pub storage: Arc<MemoryStorage>,
    pub transport: Arc<MockTransport>,
    pub session: SessionStore,
    pub gateway: Gateway,
    pub auth: AuthStore,
}

/// Wires storage, session, gateway (with the expiry interceptor) and auth
/// store the same way `AppContext` does.
pub fn harness(storage: MemoryStorage) -> Harness {
    let storage = Arc::new(storage);
    let transport = Arc::new(MockTransport::new());
    let session = SessionStore::new(storage.clone());
    let gateway = Gateway::builder(ApiClient::new(BASE_URL), transport.clone())
        .interceptor(SessionExpiryInterceptor::new(session.clone()))
        .build();
    let auth = AuthStore::new(gateway.clone(), session.clone());
    Harness {
        storage,
        transport,
        session,
        gateway,
        auth,
    }
}

/// A harness whose session is already authenticated as user 1.
pub fn signed_in() -> Harness {
    let h = harness(MemoryStorage::new());
    h.session.establish(VALID_TOKEN, user(1, "alice"));
    h
}

pub fn user(id: i64, username: &str) -> User {
    User {
        id,
        username: username.to_string(),
        email: Some(format!("{username}@example.com")),
        profile_picture: None,
        auth_provider: Some("local".to_string()),
        created_at: None,
    }
}

pub fn user_json(id: i64, username: &str) -> String {
    format!(
        r#"{{"id":{id},"username":"{username}","email":"{username}@example.com","auth_provider":"local","created_at":"2024-05-01T09:30:00"}}"#
    )
}

pub fn auth_json(token: &str, id: i64, username: &str) -> String {
    format!(
        r#"{{"access_token":"{token}","user":{}}}"#,
        user_json(id, username)
    )
}

pub fn todo_json(id: i64, title: &str, completed: bool) -> String {
    format!(
        r#"{{"id":{id},"title":"{title}","description":"","completed":{completed},"created_at":"2024-05-01T09:30:00","updated_at":"2024-05-01T09:30:00","user_id":1}}"#
    )
}
