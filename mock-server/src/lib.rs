//! In-memory stand-in for the todo REST backend.
//!
//! Mirrors the production wire format: JSON bodies, bearer-token auth with
//! `{msg}` errors (401 expired/revoked, 422 invalid) and `{error}` bodies for
//! everything else. Mail is never sent; it lands in an outbox tests can read
//! through `MockBackend`.

mod state;

use axum::{
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::{debug, info};

pub use state::{Mail, MockBackend, Todo, User, RESET_TOKEN_TTL_SECS};
use state::TokenRejection;

/// Google credentials accepted by the mock look like `google-id-token:<email>`.
pub const GOOGLE_CREDENTIAL_PREFIX: &str = "google-id-token:";

/// A refused request: status plus JSON body.
#[derive(Debug)]
pub struct Failure {
    status: StatusCode,
    body: Value,
}

impl Failure {
    fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "error": message.into() }),
        }
    }

    fn token(status: StatusCode, message: &str) -> Self {
        Self {
            status,
            body: json!({ "msg": message }),
        }
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

type Reply = Result<Response, Failure>;

#[derive(Deserialize, Default)]
#[serde(default)]
struct Credentials {
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct TokenBody {
    token: Option<String>,
    email: Option<String>,
    password: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct TodoBody {
    title: Option<String>,
    description: Option<String>,
    completed: Option<bool>,
}

pub fn app() -> Router {
    app_with(MockBackend::default())
}

pub fn app_with(backend: MockBackend) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/register", post(register))
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
        .route("/api/me", get(me))
        .route("/api/auth/google", post(google_auth))
        .route("/api/forgot-password", post(forgot_password))
        .route("/api/verify-reset-token", post(verify_reset_token))
        .route("/api/reset-password", post(reset_password))
        .route("/api/todos", get(list_todos).post(create_todo))
        .route("/api/todos/{id}", put(update_todo).delete(delete_todo))
        .route("/api/send-email-summary", post(send_email_summary))
        .with_state(backend)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with(listener, MockBackend::default()).await
}

pub async fn run_with(listener: TcpListener, backend: MockBackend) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(backend)).await
}

/// The bearer token from `headers` and the user it belongs to.
fn authenticate(backend: &MockBackend, headers: &HeaderMap) -> Result<(String, i64), Failure> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Err(Failure::token(
            StatusCode::UNAUTHORIZED,
            "Missing Authorization Header",
        ));
    };
    let token = value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| {
            Failure::token(
                StatusCode::UNPROCESSABLE_ENTITY,
                "Bad Authorization header. Expected 'Authorization: Bearer <JWT>'",
            )
        })?;

    match backend.lock().resolve_token(token) {
        Ok(user_id) => Ok((token.to_string(), user_id)),
        Err(TokenRejection::Expired) => {
            Err(Failure::token(StatusCode::UNAUTHORIZED, "Token has expired"))
        }
        Err(TokenRejection::Revoked) => {
            Err(Failure::token(StatusCode::UNAUTHORIZED, "Token has been revoked"))
        }
        Err(TokenRejection::Unknown) => {
            Err(Failure::token(StatusCode::UNPROCESSABLE_ENTITY, "Invalid token"))
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

async fn register(State(backend): State<MockBackend>, Json(input): Json<Credentials>) -> Reply {
    let (Some(username), Some(email), Some(password)) = (
        present(&input.username),
        present(&input.email),
        present(&input.password),
    ) else {
        return Err(Failure::error(
            StatusCode::BAD_REQUEST,
            "Username, email, and password are required",
        ));
    };

    let mut db = backend.lock();
    if db.username_taken(username) {
        return Err(Failure::error(StatusCode::BAD_REQUEST, "Username already exists"));
    }
    if db.user_by_email(email).is_some() {
        return Err(Failure::error(StatusCode::BAD_REQUEST, "Email already exists"));
    }
    let user = db.create_user(username, email, Some(password), "local");
    let token = db.issue_token(user.id);
    info!(user_id = user.id, username, "registered user");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully",
            "access_token": token,
            "user": user,
        })),
    )
        .into_response())
}

async fn login(State(backend): State<MockBackend>, Json(input): Json<Credentials>) -> Reply {
    let (Some(login), Some(password)) = (present(&input.username), present(&input.password))
    else {
        return Err(Failure::error(
            StatusCode::BAD_REQUEST,
            "Username and password are required",
        ));
    };

    let mut db = backend.lock();
    let user = db
        .user_by_name_or_email(login)
        .filter(|u| db.check_password(u.id, password))
        .cloned()
        .ok_or_else(|| Failure::error(StatusCode::UNAUTHORIZED, "Invalid credentials"))?;
    let token = db.issue_token(user.id);
    debug!(user_id = user.id, "login");

    Ok(Json(json!({
        "message": "Login successful",
        "access_token": token,
        "user": user,
    }))
    .into_response())
}

async fn logout(State(backend): State<MockBackend>, headers: HeaderMap) -> Reply {
    let (token, user_id) = authenticate(&backend, &headers)?;
    backend.lock().revoke(&token);
    debug!(user_id, "revoked token");
    Ok(Json(json!({ "message": "Successfully logged out" })).into_response())
}

async fn me(State(backend): State<MockBackend>, headers: HeaderMap) -> Reply {
    let (_, user_id) = authenticate(&backend, &headers)?;
    let db = backend.lock();
    let user = db
        .user(user_id)
        .ok_or_else(|| Failure::error(StatusCode::NOT_FOUND, "User not found"))?;
    Ok(Json(json!({ "user": user })).into_response())
}

async fn google_auth(State(backend): State<MockBackend>, Json(input): Json<TokenBody>) -> Reply {
    let Some(credential) = present(&input.token) else {
        return Err(Failure::error(StatusCode::BAD_REQUEST, "Google token is required"));
    };
    let email = credential
        .strip_prefix(GOOGLE_CREDENTIAL_PREFIX)
        .filter(|email| email.contains('@'))
        .ok_or_else(|| Failure::error(StatusCode::BAD_REQUEST, "Invalid Google token"))?;

    let mut db = backend.lock();
    if let Some(existing) = db.user_by_email(email).cloned() {
        if existing.auth_provider != "google" {
            return Err(Failure::error(
                StatusCode::BAD_REQUEST,
                "An account with this email already exists. Please login with your password.",
            ));
        }
        let token = db.issue_token(existing.id);
        return Ok(Json(json!({
            "access_token": token,
            "user": existing,
            "message": "Login successful",
        }))
        .into_response());
    }

    let base = email
        .split('@')
        .next()
        .unwrap_or(email)
        .to_lowercase()
        .replace(' ', "_");
    let mut username = base.clone();
    let mut counter = 1;
    while db.username_taken(&username) {
        username = format!("{base}_{counter}");
        counter += 1;
    }
    let user = db.create_user(&username, email, None, "google");
    let token = db.issue_token(user.id);
    info!(user_id = user.id, %username, "registered google user");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "access_token": token,
            "user": user,
            "message": "User registered successfully",
        })),
    )
        .into_response())
}

async fn forgot_password(State(backend): State<MockBackend>, Json(input): Json<TokenBody>) -> Reply {
    let Some(email) = present(&input.email) else {
        return Err(Failure::error(StatusCode::BAD_REQUEST, "Email is required"));
    };
    const GENERIC: &str =
        "If an account with that email exists, a password reset link has been sent.";

    let mut db = backend.lock();
    let Some(user) = db.user_by_email(email).cloned() else {
        return Ok(Json(json!({ "message": GENERIC, "email_sent": false })).into_response());
    };
    if user.auth_provider != "local" {
        let provider = &user.auth_provider;
        return Err(Failure {
            status: StatusCode::BAD_REQUEST,
            body: json!({
                "error": format!("This account uses {provider} authentication. Please use {provider} to sign in."),
                "email_sent": false,
            }),
        });
    }

    let token = db.issue_reset_token(&user.email);
    let email_sent = db.send_mail(Mail {
        to: user.email.clone(),
        subject: "Password Reset Request".to_string(),
        reset_token: Some(token),
    });
    Ok(Json(json!({ "message": GENERIC, "email_sent": email_sent })).into_response())
}

async fn verify_reset_token(
    State(backend): State<MockBackend>,
    Json(input): Json<TokenBody>,
) -> Reply {
    let Some(token) = present(&input.token) else {
        return Err(Failure::error(StatusCode::BAD_REQUEST, "Token is required"));
    };
    let db = backend.lock();
    let Some(email) = db.reset_email(token) else {
        return Err(Failure {
            status: StatusCode::BAD_REQUEST,
            body: json!({ "valid": false, "error": "Invalid or expired reset token" }),
        });
    };
    let Some(user) = db.user_by_email(&email) else {
        return Err(Failure {
            status: StatusCode::NOT_FOUND,
            body: json!({ "valid": false, "error": "User not found" }),
        });
    };
    Ok(Json(json!({ "valid": true, "email": email, "username": user.username })).into_response())
}

async fn reset_password(State(backend): State<MockBackend>, Json(input): Json<TokenBody>) -> Reply {
    let (Some(token), Some(password)) = (present(&input.token), present(&input.password)) else {
        return Err(Failure::error(
            StatusCode::BAD_REQUEST,
            "Token and new password are required",
        ));
    };
    if password.chars().count() < 6 {
        return Err(Failure::error(
            StatusCode::BAD_REQUEST,
            "Password must be at least 6 characters long",
        ));
    }

    let mut db = backend.lock();
    let email = db
        .reset_email(token)
        .ok_or_else(|| Failure::error(StatusCode::BAD_REQUEST, "Invalid or expired reset token"))?;
    let user = db
        .user_by_email(&email)
        .cloned()
        .ok_or_else(|| Failure::error(StatusCode::NOT_FOUND, "User not found"))?;
    if user.auth_provider != "local" {
        return Err(Failure::error(
            StatusCode::BAD_REQUEST,
            format!(
                "This account uses {} authentication. Password cannot be reset.",
                user.auth_provider
            ),
        ));
    }
    db.set_password(user.id, password);
    db.consume_reset_token(token);
    info!(user_id = user.id, "password reset");

    Ok(Json(json!({
        "message": "Password has been reset successfully. You can now login with your new password.",
        "success": true,
    }))
    .into_response())
}

async fn list_todos(State(backend): State<MockBackend>, headers: HeaderMap) -> Reply {
    let (_, user_id) = authenticate(&backend, &headers)?;
    let todos = backend.lock().todos_for(user_id);
    Ok(Json(todos).into_response())
}

async fn create_todo(
    State(backend): State<MockBackend>,
    headers: HeaderMap,
    Json(input): Json<TodoBody>,
) -> Reply {
    let (_, user_id) = authenticate(&backend, &headers)?;
    let Some(title) = present(&input.title) else {
        return Err(Failure::error(StatusCode::BAD_REQUEST, "Title is required"));
    };

    let mut db = backend.lock();
    let user = db
        .user(user_id)
        .cloned()
        .ok_or_else(|| Failure::error(StatusCode::NOT_FOUND, "User not found"))?;
    let todo = db.create_todo(user_id, title, input.description.as_deref().unwrap_or(""));
    let email_sent = db.send_mail(Mail {
        to: user.email,
        subject: format!("New Todo Created: {}", todo.title),
        reset_token: None,
    });

    let mut body = json!(todo);
    body["email_sent"] = json!(email_sent);
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

async fn update_todo(
    State(backend): State<MockBackend>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(input): Json<TodoBody>,
) -> Reply {
    let (_, user_id) = authenticate(&backend, &headers)?;
    let mut db = backend.lock();
    let todo = db
        .todo_mut(user_id, id)
        .ok_or_else(|| Failure::error(StatusCode::NOT_FOUND, "Todo not found"))?;

    if let Some(title) = input.title {
        todo.title = title;
    }
    if let Some(description) = input.description {
        todo.description = Some(description);
    }
    if let Some(completed) = input.completed {
        todo.completed = completed;
    }
    todo.updated_at = Utc::now().naive_utc();
    Ok(Json(todo.clone()).into_response())
}

async fn delete_todo(
    State(backend): State<MockBackend>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Reply {
    let (_, user_id) = authenticate(&backend, &headers)?;
    if !backend.lock().delete_todo(user_id, id) {
        return Err(Failure::error(StatusCode::NOT_FOUND, "Todo not found"));
    }
    Ok(Json(json!({ "message": "Todo deleted successfully" })).into_response())
}

async fn send_email_summary(State(backend): State<MockBackend>, headers: HeaderMap) -> Reply {
    let (_, user_id) = authenticate(&backend, &headers)?;
    let mut db = backend.lock();
    let user = db
        .user(user_id)
        .cloned()
        .ok_or_else(|| Failure::error(StatusCode::NOT_FOUND, "User not found"))?;
    if !db.mail_configured {
        return Err(Failure {
            status: StatusCode::BAD_REQUEST,
            body: json!({
                "error": "Email configuration not set up",
                "message": "Please configure email settings to send notifications",
            }),
        });
    }

    let active = db
        .todos_for(user_id)
        .iter()
        .filter(|t| !t.completed)
        .count();
    db.send_mail(Mail {
        to: user.email.clone(),
        subject: format!("Todo Summary: {active} Active Tasks | Sent on Demand"),
        reset_token: None,
    });

    Ok(Json(json!({
        "message": "Email summary sent successfully",
        "email": user.email,
        "active_tasks_count": active,
        "sent_at": Utc::now().naive_utc(),
    }))
    .into_response())
}
