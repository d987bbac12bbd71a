use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::{app, app_with, MockBackend, Todo};
use serde_json::Value;
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: &str) -> Request<String> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(body.to_string()).unwrap()
}

fn authed(method: &str, uri: &str, token: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::AUTHORIZATION, format!("Bearer {token}"))
        .body(String::new())
        .unwrap()
}

/// Register `username` and return its access token.
async fn register(app: &Router, username: &str) -> String {
    let body = format!(
        r#"{{"username":"{username}","email":"{username}@example.com","password":"secret1"}}"#
    );
    let resp = app
        .clone()
        .oneshot(json_request("POST", "/api/register", None, &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let json: Value = body_json(resp).await;
    json["access_token"].as_str().unwrap().to_string()
}

// --- health ---

#[tokio::test]
async fn health_reports_healthy() {
    let resp = app()
        .oneshot(Request::builder().uri("/api/health").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json: Value = body_json(resp).await;
    assert_eq!(json["status"], "healthy");
}

// --- auth ---

#[tokio::test]
async fn register_returns_201_with_token_and_user() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/api/register",
            None,
            r#"{"username":"alice","email":"alice@example.com","password":"secret1"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let json: Value = body_json(resp).await;
    assert_eq!(json["access_token"].as_str().unwrap().len(), 64);
    assert_eq!(json["user"]["username"], "alice");
    assert_eq!(json["user"]["auth_provider"], "local");
}

#[tokio::test]
async fn register_rejects_duplicates_and_missing_fields() {
    let app = app();
    register(&app, "alice").await;

    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/register",
            None,
            r#"{"username":"alice","email":"other@example.com","password":"secret1"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json: Value = body_json(resp).await;
    assert_eq!(json["error"], "Username already exists");

    let resp = app
        .oneshot(json_request("POST", "/api/register", None, r#"{"username":"bob"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_accepts_username_or_email() {
    let app = app();
    register(&app, "alice").await;

    for login in ["alice", "alice@example.com"] {
        let body = format!(r#"{{"username":"{login}","password":"secret1"}}"#);
        let resp = app
            .clone()
            .oneshot(json_request("POST", "/api/login", None, &body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "login as {login}");
    }

    let resp = app
        .oneshot(json_request(
            "POST",
            "/api/login",
            None,
            r#"{"username":"alice","password":"wrong"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let json: Value = body_json(resp).await;
    assert_eq!(json["error"], "Invalid credentials");
}

#[tokio::test]
async fn token_errors_use_msg_field() {
    let backend = MockBackend::default();
    let app = app_with(backend.clone());
    let token = register(&app, "alice").await;

    let resp = app
        .clone()
        .oneshot(Request::builder().uri("/api/me").body(String::new()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let json: Value = body_json(resp).await;
    assert_eq!(json["msg"], "Missing Authorization Header");

    let resp = app
        .clone()
        .oneshot(authed("GET", "/api/me", "garbage"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json: Value = body_json(resp).await;
    assert_eq!(json["msg"], "Invalid token");

    assert!(backend.expire_token(&token));
    let resp = app.oneshot(authed("GET", "/api/me", &token)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let json: Value = body_json(resp).await;
    assert_eq!(json["msg"], "Token has expired");
}

#[tokio::test]
async fn logout_revokes_the_token() {
    let app = app();
    let token = register(&app, "alice").await;

    let resp = app
        .clone()
        .oneshot(authed("POST", "/api/logout", &token))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app.oneshot(authed("GET", "/api/todos", &token)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let json: Value = body_json(resp).await;
    assert_eq!(json["msg"], "Token has been revoked");
}

#[tokio::test]
async fn me_returns_wrapped_user() {
    let app = app();
    let token = register(&app, "alice").await;

    let resp = app.oneshot(authed("GET", "/api/me", &token)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json: Value = body_json(resp).await;
    assert_eq!(json["user"]["email"], "alice@example.com");
}

#[tokio::test]
async fn google_creates_then_logs_in() {
    let app = app();
    let credential = r#"{"token":"google-id-token:gina@example.com"}"#;

    let resp = app
        .clone()
        .oneshot(json_request("POST", "/api/auth/google", None, credential))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let json: Value = body_json(resp).await;
    assert_eq!(json["user"]["auth_provider"], "google");
    assert_eq!(json["user"]["username"], "gina");

    let resp = app
        .clone()
        .oneshot(json_request("POST", "/api/auth/google", None, credential))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .oneshot(json_request("POST", "/api/auth/google", None, r#"{"token":"nonsense"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json: Value = body_json(resp).await;
    assert_eq!(json["error"], "Invalid Google token");
}

#[tokio::test]
async fn google_refuses_email_of_local_account() {
    let app = app();
    register(&app, "alice").await;

    let resp = app
        .oneshot(json_request(
            "POST",
            "/api/auth/google",
            None,
            r#"{"token":"google-id-token:alice@example.com"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- password reset ---

#[tokio::test]
async fn reset_flow_with_single_use_token() {
    let backend = MockBackend::new(true);
    let app = app_with(backend.clone());
    register(&app, "alice").await;

    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/forgot-password",
            None,
            r#"{"email":"alice@example.com"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json: Value = body_json(resp).await;
    assert_eq!(json["email_sent"], true);
    let reset = backend.last_reset_token().unwrap();

    let verify = format!(r#"{{"token":"{reset}"}}"#);
    let resp = app
        .clone()
        .oneshot(json_request("POST", "/api/verify-reset-token", None, &verify))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json: Value = body_json(resp).await;
    assert_eq!(json["valid"], true);
    assert_eq!(json["username"], "alice");

    let body = format!(r#"{{"token":"{reset}","password":"newpass1"}}"#);
    let resp = app
        .clone()
        .oneshot(json_request("POST", "/api/reset-password", None, &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/login",
            None,
            r#"{"username":"alice","password":"newpass1"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .oneshot(json_request("POST", "/api/verify-reset-token", None, &verify))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json: Value = body_json(resp).await;
    assert_eq!(json["valid"], false);
    assert_eq!(json["error"], "Invalid or expired reset token");
}

#[tokio::test]
async fn expired_reset_token_is_rejected() {
    let backend = MockBackend::new(true);
    let app = app_with(backend.clone());
    register(&app, "alice").await;
    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/forgot-password",
            None,
            r#"{"email":"alice@example.com"}"#,
        ))
        .await
        .unwrap();
    let reset = backend.last_reset_token().unwrap();
    backend.expire_reset_tokens();

    let body = format!(r#"{{"token":"{reset}","password":"newpass1"}}"#);
    let resp = app
        .oneshot(json_request("POST", "/api/reset-password", None, &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn forgot_password_does_not_reveal_unknown_email() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/api/forgot-password",
            None,
            r#"{"email":"ghost@example.com"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json: Value = body_json(resp).await;
    assert_eq!(json["email_sent"], false);
}

// --- todos ---

#[tokio::test]
async fn todos_require_auth() {
    let resp = app()
        .oneshot(Request::builder().uri("/api/todos").body(String::new()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_todo_returns_201_with_email_status() {
    let app = app();
    let token = register(&app, "alice").await;

    let resp = app
        .oneshot(json_request(
            "POST",
            "/api/todos",
            Some(&token),
            r#"{"title":"Buy milk","description":"2 litres"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let json: Value = body_json(resp).await;
    assert_eq!(json["title"], "Buy milk");
    assert_eq!(json["completed"], false);
    assert_eq!(json["email_sent"], false);
}

#[tokio::test]
async fn create_todo_without_title_returns_400() {
    let app = app();
    let token = register(&app, "alice").await;

    let resp = app
        .oneshot(json_request("POST", "/api/todos", Some(&token), r#"{"title":""}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json: Value = body_json(resp).await;
    assert_eq!(json["error"], "Title is required");
}

#[tokio::test]
async fn todos_are_private_to_their_owner() {
    let app = app();
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;

    let resp = app
        .clone()
        .oneshot(json_request("POST", "/api/todos", Some(&alice), r#"{"title":"secret"}"#))
        .await
        .unwrap();
    let todo: Todo = body_json(resp).await;

    let resp = app
        .clone()
        .oneshot(authed("DELETE", &format!("/api/todos/{}", todo.id), &bob))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let json: Value = body_json(resp).await;
    assert_eq!(json["error"], "Todo not found");

    let resp = app.oneshot(authed("GET", "/api/todos", &bob)).await.unwrap();
    let todos: Vec<Todo> = body_json(resp).await;
    assert!(todos.is_empty());
}

#[tokio::test]
async fn update_todo_not_found() {
    let app = app();
    let token = register(&app, "alice").await;

    let resp = app
        .oneshot(json_request(
            "PUT",
            "/api/todos/999",
            Some(&token),
            r#"{"completed":true}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn email_summary_needs_mail_configuration() {
    let backend = MockBackend::new(false);
    let app = app_with(backend.clone());
    let token = register(&app, "alice").await;

    let resp = app
        .clone()
        .oneshot(authed("POST", "/api/send-email-summary", &token))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json: Value = body_json(resp).await;
    assert_eq!(json["error"], "Email configuration not set up");

    backend.set_mail_configured(true);
    app.clone()
        .oneshot(json_request("POST", "/api/todos", Some(&token), r#"{"title":"a"}"#))
        .await
        .unwrap();
    let resp = app
        .oneshot(authed("POST", "/api/send-email-summary", &token))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json: Value = body_json(resp).await;
    assert_eq!(json["active_tasks_count"], 1);
    assert_eq!(json["email"], "alice@example.com");
    assert_eq!(backend.outbox().len(), 2);
}

// --- full lifecycle ---

#[tokio::test]
async fn crud_lifecycle() {
    let app = app();
    let token = register(&app, "alice").await;

    // Create two; list comes back newest first.
    for title in ["first", "second"] {
        let body = format!(r#"{{"title":"{title}"}}"#);
        let resp = app
            .clone()
            .oneshot(json_request("POST", "/api/todos", Some(&token), &body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
    }
    let resp = app
        .clone()
        .oneshot(authed("GET", "/api/todos", &token))
        .await
        .unwrap();
    let todos: Vec<Todo> = body_json(resp).await;
    let titles: Vec<&str> = todos.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["second", "first"]);
    let id = todos[1].id;

    // Toggle.
    let resp = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/todos/{id}"),
            Some(&token),
            r#"{"completed":true}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Todo = body_json(resp).await;
    assert!(updated.completed);
    assert_eq!(updated.title, "first");
    assert!(updated.updated_at >= updated.created_at);

    // Delete.
    let resp = app
        .clone()
        .oneshot(authed("DELETE", &format!("/api/todos/{id}"), &token))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(!body_bytes(resp).await.is_empty());

    let resp = app.oneshot(authed("GET", "/api/todos", &token)).await.unwrap();
    let todos: Vec<Todo> = body_json(resp).await;
    assert_eq!(todos.len(), 1);
}
