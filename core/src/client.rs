//! Stateless HTTP request builder and response parser for the todo API.
//!
//! # Design
//! `ApiClient` holds only a `base_url` and carries no mutable state between
//! calls. Each endpoint is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//! Authenticated builders take the bearer token as an argument; the caller
//! decides which session's token goes on the wire.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ApiError, ErrorBody};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{
    AuthResponse, CreateTodo, CreatedTodo, EmailSummary, ForgotPasswordRequest,
    ForgotPasswordResponse, GoogleAuthRequest, LoginRequest, MeResponse, MessageResponse,
    RegisterRequest, ResetPasswordRequest, Todo, UpdateTodo, User, VerifyResetTokenRequest,
    VerifyResetTokenResponse,
};

/// Synchronous, stateless client for the todo API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // --- auth ---

    pub fn build_login(&self, input: &LoginRequest) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/api/login", None, input)
    }

    pub fn parse_login(&self, response: HttpResponse) -> Result<AuthResponse, ApiError> {
        check_status(&response, 200)?;
        decode(&response)
    }

    pub fn build_register(&self, input: &RegisterRequest) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/api/register", None, input)
    }

    pub fn parse_register(&self, response: HttpResponse) -> Result<AuthResponse, ApiError> {
        check_status(&response, 201)?;
        decode(&response)
    }

    pub fn build_google_auth(&self, input: &GoogleAuthRequest) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/api/auth/google", None, input)
    }

    /// 201 when the Google account was seen for the first time, 200 otherwise.
    pub fn parse_google_auth(&self, response: HttpResponse) -> Result<AuthResponse, ApiError> {
        if response.status != 201 {
            check_status(&response, 200)?;
        }
        decode(&response)
    }

    pub fn build_logout(&self, token: &str) -> HttpRequest {
        self.request(HttpMethod::Post, "/api/logout", Some(token))
    }

    pub fn parse_logout(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response, 200)
    }

    pub fn build_me(&self, token: &str) -> HttpRequest {
        self.request(HttpMethod::Get, "/api/me", Some(token))
    }

    pub fn parse_me(&self, response: HttpResponse) -> Result<User, ApiError> {
        check_status(&response, 200)?;
        decode::<MeResponse>(&response).map(|me| me.user)
    }

    // --- password reset ---

    pub fn build_forgot_password(
        &self,
        input: &ForgotPasswordRequest,
    ) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/api/forgot-password", None, input)
    }

    pub fn parse_forgot_password(
        &self,
        response: HttpResponse,
    ) -> Result<ForgotPasswordResponse, ApiError> {
        check_status(&response, 200)?;
        decode(&response)
    }

    pub fn build_verify_reset_token(
        &self,
        input: &VerifyResetTokenRequest,
    ) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/api/verify-reset-token", None, input)
    }

    /// Only a 200 counts as a verdict; the backend reports invalid tokens
    /// with 400/404 and an `error` field, which surfaces as `ApiError`.
    pub fn parse_verify_reset_token(
        &self,
        response: HttpResponse,
    ) -> Result<VerifyResetTokenResponse, ApiError> {
        check_status(&response, 200)?;
        decode(&response)
    }

    pub fn build_reset_password(
        &self,
        input: &ResetPasswordRequest,
    ) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/api/reset-password", None, input)
    }

    pub fn parse_reset_password(&self, response: HttpResponse) -> Result<MessageResponse, ApiError> {
        check_status(&response, 200)?;
        decode(&response)
    }

    // --- todos ---

    pub fn build_list_todos(&self, token: &str) -> HttpRequest {
        self.request(HttpMethod::Get, "/api/todos", Some(token))
    }

    pub fn parse_list_todos(&self, response: HttpResponse) -> Result<Vec<Todo>, ApiError> {
        check_status(&response, 200)?;
        decode(&response)
    }

    pub fn build_create_todo(&self, token: &str, input: &CreateTodo) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/api/todos", Some(token), input)
    }

    pub fn parse_create_todo(&self, response: HttpResponse) -> Result<CreatedTodo, ApiError> {
        check_status(&response, 201)?;
        decode(&response)
    }

    pub fn build_update_todo(
        &self,
        token: &str,
        id: i64,
        input: &UpdateTodo,
    ) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Put, &format!("/api/todos/{id}"), Some(token), input)
    }

    pub fn parse_update_todo(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        check_status(&response, 200)?;
        decode(&response)
    }

    pub fn build_delete_todo(&self, token: &str, id: i64) -> HttpRequest {
        self.request(HttpMethod::Delete, &format!("/api/todos/{id}"), Some(token))
    }

    pub fn parse_delete_todo(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response, 200)
    }

    pub fn build_send_email_summary(&self, token: &str) -> HttpRequest {
        self.request(HttpMethod::Post, "/api/send-email-summary", Some(token))
    }

    pub fn parse_send_email_summary(&self, response: HttpResponse) -> Result<EmailSummary, ApiError> {
        check_status(&response, 200)?;
        decode(&response)
    }

    // --- helpers ---

    fn request(&self, method: HttpMethod, path: &str, token: Option<&str>) -> HttpRequest {
        let mut headers = Vec::new();
        if let Some(token) = token {
            headers.push(("authorization".to_string(), format!("Bearer {token}")));
        }
        HttpRequest {
            method,
            path: format!("{}{path}", self.base_url),
            headers,
            body: None,
        }
    }

    fn json_request<T: Serialize>(
        &self,
        method: HttpMethod,
        path: &str,
        token: Option<&str>,
        input: &T,
    ) -> Result<HttpRequest, ApiError> {
        let body =
            serde_json::to_string(input).map_err(|e| ApiError::SerializationError(e.to_string()))?;
        let mut request = self.request(method, path, token);
        request
            .headers
            .push(("content-type".to_string(), "application/json".to_string()));
        request.body = Some(body);
        Ok(request)
    }
}

fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    serde_json::from_str(&response.body).map_err(|e| ApiError::DeserializationError(e.to_string()))
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse, expected: u16) -> Result<(), ApiError> {
    if response.status == expected {
        return Ok(());
    }
    let body = ErrorBody::parse(&response.body);
    if response.is_auth_failure() {
        return Err(ApiError::Unauthorized {
            status: response.status,
            message: body.msg.or(body.error),
        });
    }
    if response.status == 404 {
        return Err(ApiError::NotFound {
            message: body.error,
        });
    }
    Err(ApiError::HttpError {
        status: response.status,
        message: body.error,
        body: response.body.clone(),
    })
}
