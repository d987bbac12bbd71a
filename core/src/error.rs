//! Error types for the request layer.
//!
//! # Design
//! `ApiError` keeps the status-level distinctions the views care about:
//! auth failures (401/422) end the session, `NotFound` and `HttpError` carry
//! a backend-supplied message that can be shown verbatim, and transport or
//! decoding failures are reported as a generic retry prompt. `class()`
//! collapses the variants into that three-way policy.

use serde::Deserialize;
use thiserror::Error;

use crate::transport::TransportError;

/// How a failed call is surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// 401/422: the session is over, log out.
    Auth,
    /// The backend understood the request and refused it.
    Domain,
    /// Nothing usable came back.
    Network,
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend returned 401 or 422. `message` comes from the body's
    /// `msg` (token errors) or `error` (credential errors) field.
    #[error("authentication failed (HTTP {status}): {}", detail(.message, "no details"))]
    Unauthorized { status: u16, message: Option<String> },

    /// The backend returned 404.
    #[error("resource not found")]
    NotFound { message: Option<String> },

    /// Any other non-success status.
    #[error("HTTP {status}: {}", detail(.message, .body))]
    HttpError {
        status: u16,
        message: Option<String>,
        body: String,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// The view that issued the request was torn down before it completed.
    #[error("request cancelled by view teardown")]
    Cancelled,
}

impl ApiError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ApiError::Unauthorized { .. } => ErrorClass::Auth,
            ApiError::NotFound { .. } | ApiError::HttpError { .. } => ErrorClass::Domain,
            ApiError::Transport(_)
            | ApiError::DeserializationError(_)
            | ApiError::SerializationError(_)
            | ApiError::Cancelled => ErrorClass::Network,
        }
    }

    pub fn is_auth(&self) -> bool {
        self.class() == ErrorClass::Auth
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { status, .. } | ApiError::HttpError { status, .. } => {
                Some(*status)
            }
            ApiError::NotFound { .. } => Some(404),
            _ => None,
        }
    }

    /// The message the backend put in the response body, if any.
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized { message, .. }
            | ApiError::NotFound { message }
            | ApiError::HttpError { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

fn detail<'a>(message: &'a Option<String>, fallback: &'a str) -> &'a str {
    message.as_deref().unwrap_or(fallback)
}

/// Error envelope used by the backend. Token failures use `msg`; everything
/// else uses `error`, sometimes with an extra human `message`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBody {
    pub(crate) fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }
}
