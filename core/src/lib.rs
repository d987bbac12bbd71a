//! Synchronous client core for the todo service.
//!
//! # Overview
//! `ApiClient` builds `HttpRequest` values and parses `HttpResponse` values
//! without touching the network. A `Transport` performs the round-trip and
//! the `Gateway` ties the two together, letting registered interceptors
//! observe every response. On top of that sit the session (`SessionStore`,
//! `AuthStore`) and the per-screen view models in `views`.
//!
//! # Design
//! - `ApiClient` is stateless: it holds only `base_url`, and the bearer
//!   token is passed explicitly to every authenticated `build_*` call.
//! - The session has a single writer, `SessionStore`, which publishes
//!   snapshots on a watch channel.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod auth;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod gateway;
pub mod http;
pub mod interceptor;
pub mod lifecycle;
pub mod session;
pub mod storage;
pub mod transport;
pub mod types;
pub mod validation;
pub mod views;

#[cfg(test)]
mod test_support;

pub use auth::{AuthFailure, AuthStore, MIN_TOKEN_LEN};
pub use client::ApiClient;
pub use config::ClientConfig;
pub use context::AppContext;
pub use error::{ApiError, ErrorClass};
pub use gateway::{Gateway, ResponseInterceptor};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use interceptor::SessionExpiryInterceptor;
pub use session::{EndReason, SessionState, SessionStatus, SessionStore, SessionWatch};
pub use storage::{FileStorage, MemoryStorage, StorageError, TokenStorage};
pub use transport::{Transport, TransportError, UreqTransport};
pub use types::{CreateTodo, Todo, UpdateTodo, User};
