//! Global "am I still logged in" hook.

use tracing::info;

use crate::error::ErrorBody;
use crate::gateway::ResponseInterceptor;
use crate::http::{HttpRequest, HttpResponse};
use crate::session::{EndReason, SessionStore};

const EXPIRY_MARKERS: [&str; 3] = ["expired", "revoked", "Invalid"];

/// Returns the backend message when `response` says the bearer token is no
/// longer usable: status 401/422 and a `msg` mentioning expiry, revocation or
/// invalidity. Credential failures on `/api/login` carry `error`, not `msg`,
/// and do not match.
pub fn session_expiry_message(response: &HttpResponse) -> Option<String> {
    if !response.is_auth_failure() {
        return None;
    }
    let msg = ErrorBody::parse(&response.body).msg?;
    EXPIRY_MARKERS
        .iter()
        .any(|marker| msg.contains(marker))
        .then_some(msg)
}

/// Ends the session whenever a response reports an expired, revoked or
/// invalid token.
pub struct SessionExpiryInterceptor {
    session: SessionStore,
}

impl SessionExpiryInterceptor {
    pub fn new(session: SessionStore) -> Self {
        Self { session }
    }
}

impl ResponseInterceptor for SessionExpiryInterceptor {
    fn on_response(&self, request: &HttpRequest, response: &HttpResponse) {
        let Some(message) = session_expiry_message(response) else {
            return;
        };
        info!(url = %request.path, status = response.status, %message, "token rejected, ending session");
        self.session.end(EndReason::Expired(message));
    }
}
