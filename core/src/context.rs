//! Wiring of the session, gateway and auth store for one client process.

use std::sync::Arc;

use crate::auth::AuthStore;
use crate::client::ApiClient;
use crate::config::ClientConfig;
use crate::gateway::Gateway;
use crate::interceptor::SessionExpiryInterceptor;
use crate::session::SessionStore;
use crate::storage::{FileStorage, TokenStorage};
use crate::transport::{Transport, UreqTransport};

/// Everything a view needs, built once at startup.
#[derive(Clone)]
pub struct AppContext {
    pub config: ClientConfig,
    pub session: SessionStore,
    pub gateway: Gateway,
    pub auth: AuthStore,
}

impl AppContext {
    /// The expiry interceptor is registered here, once, so every request
    /// made through `gateway` participates in session teardown.
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        storage: Arc<dyn TokenStorage>,
    ) -> Self {
        let session = SessionStore::new(storage);
        let gateway = Gateway::builder(ApiClient::new(&config.api_url), transport)
            .interceptor(SessionExpiryInterceptor::new(session.clone()))
            .build();
        let auth = AuthStore::new(gateway.clone(), session.clone())
            .with_min_token_len(config.min_token_len);
        Self {
            config,
            session,
            gateway,
            auth,
        }
    }

    /// `ureq` transport and file-backed storage, as configured.
    pub fn from_config(config: ClientConfig) -> Self {
        let transport = Arc::new(UreqTransport::new(config.request_timeout()));
        let path = config
            .storage_path
            .clone()
            .unwrap_or_else(FileStorage::default_path);
        let storage = Arc::new(FileStorage::new(path));
        Self::new(config, transport, storage)
    }
}
