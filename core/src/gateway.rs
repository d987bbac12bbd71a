//! The request boundary: transport plus response interceptors.
//!
//! Every call the stores and views make goes through `Gateway::send`, which
//! executes the request and then hands the response to each registered
//! `ResponseInterceptor` in registration order. Interceptors are fixed when
//! the gateway is built.

use std::sync::Arc;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::Transport;

/// Observes every response that comes back through the gateway.
pub trait ResponseInterceptor: Send + Sync {
    fn on_response(&self, request: &HttpRequest, response: &HttpResponse);
}

/// Cheap-to-clone request layer shared by the stores and views.
#[derive(Clone)]
pub struct Gateway {
    client: ApiClient,
    transport: Arc<dyn Transport>,
    interceptors: Arc<[Arc<dyn ResponseInterceptor>]>,
}

impl Gateway {
    pub fn builder(client: ApiClient, transport: Arc<dyn Transport>) -> GatewayBuilder {
        GatewayBuilder {
            client,
            transport,
            interceptors: Vec::new(),
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let response = self.transport.execute(&request)?;
        for interceptor in self.interceptors.iter() {
            interceptor.on_response(&request, &response);
        }
        Ok(response)
    }
}

pub struct GatewayBuilder {
    client: ApiClient,
    transport: Arc<dyn Transport>,
    interceptors: Vec<Arc<dyn ResponseInterceptor>>,
}

impl GatewayBuilder {
    pub fn interceptor(mut self, interceptor: impl ResponseInterceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn build(self) -> Gateway {
        Gateway {
            client: self.client,
            transport: self.transport,
            interceptors: self.interceptors.into(),
        }
    }
}
