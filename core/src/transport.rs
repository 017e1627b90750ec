//! Blocking HTTP transport.
//!
//! `Transport` is the only place the client performs I/O. `UreqTransport`
//! is the default; tests and embedders can supply their own.

use std::sync::Arc;

use tracing::debug;
use ureq::Agent;

use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};

/// Executes one POST and returns the raw response.
///
/// Implementations must hand back non-2xx responses as `Ok` data; only a
/// failure to complete the exchange is an `Err`.
pub trait Transport: Send + Sync {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }
}

/// `ureq` agent with status-as-error disabled, so the client sees every
/// response the server sends.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    const MAX_REDIRECTS: u32 = 2;

    pub fn new(config: &ClientConfig) -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(config.timeout())
            .max_redirects(Self::MAX_REDIRECTS)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self.agent.post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let mut response = builder.send(request.body.as_slice())?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        // ureq caps bodies at 10 MiB unless told otherwise; documents can be larger.
        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_vec()?;
        debug!(status, bytes = body.len(), "received response");

        Ok(HttpResponse { status, headers, body })
    }
}
