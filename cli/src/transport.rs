//! Blocking HTTP transport backed by ureq.
//!
//! 4xx/5xx responses come back as data so the core client can read the
//! service's `error` field. Only connection-level failures become
//! `TransportError`.

use nutrient_core::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    /// The agent keeps a cookie store for its lifetime, which is how requests
    /// marked `with_credentials` carry the service's session cookies. No
    /// timeout is set beyond ureq's own defaults.
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn with_headers<B>(mut builder: ureq::RequestBuilder<B>, req: &HttpRequest) -> ureq::RequestBuilder<B> {
    for (name, value) in &req.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

impl Transport for UreqTransport {
    fn execute(&self, req: &HttpRequest) -> Result<HttpResponse, TransportError> {
        debug!(
            method = req.method.as_str(),
            url = %req.url,
            with_credentials = req.with_credentials,
            "sending request"
        );
        let result = match (req.method, req.body.as_deref()) {
            (HttpMethod::Get, _) => with_headers(self.agent.get(&req.url), req).call(),
            (HttpMethod::Post, Some(body)) => with_headers(self.agent.post(&req.url), req).send(body.as_bytes()),
            (HttpMethod::Post, None) => with_headers(self.agent.post(&req.url), req).send_empty(),
        };
        let mut response = result.map_err(|e| TransportError(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| TransportError(e.to_string()))?;
        debug!(status, bytes = body.len(), "received response");

        Ok(HttpResponse { status, headers, body })
    }
}
