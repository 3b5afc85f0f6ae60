//! The transport seam and its default ureq implementation.
//!
//! # Design
//! The dispatcher never talks to ureq directly; it hands an [`HttpRequest`]
//! to a [`Transport`] and gets a [`RawResponse`] back. [`UreqTransport`] is
//! the default. It is configured with `http_status_as_error(false)` so that
//! 4xx/5xx responses come back as data, and it records redirect history so
//! the response can report the chain it followed.

use std::fmt;
use std::io::Read as _;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use ureq::middleware::{Middleware, MiddlewareNext};
use ureq::{RequestBuilder, ResponseExt as _, SendBody};

use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, RawResponse};

/// Executes one request over the network.
///
/// Implementations must be thread-safe: one transport is shared by every
/// dispatch of a client, sync and async alike.
pub trait Transport: Send + Sync {
    fn execute(&self, request: HttpRequest) -> Result<RawResponse, TransportError>;
}

/// A ureq middleware shared between agents.
#[derive(Clone)]
pub(crate) struct NetworkInterceptor(Arc<dyn Middleware>);

impl Middleware for NetworkInterceptor {
    fn handle(
        &self,
        request: http::Request<SendBody>,
        next: MiddlewareNext,
    ) -> Result<http::Response<ureq::Body>, ureq::Error> {
        self.0.handle(request, next)
    }
}

/// Settings for the default ureq agent.
#[derive(Clone, Default)]
pub struct TransportConfig {
    /// Applied uniformly to the call, connect, write and read phases.
    pub timeout: Option<Duration>,
    network_interceptors: Vec<NetworkInterceptor>,
}

impl fmt::Debug for TransportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportConfig")
            .field("timeout", &self.timeout)
            .field("network_interceptors", &self.network_interceptors.len())
            .finish()
    }
}

impl TransportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Install a ureq middleware; it sees every request as it goes on the wire.
    pub fn network_interceptor(mut self, middleware: impl Middleware) -> Self {
        self.network_interceptors
            .push(NetworkInterceptor(Arc::new(middleware)));
        self
    }

    /// Build the ureq agent described by this config.
    pub fn agent(&self) -> ureq::Agent {
        let mut builder = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .save_redirect_history(true);

        if let Some(timeout) = self.timeout {
            builder = builder
                .timeout_global(Some(timeout))
                .timeout_connect(Some(timeout))
                .timeout_send_body(Some(timeout))
                .timeout_recv_response(Some(timeout))
                .timeout_recv_body(Some(timeout));
        }
        for interceptor in &self.network_interceptors {
            builder = builder.middleware(interceptor.clone());
        }

        builder.build().new_agent()
    }
}

/// A [`Transport`] backed by a blocking [`ureq::Agent`].
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(config: &TransportConfig) -> Self {
        Self {
            agent: config.agent(),
        }
    }

    /// Wrap an agent configured elsewhere.
    ///
    /// The agent should be built with `http_status_as_error(false)`, otherwise
    /// non-2xx responses surface as transport errors.
    pub fn from_agent(agent: ureq::Agent) -> Self {
        Self { agent }
    }

    fn send(&self, request: &HttpRequest) -> Result<http::Response<ureq::Body>, ureq::Error> {
        let url = request.url.as_str();
        let payload = request.body.as_ref().map(|b| &b.data[..]).unwrap_or_default();

        match request.method {
            HttpMethod::Get => with_headers(self.agent.get(url), request).call(),
            HttpMethod::Delete if payload.is_empty() => {
                with_headers(self.agent.delete(url), request).call()
            }
            HttpMethod::Delete => {
                with_headers(self.agent.delete(url).force_send_body(), request).send(payload)
            }
            HttpMethod::Post => with_headers(self.agent.post(url), request).send(payload),
            HttpMethod::Put => with_headers(self.agent.put(url), request).send(payload),
            HttpMethod::Patch => with_headers(self.agent.patch(url), request).send(payload),
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(&TransportConfig::default())
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: HttpRequest) -> Result<RawResponse, TransportError> {
        let sent_at = SystemTime::now();
        let response = self.send(&request).map_err(convert_error)?;
        let received_at = SystemTime::now();
        convert_response(response, sent_at, received_at)
    }
}

/// Apply the registered headers, then the body's content type unless a
/// `Content-Type` header was registered explicitly.
fn with_headers<B>(mut builder: RequestBuilder<B>, request: &HttpRequest) -> RequestBuilder<B> {
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    if let Some(content_type) = request.body.as_ref().and_then(|b| b.content_type.as_deref()) {
        if request.header("content-type").is_none() {
            builder = builder.header("content-type", content_type);
        }
    }
    builder
}

fn convert_error(err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::Timeout(_) => TransportError::Timeout,
        ureq::Error::HostNotFound => TransportError::Connection("host not found".to_owned()),
        ureq::Error::ConnectionFailed => TransportError::Connection("connection failed".to_owned()),
        ureq::Error::Io(e) => TransportError::Connection(e.to_string()),
        ureq::Error::BadUri(uri) => TransportError::InvalidRequest(format!("bad URI: {uri}")),
        ureq::Error::Http(e) => TransportError::InvalidRequest(e.to_string()),
        e => TransportError::Other(Box::new(e)),
    }
}

fn convert_response(
    response: http::Response<ureq::Body>,
    sent_at: SystemTime,
    received_at: SystemTime,
) -> Result<RawResponse, TransportError> {
    let url = response.get_uri().to_string();
    let mut redirects: Vec<String> = response
        .get_redirect_history()
        .map(|history| history.iter().map(ToString::to_string).collect())
        .unwrap_or_default();
    // The history ends with the URI that produced this response.
    if redirects.last() == Some(&url) {
        redirects.pop();
    }

    let (parts, body) = response.into_parts();
    let mut body_bytes = Vec::new();
    body.into_reader()
        .read_to_end(&mut body_bytes)
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::TimedOut => TransportError::Timeout,
            _ => TransportError::Connection(e.to_string()),
        })?;

    Ok(RawResponse {
        status: parts.status,
        version: parts.version,
        headers: parts.headers,
        body: Bytes::from(body_bytes),
        url,
        redirects,
        sent_at,
        received_at,
    })
}
