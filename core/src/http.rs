//! HTTP request and response values exchanged with the transport.
//!
//! # Design
//! These are plain data. A registered request is materialized once into an
//! `HttpRequest` and cloned per dispatch; the transport turns it into wire
//! traffic and hands back a `RawResponse`. Bodies use `Bytes` so the clone is
//! a reference-count bump rather than a copy.

use std::time::SystemTime;

use bytes::Bytes;
use http::{HeaderMap, StatusCode, Version};
use url::Url;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Whether requests with this method always carry a (possibly empty) body.
    pub fn carries_body(self) -> bool {
        !matches!(self, HttpMethod::Get)
    }
}

impl From<HttpMethod> for http::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => http::Method::GET,
            HttpMethod::Post => http::Method::POST,
            HttpMethod::Put => http::Method::PUT,
            HttpMethod::Patch => http::Method::PATCH,
            HttpMethod::Delete => http::Method::DELETE,
        }
    }
}

/// A request payload: raw bytes plus an optional media type.
///
/// Text bodies carry no content type, matching a bare string payload on the
/// wire. Use [`Body::json`] or [`Body::with_content_type`] to label it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Body {
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl Body {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_content_type(content_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            content_type: Some(content_type.into()),
            data: data.into(),
        }
    }

    /// Serialize `value` as JSON and label it `application/json`.
    pub fn json<T: serde::Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        let data = serde_json::to_vec(value)?;
        Ok(Self::with_content_type("application/json", data))
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self {
            content_type: None,
            data: Bytes::from(text),
        }
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Self::from(text.to_string())
    }
}

impl From<Vec<u8>> for Body {
    fn from(data: Vec<u8>) -> Self {
        Self {
            content_type: None,
            data: Bytes::from(data),
        }
    }
}

/// A fully materialized request, ready to hand to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: Url,
    /// Sent in insertion order; repeated names are sent as repeated headers.
    pub headers: Vec<(String, String)>,
    pub body: Option<Body>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// What a transport returns for one exchange, before any decoding.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub version: Version,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Final URL after redirects.
    pub url: String,
    /// URLs visited before `url`, oldest first.
    pub redirects: Vec<String>,
    pub sent_at: SystemTime,
    pub received_at: SystemTime,
}

impl RawResponse {
    /// A bare response for the given status, timestamped now. Handy for fake
    /// transports.
    pub fn new(status: StatusCode, url: impl Into<String>) -> Self {
        let now = SystemTime::now();
        Self {
            status,
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            url: url.into(),
            redirects: Vec::new(),
            sent_at: now,
            received_at: now,
        }
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }
}
