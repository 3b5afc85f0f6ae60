//! The typed result of one dispatch.

use std::time::{Duration, SystemTime};

use bytes::Bytes;
use http::{HeaderMap, Version};

use crate::http::{HttpRequest, RawResponse};

/// A transport response with its body decoded into the type registered for
/// the request name.
///
/// Every status is a valid response here; a 404 or 500 is data, not an error.
#[derive(Debug, Clone)]
pub struct Response<T> {
    /// The registered request that produced this response.
    pub request: HttpRequest,
    pub status: u16,
    /// Canonical reason phrase, empty for codes without one.
    pub message: String,
    pub protocol: Version,
    /// Whether the exchange ran over https.
    pub tls: bool,
    pub headers: HeaderMap,
    /// Final URL after redirects.
    pub url: String,
    /// URLs redirected away from, oldest first.
    pub redirects: Vec<String>,
    pub sent_at: SystemTime,
    pub received_at: SystemTime,
    pub raw_body: Bytes,
    /// `None` when the payload was empty.
    pub body: Option<T>,
}

impl<T> Response<T> {
    pub(crate) fn new(request: HttpRequest, raw: RawResponse, body: Option<T>) -> Self {
        Self {
            tls: raw.url.starts_with("https://") || request.url.scheme() == "https",
            request,
            status: raw.status.as_u16(),
            message: raw.status.canonical_reason().unwrap_or_default().to_string(),
            protocol: raw.version,
            headers: raw.headers,
            url: raw.url,
            redirects: raw.redirects,
            sent_at: raw.sent_at,
            received_at: raw.received_at,
            raw_body: raw.body,
            body,
        }
    }

    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Time between sending the request and receiving the response head.
    pub fn elapsed(&self) -> Duration {
        self.received_at
            .duration_since(self.sent_at)
            .unwrap_or_default()
    }

    pub fn into_body(self) -> Option<T> {
        self.body
    }
}
