//! Request definitions as the caller describes them.
//!
//! A `RequestSpec` collects method, URL source, headers and body with
//! chainable setters; nothing is validated until it is registered, at which
//! point it becomes an immutable [`HttpRequest`].

use http::{HeaderName, HeaderValue};
use tracing::debug;
use url::Url;

use crate::error::ConfigError;
use crate::http::{Body, HttpMethod, HttpRequest};

/// Where a request's URL comes from.
#[derive(Debug, Clone)]
pub enum UrlSource {
    /// A string parsed when the request is registered.
    Raw(String),
    /// An already-parsed URL.
    Parsed(Url),
    /// An `http::Uri`; must be absolute.
    Structured(http::Uri),
}

impl From<&str> for UrlSource {
    fn from(url: &str) -> Self {
        UrlSource::Raw(url.to_string())
    }
}

impl From<String> for UrlSource {
    fn from(url: String) -> Self {
        UrlSource::Raw(url)
    }
}

impl From<&String> for UrlSource {
    fn from(url: &String) -> Self {
        UrlSource::Raw(url.clone())
    }
}

impl From<Url> for UrlSource {
    fn from(url: Url) -> Self {
        UrlSource::Parsed(url)
    }
}

impl From<http::Uri> for UrlSource {
    fn from(uri: http::Uri) -> Self {
        UrlSource::Structured(uri)
    }
}

impl UrlSource {
    fn resolve(self, name: &str) -> Result<Url, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidUrl {
            name: name.to_string(),
            reason,
        };
        let url = match self {
            UrlSource::Raw(raw) => Url::parse(&raw).map_err(|e| invalid(e.to_string()))?,
            UrlSource::Parsed(url) => url,
            UrlSource::Structured(uri) => {
                if uri.scheme().is_none() || uri.authority().is_none() {
                    return Err(invalid(format!("`{uri}` is not an absolute URI")));
                }
                Url::parse(&uri.to_string()).map_err(|e| invalid(e.to_string()))?
            }
        };
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(invalid(format!("unsupported scheme `{other}`"))),
        }
    }
}

/// A request definition under construction.
///
/// ```
/// use rest_registry::{Body, RequestSpec};
///
/// let spec = RequestSpec::post("http://localhost:8080/login")
///     .header("Authorization", "token@12345")
///     .body(Body::from(r#"{"login":"login"}"#));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestSpec {
    method: Option<HttpMethod>,
    url: Option<UrlSource>,
    headers: Vec<(String, String)>,
    body: Option<Body>,
}

impl RequestSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(url: impl Into<UrlSource>) -> Self {
        Self::new().method(HttpMethod::Get).url(url)
    }

    pub fn post(url: impl Into<UrlSource>) -> Self {
        Self::new().method(HttpMethod::Post).url(url)
    }

    pub fn put(url: impl Into<UrlSource>) -> Self {
        Self::new().method(HttpMethod::Put).url(url)
    }

    pub fn patch(url: impl Into<UrlSource>) -> Self {
        Self::new().method(HttpMethod::Patch).url(url)
    }

    pub fn delete(url: impl Into<UrlSource>) -> Self {
        Self::new().method(HttpMethod::Delete).url(url)
    }

    /// Select the method. Selecting again replaces the previous choice.
    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = Some(method);
        self
    }

    /// Set the URL source. Setting again replaces the previous source.
    pub fn url(mut self, url: impl Into<UrlSource>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Append a header. Repeated names are all sent.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Validate and freeze into an executable request.
    pub(crate) fn materialize(self, name: &str) -> Result<HttpRequest, ConfigError> {
        let url = self
            .url
            .ok_or_else(|| ConfigError::MissingUrl {
                name: name.to_string(),
            })?
            .resolve(name)?;
        let method = self.method.ok_or_else(|| ConfigError::MissingMethod {
            name: name.to_string(),
        })?;

        for (header, value) in &self.headers {
            let valid = HeaderName::from_bytes(header.as_bytes()).is_ok()
                && HeaderValue::from_str(value).is_ok();
            if !valid {
                return Err(ConfigError::InvalidHeader {
                    name: name.to_string(),
                    header: header.clone(),
                });
            }
        }

        let body = if method.carries_body() {
            Some(self.body.unwrap_or_default())
        } else {
            if self.body.is_some() {
                debug!(request = name, "dropping body on GET request");
            }
            None
        };

        Ok(HttpRequest {
            method,
            url,
            headers: self.headers,
            body,
        })
    }
}
