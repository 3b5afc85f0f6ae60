//! Application-level interceptors around the transport.
//!
//! Interceptors run in registration order on every dispatch, sync or async.
//! Each one receives the request and a [`Chain`]; calling
//! [`Chain::proceed`] hands the (possibly modified) request to the next
//! interceptor and finally to the transport.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::error::TransportError;
use crate::http::{HttpRequest, RawResponse};
use crate::transport::Transport;

pub trait Interceptor: Send + Sync {
    fn intercept(&self, request: HttpRequest, chain: Chain<'_>) -> Result<RawResponse, TransportError>;
}

/// The rest of the interceptor stack, ending at the transport.
pub struct Chain<'a> {
    interceptors: &'a [Arc<dyn Interceptor>],
    transport: &'a dyn Transport,
}

impl<'a> Chain<'a> {
    pub(crate) fn new(interceptors: &'a [Arc<dyn Interceptor>], transport: &'a dyn Transport) -> Self {
        Self {
            interceptors,
            transport,
        }
    }

    pub fn proceed(self, request: HttpRequest) -> Result<RawResponse, TransportError> {
        match self.interceptors.split_first() {
            Some((first, rest)) => first.intercept(request, Chain::new(rest, self.transport)),
            None => self.transport.execute(request),
        }
    }
}

/// How much of each exchange [`LoggingInterceptor`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    None,
    /// Method, URL, status and elapsed time.
    Basic,
    /// `Basic` plus request and response headers.
    Headers,
    /// `Headers` plus request and response bodies.
    #[default]
    Body,
}

/// Logs each exchange as `tracing` events at `INFO` (failures at `WARN`).
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingInterceptor {
    level: LogLevel,
}

impl LoggingInterceptor {
    pub fn new(level: LogLevel) -> Self {
        Self { level }
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }
}

impl Interceptor for LoggingInterceptor {
    fn intercept(&self, request: HttpRequest, chain: Chain<'_>) -> Result<RawResponse, TransportError> {
        if self.level == LogLevel::None {
            return chain.proceed(request);
        }

        info!(method = request.method.as_str(), url = %request.url, "--> request");
        if self.level >= LogLevel::Headers {
            for (name, value) in &request.headers {
                info!(header = %name, value = %value, "--> header");
            }
        }
        if self.level >= LogLevel::Body {
            if let Some(body) = request.body.as_ref().filter(|b| !b.is_empty()) {
                info!(body = %String::from_utf8_lossy(&body.data), "--> body");
            }
        }

        let started = Instant::now();
        let result = chain.proceed(request);
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(response) => {
                info!(status = response.status.as_u16(), url = %response.url, elapsed_ms, "<-- response");
                if self.level >= LogLevel::Headers {
                    for (name, value) in &response.headers {
                        info!(header = %name, value = %String::from_utf8_lossy(value.as_bytes()), "<-- header");
                    }
                }
                if self.level >= LogLevel::Body && !response.body.is_empty() {
                    info!(body = %String::from_utf8_lossy(&response.body), "<-- body");
                }
            }
            Err(err) => warn!(error = %err, elapsed_ms, "<-- failed"),
        }
        result
    }
}

impl<F> Interceptor for F
where
    F: Fn(HttpRequest, Chain<'_>) -> Result<RawResponse, TransportError> + Send + Sync,
{
    fn intercept(&self, request: HttpRequest, chain: Chain<'_>) -> Result<RawResponse, TransportError> {
        self(request, chain)
    }
}

impl fmt::Debug for Chain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("remaining", &self.interceptors.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;
    use http::StatusCode;
    use std::sync::Mutex;
    use tracing_test::traced_test;

    /// Records every request it sees and answers 200 with a fixed body.
    #[derive(Default)]
    struct Recording {
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl Transport for Recording {
        fn execute(&self, request: HttpRequest) -> Result<RawResponse, TransportError> {
            let url = request.url.to_string();
            self.seen.lock().unwrap().push(request);
            Ok(RawResponse::new(StatusCode::OK, url).with_body(r#"{"ok":true}"#))
        }
    }

    struct Failing;

    impl Transport for Failing {
        fn execute(&self, _request: HttpRequest) -> Result<RawResponse, TransportError> {
            Err(TransportError::Timeout)
        }
    }

    fn request() -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: url::Url::parse("http://localhost/api-test-get").unwrap(),
            headers: vec![("X-Trace".to_string(), "abc".to_string())],
            body: None,
        }
    }

    #[test]
    fn empty_chain_reaches_transport() {
        let transport = Recording::default();
        let response = Chain::new(&[], &transport).proceed(request()).unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(transport.seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn interceptors_run_in_order_and_can_rewrite() {
        let transport = Recording::default();
        let first = |mut req: HttpRequest, chain: Chain<'_>| {
            req.headers.push(("X-Order".to_string(), "first".to_string()));
            chain.proceed(req)
        };
        let second = |mut req: HttpRequest, chain: Chain<'_>| {
            req.headers.push(("X-Order".to_string(), "second".to_string()));
            chain.proceed(req)
        };
        let stack: Vec<Arc<dyn Interceptor>> = vec![Arc::new(first), Arc::new(second)];

        Chain::new(&stack, &transport).proceed(request()).unwrap();

        let seen = transport.seen.lock().unwrap();
        let order: Vec<&str> = seen[0]
            .headers
            .iter()
            .filter(|(n, _)| n == "X-Order")
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(order, vec!["first", "second"]);
    }

    #[test]
    fn interceptor_can_short_circuit() {
        let transport = Recording::default();
        let cached = |req: HttpRequest, _chain: Chain<'_>| {
            Ok::<_, TransportError>(RawResponse::new(StatusCode::NOT_MODIFIED, req.url.to_string()))
        };
        let stack: Vec<Arc<dyn Interceptor>> = vec![Arc::new(cached)];

        let response = Chain::new(&stack, &transport).proceed(request()).unwrap();
        assert_eq!(response.status, StatusCode::NOT_MODIFIED);
        assert!(transport.seen.lock().unwrap().is_empty());
    }

    #[traced_test]
    #[test]
    fn logging_basic_omits_headers_and_body() {
        let transport = Recording::default();
        let stack: Vec<Arc<dyn Interceptor>> = vec![Arc::new(LoggingInterceptor::new(LogLevel::Basic))];
        Chain::new(&stack, &transport).proceed(request()).unwrap();

        assert!(logs_contain("--> request"));
        assert!(logs_contain("<-- response"));
        assert!(!logs_contain("X-Trace"));
        assert!(!logs_contain("<-- body"));
    }

    #[traced_test]
    #[test]
    fn logging_body_includes_everything() {
        let transport = Recording::default();
        let stack: Vec<Arc<dyn Interceptor>> = vec![Arc::new(LoggingInterceptor::default())];
        Chain::new(&stack, &transport).proceed(request()).unwrap();

        assert!(logs_contain("X-Trace"));
        assert!(logs_contain("<-- body"));
    }

    #[traced_test]
    #[test]
    fn logging_reports_failures() {
        let stack: Vec<Arc<dyn Interceptor>> = vec![Arc::new(LoggingInterceptor::new(LogLevel::Basic))];
        let err = Chain::new(&stack, &Failing).proceed(request()).unwrap_err();
        assert!(matches!(err, TransportError::Timeout));
        assert!(logs_contain("<-- failed"));
    }
}
