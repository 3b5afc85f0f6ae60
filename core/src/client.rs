//! The builder that registers named requests and the client that sends them.
//!
//! # Design
//! `RestClientBuilder` is the only mutable stage. `build()` moves the
//! registry, transport, interceptors and decoder into an `Arc`-shared,
//! read-only core, so any number of sync and async dispatches can run at once
//! without locking. Async dispatch runs the blocking exchange on a tokio
//! blocking pool, either an owned runtime or a caller-supplied handle.

use std::any::type_name;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::runtime::{Handle, Runtime};
use tokio::sync::oneshot;
use tracing::{debug, warn};
use ureq::middleware::Middleware;

use crate::decode::{decode_body, ensure_type, BodyDecoder, JsonDecoder};
use crate::error::{ConfigError, DispatchError, RequestNotRegistered};
use crate::interceptor::{Chain, Interceptor, LogLevel, LoggingInterceptor};
use crate::registry::{Registration, Registry};
use crate::request::RequestSpec;
use crate::response::Response;
use crate::transport::{Transport, TransportConfig, UreqTransport};

const DEFAULT_ASYNC_WORKERS: usize = 4;

/// Collects named requests and client settings.
///
/// Methods take `&mut self` so a failed registration leaves every earlier
/// one in place:
///
/// ```no_run
/// use rest_registry::{RequestSpec, RestClient};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut builder = RestClient::builder();
/// builder
///     .add_request("status", RequestSpec::get("http://localhost:8080/status"))?
///     .timeout(std::time::Duration::from_secs(5));
/// let client = builder.build()?;
/// let response = client.send_sync::<serde_json::Value>("status")?;
/// println!("{}", response.status);
/// # Ok(())
/// # }
/// ```
pub struct RestClientBuilder {
    registry: Registry,
    transport_config: TransportConfig,
    transport: Option<Arc<dyn Transport>>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    decoder: Arc<dyn BodyDecoder>,
    async_workers: usize,
    runtime: Option<Handle>,
}

impl Default for RestClientBuilder {
    fn default() -> Self {
        Self {
            registry: Registry::default(),
            transport_config: TransportConfig::default(),
            transport: None,
            interceptors: Vec::new(),
            decoder: Arc::new(JsonDecoder),
            async_workers: DEFAULT_ASYNC_WORKERS,
            runtime: None,
        }
    }
}

impl RestClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `spec` under `name`, decoding responses as an opaque
    /// [`serde_json::Value`].
    pub fn add_request(
        &mut self,
        name: impl Into<String>,
        spec: RequestSpec,
    ) -> Result<&mut Self, ConfigError> {
        self.add_request_as::<Value>(name, spec)
    }

    /// Register `spec` under `name`, decoding responses as `T`.
    ///
    /// A later registration with the same name replaces both the request and
    /// its decoding type.
    pub fn add_request_as<T>(
        &mut self,
        name: impl Into<String>,
        spec: RequestSpec,
    ) -> Result<&mut Self, ConfigError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let name = name.into();
        let request = spec.materialize(&name)?;
        debug!(
            request = %name,
            method = request.method.as_str(),
            url = %request.url,
            response_type = type_name::<T>(),
            "registered request"
        );
        if self.registry.insert::<T>(name.clone(), request).is_some() {
            debug!(request = %name, "replaced earlier registration");
        }
        Ok(self)
    }

    /// Apply `timeout` to every phase of the default transport.
    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        self.transport_config.timeout = Some(timeout);
        self
    }

    /// Add an interceptor around every dispatch. Runs in insertion order.
    pub fn add_interceptor(&mut self, interceptor: impl Interceptor + 'static) -> &mut Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Install a ureq middleware on the default transport's agent.
    pub fn add_network_interceptor(&mut self, middleware: impl Middleware) -> &mut Self {
        let config = std::mem::take(&mut self.transport_config);
        self.transport_config = config.network_interceptor(middleware);
        self
    }

    pub fn add_logging_interceptor(&mut self, level: LogLevel) -> &mut Self {
        self.add_interceptor(LoggingInterceptor::new(level))
    }

    /// Replace the default ureq transport. Timeouts and network interceptors
    /// only configure the default transport and are ignored once this is set.
    pub fn transport(&mut self, transport: impl Transport + 'static) -> &mut Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Replace the default JSON body decoder.
    pub fn decoder(&mut self, decoder: impl BodyDecoder + 'static) -> &mut Self {
        self.decoder = Arc::new(decoder);
        self
    }

    /// Upper bound on concurrently running async dispatches when the client
    /// owns its runtime.
    pub fn async_workers(&mut self, workers: usize) -> &mut Self {
        self.async_workers = workers.max(1);
        self
    }

    /// Run async dispatches on an existing runtime instead of an owned one.
    pub fn runtime_handle(&mut self, handle: Handle) -> &mut Self {
        self.runtime = Some(handle);
        self
    }

    /// Freeze the registry and settings into a client. The builder is left
    /// empty.
    pub fn build(&mut self) -> Result<RestClient, ConfigError> {
        let transport = match self.transport.take() {
            Some(transport) => {
                if self.transport_config.timeout.is_some() {
                    warn!("custom transport set; ignoring configured timeout");
                }
                transport
            }
            None => Arc::new(UreqTransport::new(&self.transport_config)),
        };

        let executor = match self.runtime.take() {
            Some(handle) => Executor {
                runtime: None,
                handle,
            },
            None => {
                let runtime = tokio::runtime::Builder::new_multi_thread()
                    .worker_threads(1)
                    .max_blocking_threads(self.async_workers)
                    .thread_name("rest-registry")
                    .build()
                    .map_err(ConfigError::Executor)?;
                Executor {
                    handle: runtime.handle().clone(),
                    runtime: Some(runtime),
                }
            }
        };

        let shared = Shared {
            registry: std::mem::take(&mut self.registry),
            transport,
            interceptors: std::mem::take(&mut self.interceptors),
            decoder: std::mem::replace(&mut self.decoder, Arc::new(JsonDecoder)),
        };
        self.transport_config = TransportConfig::default();
        debug!(requests = shared.registry.len(), "built client");

        Ok(RestClient {
            shared: Arc::new(shared),
            executor: Arc::new(executor),
        })
    }
}

impl fmt::Debug for RestClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClientBuilder")
            .field("requests", &self.registry.len())
            .field("transport_config", &self.transport_config)
            .field("custom_transport", &self.transport.is_some())
            .field("interceptors", &self.interceptors.len())
            .field("async_workers", &self.async_workers)
            .finish_non_exhaustive()
    }
}

/// Everything a dispatch reads. Never mutated after `build()`.
struct Shared {
    registry: Registry,
    transport: Arc<dyn Transport>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    decoder: Arc<dyn BodyDecoder>,
}

impl Shared {
    fn lookup(&self, name: &str) -> Result<&Registration, RequestNotRegistered> {
        self.registry.get(name).ok_or_else(|| RequestNotRegistered {
            name: name.to_string(),
        })
    }

    fn execute<T: 'static>(&self, name: &str) -> Result<Response<T>, DispatchError> {
        let registration = self.lookup(name)?;
        ensure_type::<T>(registration.type_name)?;

        let request = registration.request.clone();
        debug!(
            request = name,
            method = request.method.as_str(),
            url = %request.url,
            "dispatching"
        );

        let raw = Chain::new(&self.interceptors, self.transport.as_ref())
            .proceed(request.clone())
            .map_err(|err| {
                warn!(request = name, error = %err, "transport failed");
                err
            })?;
        debug!(request = name, status = raw.status.as_u16(), "received response");

        let body = decode_body::<T>(
            &registration.decode,
            registration.type_name,
            self.decoder.as_ref(),
            &raw.body,
        )
        .map_err(|err| {
            warn!(request = name, error = %err, "decoding failed");
            err
        })?;

        Ok(Response::new(request, raw, body))
    }
}

/// Owns the async runtime unless one was supplied.
struct Executor {
    runtime: Option<Runtime>,
    handle: Handle,
}

impl Drop for Executor {
    fn drop(&mut self) {
        // Never block here: the last client clone may be dropped inside an
        // async context.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

/// Sends registered requests by name.
///
/// Cheap to clone; clones share the registry and the async executor.
#[derive(Clone)]
pub struct RestClient {
    shared: Arc<Shared>,
    executor: Arc<Executor>,
}

impl RestClient {
    pub fn builder() -> RestClientBuilder {
        RestClientBuilder::new()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.shared.registry.get(name).is_some()
    }

    /// Registered names, in no particular order.
    pub fn names(&self) -> Vec<&str> {
        self.shared.registry.names().collect()
    }

    /// Send the request registered under `name` and block until it completes.
    ///
    /// `T` must be the type the request was registered with. Any HTTP status
    /// is returned as a response; only transport and decoding failures are
    /// errors.
    pub fn send_sync<T: 'static>(&self, name: &str) -> Result<Response<T>, DispatchError> {
        self.shared.execute(name)
    }

    /// Send the request registered under `name` without blocking.
    ///
    /// An unknown name is reported immediately and neither callback runs.
    /// Otherwise exactly one of `on_success` / `on_failure` runs once, on an
    /// executor thread.
    pub fn send_async<T, S, F>(
        &self,
        name: &str,
        on_success: S,
        on_failure: F,
    ) -> Result<(), RequestNotRegistered>
    where
        T: Send + 'static,
        S: FnOnce(Response<T>) + Send + 'static,
        F: FnOnce(DispatchError) + Send + 'static,
    {
        self.spawn(name, move |result| match result {
            Ok(response) => on_success(response),
            Err(err) => on_failure(err),
        })
    }

    /// Like [`send_async`](Self::send_async), but hands back the outcome as a
    /// future.
    pub fn dispatch<T: Send + 'static>(
        &self,
        name: &str,
    ) -> Result<PendingResponse<T>, RequestNotRegistered> {
        let (tx, rx) = oneshot::channel();
        self.spawn(name, move |result| {
            // The receiver may have been dropped; nobody is waiting then.
            let _ = tx.send(result);
        })?;
        Ok(PendingResponse {
            name: name.to_string(),
            rx,
        })
    }

    fn spawn<T, C>(&self, name: &str, complete: C) -> Result<(), RequestNotRegistered>
    where
        T: Send + 'static,
        C: FnOnce(Result<Response<T>, DispatchError>) + Send + 'static,
    {
        self.shared.lookup(name)?;
        let shared = Arc::clone(&self.shared);
        let name = name.to_string();
        self.executor
            .handle
            .spawn_blocking(move || complete(shared.execute::<T>(&name)));
        Ok(())
    }
}

impl fmt::Debug for RestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClient")
            .field("requests", &self.shared.registry.len())
            .field("interceptors", &self.shared.interceptors.len())
            .finish_non_exhaustive()
    }
}

/// The eventual outcome of [`RestClient::dispatch`].
///
/// Await it from async code, or call [`wait`](Self::wait) from a thread that
/// is not driving a tokio runtime.
#[derive(Debug)]
pub struct PendingResponse<T> {
    name: String,
    rx: oneshot::Receiver<Result<Response<T>, DispatchError>>,
}

impl<T> PendingResponse<T> {
    /// Block the current thread until the dispatch completes.
    ///
    /// Panics if called from within an async execution context.
    pub fn wait(self) -> Result<Response<T>, DispatchError> {
        let name = self.name;
        self.rx
            .blocking_recv()
            .unwrap_or(Err(DispatchError::Abandoned { name }))
    }
}

impl<T> Future for PendingResponse<T> {
    type Output = Result<Response<T>, DispatchError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        Pin::new(&mut this.rx).poll(cx).map(|received| {
            received.unwrap_or_else(|_| {
                Err(DispatchError::Abandoned {
                    name: this.name.clone(),
                })
            })
        })
    }
}
