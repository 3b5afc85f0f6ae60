//! Error types for the request registry and dispatcher.
//!
//! # Design
//! Errors are split by the phase that raises them. `ConfigError` only comes
//! out of the builder, `RequestNotRegistered` is a caller mistake detected
//! before any I/O, and `TransportError` / `DecodeError` describe what went
//! wrong during an actual exchange. `DispatchError` is the union returned by
//! dispatch calls. HTTP status codes never produce an error here.

use thiserror::Error;

/// Raised while registering requests or building the client.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No URL source was supplied for the request.
    #[error("URL not provided for request `{name}`")]
    MissingUrl { name: String },

    /// No HTTP method was selected for the request.
    #[error("HTTP method not provided for request `{name}`")]
    MissingMethod { name: String },

    /// The URL could not be parsed, is relative, or is not http(s).
    #[error("invalid URL for request `{name}`: {reason}")]
    InvalidUrl { name: String, reason: String },

    /// A header name or value is not valid HTTP.
    #[error("invalid header `{header}` for request `{name}`")]
    InvalidHeader { name: String, header: String },

    /// The async executor could not be started.
    #[error("failed to start async executor: {0}")]
    Executor(#[source] std::io::Error),
}

/// The name passed to a dispatch call has no registered request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("request `{name}` not registered")]
pub struct RequestNotRegistered {
    pub name: String,
}

/// Failure while executing a request over the network.
#[derive(Debug, Error)]
pub enum TransportError {
    /// One of the configured timeouts elapsed.
    #[error("request timed out")]
    Timeout,

    /// Connecting, resolving, reading or writing failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The request could not be turned into a valid HTTP message.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Anything else the transport reported.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

/// Failure while turning a response body into the registered type.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload is not valid for the registered type.
    #[error("malformed response body: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The caller asked for a different type than the one registered.
    #[error("response registered as `{registered}` but requested as `{requested}`")]
    TypeMismatch {
        registered: &'static str,
        requested: &'static str,
    },
}

/// Everything a dispatch call can fail with.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    NotRegistered(#[from] RequestNotRegistered),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The executor shut down before an async dispatch finished.
    #[error("dispatch of `{name}` abandoned before completion")]
    Abandoned { name: String },
}
