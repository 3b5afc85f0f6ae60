//! Named HTTP requests with typed responses.
//!
//! # Overview
//! Requests are registered once under string keys, each with the type its
//! response body should be decoded into. The built [`RestClient`] then sends
//! them by key, blocking ([`RestClient::send_sync`]) or in the background
//! ([`RestClient::send_async`], [`RestClient::dispatch`]).
//!
//! # Design
//! - [`RestClientBuilder`] is the only mutable stage; `build()` freezes the
//!   registry into an `Arc`-shared, read-only client.
//! - The name -> type binding is a table of decode functions captured at
//!   registration, not runtime type inspection.
//! - The network sits behind the [`Transport`] trait (default:
//!   [`UreqTransport`]) and JSON parsing behind [`BodyDecoder`] (default:
//!   [`JsonDecoder`]); both can be swapped.
//! - HTTP status codes are never errors. Only transport and decoding
//!   failures are.

pub mod client;
pub mod decode;
pub mod error;
pub mod http;
pub mod interceptor;
mod registry;
pub mod request;
pub mod response;
pub mod transport;

pub use crate::client::{PendingResponse, RestClient, RestClientBuilder};
pub use crate::decode::{BodyDecoder, JsonDecoder};
pub use crate::error::{ConfigError, DecodeError, DispatchError, RequestNotRegistered, TransportError};
pub use crate::http::{Body, HttpMethod, HttpRequest, RawResponse};
pub use crate::interceptor::{Chain, Interceptor, LogLevel, LoggingInterceptor};
pub use crate::request::{RequestSpec, UrlSource};
pub use crate::response::Response;
pub use crate::transport::{Transport, TransportConfig, UreqTransport};
