//! Outbound HTTP request assembly, execution and response classification.
//!
//! # Overview
//! `RequestBuilder` assembles and validates an `HttpRequest` from discrete
//! components, a raw URL or a pre-built `http::Request`. An exchange is then
//! performed either through the request itself (`HttpRequest::get` and
//! friends) or through a long-lived `HttpClient`; both run the same
//! pipeline. Every failure comes back as a `RequestError` whose `ErrorKind`
//! says whether the request could not be built, no response was obtained,
//! the server answered with an error status, or the body did not decode.
//!
//! # Design
//! - Builds never touch the network; exchanges are blocking and happen on the
//!   calling thread.
//! - Response bodies are fully buffered and written into a caller-supplied
//!   `ResponseTarget` (`RawBody` or any `DeserializeOwned` type).
//! - Logging goes through `tracing` and is switched per client by
//!   `ClientConfig::logging_enabled`.

pub mod auth;
pub mod classify;
pub mod client;
pub mod codec;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod request;

pub use auth::{Authenticator, BasicAuthenticator};
pub use client::{CallOptions, HttpClient};
pub use codec::{RawBody, ResponseTarget};
pub use config::{ClientConfig, DEFAULT_TIMEOUT};
pub use endpoint::build_endpoint;
pub use error::{BoxError, ErrorKind, RequestError};
pub use request::{Headers, HttpRequest, QueryParams, RequestBuilder};

/// Re-export of the `http` types used for pre-built requests.
pub use ureq::http;
