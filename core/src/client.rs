//! Request execution.
//!
//! # Design
//! `HttpClient` owns a blocking `ureq::Agent` configured with the client-level
//! timeout and with status-as-error disabled, so every response reaches the
//! classifier. One call to `execute` is one exchange on the calling thread:
//! universal headers, authentication, timeout resolution, the call itself,
//! classification and finally decoding into the caller's target. Nothing is
//! retried.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info};
use ureq::http::header::{HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use ureq::http::{Method, Request, Response};
use ureq::{Agent, AsSendBody, Body};

use crate::auth::Authenticator;
use crate::classify::classify;
use crate::codec::{decode_into, ResponseTarget};
use crate::config::ClientConfig;
use crate::error::RequestError;

const JSON: &str = "application/json";

/// Per-call inputs of an exchange.
#[derive(Default)]
pub struct CallOptions<'a> {
    auth: Option<Arc<dyn Authenticator>>,
    target: Option<&'a mut dyn ResponseTarget>,
    timeout: Duration,
}

impl<'a> CallOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn auth(mut self, auth: Arc<dyn Authenticator>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Where a successful response body is written.
    pub fn target(mut self, target: &'a mut dyn ResponseTarget) -> Self {
        self.target = Some(target);
        self
    }

    /// Per-call timeout. Only takes effect when shorter than the client's.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Clone)]
pub struct HttpClient {
    agent: Agent,
    logging_enabled: bool,
    timeout: Duration,
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("logging_enabled", &self.logging_enabled)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl HttpClient {
    pub fn new(config: ClientConfig) -> Self {
        let timeout = config.effective_timeout();
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self {
            agent,
            logging_enabled: config.logging_enabled,
            timeout,
        }
    }

    /// Client-level timeout in force for every call.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn get(&self, request: Request<Vec<u8>>, options: CallOptions<'_>) -> Result<(), RequestError> {
        self.execute(Method::GET, request, options)
    }

    pub fn post(&self, request: Request<Vec<u8>>, options: CallOptions<'_>) -> Result<(), RequestError> {
        self.execute(Method::POST, request, options)
    }

    pub fn put(&self, request: Request<Vec<u8>>, options: CallOptions<'_>) -> Result<(), RequestError> {
        self.execute(Method::PUT, request, options)
    }

    pub fn patch(&self, request: Request<Vec<u8>>, options: CallOptions<'_>) -> Result<(), RequestError> {
        self.execute(Method::PATCH, request, options)
    }

    pub fn delete(&self, request: Request<Vec<u8>>, options: CallOptions<'_>) -> Result<(), RequestError> {
        self.execute(Method::DELETE, request, options)
    }

    /// Perform one exchange with `method`.
    pub fn execute(
        &self,
        method: Method,
        mut request: Request<Vec<u8>>,
        options: CallOptions<'_>,
    ) -> Result<(), RequestError> {
        prepare_request(&mut request, method);

        if let Some(auth) = &options.auth {
            auth.apply(&mut request).map_err(RequestError::authentication)?;
        }

        let call_timeout = resolve_timeout(self.timeout, options.timeout);
        if call_timeout.is_none() && !options.timeout.is_zero() {
            info!(
                requested = ?options.timeout,
                client = ?self.timeout,
                "request timeout is not shorter than the client timeout, client timeout will be used"
            );
        }

        let url = request.uri().to_string();
        let started = self.logging_enabled.then(Instant::now);
        let result = self.send(request, call_timeout);
        let duration_ms = started.map_or(0, |s| {
            u64::try_from(s.elapsed().as_millis()).unwrap_or(u64::MAX)
        });

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                if self.logging_enabled {
                    error!(status = 0, duration_ms, url = %url, error = %err, "request failed");
                }
                return Err(transport_error(err));
            }
        };

        let status = response.status().as_u16();
        if self.logging_enabled {
            info!(status, duration_ms, url = %url, "request finished");
        }

        // The reader is dropped, closing the body, on every path out of here.
        let mut body = response.into_body().into_reader();
        classify(status, &mut body)?;

        if let Some(target) = options.target {
            let type_name = target.type_name();
            decode_into(&mut body, target).map_err(|e| {
                RequestError::response_parse(
                    format!("Failed to decode response body into given response target {type_name}"),
                    e,
                )
            })?;
        }
        Ok(())
    }

    fn send(
        &self,
        request: Request<Vec<u8>>,
        timeout: Option<Duration>,
    ) -> Result<Response<Body>, ureq::Error> {
        let (parts, body) = request.into_parts();
        if body.is_empty() && !is_body_bearing(&parts.method) {
            self.run(Request::from_parts(parts, ()), timeout)
        } else {
            self.run(Request::from_parts(parts, body), timeout)
        }
    }

    fn run<S: AsSendBody>(
        &self,
        request: Request<S>,
        timeout: Option<Duration>,
    ) -> Result<Response<Body>, ureq::Error> {
        match timeout {
            Some(timeout) => {
                let request = self
                    .agent
                    .configure_request(request)
                    .timeout_global(Some(timeout))
                    .build();
                self.agent.run(request)
            }
            None => self.agent.run(request),
        }
    }
}

/// POST, PUT and PATCH conventionally carry a JSON payload.
pub fn is_body_bearing(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PUT || *method == Method::PATCH
}

/// Set the universal headers and the method.
pub fn prepare_request(request: &mut Request<Vec<u8>>, method: Method) {
    set_header_if_absent(request, ACCEPT, JSON);
    let body_bearing = is_body_bearing(&method);
    *request.method_mut() = method;
    if body_bearing {
        set_header_if_absent(request, CONTENT_TYPE, JSON);
    }
}

fn set_header_if_absent(request: &mut Request<Vec<u8>>, name: HeaderName, value: &'static str) {
    request
        .headers_mut()
        .entry(name)
        .or_insert_with(|| HeaderValue::from_static(value));
}

/// A per-call timeout applies only when it is positive and shorter than the
/// client-level timeout.
pub fn resolve_timeout(client: Duration, call: Duration) -> Option<Duration> {
    if call.is_zero() {
        return None;
    }
    if client.is_zero() || call < client {
        Some(call)
    } else {
        None
    }
}

fn transport_error(err: ureq::Error) -> RequestError {
    let timed_out = match &err {
        ureq::Error::Timeout(_) => true,
        ureq::Error::Io(io) => io.kind() == std::io::ErrorKind::TimedOut,
        _ => false,
    };
    if timed_out {
        RequestError::timeout(err)
    } else {
        RequestError::connection(err)
    }
}
