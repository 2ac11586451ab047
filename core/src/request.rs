//! Request assembly.
//!
//! # Design
//! `RequestBuilder` is a by-value fluent builder: every setter consumes the
//! builder and returns a new one, and the builder is `Clone`, so a partially
//! configured builder can be branched into several requests. `build()` runs
//! the whole validation pipeline and produces an `HttpRequest`, the immutable
//! descriptor that is consumed by exactly one exchange. Nothing here touches
//! the network.
//!
//! A build starts from one of three origins: discrete fields
//! (`scheme`/`host`/`path_elements`), a raw URL (`raw_url`), or a pre-built
//! transport request (`request`).

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::str::Utf8Error;
use std::sync::Arc;
use std::time::Duration;

use percent_encoding::percent_decode_str;
use serde::Serialize;
use tracing::warn;
use ureq::http::header::{HeaderName, HeaderValue, CONNECTION};
use ureq::http::uri::PathAndQuery;
use ureq::http::{Method, Request, Uri};
use url::form_urlencoded;
use url::Url;

use crate::auth::Authenticator;
use crate::client::{CallOptions, HttpClient};
use crate::codec::ResponseTarget;
use crate::config::{ClientConfig, DEFAULT_TIMEOUT};
use crate::endpoint::build_endpoint;
use crate::error::RequestError;

/// Multi-valued mapping: unique keys, ordered values.
pub type MultiMap = BTreeMap<String, Vec<String>>;
pub type QueryParams = MultiMap;
pub type Headers = MultiMap;

/// Why a raw URL could not be taken apart.
#[derive(Debug, Clone, thiserror::Error)]
enum RawUrlError {
    #[error(transparent)]
    Parse(#[from] url::ParseError),
    #[error("path segment {segment:?} does not decode to UTF-8")]
    Segment {
        segment: String,
        #[source]
        source: Utf8Error,
    },
}

/// Fluent, branchable builder for `HttpRequest`.
pub struct RequestBuilder {
    scheme: String,
    host: String,
    path_elements: Vec<String>,
    query_params: Option<QueryParams>,
    headers: Option<Headers>,
    body: Option<Vec<u8>>,
    body_error: Option<Arc<serde_json::Error>>,
    lenient_body: bool,
    raw_url_error: Option<RawUrlError>,
    request: Option<Request<Vec<u8>>>,
    auth: Option<Arc<dyn Authenticator>>,
    timeout: Duration,
    logging_enabled: bool,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self {
            scheme: String::new(),
            host: String::new(),
            path_elements: Vec::new(),
            query_params: None,
            headers: None,
            body: None,
            body_error: None,
            lenient_body: false,
            raw_url_error: None,
            request: None,
            auth: None,
            timeout: DEFAULT_TIMEOUT,
            logging_enabled: false,
        }
    }
}

impl Clone for RequestBuilder {
    fn clone(&self) -> Self {
        Self {
            scheme: self.scheme.clone(),
            host: self.host.clone(),
            path_elements: self.path_elements.clone(),
            query_params: self.query_params.clone(),
            headers: self.headers.clone(),
            body: self.body.clone(),
            body_error: self.body_error.clone(),
            lenient_body: self.lenient_body,
            raw_url_error: self.raw_url_error.clone(),
            request: self.request.as_ref().map(clone_request),
            auth: self.auth.clone(),
            timeout: self.timeout,
            logging_enabled: self.logging_enabled,
        }
    }
}

/// `http::Request` is not `Clone` because of its extensions; everything that
/// matters on the wire is copied.
fn clone_request(request: &Request<Vec<u8>>) -> Request<Vec<u8>> {
    let mut copy = Request::new(request.body().clone());
    *copy.method_mut() = request.method().clone();
    *copy.uri_mut() = request.uri().clone();
    *copy.version_mut() = request.version();
    *copy.headers_mut() = request.headers().clone();
    copy
}

impl RequestBuilder {
    /// Builder with a 60 second timeout and logging disabled.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Path components, each escaped on its own, e.g. `["posts", "1"]`.
    pub fn path_elements<I, S>(mut self, elements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.path_elements = elements.into_iter().map(Into::into).collect();
        self
    }

    pub fn query_params(mut self, params: QueryParams) -> Self {
        self.query_params = Some(params);
        self
    }

    /// Fill scheme, host, path elements and query parameters from `raw_url`.
    ///
    /// A URL that does not parse, or whose path segments do not decode to
    /// UTF-8, is reported by `build()`.
    pub fn raw_url(mut self, raw_url: &str) -> Self {
        let parsed = match Url::parse(raw_url) {
            Ok(url) => url,
            Err(err) => {
                self.raw_url_error = Some(err.into());
                return self;
            }
        };
        let segments: Result<Vec<String>, RawUrlError> = parsed
            .path()
            .split('/')
            .skip(1)
            .map(|segment| {
                percent_decode_str(segment)
                    .decode_utf8()
                    .map(Cow::into_owned)
                    .map_err(|source| RawUrlError::Segment {
                        segment: segment.to_string(),
                        source,
                    })
            })
            .collect();
        self.path_elements = match segments {
            Ok(segments) => segments,
            Err(err) => {
                self.raw_url_error = Some(err);
                return self;
            }
        };
        self.raw_url_error = None;
        self.scheme = parsed.scheme().to_string();
        self.host = match (parsed.host_str(), parsed.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => String::new(),
        };
        self.query_params = Some(query_from_url(&parsed));
        self
    }

    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Raw request body, sent as-is.
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self.body_error = None;
        self
    }

    /// Body to be sent as JSON. Serialization happens here; a failure is
    /// reported by `build()` unless `lenient_body` is set.
    pub fn body_json<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        match serde_json::to_vec(body) {
            Ok(bytes) => {
                self.body = Some(bytes);
                self.body_error = None;
            }
            Err(err) => {
                self.body = None;
                self.body_error = Some(Arc::new(err));
            }
        }
        self
    }

    /// When set, a JSON body that fails to serialize is dropped with a warning
    /// instead of failing the build.
    pub fn lenient_body(mut self, lenient: bool) -> Self {
        self.lenient_body = lenient;
        self
    }

    /// Extend a pre-built request instead of constructing a fresh one.
    pub fn request(mut self, request: Request<Vec<u8>>) -> Self {
        self.request = Some(request);
        self
    }

    pub fn auth(mut self, auth: Arc<dyn Authenticator>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Timeout for the exchange; zero means the 60 second default.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn logging_enabled(mut self, enabled: bool) -> Self {
        self.logging_enabled = enabled;
        self
    }

    pub fn build(self) -> Result<HttpRequest, RequestError> {
        if let Some(err) = self.raw_url_error {
            return Err(RequestError::build("Failed to parse raw URL", err));
        }
        if let Some(err) = &self.body_error {
            if !self.lenient_body {
                return Err(RequestError::build(
                    "Failed to marshal request body",
                    Arc::clone(err),
                ));
            }
            warn!(error = %err, "failed to marshal request body, leaving request body empty");
        }

        let mut request = match self.request {
            None => {
                validate_required_fields(&self.scheme, &self.host)?;
                let endpoint = build_endpoint(&self.scheme, &self.host, &self.path_elements);
                let mut request = Request::builder()
                    .uri(endpoint.as_str())
                    .body(self.body.unwrap_or_default())
                    .map_err(|e| RequestError::build("Failed to construct http request", e))?;
                request
                    .headers_mut()
                    .insert(CONNECTION, HeaderValue::from_static("close"));
                request
            }
            Some(mut request) => {
                if let Some(body) = self.body {
                    *request.body_mut() = body;
                }
                request
            }
        };

        if !self.path_elements.is_empty() {
            validate_request_path(request.uri().path())?;
        }

        if let Some(params) = &self.query_params {
            set_query(&mut request, &encode_query(params))?;
        }

        if let Some(headers) = &self.headers {
            append_headers(&mut request, headers)?;
        }

        Ok(HttpRequest {
            request,
            auth: self.auth,
            timeout: self.timeout,
            logging_enabled: self.logging_enabled,
        })
    }
}

fn validate_required_fields(scheme: &str, host: &str) -> Result<(), RequestError> {
    if scheme.is_empty() {
        return Err(RequestError::invalid("Invalid request fields: Empty request scheme"));
    }
    if host.is_empty() {
        return Err(RequestError::invalid("Invalid request fields: Empty request host"));
    }
    Ok(())
}

/// The path must be absolute and made only of characters legal in a URI path.
fn validate_request_path(path: &str) -> Result<(), RequestError> {
    if !path.starts_with('/') {
        return Err(RequestError::invalid(format!(
            "Invalid Request URI: path {path:?} is not absolute"
        )));
    }
    if path.contains(['?', '#']) {
        return Err(RequestError::invalid(format!(
            "Invalid Request URI: path {path:?} contains a query or fragment marker"
        )));
    }
    PathAndQuery::try_from(path)
        .map(|_| ())
        .map_err(|e| RequestError::build("Invalid Request URI", e))
}

/// Form-encode `params`: keys in sorted order, values in their given order.
pub fn encode_query(params: &QueryParams) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, values) in params {
        for value in values {
            serializer.append_pair(key, value);
        }
    }
    serializer.finish()
}

/// Collect the decoded query pairs of `url`, grouping repeated keys.
pub fn query_from_url(url: &Url) -> QueryParams {
    let mut params = QueryParams::new();
    for (key, value) in url.query_pairs() {
        params
            .entry(key.into_owned())
            .or_default()
            .push(value.into_owned());
    }
    params
}

/// Replace the query string of `request`; an empty query removes it.
fn set_query(request: &mut Request<Vec<u8>>, query: &str) -> Result<(), RequestError> {
    let mut parts = request.uri().clone().into_parts();
    let path_and_query = {
        let path = parts.path_and_query.as_ref().map_or("/", |pq| pq.path());
        if query.is_empty() {
            path.to_string()
        } else {
            format!("{path}?{query}")
        }
    };
    parts.path_and_query = Some(
        PathAndQuery::try_from(path_and_query)
            .map_err(|e| RequestError::build("Invalid query parameters", e))?,
    );
    *request.uri_mut() =
        Uri::from_parts(parts).map_err(|e| RequestError::build("Invalid request URI", e))?;
    Ok(())
}

/// Append every value of `headers`, keeping values already on the request.
fn append_headers(request: &mut Request<Vec<u8>>, headers: &Headers) -> Result<(), RequestError> {
    for (name, values) in headers {
        if name.is_empty() || values.is_empty() {
            continue;
        }
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| RequestError::build(format!("Invalid header name {name:?}"), e))?;
        for value in values {
            let value = HeaderValue::from_str(value)
                .map_err(|e| RequestError::build(format!("Invalid value for header {name}"), e))?;
            request.headers_mut().append(name.clone(), value);
        }
    }
    Ok(())
}

/// Fully assembled outgoing request, consumed by exactly one exchange.
pub struct HttpRequest {
    request: Request<Vec<u8>>,
    auth: Option<Arc<dyn Authenticator>>,
    timeout: Duration,
    logging_enabled: bool,
}

impl std::fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRequest")
            .field("request", &self.request)
            .field("auth", &self.auth.is_some())
            .field("timeout", &self.timeout)
            .field("logging_enabled", &self.logging_enabled)
            .finish()
    }
}

impl HttpRequest {
    /// The underlying transport request.
    pub fn request(&self) -> &Request<Vec<u8>> {
        &self.request
    }

    pub fn into_request(self) -> Request<Vec<u8>> {
        self.request
    }

    pub fn uri(&self) -> &Uri {
        self.request.uri()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn get(self, target: Option<&mut dyn ResponseTarget>) -> Result<(), RequestError> {
        self.execute(Method::GET, target)
    }

    pub fn post(self, target: Option<&mut dyn ResponseTarget>) -> Result<(), RequestError> {
        self.execute(Method::POST, target)
    }

    pub fn put(self, target: Option<&mut dyn ResponseTarget>) -> Result<(), RequestError> {
        self.execute(Method::PUT, target)
    }

    pub fn patch(self, target: Option<&mut dyn ResponseTarget>) -> Result<(), RequestError> {
        self.execute(Method::PATCH, target)
    }

    pub fn delete(self, target: Option<&mut dyn ResponseTarget>) -> Result<(), RequestError> {
        self.execute(Method::DELETE, target)
    }

    /// Perform the exchange with a client whose timeout and logging come from
    /// this request. The response body is written into `target` if given.
    pub fn execute(
        self,
        method: Method,
        target: Option<&mut dyn ResponseTarget>,
    ) -> Result<(), RequestError> {
        let client = HttpClient::new(ClientConfig::new(self.logging_enabled, self.timeout));
        let mut options = CallOptions::new();
        if let Some(auth) = self.auth {
            options = options.auth(auth);
        }
        if let Some(target) = target {
            options = options.target(target);
        }
        client.execute(method, self.request, options)
    }
}
