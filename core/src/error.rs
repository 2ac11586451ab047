//! Error taxonomy for request assembly and execution.
//!
//! # Design
//! Every failure is a `RequestError`: a closed `ErrorKind` that names the
//! category, the detail message, the proximate cause (reachable through
//! `Error::source`) and the status code. Status-derived errors carry the
//! literal response body as their message and the real status code;
//! everything that happened before a response was obtained reports `0`.

use thiserror::Error;

/// Boxed cause attached to a `RequestError`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Top-level category of a failed build or exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request could not be assembled from the given inputs.
    RequestBuild,
    /// The authenticator refused to apply credentials.
    Authentication,
    /// No response was obtained.
    Connection,
    /// No response was obtained before the deadline.
    Timeout,
    Unauthorized,
    Forbidden,
    NotFound,
    /// The server answered 400.
    MalformedRequest,
    TooManyRequests,
    UnprocessableEntity,
    InternalServerError,
    ServiceUnavailable,
    /// Any other status code >= 400.
    UnexpectedStatus,
    /// A response was obtained but its body could not be read or decoded.
    ResponseDecode,
}

impl ErrorKind {
    /// Map a status code >= 400 to its category.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => ErrorKind::Unauthorized,
            403 => ErrorKind::Forbidden,
            404 => ErrorKind::NotFound,
            400 => ErrorKind::MalformedRequest,
            429 => ErrorKind::TooManyRequests,
            422 => ErrorKind::UnprocessableEntity,
            500 => ErrorKind::InternalServerError,
            503 => ErrorKind::ServiceUnavailable,
            _ => ErrorKind::UnexpectedStatus,
        }
    }

    /// Human-readable title of the category.
    pub fn title(self) -> &'static str {
        match self {
            ErrorKind::RequestBuild => "Invalid request error",
            ErrorKind::Authentication => "Cannot apply authentication information to request",
            ErrorKind::Connection => "Http client error",
            ErrorKind::Timeout => "Http client error, request timed out",
            ErrorKind::Unauthorized => "Unauthorized - Authentication failed",
            ErrorKind::Forbidden => {
                "Resource is forbidden, check your authentication token and permissions"
            }
            ErrorKind::NotFound => "Resource is not found",
            ErrorKind::MalformedRequest => "Not well-formatted request or missing fields",
            ErrorKind::TooManyRequests => "Too many requests - Resource unavailable",
            ErrorKind::UnprocessableEntity => {
                "Syntactically correct but semantically incorrect request"
            }
            ErrorKind::InternalServerError => "Internal server error",
            ErrorKind::ServiceUnavailable => "Service unavailable",
            ErrorKind::UnexpectedStatus => "Unexpected HTTP response code",
            ErrorKind::ResponseDecode => "Invalid response body error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.title())
    }
}

/// A classified failure of a build or an exchange.
#[derive(Debug, Error)]
#[error("{kind} - {message} - Status Code: {status}")]
pub struct RequestError {
    kind: ErrorKind,
    message: String,
    status: u16,
    #[source]
    source: Option<BoxError>,
}

impl RequestError {
    fn new(kind: ErrorKind, message: impl Into<String>, status: u16, source: Option<BoxError>) -> Self {
        Self {
            kind,
            message: message.into(),
            status,
            source,
        }
    }

    pub fn build(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::new(ErrorKind::RequestBuild, message, 0, Some(source.into()))
    }

    /// A build error with no underlying cause beyond its message.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RequestBuild, message, 0, None)
    }

    pub fn authentication(source: BoxError) -> Self {
        Self::new(
            ErrorKind::Authentication,
            "cannot apply authentication information to request",
            0,
            Some(source),
        )
    }

    pub fn connection(source: impl Into<BoxError>) -> Self {
        Self::new(ErrorKind::Connection, "Connection Error", 0, Some(source.into()))
    }

    pub fn timeout(source: impl Into<BoxError>) -> Self {
        Self::new(
            ErrorKind::Timeout,
            "Connection Error, Request Timed out",
            0,
            Some(source.into()),
        )
    }

    /// A status-derived error; `body` is kept verbatim as the message.
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::new(ErrorKind::from_status(status), body, status, None)
    }

    pub fn response_parse(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::new(ErrorKind::ResponseDecode, message, 0, Some(source.into()))
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn title(&self) -> &'static str {
        self.kind.title()
    }

    /// Detail message. For status errors this is the literal response body.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Status code of the response, `0` when none was obtained.
    pub fn status_code(&self) -> u16 {
        self.status
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == ErrorKind::Timeout
    }

    /// True for every failure where no response was obtained, timeouts included.
    pub fn is_connection_error(&self) -> bool {
        matches!(self.kind, ErrorKind::Connection | ErrorKind::Timeout)
    }

    pub fn is_response_parse_error(&self) -> bool {
        self.kind == ErrorKind::ResponseDecode
    }

    /// True when the request never left the process.
    pub fn is_request_build_error(&self) -> bool {
        matches!(self.kind, ErrorKind::RequestBuild | ErrorKind::Authentication)
    }
}
