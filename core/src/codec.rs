//! Body buffering and decoding.
//!
//! # Design
//! Bodies are drained into memory first and only then handed to a
//! `ResponseTarget`. Any `DeserializeOwned` type is a target and receives the
//! body as JSON; `RawBody` receives the bytes unchanged.

use std::io::Read;

use serde::de::DeserializeOwned;
use thiserror::Error;
use ureq::http::Request;

/// Failure to drain or decode a body.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Failed to read body")]
    Read(#[source] std::io::Error),

    #[error("Failed unmarshal body")]
    Decode(#[source] serde_json::Error),
}

/// Something a body can be written into.
///
/// Every `DeserializeOwned` type is a target and is decoded as JSON. That
/// includes `Vec<u8>`, which expects a JSON array of numbers; use `RawBody`
/// to receive the bytes as they arrived.
pub trait ResponseTarget {
    /// Replace `self` with the content of `body`.
    fn assign_body(&mut self, body: Vec<u8>) -> Result<(), serde_json::Error>;

    /// Declared type of the target, used in error messages.
    fn type_name(&self) -> &'static str;
}

impl<T: DeserializeOwned> ResponseTarget for T {
    fn assign_body(&mut self, body: Vec<u8>) -> Result<(), serde_json::Error> {
        *self = serde_json::from_slice(&body)?;
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// Target that keeps the body as raw bytes instead of decoding JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawBody(pub Vec<u8>);

impl RawBody {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl ResponseTarget for RawBody {
    fn assign_body(&mut self, body: Vec<u8>) -> Result<(), serde_json::Error> {
        self.0 = body;
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<RawBody>()
    }
}

/// Drain `reader` completely.
pub fn read_body<R: Read>(mut reader: R) -> Result<Vec<u8>, CodecError> {
    let mut body = Vec::new();
    reader.read_to_end(&mut body).map_err(CodecError::Read)?;
    Ok(body)
}

/// Drain `reader` and write its content into `target`.
pub fn decode_into<R, T>(reader: R, target: &mut T) -> Result<(), CodecError>
where
    R: Read,
    T: ResponseTarget + ?Sized,
{
    let body = read_body(reader)?;
    target.assign_body(body).map_err(CodecError::Decode)
}

/// Decode the body of an incoming request, for server-side harnesses.
pub fn decode_request_body<T>(request: &Request<Vec<u8>>, target: &mut T) -> Result<(), CodecError>
where
    T: ResponseTarget + ?Sized,
{
    decode_into(request.body().as_slice(), target)
}
