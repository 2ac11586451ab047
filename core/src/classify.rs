//! Status-code classification.

use std::io::Read;

use crate::codec::read_body;
use crate::error::RequestError;

/// Return `Ok` for status < 400, otherwise a `RequestError` whose message is
/// the literal response body.
pub fn classify<R: Read>(status: u16, body: R) -> Result<(), RequestError> {
    if status < 400 {
        return Ok(());
    }
    let body = read_body(body).map_err(|e| {
        RequestError::response_parse(
            format!("Failed to read response body, response code: {status}"),
            e,
        )
    })?;
    Err(RequestError::status(
        status,
        String::from_utf8_lossy(&body).into_owned(),
    ))
}
