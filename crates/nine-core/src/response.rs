//! Handler-facing response.

use std::io::Write;

use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use serde::Serialize;

use crate::error::ServerError;
use crate::handler::HandlerResult;
use crate::writer::ResponseWriter;

/// Status code used when none was set.
pub const DEFAULT_STATUS_CODE: u16 = 200;

const MIN_STATUS_CODE: u16 = 100;
const MAX_STATUS_CODE: u16 = 511;

/// The response view handed to one layer of a handler chain.
///
/// Each layer gets a fresh `Response` over the shared [`ResponseWriter`].
/// Only the first of [`send`](Self::send), [`json`](Self::json) and
/// [`send_status`](Self::send_status) has an effect; later calls return
/// `Ok(())` without writing.
///
/// # Example
///
/// ```rust
/// use nine_core::{Response, ResponseWriter};
///
/// let mut w = ResponseWriter::new();
/// let mut res = Response::new(&mut w);
/// res.status(201).send("created").unwrap();
/// res.send("ignored").unwrap();
/// assert!(res.sent());
///
/// let response = w.into_response();
/// assert_eq!(response.status(), 201);
/// assert_eq!(response.body().as_ref(), b"created");
/// ```
#[derive(Debug)]
pub struct Response<'w> {
    writer: &'w mut ResponseWriter,
    status: u16,
    sent: bool,
}

impl<'w> Response<'w> {
    /// Creates a response with the default status over `writer`.
    pub fn new(writer: &'w mut ResponseWriter) -> Self {
        Self {
            writer,
            status: DEFAULT_STATUS_CODE,
            sent: false,
        }
    }

    /// Returns true once this response has sent something.
    #[must_use]
    pub fn sent(&self) -> bool {
        self.sent
    }

    /// Sets the status code used by the next send.
    pub fn status(&mut self, code: u16) -> &mut Self {
        self.status = code;
        self
    }

    /// Returns the status code that will be used.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status
    }

    /// Sets a response header, replacing existing values.
    ///
    /// # Errors
    ///
    /// Fails if `key` or `value` is not a valid header name or value.
    pub fn set_header(&mut self, key: &str, value: &str) -> Result<(), http::Error> {
        let name = HeaderName::from_bytes(key.as_bytes())?;
        let value = HeaderValue::from_str(value)?;
        self.writer.set_header(name, value);
        Ok(())
    }

    /// Writes the status and `body`.
    ///
    /// A non-empty body without a `Content-Type` header gets one sniffed from
    /// its content.
    pub fn send(&mut self, body: impl AsRef<[u8]>) -> HandlerResult {
        if self.mark_sent() {
            return Ok(());
        }
        self.write_status();
        let body = body.as_ref();
        if !body.is_empty() {
            self.writer.write_all(body)?;
        }
        Ok(())
    }

    /// Encodes `data` as JSON, followed by a newline.
    ///
    /// Sets `Content-Type: application/json`. An invalid status code is
    /// replaced by the default.
    pub fn json<T: Serialize + ?Sized>(&mut self, data: &T) -> HandlerResult {
        if self.mark_sent() {
            return Ok(());
        }
        let mut body = serde_json::to_vec(data)?;
        body.push(b'\n');

        self.writer
            .set_header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if !valid_status(self.status) {
            self.status = DEFAULT_STATUS_CODE;
        }
        self.writer.write_header(self.status);
        self.writer.write_all(&body)?;
        Ok(())
    }

    /// Ends the chain with `code`.
    ///
    /// Nothing is written here: the returned [`ServerError`] carries the
    /// status and its reason phrase up to the dispatcher, which renders it.
    pub fn send_status(&mut self, code: u16) -> HandlerResult {
        if self.mark_sent() {
            return Ok(());
        }
        self.status = code;
        Err(ServerError::from_status(code).into())
    }

    /// Returns the underlying writer.
    pub fn writer(&mut self) -> &mut ResponseWriter {
        self.writer
    }

    fn mark_sent(&mut self) -> bool {
        std::mem::replace(&mut self.sent, true)
    }

    fn write_status(&mut self) {
        if valid_status(self.status) && self.status != DEFAULT_STATUS_CODE {
            self.writer.write_header(self.status);
        } else {
            self.writer.write_header(DEFAULT_STATUS_CODE);
        }
    }
}

fn valid_status(code: u16) -> bool {
    (MIN_STATUS_CODE..=MAX_STATUS_CODE).contains(&code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_defaults_to_ok() {
        let mut w = ResponseWriter::new();
        Response::new(&mut w).send("hello world").unwrap();

        let response = w.into_response();
        assert_eq!(response.status(), 200);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
        assert_eq!(response.body().as_ref(), b"hello world");
    }

    #[test]
    fn test_send_twice_writes_once() {
        let mut w = ResponseWriter::new();
        let mut res = Response::new(&mut w);
        res.send("first").unwrap();
        res.send("second").unwrap();

        assert_eq!(w.into_response().body().as_ref(), b"first");
    }

    #[test]
    fn test_send_with_invalid_status_uses_default() {
        let mut w = ResponseWriter::new();
        Response::new(&mut w).status(600).send("x").unwrap();
        assert_eq!(w.into_response().status(), 200);
    }

    #[test]
    fn test_send_keeps_explicit_content_type() {
        let mut w = ResponseWriter::new();
        let mut res = Response::new(&mut w);
        res.set_header("Content-Type", "text/csv").unwrap();
        res.send("a,b").unwrap();

        assert_eq!(w.into_response().headers()[CONTENT_TYPE], "text/csv");
    }

    #[test]
    fn test_empty_send_writes_status_only() {
        let mut w = ResponseWriter::new();
        Response::new(&mut w).status(202).send("").unwrap();

        let response = w.into_response();
        assert_eq!(response.status(), 202);
        assert!(response.body().is_empty());
        assert!(response.headers().get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_json_appends_newline() {
        let mut w = ResponseWriter::new();
        Response::new(&mut w)
            .json(&serde_json::json!({"message": "hello world"}))
            .unwrap();

        let response = w.into_response();
        assert_eq!(response.status(), 200);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(response.body().as_ref(), b"{\"message\":\"hello world\"}\n");
    }

    #[test]
    fn test_json_with_status() {
        let mut w = ResponseWriter::new();
        Response::new(&mut w)
            .status(201)
            .json(&serde_json::json!({"created": true}))
            .unwrap();
        assert_eq!(w.into_response().status(), 201);
    }

    #[test]
    fn test_send_status_returns_server_error() {
        let mut w = ResponseWriter::new();
        let mut res = Response::new(&mut w);
        let err = res.send_status(403).unwrap_err();
        let server_error = err.downcast_ref::<ServerError>().unwrap();

        assert_eq!(server_error.status_code, 403);
        assert_eq!(server_error.to_string(), "Forbidden");
        assert!(res.sent());
        assert!(res.send_status(500).is_ok());
    }

    #[test]
    fn test_set_header_rejects_invalid_name() {
        let mut w = ResponseWriter::new();
        let mut res = Response::new(&mut w);
        assert!(res.set_header("bad header", "x").is_err());
    }
}
