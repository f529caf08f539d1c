//! The transport side of a response.
//!
//! [`ResponseWriter`] buffers a single HTTP response. Headers stay mutable
//! until the status is committed by [`ResponseWriter::write_header`] or the
//! first body write; after that the committed header set is what goes out.

use std::io;

use bytes::{Bytes, BytesMut};
use http::header::{HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, StatusCode};
use tracing::{debug, warn};

use crate::sniff::{detect_content_type, SNIFF_LEN};

#[derive(Debug)]
struct Committed {
    status: StatusCode,
    headers: HeaderMap,
}

/// A buffered HTTP response shared by every layer of a handler chain.
///
/// # Example
///
/// ```rust
/// use std::io::Write;
/// use nine_core::ResponseWriter;
///
/// let mut w = ResponseWriter::new();
/// w.write_header(201);
/// w.write_all(b"<p>created</p>").unwrap();
///
/// let response = w.into_response();
/// assert_eq!(response.status(), 201);
/// assert_eq!(response.headers()["content-type"], "text/html; charset=utf-8");
/// ```
#[derive(Debug, Default)]
pub struct ResponseWriter {
    headers: HeaderMap,
    committed: Option<Committed>,
    body: BytesMut,
}

impl ResponseWriter {
    /// Creates an empty, uncommitted writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the header map that will be sent when the status is committed.
    ///
    /// Changes made after the commit are not sent.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Returns the pending header map.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Sets a header, replacing any existing values.
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    /// Commits the status line and snapshots the headers.
    ///
    /// Only the first call has an effect. Informational codes other than
    /// `101` do not commit, and codes outside `100..=999` commit a `500`.
    pub fn write_header(&mut self, code: u16) {
        if let Some(committed) = &self.committed {
            warn!(
                current = committed.status.as_u16(),
                ignored = code,
                "superfluous write_header call"
            );
            return;
        }

        let status = match StatusCode::from_u16(code) {
            Ok(status) => status,
            Err(_) => {
                warn!(code, "invalid status code, responding with 500");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_informational() && status != StatusCode::SWITCHING_PROTOCOLS {
            debug!(code, "informational status is not committed");
            return;
        }

        self.committed = Some(Committed {
            status,
            headers: self.headers.clone(),
        });
    }

    /// Returns the committed status, if any.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        self.committed.as_ref().map(|c| c.status)
    }

    /// Returns true once the status has been committed.
    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.committed.is_some()
    }

    /// Returns the bytes written so far.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Finishes the response.
    ///
    /// An uncommitted writer answers `200` with its current headers. A
    /// non-empty body without `Content-Type` gets one sniffed from its first
    /// 512 bytes.
    #[must_use]
    pub fn into_response(mut self) -> http::Response<Bytes> {
        if self.committed.is_none() {
            self.write_header(StatusCode::OK.as_u16());
        }
        let (status, mut headers) = match self.committed {
            Some(Committed { status, headers }) => (status, headers),
            None => (StatusCode::OK, self.headers),
        };

        if !self.body.is_empty() && !headers.contains_key(CONTENT_TYPE) {
            let sniffed = detect_content_type(&self.body[..self.body.len().min(SNIFF_LEN)]);
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(sniffed));
        }

        let mut response = http::Response::new(self.body.freeze());
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }
}

fn body_allowed(status: StatusCode) -> bool {
    !(status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED)
}

impl io::Write for ResponseWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.committed.is_none() {
            self.write_header(StatusCode::OK.as_u16());
        }
        if let Some(committed) = &self.committed {
            if !body_allowed(committed.status) {
                return Err(io::Error::other(
                    "response status code does not allow body",
                ));
            }
        }
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Replies with `msg` as a plain-text error.
///
/// Sets `Content-Type: text/plain; charset=utf-8` and
/// `X-Content-Type-Options: nosniff`, writes `code` and then `msg` followed
/// by a newline.
pub fn http_error(w: &mut ResponseWriter, msg: &str, code: u16) {
    let headers = w.headers_mut();
    headers.remove(CONTENT_LENGTH);
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(
        HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    );
    w.write_header(code);

    let mut line = String::with_capacity(msg.len() + 1);
    line.push_str(msg);
    line.push('\n');
    if let Err(err) = io::Write::write_all(w, line.as_bytes()) {
        debug!(error = %err, "error body dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_uncommitted_writer_defaults_to_ok() {
        let w = ResponseWriter::new();
        let response = w.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.body().is_empty());
        assert!(response.headers().get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_first_write_commits_ok_and_sniffs() {
        let mut w = ResponseWriter::new();
        w.write_all(b"hello world").unwrap();
        assert_eq!(w.status(), Some(StatusCode::OK));

        let response = w.into_response();
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
        assert_eq!(response.body().as_ref(), b"hello world");
    }

    #[test]
    fn test_explicit_content_type_is_kept() {
        let mut w = ResponseWriter::new();
        w.set_header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        w.write_all(b"{}").unwrap();

        let response = w.into_response();
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn test_second_write_header_is_ignored() {
        let mut w = ResponseWriter::new();
        w.write_header(201);
        w.write_header(404);
        assert_eq!(w.into_response().status(), StatusCode::CREATED);
    }

    #[test]
    fn test_headers_after_commit_are_not_sent() {
        let mut w = ResponseWriter::new();
        w.set_header(
            HeaderName::from_static("x-before"),
            HeaderValue::from_static("1"),
        );
        w.write_header(200);
        w.set_header(
            HeaderName::from_static("x-after"),
            HeaderValue::from_static("1"),
        );

        let response = w.into_response();
        assert!(response.headers().contains_key("x-before"));
        assert!(!response.headers().contains_key("x-after"));
    }

    #[test]
    fn test_informational_does_not_commit() {
        let mut w = ResponseWriter::new();
        w.write_header(103);
        assert!(!w.is_committed());
        w.write_header(202);
        assert_eq!(w.status(), Some(StatusCode::ACCEPTED));
    }

    #[test]
    fn test_invalid_code_commits_500() {
        let mut w = ResponseWriter::new();
        w.write_header(42);
        assert_eq!(w.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn test_no_content_refuses_body() {
        let mut w = ResponseWriter::new();
        w.write_header(204);
        assert!(w.write_all(b"ignored").is_err());
        assert!(w.into_response().body().is_empty());
    }

    #[test]
    fn test_http_error_writes_plain_text() {
        let mut w = ResponseWriter::new();
        http_error(&mut w, "page not found", 404);

        let response = w.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
        assert_eq!(response.body().as_ref(), b"page not found\n");
    }
}
