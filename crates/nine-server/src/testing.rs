//! In-memory testing.
//!
//! [`Server::test`](crate::Server::test) composes the current routes and
//! dispatches requests without binding a socket:
//!
//! ```rust
//! use nine_core::{with_context, Json};
//! use nine_server::{RouteManager, Server};
//!
//! let mut server = Server::new(5050);
//! server
//!     .get("/hello", with_context(|c| c.json(&Json::new().with("message", "hello world"))))
//!     .unwrap();
//!
//! let response = server.test().get("/hello").send();
//! response.assert_status(200);
//! assert_eq!(response.text().unwrap(), "{\"message\":\"hello world\"}\n");
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::string::FromUtf8Error;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::compose::App;

/// Peer address of simulated requests.
pub const SIMULATED_REMOTE_ADDR: SocketAddr =
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)), 1234);

/// Errors raised while building a test request or reading its response.
#[derive(Debug, Error)]
pub enum TestError {
    /// The request could not be built.
    #[error("request build error: {0}")]
    RequestBuild(#[from] http::Error),

    /// A JSON body could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The body is not UTF-8.
    #[error("body is not UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),
}

/// Dispatches simulated requests through a composed [`App`].
#[derive(Debug, Clone)]
pub struct TestServer {
    app: App,
}

impl TestServer {
    pub(crate) fn new(app: App) -> Self {
        Self { app }
    }

    /// Dispatches `req` and captures the response.
    #[must_use]
    pub fn request(&self, req: http::Request<Bytes>) -> TestResponse {
        TestResponse::from(self.app.dispatch(req, Some(SIMULATED_REMOTE_ADDR)))
    }

    /// Starts a request with any method.
    #[must_use]
    pub fn method(&self, method: Method, uri: &str) -> TestRequest<'_> {
        TestRequest {
            server: self,
            builder: http::Request::builder().method(method).uri(uri),
            body: Bytes::new(),
            json_error: None,
        }
    }

    /// Starts a `GET` request.
    #[must_use]
    pub fn get(&self, uri: &str) -> TestRequest<'_> {
        self.method(Method::GET, uri)
    }

    /// Starts a `POST` request.
    #[must_use]
    pub fn post(&self, uri: &str) -> TestRequest<'_> {
        self.method(Method::POST, uri)
    }

    /// Starts a `PUT` request.
    #[must_use]
    pub fn put(&self, uri: &str) -> TestRequest<'_> {
        self.method(Method::PUT, uri)
    }

    /// Starts a `PATCH` request.
    #[must_use]
    pub fn patch(&self, uri: &str) -> TestRequest<'_> {
        self.method(Method::PATCH, uri)
    }

    /// Starts a `DELETE` request.
    #[must_use]
    pub fn delete(&self, uri: &str) -> TestRequest<'_> {
        self.method(Method::DELETE, uri)
    }

    /// Starts an `OPTIONS` request.
    #[must_use]
    pub fn options(&self, uri: &str) -> TestRequest<'_> {
        self.method(Method::OPTIONS, uri)
    }
}

/// A simulated request being built.
#[derive(Debug)]
pub struct TestRequest<'a> {
    server: &'a TestServer,
    builder: http::request::Builder,
    body: Bytes,
    json_error: Option<serde_json::Error>,
}

impl TestRequest<'_> {
    /// Adds a header.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    /// Sets the raw body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets a JSON body and `Content-Type: application/json`.
    #[must_use]
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => self.body = Bytes::from(body),
            Err(err) => self.json_error = Some(err),
        }
        self.header("content-type", "application/json")
    }

    /// Dispatches the request.
    ///
    /// # Errors
    ///
    /// Fails if the method, URI, a header or the JSON body is invalid.
    pub fn try_send(self) -> Result<TestResponse, TestError> {
        if let Some(err) = self.json_error {
            return Err(err.into());
        }
        let req = self.builder.body(self.body)?;
        Ok(self.server.request(req))
    }

    /// Dispatches the request.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built; see [`try_send`](Self::try_send).
    #[must_use]
    pub fn send(self) -> TestResponse {
        match self.try_send() {
            Ok(response) => response,
            Err(err) => panic!("invalid test request: {err}"),
        }
    }
}

/// A captured response.
#[derive(Debug, Clone)]
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl From<http::Response<Bytes>> for TestResponse {
    fn from(response: http::Response<Bytes>) -> Self {
        let (parts, body) = response.into_parts();
        Self {
            status: parts.status,
            headers: parts.headers,
            body,
        }
    }
}

impl TestResponse {
    /// Returns the status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header as text, if present and valid.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = HeaderName::try_from(name).ok()?;
        self.headers.get(name)?.to_str().ok()
    }

    /// Returns the raw body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the body as text.
    ///
    /// # Errors
    ///
    /// Fails if the body is not UTF-8.
    pub fn text(&self) -> Result<String, TestError> {
        Ok(String::from_utf8(self.body.to_vec())?)
    }

    /// Decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Fails if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TestError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Asserts the status code.
    ///
    /// # Panics
    ///
    /// Panics on mismatch.
    pub fn assert_status(&self, expected: u16) -> &Self {
        assert_eq!(
            self.status.as_u16(),
            expected,
            "expected status {expected}, got {}",
            self.status
        );
        self
    }

    /// Asserts a header value.
    ///
    /// # Panics
    ///
    /// Panics if the header is missing or differs.
    pub fn assert_header(&self, name: &str, expected: &str) -> &Self {
        assert_eq!(self.header(name), Some(expected), "header {name}");
        self
    }

    /// Asserts the exact body.
    ///
    /// # Panics
    ///
    /// Panics if the body differs.
    pub fn assert_body(&self, expected: impl AsRef<[u8]>) -> &Self {
        assert_eq!(
            self.body.as_ref(),
            expected.as_ref(),
            "body was {:?}",
            String::from_utf8_lossy(&self.body)
        );
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_from_http() {
        let http = http::Response::builder()
            .status(201)
            .header("x-id", "42")
            .body(Bytes::from_static(b"{\"ok\":true}"))
            .unwrap();
        let response = TestResponse::from(http);

        response.assert_status(201).assert_header("X-Id", "42");
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["ok"], true);
    }

    #[test]
    fn test_missing_header() {
        let response = TestResponse::from(http::Response::new(Bytes::new()));
        assert_eq!(response.header("x-missing"), None);
        assert_eq!(response.header("not a header"), None);
    }
}
