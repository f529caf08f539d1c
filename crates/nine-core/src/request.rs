//! Handler-facing request.

use std::net::SocketAddr;

use bytes::Bytes;
use http::{HeaderMap, Method};
use nine_router::Params;
use serde::de::DeserializeOwned;

/// An incoming request with its body already collected.
///
/// Besides the `http` request itself, a `Request` knows which route pattern
/// matched it, the parameters captured from the path and the peer address.
///
/// # Example
///
/// ```rust
/// use bytes::Bytes;
/// use nine_core::Request;
/// use nine_router::Params;
///
/// let mut params = Params::new();
/// params.push("name", "ana");
///
/// let http = http::Request::get("/hello/ana?lang=pt").body(Bytes::new()).unwrap();
/// let req = Request::new(http)
///     .with_pattern("GET /hello/{name}")
///     .with_params(params);
///
/// assert_eq!(req.param("name"), Some("ana"));
/// assert_eq!(req.query("lang").as_deref(), Some("pt"));
/// assert_eq!(req.registered_pattern(), "GET /hello/{name}");
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    inner: http::Request<Bytes>,
    pattern: String,
    params: Params,
    remote_addr: Option<SocketAddr>,
}

impl Request {
    /// Wraps an `http` request.
    #[must_use]
    pub fn new(inner: http::Request<Bytes>) -> Self {
        Self {
            inner,
            pattern: String::new(),
            params: Params::new(),
            remote_addr: None,
        }
    }

    /// Records the route pattern that matched.
    #[must_use]
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    /// Records the captured path parameters.
    #[must_use]
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Records the peer address.
    #[must_use]
    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// Returns the route pattern registered for this request, e.g.
    /// `GET /user/{id}`.
    #[must_use]
    pub fn registered_pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns the underlying `http` request.
    #[must_use]
    pub fn http(&self) -> &http::Request<Bytes> {
        &self.inner
    }

    /// Returns the request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    /// Returns the URL path.
    #[must_use]
    pub fn path(&self) -> &str {
        self.inner.uri().path()
    }

    /// Returns a path parameter captured by the matched pattern.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// Returns every captured path parameter.
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Returns the request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Returns the first value of header `key`, if it is valid text.
    #[must_use]
    pub fn header(&self, key: &str) -> Option<&str> {
        self.inner.headers().get(key)?.to_str().ok()
    }

    /// Returns the decoded query string as `(key, value)` pairs in order.
    ///
    /// A malformed query string yields no pairs.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.inner
            .uri()
            .query()
            .and_then(|query| serde_urlencoded::from_str(query).ok())
            .unwrap_or_default()
    }

    /// Returns the first value of query parameter `key`.
    #[must_use]
    pub fn query(&self, key: &str) -> Option<String> {
        self.query_pairs()
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Returns the request body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        self.inner.body()
    }

    /// Decodes the body as JSON.
    pub fn body_json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(self.inner.body())
    }

    /// Returns the peer address, when the request came from a socket.
    #[must_use]
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }
}
