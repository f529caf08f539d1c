//! Request and response in one value.

use std::net::SocketAddr;
use std::path::Path;

use http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::handler::HandlerResult;
use crate::request::Request;
use crate::response::Response;

/// The argument of a [`HandlerWithContext`](crate::HandlerWithContext).
///
/// Holds the request and the response of the current layer and forwards
/// the common calls to them. Missing values read as empty strings, so
/// handlers can write `c.params("id")` without unwrapping.
///
/// # Example
///
/// ```rust
/// use bytes::Bytes;
/// use nine_core::{Context, Request, Response, ResponseWriter};
///
/// let req = Request::new(
///     http::Request::get("/search?q=nine").body(Bytes::new()).unwrap(),
/// );
/// let mut w = ResponseWriter::new();
/// let mut res = Response::new(&mut w);
/// let mut c = Context::new(&req, &mut res);
///
/// let q = c.query("q");
/// c.status(200).send(format!("searching {q}")).unwrap();
/// assert_eq!(w.into_response().body().as_ref(), b"searching nine");
/// ```
#[derive(Debug)]
pub struct Context<'a, 'w> {
    request: &'a Request,
    response: &'a mut Response<'w>,
}

impl<'a, 'w> Context<'a, 'w> {
    /// Creates a context over a request and the current response.
    pub fn new(request: &'a Request, response: &'a mut Response<'w>) -> Self {
        Self { request, response }
    }

    /// Returns the request.
    #[must_use]
    pub fn request(&self) -> &Request {
        self.request
    }

    /// Returns the response.
    pub fn response(&mut self) -> &mut Response<'w> {
        self.response
    }

    /// Returns path parameter `name`, or an empty string.
    #[must_use]
    pub fn params(&self, name: &str) -> String {
        self.request.param(name).unwrap_or_default().to_string()
    }

    /// Returns path parameter `name`, or `default` when it is empty.
    #[must_use]
    pub fn params_or(&self, name: &str, default: &str) -> String {
        or_default(self.params(name), default)
    }

    /// Returns the first value of query parameter `name`, or an empty string.
    #[must_use]
    pub fn query(&self, name: &str) -> String {
        self.request.query(name).unwrap_or_default()
    }

    /// Returns query parameter `name`, or `default` when it is empty.
    #[must_use]
    pub fn query_or(&self, name: &str, default: &str) -> String {
        or_default(self.query(name), default)
    }

    /// Returns header `key`, or an empty string.
    #[must_use]
    pub fn header(&self, key: &str) -> &str {
        self.request.header(key).unwrap_or_default()
    }

    /// Returns the request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        self.request.method()
    }

    /// Returns the URL path.
    #[must_use]
    pub fn path(&self) -> &str {
        self.request.path()
    }

    /// Returns the client address.
    ///
    /// `X-Real-IP` wins over `X-Forwarded-For`, which wins over the peer
    /// address of the connection.
    #[must_use]
    pub fn ip(&self) -> String {
        for key in ["X-Real-IP", "X-Forwarded-For"] {
            let value = self.header(key);
            if !value.is_empty() {
                return value.to_string();
            }
        }
        self.request
            .remote_addr()
            .as_ref()
            .map(SocketAddr::to_string)
            .unwrap_or_default()
    }

    /// Returns every address listed in `X-Forwarded-For`, or [`ip`](Self::ip)
    /// when the header is absent.
    #[must_use]
    pub fn ips(&self) -> Vec<String> {
        let forwarded = self.header("X-Forwarded-For");
        if forwarded.is_empty() {
            return vec![self.ip()];
        }
        forwarded.split(',').map(|ip| ip.trim().to_string()).collect()
    }

    /// Returns the raw request body.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        self.request.body()
    }

    /// Decodes the request body as JSON.
    pub fn body_parser<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        self.request.body_json()
    }

    /// Decodes the query string into `T`, keeping the first value of each key.
    pub fn query_parser<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        let mut pairs: Vec<(String, String)> = Vec::new();
        for (key, value) in self.request.query_pairs() {
            if !pairs.iter().any(|(k, _)| *k == key) {
                pairs.push((key, value));
            }
        }
        decode_pairs(&pairs)
    }

    /// Decodes the captured path parameters into `T`.
    pub fn params_parser<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        let pairs: Vec<(&str, &str)> = self.request.params().iter().collect();
        decode_pairs(&pairs)
    }

    /// Decodes the request headers into `T`.
    ///
    /// Field names are the lowercase header names; each takes the header's
    /// first value.
    pub fn req_header_parser<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        let mut pairs: Vec<(&str, &str)> = Vec::new();
        for name in self.request.headers().keys() {
            if let Some(value) = self.request.header(name.as_str()) {
                pairs.push((name.as_str(), value));
            }
        }
        decode_pairs(&pairs)
    }

    /// Sets the status code of the response.
    pub fn status(&mut self, code: u16) -> &mut Response<'w> {
        self.response.status(code)
    }

    /// Sets a response header.
    pub fn set_header(&mut self, key: &str, value: &str) -> Result<(), http::Error> {
        self.response.set_header(key, value)
    }

    /// See [`Response::send`].
    pub fn send(&mut self, body: impl AsRef<[u8]>) -> HandlerResult {
        self.response.send(body)
    }

    /// Sends a text body.
    pub fn send_string(&mut self, body: &str) -> HandlerResult {
        self.response.send(body)
    }

    /// Reads the file at `path` and sends its content.
    pub fn send_file(&mut self, path: impl AsRef<Path>) -> HandlerResult {
        let content = std::fs::read(path)?;
        self.response.send(content)
    }

    /// See [`Response::json`].
    pub fn json<T: Serialize + ?Sized>(&mut self, data: &T) -> HandlerResult {
        self.response.json(data)
    }

    /// See [`Response::send_status`].
    pub fn send_status(&mut self, code: u16) -> HandlerResult {
        self.response.send_status(code)
    }
}

fn or_default(value: String, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value
    }
}

fn decode_pairs<K, V, T>(pairs: &[(K, V)]) -> anyhow::Result<T>
where
    K: Serialize,
    V: Serialize,
    T: DeserializeOwned,
{
    let encoded = serde_urlencoded::to_string(pairs)?;
    Ok(serde_urlencoded::from_str(&encoded)?)
}
