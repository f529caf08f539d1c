//! Handler shapes.
//!
//! Nine accepts request logic in two shapes:
//!
//! - [`Handler`]: a function of the request and the response.
//! - [`HandlerWithContext`]: a function of a [`Context`] wrapping both.
//!
//! Both are cheap to clone and safe to share across threads. A context
//! handler is turned into a plain one with [`HandlerWithContext::handler`];
//! everything past registration deals only in [`Handler`].

use std::fmt;
use std::sync::Arc;

use http::header::{HeaderValue, CONTENT_TYPE, LOCATION};
use http::{Method, StatusCode};

use crate::context::Context;
use crate::request::Request;
use crate::response::Response;

/// Outcome of a handler or middleware.
///
/// Returning a [`ServerError`](crate::ServerError) answers with its status;
/// any other error answers `500`.
pub type HandlerResult = anyhow::Result<()>;

/// Plain function pointer accepted as a [`Handler`].
pub type DirectFn = fn(&Request, &mut Response<'_>) -> HandlerResult;

/// Plain function pointer accepted as a [`HandlerWithContext`].
pub type ContextFn = fn(&mut Context<'_, '_>) -> HandlerResult;

type DirectBody = dyn Fn(&Request, &mut Response<'_>) -> HandlerResult + Send + Sync;
type ContextBody = dyn Fn(&mut Context<'_, '_>) -> HandlerResult + Send + Sync;

/// Request logic operating on a request and a response.
///
/// # Example
///
/// ```rust
/// use nine_core::{handler, Handler, Request, Response};
///
/// let hello: Handler = handler(|_req: &Request, res: &mut Response<'_>| res.send("hello"));
/// ```
#[derive(Clone)]
pub struct Handler(Arc<DirectBody>);

impl Handler {
    /// Wraps a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Request, &mut Response<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Runs the handler.
    pub fn call(&self, req: &Request, res: &mut Response<'_>) -> HandlerResult {
        (self.0)(req, res)
    }

    /// Returns true if both values share the same underlying closure.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// A handler that answers `301 Moved Permanently` pointing at `url`.
    ///
    /// `GET` and `HEAD` requests also get a short HTML body linking to the
    /// new location.
    pub fn redirect(url: impl Into<String>) -> Self {
        let url: String = url.into();
        Self::new(move |req, res| {
            let location = HeaderValue::from_str(&url)?;
            let writer = res.writer();
            writer.set_header(LOCATION, location);

            let with_body = matches!(*req.method(), Method::GET | Method::HEAD);
            if with_body {
                writer.set_header(
                    CONTENT_TYPE,
                    HeaderValue::from_static("text/html; charset=utf-8"),
                );
            }
            writer.write_header(StatusCode::MOVED_PERMANENTLY.as_u16());
            if with_body {
                let body = format!(
                    "<a href=\"{}\">Moved Permanently</a>.\n\n",
                    html_escape(&url)
                );
                std::io::Write::write_all(writer, body.as_bytes())?;
            }
            Ok(())
        })
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handler").finish_non_exhaustive()
    }
}

/// Request logic operating on a [`Context`].
///
/// # Example
///
/// ```rust
/// use nine_core::{with_context, Context, HandlerWithContext};
///
/// let hello: HandlerWithContext = with_context(|c: &mut Context<'_, '_>| c.send_string("hello"));
/// let plain = hello.handler();
/// ```
#[derive(Clone)]
pub struct HandlerWithContext(Arc<ContextBody>);

impl HandlerWithContext {
    /// Wraps a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut Context<'_, '_>) -> HandlerResult + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Runs the handler.
    pub fn call(&self, c: &mut Context<'_, '_>) -> HandlerResult {
        (self.0)(c)
    }

    /// Adapts this handler to the request/response shape.
    ///
    /// Each call builds a [`Context`] over the request and response it is
    /// given.
    #[must_use]
    pub fn handler(&self) -> Handler {
        let inner = Arc::clone(&self.0);
        Handler::new(move |req, res| {
            let mut c = Context::new(req, res);
            inner(&mut c)
        })
    }
}

impl fmt::Debug for HandlerWithContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HandlerWithContext").finish_non_exhaustive()
    }
}

/// Every handler shape Nine understands.
#[derive(Debug, Clone)]
pub enum HandlerKind {
    /// Request/response shape.
    Direct(Handler),
    /// Context shape.
    Context(HandlerWithContext),
}

impl HandlerKind {
    /// Normalizes to the request/response shape.
    #[must_use]
    pub fn into_handler(self) -> Handler {
        match self {
            Self::Direct(h) => h,
            Self::Context(h) => h.handler(),
        }
    }
}

impl From<Handler> for HandlerKind {
    fn from(h: Handler) -> Self {
        Self::Direct(h)
    }
}

impl From<HandlerWithContext> for HandlerKind {
    fn from(h: HandlerWithContext) -> Self {
        Self::Context(h)
    }
}

impl From<DirectFn> for HandlerKind {
    fn from(f: DirectFn) -> Self {
        Self::Direct(Handler::new(f))
    }
}

impl From<ContextFn> for HandlerKind {
    fn from(f: ContextFn) -> Self {
        Self::Context(HandlerWithContext::new(f))
    }
}

impl From<DirectFn> for Handler {
    fn from(f: DirectFn) -> Self {
        Self::new(f)
    }
}

impl From<HandlerWithContext> for Handler {
    fn from(h: HandlerWithContext) -> Self {
        h.handler()
    }
}

impl From<ContextFn> for HandlerWithContext {
    fn from(f: ContextFn) -> Self {
        Self::new(f)
    }
}

/// Builds a [`Handler`] from a closure.
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&Request, &mut Response<'_>) -> HandlerResult + Send + Sync + 'static,
{
    Handler::new(f)
}

/// Builds a [`HandlerWithContext`] from a closure.
pub fn with_context<F>(f: F) -> HandlerWithContext
where
    F: Fn(&mut Context<'_, '_>) -> HandlerResult + Send + Sync + 'static,
{
    HandlerWithContext::new(f)
}

fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
