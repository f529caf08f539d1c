//! # Nine Core
//!
//! Handler model and per-request types for the Nine routing toolkit.
//!
//! - [`Handler`] and [`HandlerWithContext`] - the two accepted handler shapes
//! - [`register_handlers`] and [`IntoHandlers`] - handler list normalization
//! - [`Request`], [`Response`] and [`Context`] - what a handler works with
//! - [`ResponseWriter`] - the buffered response shared by a handler chain
//! - [`ServerError`] - an intentional HTTP failure with an explicit status
//! - [`RegistrationError`] - errors raised while routes are registered
//!
//! # Example
//!
//! ```rust
//! use bytes::Bytes;
//! use nine_core::{handler, Request, Response, ResponseWriter};
//!
//! let hello = handler(|req, res| {
//!     let name = req.query("name").unwrap_or_else(|| "world".to_string());
//!     res.send(format!("hello {name}"))
//! });
//!
//! let req = Request::new(http::Request::get("/?name=nine").body(Bytes::new()).unwrap());
//! let mut w = ResponseWriter::new();
//! hello.call(&req, &mut Response::new(&mut w)).unwrap();
//!
//! assert_eq!(w.into_response().body().as_ref(), b"hello nine");
//! ```

#![doc(html_root_url = "https://docs.rs/nine-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod error;
mod handler;
mod json;
mod normalize;
mod request;
mod response;
mod sniff;
mod writer;

pub use context::Context;
pub use error::{
    status_text, write_error, BoxError, RegistrationError, ServerError, JSON_CONTENT_TYPE,
};
pub use handler::{
    handler, with_context, ContextFn, DirectFn, Handler, HandlerKind, HandlerResult,
    HandlerWithContext,
};
pub use json::Json;
pub use normalize::{register_handlers, validate_handler, DynHandler, IntoHandlers};
pub use request::Request;
pub use response::{Response, DEFAULT_STATUS_CODE};
pub use sniff::{detect_content_type, SNIFF_LEN};
pub use writer::{http_error, ResponseWriter};
