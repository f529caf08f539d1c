//! Error types for Nine.
//!
//! Two families live here:
//!
//! - [`ServerError`] is returned from handlers to answer with an explicit
//!   status code. It is written to the response and ends the chain.
//! - [`RegistrationError`] is returned while routes are being registered,
//!   before any request is served.
//!
//! Any other error returned by a handler becomes a `500` with the error's
//! message as a plain-text body, see [`write_error`].

use std::error::Error as StdError;

use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use thiserror::Error;
use tracing::debug;

use crate::writer::{http_error, ResponseWriter};

/// Content type that switches a [`ServerError`] to the JSON wire format.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Boxed error carried by a [`ServerError`].
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// An intentional HTTP failure with an explicit status code.
///
/// Returning a `ServerError` from a handler or middleware writes it to the
/// response and stops the chain.
///
/// # Wire format
///
/// With `content_type == "application/json"` the body is
/// `{"err":"<message>"}` followed by a newline. Any other content type uses
/// the plain-text convention of [`http_error`].
///
/// # Example
///
/// ```rust
/// use nine_core::{ResponseWriter, ServerError};
///
/// let err = ServerError::json(401, "Unauthorized");
/// assert_eq!(err.to_string(), "Unauthorized");
///
/// let mut w = ResponseWriter::new();
/// err.write_to(&mut w);
/// let response = w.into_response();
/// assert_eq!(response.status(), 401);
/// assert_eq!(response.body().as_ref(), b"{\"err\":\"Unauthorized\"}\n");
/// ```
#[derive(Debug, Error)]
#[error("{err}")]
pub struct ServerError {
    /// HTTP status code to answer with.
    pub status_code: u16,
    /// Content type that selects the body format.
    pub content_type: String,
    /// The underlying error; its message becomes the body.
    pub err: BoxError,
}

impl ServerError {
    /// Creates a plain-text server error.
    pub fn new(status_code: u16, err: impl Into<BoxError>) -> Self {
        Self {
            status_code,
            content_type: String::new(),
            err: err.into(),
        }
    }

    /// Creates a server error rendered as `{"err":"<message>"}`.
    pub fn json(status_code: u16, err: impl Into<BoxError>) -> Self {
        Self {
            status_code,
            content_type: JSON_CONTENT_TYPE.to_string(),
            err: err.into(),
        }
    }

    /// Creates an error whose message is the canonical reason phrase of
    /// `status_code`.
    pub fn from_status(status_code: u16) -> Self {
        Self::new(status_code, status_text(status_code))
    }

    /// The `404 Not Found` error produced for unregistered routes.
    pub fn not_found() -> Self {
        Self::from_status(StatusCode::NOT_FOUND.as_u16())
    }

    /// Returns true if the error renders as JSON.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.content_type == JSON_CONTENT_TYPE
    }

    /// Writes the error to `w`.
    pub fn write_to(&self, w: &mut ResponseWriter) {
        if let Ok(value) = HeaderValue::from_str(&self.content_type) {
            w.headers_mut().insert(CONTENT_TYPE, value);
        }

        if !self.is_json() {
            http_error(w, &self.err.to_string(), self.status_code);
            return;
        }

        if self.status_code >= 100 {
            w.write_header(self.status_code);
        }
        let mut body = serde_json::json!({ "err": self.err.to_string() }).to_string();
        body.push('\n');
        if let Err(err) = std::io::Write::write_all(w, body.as_bytes()) {
            debug!(error = %err, "error body dropped");
        }
    }
}

/// Returns the canonical reason phrase for `code`, or an empty string.
#[must_use]
pub fn status_text(code: u16) -> &'static str {
    StatusCode::from_u16(code)
        .ok()
        .and_then(|status| status.canonical_reason())
        .unwrap_or("")
}

/// Writes a handler error to `w`.
///
/// A [`ServerError`] is written as itself; anything else answers `500` with
/// the error's message.
pub fn write_error(w: &mut ResponseWriter, err: &anyhow::Error) {
    match err.downcast_ref::<ServerError>() {
        Some(server_error) => server_error.write_to(w),
        None => http_error(
            w,
            &err.to_string(),
            StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
        ),
    }
}

/// Errors raised while registering handlers and routes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// A route was registered without a handler.
    #[error("put a handler")]
    PutAHandler,

    /// A value of an unsupported type was offered as a handler.
    #[error(
        "invalid handler type: {type_name} - must be either nine::Handler or nine::HandlerWithContext"
    )]
    InvalidHandler {
        /// Name of the rejected type.
        type_name: String,
    },

    /// A middleware in a handler list was rejected.
    #[error("middleware at position {position}: {source}")]
    Middleware {
        /// Zero-based index in the handler list.
        position: usize,
        /// Why it was rejected.
        source: Box<RegistrationError>,
    },

    /// The last entry of a handler list was rejected.
    #[error("final handler: {source}")]
    FinalHandler {
        /// Why it was rejected.
        source: Box<RegistrationError>,
    },

    /// A global middleware was rejected.
    #[error("invalid middleware: {source}")]
    InvalidMiddleware {
        /// Why it was rejected.
        source: Box<RegistrationError>,
    },

    /// The route pattern could not be registered.
    #[error("invalid route {pattern:?}: {reason}")]
    InvalidRoute {
        /// The transformed route pattern.
        pattern: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl RegistrationError {
    /// Returns the innermost error, skipping positional wrappers.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Middleware { source, .. }
            | Self::FinalHandler { source }
            | Self::InvalidMiddleware { source } => source.root(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_server_error_body() {
        let mut w = ResponseWriter::new();
        ServerError::json(503, "err").write_to(&mut w);

        let response = w.into_response();
        assert_eq!(response.status(), 503);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(response.body().as_ref(), b"{\"err\":\"err\"}\n");
    }

    #[test]
    fn test_json_server_error_below_100_keeps_default_status() {
        let mut w = ResponseWriter::new();
        ServerError::json(42, "odd").write_to(&mut w);

        let response = w.into_response();
        assert_eq!(response.status(), 200);
        assert_eq!(response.body().as_ref(), b"{\"err\":\"odd\"}\n");
    }

    #[test]
    fn test_plain_server_error_body() {
        let mut w = ResponseWriter::new();
        ServerError::new(500, "internal server error").write_to(&mut w);

        let response = w.into_response();
        assert_eq!(response.status(), 500);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
        assert_eq!(response.body().as_ref(), b"internal server error\n");
    }

    #[test]
    fn test_not_found_uses_reason_phrase() {
        let err = ServerError::not_found();
        assert_eq!(err.status_code, 404);
        assert_eq!(err.to_string(), "Not Found");
        assert!(!err.is_json());
    }

    #[test]
    fn test_write_error_maps_other_errors_to_500() {
        let mut w = ResponseWriter::new();
        write_error(&mut w, &anyhow::anyhow!("boom"));

        let response = w.into_response();
        assert_eq!(response.status(), 500);
        assert_eq!(response.body().as_ref(), b"boom\n");
    }

    #[test]
    fn test_write_error_recovers_server_error() {
        let mut w = ResponseWriter::new();
        write_error(&mut w, &anyhow::Error::new(ServerError::new(418, "teapot")));

        let response = w.into_response();
        assert_eq!(response.status(), 418);
        assert_eq!(response.body().as_ref(), b"teapot\n");
    }

    #[test]
    fn test_registration_error_messages() {
        let invalid = RegistrationError::InvalidHandler {
            type_name: "&str".to_string(),
        };
        let wrapped = RegistrationError::Middleware {
            position: 1,
            source: Box::new(invalid.clone()),
        };

        assert_eq!(RegistrationError::PutAHandler.to_string(), "put a handler");
        assert!(wrapped.to_string().starts_with("middleware at position 1: invalid handler type: &str"));
        assert_eq!(wrapped.root(), &invalid);
    }

    #[test]
    fn test_status_text() {
        assert_eq!(status_text(204), "No Content");
        assert_eq!(status_text(999), "");
    }
}
