//! Static file serving.
//!
//! The full request path is resolved under the root directory, so a route
//! registered as `/assets/` serves `<root>/assets/...`.
//!
//! - `index.html` for directories and paths ending in `/`
//! - MIME type by extension, then by content sniffing
//! - `X-Content-Type-Options`, `X-Frame-Options` and `X-XSS-Protection`
//! - gzip when the client sends `Accept-Encoding: gzip`
//!
//! # Security
//!
//! `..` segments and hidden files (names starting with `.`) are rejected
//! with `403`, and the resolved path must stay under the root once symlinks
//! are followed.

use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use flate2::write::GzEncoder;
use flate2::Compression;
use http::header::{self, HeaderName, HeaderValue};
use nine_core::{detect_content_type, handler, Handler, HandlerResult, Request, Response, ServerError};
use thiserror::Error;
use tracing::debug;

/// Default index file name.
pub const DEFAULT_INDEX: &str = "index.html";

/// Errors that can occur when resolving a static file.
#[derive(Debug, Error)]
pub enum StaticFileError {
    /// Nothing to serve at this path.
    #[error("file not found: {0}")]
    NotFound(String),

    /// The path is not allowed.
    #[error("forbidden path: {0}")]
    Forbidden(String),

    /// Reading or compressing the file failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StaticFileError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Forbidden(_) => 403,
            Self::Io(_) => 500,
        }
    }

    /// Converts into a handler error: `NotFound` and `Forbidden` become a
    /// [`ServerError`] with their status, I/O failures stay plain errors.
    #[must_use]
    pub fn into_handler_error(self) -> anyhow::Error {
        match self {
            Self::NotFound(_) | Self::Forbidden(_) => {
                ServerError::from_status(self.status_code()).into()
            }
            Self::Io(err) => err.into(),
        }
    }
}

/// Serves files from a directory.
///
/// # Example
///
/// ```rust
/// use nine_server::StaticFiles;
///
/// let files = StaticFiles::new("./public").gzip(false);
/// assert_eq!(files.root().to_str(), Some("./public"));
/// ```
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
    index: String,
    serve_hidden: bool,
    gzip: bool,
}

impl StaticFiles {
    /// Serves files under `root`.
    #[must_use]
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            index: DEFAULT_INDEX.to_string(),
            serve_hidden: false,
            gzip: true,
        }
    }

    /// Sets the file served for directories.
    #[must_use]
    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = index.into();
        self
    }

    /// Allows files and directories whose name starts with a dot.
    #[must_use]
    pub fn serve_hidden(mut self, enabled: bool) -> Self {
        self.serve_hidden = enabled;
        self
    }

    /// Enables gzip for clients that accept it. On by default.
    #[must_use]
    pub fn gzip(mut self, enabled: bool) -> Self {
        self.gzip = enabled;
        self
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a request path to a file under the root.
    ///
    /// # Errors
    ///
    /// - [`StaticFileError::Forbidden`] for `..`, hidden names or paths that
    ///   escape the root.
    /// - [`StaticFileError::NotFound`] when no regular file exists there.
    pub fn resolve(&self, request_path: &str) -> Result<PathBuf, StaticFileError> {
        let relative = request_path.trim_start_matches('/');

        for component in Path::new(relative).components() {
            match component {
                Component::ParentDir => {
                    return Err(StaticFileError::Forbidden(request_path.to_string()));
                }
                Component::Normal(name) if !self.serve_hidden => {
                    if name.to_str().is_some_and(|n| n.starts_with('.')) {
                        return Err(StaticFileError::Forbidden(request_path.to_string()));
                    }
                }
                _ => {}
            }
        }

        let mut full = self.root.join(relative);
        if request_path.ends_with('/') || full.is_dir() {
            full = full.join(&self.index);
        }

        let canonical = full
            .canonicalize()
            .map_err(|_| StaticFileError::NotFound(request_path.to_string()))?;
        let root = self.root.canonicalize()?;

        if !canonical.starts_with(&root) {
            return Err(StaticFileError::Forbidden(request_path.to_string()));
        }
        if !canonical.is_file() {
            return Err(StaticFileError::NotFound(request_path.to_string()));
        }

        Ok(canonical)
    }

    /// Answers `req` with the file it names.
    ///
    /// # Errors
    ///
    /// See [`StaticFileError::into_handler_error`].
    pub fn serve(&self, req: &Request, res: &mut Response<'_>) -> HandlerResult {
        let path = self.resolve(req.path()).map_err(|err| {
            debug!(path = req.path(), error = %err, "static file not served");
            err.into_handler_error()
        })?;

        let data = std::fs::read(&path)?;
        let content_type = mime_type(&path).unwrap_or_else(|| detect_content_type(&data));

        let gzip = self.gzip && accepts_gzip(req.header(header::ACCEPT_ENCODING.as_str()));
        let body = if gzip { compress(&data)? } else { data };

        let w = res.writer();
        w.set_header(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        w.set_header(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
        w.set_header(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
        w.set_header(
            HeaderName::from_static("x-xss-protection"),
            HeaderValue::from_static("1; mode=block"),
        );
        if gzip {
            w.set_header(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
            w.set_header(header::VARY, HeaderValue::from_static("accept-encoding"));
        }
        w.write_header(200);
        w.write_all(&body)?;
        Ok(())
    }

    /// Wraps the file server in a [`Handler`].
    #[must_use]
    pub fn into_handler(self) -> Handler {
        let files = Arc::new(self);
        handler(move |req, res| files.serve(req, res))
    }
}

fn accepts_gzip(accept_encoding: Option<&str>) -> bool {
    accept_encoding.is_some_and(|v| v.contains("gzip"))
}

fn compress(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

fn mime_type(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();

    let mime = match extension.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "xml" => "text/xml; charset=utf-8",
        "txt" => "text/plain; charset=utf-8",
        "csv" => "text/csv; charset=utf-8",
        "md" => "text/markdown; charset=utf-8",

        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "avif" => "image/avif",

        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",

        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "wasm" => "application/wasm",

        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        "webm" => "video/webm",

        _ => return None,
    };
    Some(mime)
}
