//! Cross-origin resource sharing.
//!
//! [`cors`] installs a preflight handler on the server and returns a
//! middleware that adds the same headers to regular responses:
//!
//! ```rust
//! use nine_server::{cors, CorsConfig, RouteManager, Server};
//!
//! let mut server = Server::new(5050);
//! let middleware = cors(&mut server, CorsConfig::default());
//! server.use_middleware(middleware).unwrap();
//! ```

use std::sync::Arc;

use nine_core::{with_context, Context, HandlerResult, HandlerWithContext};

use crate::server::Server;

/// CORS settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsConfig {
    /// Origins allowed to call the API; `*` allows any.
    pub allow_origins: Vec<String>,
    /// Value of `Access-Control-Allow-Methods`.
    pub allow_methods: Vec<String>,
    /// Value of `Access-Control-Allow-Headers`.
    pub allow_headers: Vec<String>,
    /// Sends `Access-Control-Allow-Credentials: true` for a named origin.
    pub allow_credentials: bool,
    /// Value of `Access-Control-Max-Age`, in seconds.
    pub max_age: u64,
}

impl Default for CorsConfig {
    /// Any origin; the usual methods and headers; preflight cached for a day.
    fn default() -> Self {
        Self {
            allow_origins: vec!["*".to_string()],
            allow_methods: ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"]
                .map(String::from)
                .to_vec(),
            allow_headers: ["Origin", "Content-Type", "Accept", "Authorization"]
                .map(String::from)
                .to_vec(),
            allow_credentials: false,
            max_age: 24 * 60 * 60,
        }
    }
}

impl CorsConfig {
    /// Returns the `Access-Control-Allow-Origin` value for `origin`, empty
    /// when the origin is not allowed.
    #[must_use]
    pub fn allowed_origin(&self, origin: &str) -> String {
        self.allow_origins
            .iter()
            .find(|allowed| *allowed == "*" || *allowed == origin)
            .map(|allowed| {
                if allowed == "*" {
                    "*".to_string()
                } else {
                    origin.to_string()
                }
            })
            .unwrap_or_default()
    }

    fn apply(&self, c: &mut Context<'_, '_>) -> HandlerResult {
        let origin = self.allowed_origin(c.header("Origin"));

        c.set_header("Access-Control-Allow-Origin", &origin)?;
        if self.allow_credentials && origin != "*" {
            c.set_header("Access-Control-Allow-Credentials", "true")?;
        }
        c.set_header("Access-Control-Allow-Methods", &self.allow_methods.join(","))?;
        c.set_header("Access-Control-Allow-Headers", &self.allow_headers.join(","))?;
        c.set_header("Access-Control-Max-Age", &self.max_age.to_string())?;
        Ok(())
    }
}

/// Enables CORS on `server` and returns the header middleware.
///
/// Every registered path gets an `OPTIONS` route answering `204 No Content`
/// with the CORS headers. The returned middleware only sets the headers; add
/// it with [`Server::use_middleware`] or on a group to cover other methods.
pub fn cors(server: &mut Server, config: CorsConfig) -> HandlerWithContext {
    let config = Arc::new(config);

    let preflight = {
        let config = Arc::clone(&config);
        with_context(move |c| {
            config.apply(c)?;
            if *c.method() == http::Method::OPTIONS {
                return c.send_status(204);
            }
            Ok(())
        })
    };
    server.enable_cors(preflight);

    with_context(move |c| config.apply(c))
}
