//! # Nine Server
//!
//! HTTP server, route groups and bundled middlewares for the Nine routing
//! toolkit.
//!
//! - [`Server`] - route registration, composition and the listen loop
//! - [`RouteManager`] and [`RouteGroup`] - registration shared by servers
//!   and groups
//! - [`App`] - the composed, shareable request handler
//! - [`cors`] - CORS preflight routes and header middleware
//! - [`StaticFiles`] - file serving under a directory
//! - [`ShutdownHandle`] - graceful shutdown from another task
//! - [`TestServer`] - in-memory requests for tests
//!
//! # Example
//!
//! ```rust
//! use nine_core::{with_context, Json};
//! use nine_server::{RouteManager, Server};
//!
//! let mut server = Server::new(5050);
//! server
//!     .use_middleware(with_context(|c| {
//!         if c.header("Authorization").is_empty() {
//!             return c.status(401).json(&Json::new().with("error", "Unauthorized"));
//!         }
//!         Ok(())
//!     }))
//!     .unwrap();
//! server
//!     .get("/me", with_context(|c| c.json(&Json::new().with("name", "nine"))))
//!     .unwrap();
//!
//! let client = server.test();
//! client.get("/me").send().assert_status(401);
//! client
//!     .get("/me")
//!     .header("Authorization", "Bearer token")
//!     .send()
//!     .assert_status(200);
//! ```

#![doc(html_root_url = "https://docs.rs/nine-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod banner;
mod compose;
mod config;
mod cors;
mod error;
mod group;
mod server;
mod shutdown;
mod static_files;
mod testing;

pub use compose::{App, Endpoint};
pub use config::{
    ServerConfig, ServerConfigBuilder, DEFAULT_HOST, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_SHUTDOWN_TIMEOUT_SECS,
};
pub use cors::{cors, CorsConfig};
pub use error::{ListenError, ShutdownError};
pub use group::{RouteGroup, RouteManager};
pub use server::Server;
pub use shutdown::{
    wait_for_os_signal, ConnectionToken, ConnectionTracker, ShutdownHandle, ShutdownReceiver,
    ShutdownSignal,
};
pub use static_files::{StaticFileError, StaticFiles, DEFAULT_INDEX};
pub use testing::{TestError, TestRequest, TestResponse, TestServer, SIMULATED_REMOTE_ADDR};
