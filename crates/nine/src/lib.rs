//! # Nine
//!
//! A small HTTP routing and middleware toolkit.
//!
//! - Handlers written as `fn(&Request, &mut Response)` or `fn(&mut Context)`
//! - Middlewares: every handler but the last in a list, run in order
//! - Route groups with a base path and their own middlewares
//! - CORS, static files and graceful shutdown out of the box
//! - An in-memory test client
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nine::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new().with_defaults().with_env_prefix("NINE").load()?;
//!     init_logging(&config.logging.to_log_config())?;
//!
//!     let mut server = Server::with_config(ServerConfig::from_settings(&config.server));
//!     server.get("/hello", with_context(|c| {
//!         c.json(&Json::new().with("message", "hello world"))
//!     }))?;
//!
//!     let handle = server.shutdown_handle();
//!     tokio::spawn(async move {
//!         if wait_for_os_signal().await.is_ok() {
//!             let _ = handle.shutdown_default().await;
//!         }
//!     });
//!
//!     server.listen().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Request flow
//!
//! ```text
//! Request → not-found guard → global → group → route → handler
//! ```
//!
//! A layer that sends a response or returns an error ends the chain.

#![doc(html_root_url = "https://docs.rs/nine/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub use nine_config as config;
pub use nine_core as core;
pub use nine_router as router;
pub use nine_server as server;
pub use nine_telemetry as telemetry;

/// Everything needed to write a server.
///
/// ```rust
/// use nine::prelude::*;
///
/// let mut server = Server::new(5050);
/// server.get("/", handler(|_req, res| res.send("home"))).unwrap();
/// server.test().get("/").send().assert_status(200);
/// ```
pub mod prelude {
    pub use nine_config::{ConfigLoader, NineConfig};
    pub use nine_core::{
        handler, with_context, Context, Handler, HandlerResult, HandlerWithContext, Json,
        RegistrationError, Request, Response, ServerError,
    };
    pub use nine_server::{
        cors, wait_for_os_signal, CorsConfig, RouteGroup, RouteManager, Server, ServerConfig,
        ShutdownHandle,
    };
    pub use nine_telemetry::{init_logging, LogConfig, LogFormat};
}
