//! Typed configuration for Nine servers.
//!
//! - TOML and JSON configuration files
//! - `.env` files through `dotenvy`
//! - `PREFIX__SECTION__KEY` environment overrides
//! - Strict parsing (unknown fields are rejected)
//!
//! # Example
//!
//! ```no_run
//! use nine_config::ConfigLoader;
//!
//! # fn main() -> Result<(), nine_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_optional_file("nine.toml")?
//!     .with_env_prefix("NINE")
//!     .load()?;
//!
//! println!("port: {:?}", config.server.port);
//! # Ok(())
//! # }
//! ```
//!
//! # File Format
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = "8080"
//! shutdown_timeout_secs = 5
//! request_timeout_ms = 30000
//! keep_alive = true
//!
//! [logging]
//! enabled = true
//! level = "info,nine_server=debug"
//! format = "json"
//! ```

#![doc(html_root_url = "https://docs.rs/nine-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::NineConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{LoggingSettings, ServerSettings};

pub use nine_telemetry::LogFormat;
