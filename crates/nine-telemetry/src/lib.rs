//! Logging setup for Nine.
//!
//! Nine reports what it does through `tracing` events: the listening
//! address at startup, duplicate routes at registration, one `debug` event
//! per request, and shutdown progress. This crate installs a subscriber
//! that prints those events.
//!
//! # Example
//!
//! ```rust,ignore
//! use nine_telemetry::{init_logging, LogConfig, LogFormat};
//!
//! let config = LogConfig::production()
//!     .with_level("info,nine_server=debug")
//!     .with_format(LogFormat::Json);
//! init_logging(&config)?;
//! ```

#![doc(html_root_url = "https://docs.rs/nine-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, LogConfig, LogFormat};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
