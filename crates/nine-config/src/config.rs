//! Main configuration type.

use serde::{Deserialize, Serialize};

use crate::{ConfigError, LoggingSettings, ServerSettings};

/// Complete Nine configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use nine_config::NineConfig;
///
/// let config = NineConfig::default();
/// assert_eq!(config.server.host, "0.0.0.0");
/// assert_eq!(config.logging.level, "info");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct NineConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl NineConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - The log level is empty or not a valid filter directive
    /// - A timeout is zero
    /// - The port is set but is not a number
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::invalid_value("logging.level", "must not be empty"));
        }
        if let Err(err) = nine_telemetry::create_env_filter(&self.logging.level) {
            return Err(ConfigError::invalid_value("logging.level", err.to_string()));
        }

        if self.server.shutdown_timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                "server.shutdown_timeout_secs",
                "must be greater than 0",
            ));
        }
        if self.server.request_timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "server.request_timeout_ms",
                "must be greater than 0",
            ));
        }

        if let Some(port) = self.server.port.as_deref().filter(|p| !p.is_empty()) {
            if port.parse::<u16>().is_err() {
                return Err(ConfigError::invalid_value(
                    "server.port",
                    format!("invalid port: {port}"),
                ));
            }
        }

        if self.server.host.trim().is_empty() {
            return Err(ConfigError::invalid_value("server.host", "must not be empty"));
        }

        Ok(())
    }

    /// Development preset: pretty debug logs.
    #[must_use]
    pub fn development() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                ..Default::default()
            },
            logging: LoggingSettings {
                level: "debug".to_string(),
                format: nine_telemetry::LogFormat::Pretty,
                ..Default::default()
            },
        }
    }

    /// Production preset: JSON info logs.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }
}
