//! Configuration schema types.

use nine_telemetry::{LogConfig, LogFormat};
use serde::{Deserialize, Serialize};

/// Server configuration section.
///
/// # Example
///
/// ```
/// use nine_config::ServerSettings;
///
/// let settings = ServerSettings {
///     port: Some("8080".to_string()),
///     ..Default::default()
/// };
/// assert_eq!(settings.host, "0.0.0.0");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerSettings {
    /// Interface to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind. Absent or empty picks a free port.
    #[serde(default)]
    pub port: Option<String>,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Request timeout in milliseconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Keep idle HTTP/1.1 connections open between requests.
    #[serde(default = "default_true")]
    pub keep_alive: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: None,
            shutdown_timeout_secs: default_shutdown_timeout(),
            request_timeout_ms: default_request_timeout(),
            keep_alive: true,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_shutdown_timeout() -> u64 {
    5
}

fn default_request_timeout() -> u64 {
    30_000
}

fn default_true() -> bool {
    true
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingSettings {
    /// Enable log output.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive, e.g. `info` or `info,nine_server=debug`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::Json,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl LoggingSettings {
    /// Converts the section into a logging setup.
    ///
    /// ```
    /// use nine_config::LoggingSettings;
    /// use nine_telemetry::LogFormat;
    ///
    /// let settings = LoggingSettings {
    ///     level: "debug".to_string(),
    ///     format: LogFormat::Pretty,
    ///     ..Default::default()
    /// };
    /// let log = settings.to_log_config();
    /// assert_eq!(log.level, "debug");
    /// assert_eq!(log.format, LogFormat::Pretty);
    /// ```
    #[must_use]
    pub fn to_log_config(&self) -> LogConfig {
        let mut config = LogConfig::production()
            .with_level(self.level.clone())
            .with_format(self.format);
        config.enabled = self.enabled;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_defaults() {
        let settings = ServerSettings::default();
        assert_eq!(settings.host, "0.0.0.0");
        assert_eq!(settings.port, None);
        assert_eq!(settings.shutdown_timeout_secs, 5);
        assert_eq!(settings.request_timeout_ms, 30_000);
        assert!(settings.keep_alive);
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let settings: ServerSettings = toml::from_str(r#"port = "3000""#).unwrap();
        assert_eq!(settings.port.as_deref(), Some("3000"));
        assert_eq!(settings.host, "0.0.0.0");
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let result: Result<ServerSettings, _> = toml::from_str("http2 = true");
        assert!(result.is_err());
    }

    #[test]
    fn test_logging_format_from_json() {
        let settings: LoggingSettings =
            serde_json::from_str(r#"{"level":"warn","format":"pretty"}"#).unwrap();
        assert_eq!(settings.format, LogFormat::Pretty);
        assert!(settings.enabled);
    }

    #[test]
    fn test_disabled_logging_carries_over() {
        let settings = LoggingSettings {
            enabled: false,
            ..Default::default()
        };
        assert!(!settings.to_log_config().enabled);
    }
}
