//! Server configuration types.
//!
//! # Example
//!
//! ```rust
//! use nine_server::ServerConfig;
//! use std::time::Duration;
//!
//! let config = ServerConfig::builder()
//!     .host("127.0.0.1")
//!     .port("8080")
//!     .shutdown_timeout(Duration::from_secs(10))
//!     .build();
//!
//! assert_eq!(config.bind_addr(), "127.0.0.1:8080");
//! ```

use std::time::Duration;

use nine_config::ServerSettings;

/// Default bind host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default graceful shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 5;

/// Default request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Server configuration.
///
/// Use [`ServerConfig::builder()`] to construct instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    host: String,

    /// Empty means "pick a free port".
    port: String,

    shutdown_timeout: Duration,

    /// Bounds body collection and handler execution, each.
    request_timeout: Duration,

    keep_alive: bool,
}

impl ServerConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Builds a configuration from a loaded `[server]` section.
    ///
    /// ```rust
    /// use nine_config::ServerSettings;
    /// use nine_server::ServerConfig;
    ///
    /// let settings = ServerSettings {
    ///     port: Some("3000".to_string()),
    ///     request_timeout_ms: 1500,
    ///     ..Default::default()
    /// };
    /// let config = ServerConfig::from_settings(&settings);
    /// assert_eq!(config.port(), "3000");
    /// assert_eq!(config.request_timeout().as_millis(), 1500);
    /// ```
    #[must_use]
    pub fn from_settings(settings: &ServerSettings) -> Self {
        Self::builder()
            .host(settings.host.clone())
            .port(settings.port.clone().unwrap_or_default())
            .shutdown_timeout(Duration::from_secs(settings.shutdown_timeout_secs))
            .request_timeout(Duration::from_millis(settings.request_timeout_ms))
            .keep_alive(settings.keep_alive)
            .build()
    }

    /// Returns the bind host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the configured port, possibly empty.
    #[must_use]
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Returns `host:port`, with port `0` when none is configured.
    ///
    /// An IPv6 host is wrapped in brackets: `[::1]:8080`.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        let port = if self.port.is_empty() { "0" } else { &self.port };
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, port)
        } else {
            format!("{}:{}", self.host, port)
        }
    }

    /// Returns the graceful shutdown timeout.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Returns the request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Returns whether idle connections are kept open.
    #[must_use]
    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Clone, Default)]
pub struct ServerConfigBuilder {
    host: Option<String>,
    port: Option<String>,
    shutdown_timeout: Option<Duration>,
    request_timeout: Option<Duration>,
    keep_alive: Option<bool>,
}

impl ServerConfigBuilder {
    /// Sets the bind host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the port. Accepts anything printable, e.g. `8080` or `"8080"`.
    #[must_use]
    pub fn port(mut self, port: impl ToString) -> Self {
        self.port = Some(port.to_string());
        self
    }

    /// Sets the graceful shutdown timeout.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = Some(timeout);
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Enables or disables HTTP/1.1 keep-alive.
    #[must_use]
    pub fn keep_alive(mut self, enabled: bool) -> Self {
        self.keep_alive = Some(enabled);
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> ServerConfig {
        ServerConfig {
            host: self.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: self.port.unwrap_or_default(),
            shutdown_timeout: self
                .shutdown_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS)),
            request_timeout: self
                .request_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
            keep_alive: self.keep_alive.unwrap_or(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.host(), "0.0.0.0");
        assert_eq!(config.port(), "");
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(5));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(config.keep_alive());
    }

    #[test]
    fn test_empty_port_binds_any_free_port() {
        let config = ServerConfig::builder().host("127.0.0.1").build();
        assert_eq!(config.bind_addr(), "127.0.0.1:0");
    }

    #[test]
    fn test_numeric_port() {
        let config = ServerConfig::builder().port(9090).build();
        assert_eq!(config.port(), "9090");
        assert_eq!(config.bind_addr(), "0.0.0.0:9090");
    }

    #[test]
    fn test_ipv6_host_is_bracketed() {
        let config = ServerConfig::builder().host("::").port(8080).build();
        assert_eq!(config.bind_addr(), "[::]:8080");

        let config = ServerConfig::builder().host("[::1]").port(8080).build();
        assert_eq!(config.bind_addr(), "[::1]:8080");
    }

    #[test]
    fn test_from_default_settings() {
        let config = ServerConfig::from_settings(&ServerSettings::default());
        assert_eq!(config, ServerConfig::default());
    }
}
