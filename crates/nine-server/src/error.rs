//! Runtime error types.

use std::io;

use thiserror::Error;

/// Errors raised while binding or serving.
#[derive(Debug, Error)]
pub enum ListenError {
    /// The listening socket could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The address that was requested.
        addr: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Any other socket error.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Errors raised by a graceful shutdown.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShutdownError {
    /// Connections were still open when the deadline passed.
    #[error("shutdown timed out with {active} connection(s) still active")]
    Timeout {
        /// Connections left open.
        active: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_error_names_address() {
        let err = ListenError::Bind {
            addr: "127.0.0.1:80".to_string(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.to_string(), "failed to bind 127.0.0.1:80: denied");
    }

    #[test]
    fn test_timeout_message() {
        let err = ShutdownError::Timeout { active: 2 };
        assert_eq!(
            err.to_string(),
            "shutdown timed out with 2 connection(s) still active"
        );
    }
}
