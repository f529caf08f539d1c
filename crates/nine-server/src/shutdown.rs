//! Graceful shutdown.
//!
//! A [`ShutdownSignal`] stops the accept loop and asks every open
//! connection to finish its current request. A [`ConnectionTracker`] counts
//! the connections still open so that [`ShutdownHandle::shutdown`] can wait
//! for them to drain.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use nine_server::Server;
//!
//! let server = Server::new(8080);
//! let handle = server.shutdown_handle();
//!
//! tokio::spawn(async move {
//!     nine_server::wait_for_os_signal().await.ok();
//!     handle.shutdown(Duration::from_secs(5)).await.ok();
//! });
//!
//! server.listen().await?;
//! ```

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::{broadcast, Notify};
use tracing::{info, warn};

use crate::error::ShutdownError;

/// A signal that can be used to trigger and await shutdown.
///
/// Clones share the same state.
///
/// ```rust
/// use nine_server::ShutdownSignal;
///
/// let shutdown = ShutdownSignal::new();
/// let other = shutdown.clone();
///
/// shutdown.trigger();
/// assert!(other.is_shutdown());
/// ```
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    triggered: Arc<AtomicBool>,
    sender: broadcast::Sender<()>,
}

impl ShutdownSignal {
    /// Creates an untriggered signal.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self {
            triggered: Arc::new(AtomicBool::new(false)),
            sender,
        }
    }

    /// Triggers the signal. Idempotent.
    pub fn trigger(&self) {
        if self
            .triggered
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            // no receivers is fine
            let _ = self.sender.send(());
        }
    }

    /// Returns `true` once the signal has been triggered.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Returns a future that completes when the signal is triggered, or
    /// immediately if it already was.
    pub fn recv(&self) -> ShutdownReceiver {
        let triggered = Arc::clone(&self.triggered);
        // subscribed before the flag is read, so a trigger in between is seen
        let mut receiver = self.sender.subscribe();
        ShutdownReceiver {
            inner: Box::pin(async move {
                if triggered.load(Ordering::SeqCst) {
                    return;
                }
                let _ = receiver.recv().await;
            }),
        }
    }

    /// Creates a signal triggered by SIGTERM or SIGINT.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn with_os_signals() -> Self {
        let signal = Self::new();
        let trigger = signal.clone();

        tokio::spawn(async move {
            match wait_for_os_signal().await {
                Ok(()) => trigger.trigger(),
                Err(err) => tracing::error!(error = %err, "cannot listen for OS signals"),
            }
        });

        signal
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Future returned by [`ShutdownSignal::recv`].
pub struct ShutdownReceiver {
    inner: Pin<Box<dyn Future<Output = ()> + Send>>,
}

impl Future for ShutdownReceiver {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx)
    }
}

impl std::fmt::Debug for ShutdownReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownReceiver").finish_non_exhaustive()
    }
}

/// Waits for SIGTERM or SIGINT (Ctrl+C only on non-Unix targets).
///
/// # Errors
///
/// Fails if the signal handlers cannot be installed.
pub async fn wait_for_os_signal() -> io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
            _ = sigint.recv() => info!("received SIGINT, shutting down"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("received Ctrl+C, shutting down");
    }

    Ok(())
}

/// Counts open connections.
///
/// ```rust
/// use nine_server::ConnectionTracker;
///
/// let tracker = ConnectionTracker::new();
/// let token = tracker.acquire();
/// assert_eq!(tracker.active_connections(), 1);
///
/// drop(token);
/// assert_eq!(tracker.active_connections(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    active: Arc<AtomicUsize>,
    notify: Arc<Notify>,
}

impl ConnectionTracker {
    /// Creates a tracker with no connections.
    #[must_use]
    pub fn new() -> Self {
        Self {
            active: Arc::new(AtomicUsize::new(0)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Registers a connection until the returned token is dropped.
    #[must_use]
    pub fn acquire(&self) -> ConnectionToken {
        self.active.fetch_add(1, Ordering::SeqCst);
        ConnectionToken {
            active: Arc::clone(&self.active),
            notify: Arc::clone(&self.notify),
        }
    }

    /// Returns the number of open connections.
    #[must_use]
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Completes once no connection is open.
    pub async fn wait_for_idle(&self) {
        loop {
            // registered before the check so a concurrent last drop is not missed
            let notified = self.notify.notified();
            if self.active.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Held by a connection task for as long as the connection is open.
#[derive(Debug)]
pub struct ConnectionToken {
    active: Arc<AtomicUsize>,
    notify: Arc<Notify>,
}

impl Drop for ConnectionToken {
    fn drop(&mut self) {
        if self.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.notify.notify_waiters();
        }
    }
}

/// Stops a running server from another task.
///
/// Obtained with [`Server::shutdown_handle`](crate::Server::shutdown_handle).
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    pub(crate) signal: ShutdownSignal,
    pub(crate) tracker: ConnectionTracker,
    pub(crate) local_addr: Arc<RwLock<Option<SocketAddr>>>,
    pub(crate) default_timeout: Duration,
}

impl ShutdownHandle {
    /// Stops accepting connections, asks open ones to finish and waits for
    /// them for at most `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError::Timeout`] if connections are still open when
    /// the timeout elapses. They keep draining in the background.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), ShutdownError> {
        self.signal.trigger();
        info!(
            active = self.tracker.active_connections(),
            timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            "shutting down"
        );

        if tokio::time::timeout(timeout, self.tracker.wait_for_idle())
            .await
            .is_ok()
        {
            info!("all connections closed");
            Ok(())
        } else {
            let active = self.tracker.active_connections();
            warn!(active, "shutdown timed out");
            Err(ShutdownError::Timeout { active })
        }
    }

    /// [`shutdown`](Self::shutdown) with the configured shutdown timeout.
    ///
    /// # Errors
    ///
    /// See [`shutdown`](Self::shutdown).
    pub async fn shutdown_default(&self) -> Result<(), ShutdownError> {
        self.shutdown(self.default_timeout).await
    }

    /// Stops accepting connections without waiting.
    pub fn trigger(&self) {
        self.signal.trigger();
    }

    /// Returns `true` once shutdown has started.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.signal.is_shutdown()
    }

    /// Returns the number of open connections.
    #[must_use]
    pub fn active_connections(&self) -> usize {
        self.tracker.active_connections()
    }

    /// Returns the bound address once the server is listening.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.read()
    }
}
