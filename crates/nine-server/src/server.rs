//! The HTTP server.
//!
//! Routes are registered on a [`Server`] first, then [`Server::listen`]
//! composes them into an [`App`] and serves it over HTTP/1.1:
//!
//! - one Tokio task per connection
//! - the request body is collected before dispatch
//! - the handler chain runs on the blocking pool
//! - on shutdown, accepting stops and open connections finish their current
//!   request
//!
//! Registration needs `&mut Server` and serving borrows it immutably, so
//! routes cannot change while the server runs.
//!
//! # Example
//!
//! ```rust,no_run
//! use nine_core::handler;
//! use nine_server::{RouteManager, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new(5050);
//!     server.get("/hello", handler(|_req, res| res.send("Hello World")))?;
//!     server.listen().await?;
//!     Ok(())
//! }
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::Method;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use nine_core::{
    http_error, register_handlers, status_text, Handler, HandlerWithContext, IntoHandlers,
    RegistrationError, ResponseWriter,
};
use nine_router::{route_pattern, Mux, MuxError, RouteTable};
use parking_lot::RwLock;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::banner::banner;
use crate::compose::{compose, App, RouteEntry};
use crate::config::ServerConfig;
use crate::error::ListenError;
use crate::group::{RouteGroup, RouteManager};
use crate::shutdown::{ConnectionTracker, ShutdownHandle, ShutdownSignal};
use crate::static_files::StaticFiles;
use crate::testing::TestServer;

/// Routes, middlewares and the listening socket of one HTTP server.
#[derive(Debug)]
pub struct Server {
    config: ServerConfig,
    routes: RouteTable<RouteEntry>,
    global: Vec<Handler>,
    cors: Option<Handler>,
    shutdown: ShutdownSignal,
    tracker: ConnectionTracker,
    local_addr: Arc<RwLock<Option<SocketAddr>>>,
}

impl Server {
    /// Creates a server for `port`.
    ///
    /// Accepts a number or a string; an empty string picks a free port when
    /// listening.
    #[must_use]
    pub fn new(port: impl ToString) -> Self {
        Self::with_config(ServerConfig::builder().port(port).build())
    }

    /// Creates a server from a full configuration.
    #[must_use]
    pub fn with_config(config: ServerConfig) -> Self {
        Self {
            config,
            routes: RouteTable::new(),
            global: Vec::new(),
            cors: None,
            shutdown: ShutdownSignal::new(),
            tracker: ConnectionTracker::new(),
            local_addr: Arc::new(RwLock::new(None)),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the port: the bound one once listening, else the configured
    /// one (possibly empty).
    #[must_use]
    pub fn port(&self) -> String {
        match *self.local_addr.read() {
            Some(addr) => addr.port().to_string(),
            None => self.config.port().to_string(),
        }
    }

    /// Returns the bound address once listening.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.read()
    }

    /// Iterates over the registered patterns, in registration order.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|route| route.pattern())
    }

    /// Answers `OPTIONS` on every registered path with `preflight`.
    ///
    /// Usually called through [`cors`](crate::cors()).
    pub fn enable_cors(&mut self, preflight: HandlerWithContext) {
        self.cors = Some(preflight.handler());
    }

    /// Serves the files under `dir` for `GET` requests matching `pattern`.
    ///
    /// The full request path is looked up under `dir`; see
    /// [`StaticFiles`]. Static routes skip the not-found guard.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::InvalidRoute`] when the pattern cannot
    /// be routed.
    pub fn serve_files(
        &mut self,
        pattern: &str,
        dir: impl AsRef<Path>,
    ) -> Result<(), RegistrationError> {
        self.add_route(
            route_pattern(Method::GET.as_str(), pattern),
            RouteEntry {
                handler: StaticFiles::new(dir).into_handler(),
                middlewares: Vec::new(),
                serving_files: true,
            },
        )
    }

    /// Composes the registered routes into a request handler.
    ///
    /// Duplicate patterns are logged; the first one registered is served.
    #[must_use]
    pub fn handler(&self) -> App {
        compose(&self.routes, &self.global, self.cors.as_ref())
    }

    /// Returns an in-memory client for the current routes.
    #[must_use]
    pub fn test(&self) -> TestServer {
        TestServer::new(self.handler())
    }

    /// Returns a handle to stop the server from another task.
    #[must_use]
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            signal: self.shutdown.clone(),
            tracker: self.tracker.clone(),
            local_addr: Arc::clone(&self.local_addr),
            default_timeout: self.config.shutdown_timeout(),
        }
    }

    /// Binds `host:port` and serves until shut down.
    ///
    /// Returns `Ok(())` once a shutdown has stopped the accept loop. Use
    /// [`ShutdownHandle::shutdown`] to also wait for open connections.
    ///
    /// # Errors
    ///
    /// Returns [`ListenError::Bind`] if the address cannot be bound.
    pub async fn listen(&self) -> Result<(), ListenError> {
        let addr = self.config.bind_addr();
        let listener = TcpListener::bind(addr.as_str())
            .await
            .map_err(|source| ListenError::Bind {
                addr: addr.clone(),
                source,
            })?;
        self.serve(listener).await
    }

    /// Serves an already bound listener until shut down.
    ///
    /// # Errors
    ///
    /// Fails if the listener's local address cannot be read.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ListenError> {
        let local = listener.local_addr()?;
        *self.local_addr.write() = Some(local);

        let app = self.handler();
        info!(address = %local, routes = app.len(), "{}", banner(local.port()));

        let mut shutdown = self.shutdown.recv();
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote)) => self.spawn_connection(stream, remote, app.clone()),
                    Err(err) => error!(error = %err, "failed to accept connection"),
                },
                () = &mut shutdown => {
                    info!(
                        active = self.tracker.active_connections(),
                        "stopped accepting connections"
                    );
                    break;
                }
            }
        }

        Ok(())
    }

    pub(crate) fn add_route(
        &mut self,
        pattern: String,
        entry: RouteEntry,
    ) -> Result<(), RegistrationError> {
        if let Err(MuxError::InvalidPattern { reason, .. }) = Mux::new().insert(&pattern, ()) {
            return Err(RegistrationError::InvalidRoute {
                pattern,
                reason: reason.to_string(),
            });
        }
        debug!(pattern = %pattern, middlewares = entry.middlewares.len(), "route registered");
        self.routes.register(pattern, entry);
        Ok(())
    }

    fn spawn_connection(&self, stream: TcpStream, remote: SocketAddr, app: App) {
        let token = self.tracker.acquire();
        let shutdown = self.shutdown.clone();
        let keep_alive = self.config.keep_alive();
        let timeout = self.config.request_timeout();

        tokio::spawn(async move {
            let _token = token;
            if let Err(err) =
                serve_connection(stream, remote, app, shutdown, keep_alive, timeout).await
            {
                error!(remote = %remote, error = %err, "connection error");
            }
        });
    }
}

impl RouteManager for Server {
    fn register(
        &mut self,
        method: Method,
        path: &str,
        handlers: impl IntoHandlers,
    ) -> Result<(), RegistrationError> {
        let (handler, middlewares) = register_handlers(handlers)?;
        self.add_route(
            route_pattern(method.as_str(), path),
            RouteEntry {
                handler,
                middlewares,
                serving_files: false,
            },
        )
    }

    fn use_middleware(&mut self, middleware: impl IntoHandlers) -> Result<(), RegistrationError> {
        let handlers = middleware
            .into_handlers()
            .map_err(|err| RegistrationError::InvalidMiddleware {
                source: Box::new(err),
            })?;
        self.global.extend(handlers);
        Ok(())
    }

    fn group(&mut self, base_path: &str, middlewares: impl IntoHandlers) -> RouteGroup<'_> {
        RouteGroup::new(self, base_path.to_string(), middlewares)
    }
}

async fn serve_connection(
    stream: TcpStream,
    remote: SocketAddr,
    app: App,
    shutdown: ShutdownSignal,
    keep_alive: bool,
    timeout: Duration,
) -> Result<(), hyper::Error> {
    let io = TokioIo::new(stream);
    let service = service_fn(move |req: http::Request<Incoming>| {
        let app = app.clone();
        async move { Ok::<_, Infallible>(handle_request(app, req, remote, timeout).await) }
    });

    let conn = http1::Builder::new()
        .keep_alive(keep_alive)
        .serve_connection(io, service);
    tokio::pin!(conn);

    tokio::select! {
        result = conn.as_mut() => return result,
        () = shutdown.recv() => {
            debug!(remote = %remote, "closing connection for shutdown");
            conn.as_mut().graceful_shutdown();
        }
    }
    conn.await
}

async fn handle_request(
    app: App,
    req: http::Request<Incoming>,
    remote: SocketAddr,
    timeout: Duration,
) -> http::Response<Full<Bytes>> {
    let (parts, body) = req.into_parts();

    let body = match tokio::time::timeout(timeout, body.collect()).await {
        Ok(Ok(collected)) => collected.to_bytes(),
        Ok(Err(err)) => {
            warn!(remote = %remote, error = %err, "failed to read request body");
            return plain_error(400);
        }
        Err(_) => {
            warn!(remote = %remote, "request body timed out");
            return plain_error(408);
        }
    };

    let method = parts.method.clone();
    let path = parts.uri.path().to_string();
    let req = http::Request::from_parts(parts, body);
    let dispatched = tokio::task::spawn_blocking(move || app.dispatch(req, Some(remote)));

    match tokio::time::timeout(timeout, dispatched).await {
        Ok(Ok(response)) => response.map(Full::new),
        Ok(Err(err)) => {
            error!(http.method = %method, http.path = %path, error = %err, "handler panicked");
            plain_error(500)
        }
        Err(_) => {
            warn!(http.method = %method, http.path = %path, "handler timed out");
            plain_error(503)
        }
    }
}

fn plain_error(code: u16) -> http::Response<Full<Bytes>> {
    let mut w = ResponseWriter::new();
    http_error(&mut w, status_text(code), code);
    w.into_response().map(Full::new)
}
