//! Route registration and route groups.

use http::Method;
use nine_core::{Handler, IntoHandlers, RegistrationError};
use nine_router::route_pattern;

use crate::compose::RouteEntry;
use crate::server::Server;

/// Registration API shared by [`Server`] and [`RouteGroup`].
///
/// The last handler of a list answers the request, the ones before it run
/// first as route middlewares. Paths accept both `:name` and `{name}`
/// parameters.
///
/// ```rust
/// use nine_core::{handler, with_context};
/// use nine_server::{RouteManager, Server};
///
/// let mut server = Server::new(5050);
/// server.get("/user/:id", with_context(|c| {
///     let id = c.params("id");
///     c.send_string(&id)
/// })).unwrap();
///
/// server.route("/posts", |posts| {
///     posts.get("/", handler(|_req, res| res.send("all posts"))).unwrap();
/// });
/// ```
pub trait RouteManager {
    /// Registers `handlers` for `method` and `path`.
    ///
    /// # Errors
    ///
    /// - [`RegistrationError::PutAHandler`] when no handler is given.
    /// - [`RegistrationError::Middleware`] or
    ///   [`RegistrationError::FinalHandler`] for rejected dynamic handlers.
    /// - [`RegistrationError::InvalidRoute`] when the path cannot be routed.
    fn register(
        &mut self,
        method: Method,
        path: &str,
        handlers: impl IntoHandlers,
    ) -> Result<(), RegistrationError>;

    /// Adds middlewares that run before the handlers of later routes.
    ///
    /// On a [`Server`] they run for every route.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::InvalidMiddleware`] for a rejected
    /// dynamic handler.
    fn use_middleware(&mut self, middleware: impl IntoHandlers) -> Result<(), RegistrationError>;

    /// Returns a group that prefixes paths with `base_path` and runs
    /// `middlewares` before every route registered through it.
    ///
    /// A rejected middleware is reported by each registration on the group.
    fn group(&mut self, base_path: &str, middlewares: impl IntoHandlers) -> RouteGroup<'_>;

    /// Registers a `GET` route.
    ///
    /// # Errors
    ///
    /// See [`register`](Self::register).
    fn get(&mut self, path: &str, handlers: impl IntoHandlers) -> Result<(), RegistrationError> {
        self.register(Method::GET, path, handlers)
    }

    /// Registers a `POST` route.
    ///
    /// # Errors
    ///
    /// See [`register`](Self::register).
    fn post(&mut self, path: &str, handlers: impl IntoHandlers) -> Result<(), RegistrationError> {
        self.register(Method::POST, path, handlers)
    }

    /// Registers a `PUT` route.
    ///
    /// # Errors
    ///
    /// See [`register`](Self::register).
    fn put(&mut self, path: &str, handlers: impl IntoHandlers) -> Result<(), RegistrationError> {
        self.register(Method::PUT, path, handlers)
    }

    /// Registers a `PATCH` route.
    ///
    /// # Errors
    ///
    /// See [`register`](Self::register).
    fn patch(&mut self, path: &str, handlers: impl IntoHandlers) -> Result<(), RegistrationError> {
        self.register(Method::PATCH, path, handlers)
    }

    /// Registers a `DELETE` route.
    ///
    /// # Errors
    ///
    /// See [`register`](Self::register).
    fn delete(&mut self, path: &str, handlers: impl IntoHandlers) -> Result<(), RegistrationError> {
        self.register(Method::DELETE, path, handlers)
    }

    /// Runs `f` with a group for `base_path`, before returning.
    fn route<F>(&mut self, base_path: &str, f: F)
    where
        F: FnOnce(&mut RouteGroup<'_>),
    {
        let mut group = self.group(base_path, ());
        f(&mut group);
    }
}

/// A scoped view over a [`Server`].
///
/// ```rust
/// use nine_core::handler;
/// use nine_server::{RouteManager, Server};
///
/// let auth = handler(|_req, _res| Ok(()));
///
/// let mut server = Server::new(5050);
/// let mut api = server.group("/api", auth);
/// api.post("/posts/create", handler(|_req, res| res.send("created"))).unwrap();
///
/// assert_eq!(api.full_path("/posts"), "/api/posts");
/// ```
#[derive(Debug)]
pub struct RouteGroup<'s> {
    server: &'s mut Server,
    base_path: String,
    middlewares: Vec<Handler>,
    error: Option<RegistrationError>,
}

impl<'s> RouteGroup<'s> {
    pub(crate) fn new(
        server: &'s mut Server,
        base_path: String,
        middlewares: impl IntoHandlers,
    ) -> Self {
        let (middlewares, error) = match middlewares.into_handlers() {
            Ok(handlers) => (handlers, None),
            Err(err) => (Vec::new(), Some(err)),
        };
        Self {
            server,
            base_path,
            middlewares,
            error,
        }
    }

    /// Returns the path prefix of the group.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Returns the error raised by the group's own middlewares, if any.
    #[must_use]
    pub fn error(&self) -> Option<&RegistrationError> {
        self.error.as_ref()
    }

    /// Joins the base path and `path` with exactly one `/`.
    ///
    /// `"/"` maps to the base path itself.
    #[must_use]
    pub fn full_path(&self, path: &str) -> String {
        if path == "/" {
            return self.base_path.clone();
        }
        let mut full = self.base_path.clone();
        if !full.ends_with('/') {
            full.push('/');
        }
        full.push_str(path.strip_prefix('/').unwrap_or(path));
        full
    }
}

impl RouteManager for RouteGroup<'_> {
    fn register(
        &mut self,
        method: Method,
        path: &str,
        handlers: impl IntoHandlers,
    ) -> Result<(), RegistrationError> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }

        let mut handlers = handlers.into_handlers()?;
        let handler = handlers.pop().ok_or(RegistrationError::PutAHandler)?;
        let mut middlewares = self.middlewares.clone();
        middlewares.extend(handlers);

        let pattern = route_pattern(method.as_str(), &self.full_path(path));
        self.server.add_route(
            pattern,
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
        self.middlewares.extend(handlers);
        Ok(())
    }

    fn group(&mut self, base_path: &str, middlewares: impl IntoHandlers) -> RouteGroup<'_> {
        let base_path = self.full_path(base_path);
        let mut group = RouteGroup::new(&mut *self.server, base_path, middlewares);

        let mut inherited = self.middlewares.clone();
        inherited.append(&mut group.middlewares);
        group.middlewares = inherited;
        if let Some(err) = &self.error {
            group.error = Some(err.clone());
        }
        group
    }
}
