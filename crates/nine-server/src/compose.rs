//! Middleware composition and request dispatch.
//!
//! [`App`] is the immutable handler graph built from a [`Server`]'s route
//! table. Each registered pattern becomes one [`Endpoint`] whose chain runs,
//! in order:
//!
//! 1. the not-found guard (skipped for static file routes)
//! 2. global middlewares
//! 3. group and route middlewares
//! 4. the route handler
//!
//! Every layer gets its own [`Response`] over one shared [`ResponseWriter`].
//! A layer that returns an error or sends a response ends the chain.
//!
//! [`Server`]: crate::Server

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderValue, ALLOW};
use http::Method;
use nine_core::{handler, http_error, write_error, Handler, Request, Response, ResponseWriter, ServerError};
use nine_router::{decode_path, split_pattern, Lookup, Mux, RouteTable};
use tracing::{debug, warn};

/// A registered route as kept by the server.
#[derive(Debug, Clone)]
pub(crate) struct RouteEntry {
    pub(crate) handler: Handler,
    pub(crate) middlewares: Vec<Handler>,
    pub(crate) serving_files: bool,
}

/// One dispatchable pattern with its full handler chain.
#[derive(Debug)]
pub struct Endpoint {
    pattern: String,
    chain: Vec<Handler>,
}

impl Endpoint {
    /// Returns the pattern this endpoint answers.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns the number of layers, handler included.
    #[must_use]
    pub fn layers(&self) -> usize {
        self.chain.len()
    }

    fn run(&self, req: &Request, w: &mut ResponseWriter) {
        for (layer, h) in self.chain.iter().enumerate() {
            let mut res = Response::new(w);
            let outcome = h.call(req, &mut res);
            let sent = res.sent();

            if let Err(err) = outcome {
                debug!(pattern = %self.pattern, layer, error = %err, "chain stopped by error");
                write_error(w, &err);
                return;
            }
            if sent {
                if layer + 1 < self.chain.len() {
                    debug!(pattern = %self.pattern, layer, "chain stopped by sent response");
                }
                return;
            }
        }
    }
}

/// The composed request handler of a server.
///
/// Cheap to clone and safe to share between threads. Obtained with
/// [`Server::handler`](crate::Server::handler).
#[derive(Debug, Clone)]
pub struct App {
    mux: Arc<Mux<Arc<Endpoint>>>,
}

impl App {
    /// Answers one request.
    ///
    /// The handler chain runs synchronously on the calling thread.
    pub fn dispatch(
        &self,
        req: http::Request<Bytes>,
        remote_addr: Option<SocketAddr>,
    ) -> http::Response<Bytes> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let mut w = ResponseWriter::new();

        match self.mux.lookup(&method, &path) {
            Lookup::Found {
                pattern,
                value,
                params,
            } => {
                let mut request = Request::new(req).with_pattern(pattern).with_params(params);
                if let Some(addr) = remote_addr {
                    request = request.with_remote_addr(addr);
                }
                value.run(&request, &mut w);
            }
            Lookup::MethodNotAllowed { allow } => {
                let allow = allow.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");
                if let Ok(value) = HeaderValue::from_str(&allow) {
                    w.headers_mut().insert(ALLOW, value);
                }
                http_error(&mut w, "Method Not Allowed", 405);
            }
            Lookup::NotFound => http_error(&mut w, "404 page not found", 404),
        }

        let response = w.into_response();
        debug!(
            http.method = %method,
            http.path = %path,
            http.status = response.status().as_u16(),
            "request served"
        );
        response
    }

    /// Returns the endpoint that would answer `method` and `path`.
    #[must_use]
    pub fn endpoint(&self, method: &Method, path: &str) -> Option<&Endpoint> {
        match self.mux.lookup(method, path) {
            Lookup::Found { value, .. } => Some(value.as_ref()),
            _ => None,
        }
    }

    /// Returns the number of dispatchable patterns, CORS preflights included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mux.len()
    }

    /// Returns true if no pattern is dispatchable.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mux.is_empty()
    }
}

/// Builds the handler graph.
pub(crate) fn compose(
    routes: &RouteTable<RouteEntry>,
    global: &[Handler],
    cors: Option<&Handler>,
) -> App {
    let guard = not_found_guard(Arc::new(routes.clone()));
    let mut mux = Mux::new();
    let mut preflights = HashSet::new();

    for route in routes.iter() {
        let entry = route.value();

        let mut chain = Vec::with_capacity(global.len() + entry.middlewares.len() + 2);
        if !entry.serving_files {
            chain.push(guard.clone());
        }
        chain.extend(global.iter().cloned());
        chain.extend(entry.middlewares.iter().cloned());
        chain.push(entry.handler.clone());

        insert(&mut mux, route.pattern(), chain);

        let Some(cors) = cors else { continue };
        let Some((_, path)) = split_pattern(route.pattern()) else {
            continue;
        };
        if preflights.insert(path.to_string()) {
            insert(&mut mux, &format!("OPTIONS {path}"), vec![cors.clone()]);
        }
    }

    App { mux: Arc::new(mux) }
}

fn insert(mux: &mut Mux<Arc<Endpoint>>, pattern: &str, chain: Vec<Handler>) {
    let endpoint = Arc::new(Endpoint {
        pattern: pattern.to_string(),
        chain,
    });
    if let Err(err) = mux.insert(pattern, endpoint) {
        warn!(pattern, error = %err, "route not served");
    }
}

/// Answers 404 unless the route table knows the request path.
fn not_found_guard(routes: Arc<RouteTable<RouteEntry>>) -> Handler {
    handler(move |req, _res| {
        let path = decode_path(req.path());
        let known = routes.exists(req.method().as_str(), &path)
            || (*req.method() == Method::HEAD && routes.exists(Method::GET.as_str(), &path));
        if known {
            Ok(())
        } else {
            Err(ServerError::not_found().into())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(h: Handler) -> RouteEntry {
        RouteEntry {
            handler: h,
            middlewares: Vec::new(),
            serving_files: false,
        }
    }

    fn get(uri: &str) -> http::Request<Bytes> {
        http::Request::get(uri).body(Bytes::new()).unwrap()
    }

    #[test]
    fn test_dispatch_with_params() {
        let mut routes = RouteTable::new();
        routes.register(
            "GET /user/{id}",
            entry(handler(|req, res| res.send(format!("user {}", req.param("id").unwrap_or(""))))),
        );
        let app = compose(&routes, &[], None);

        let response = app.dispatch(get("/user/7"), None);
        assert_eq!(response.status(), 200);
        assert_eq!(response.body().as_ref(), b"user 7");
    }

    #[test]
    fn test_unknown_path_is_404() {
        let app = compose(&RouteTable::new(), &[], None);
        let response = app.dispatch(get("/missing"), None);

        assert_eq!(response.status(), 404);
        assert_eq!(response.body().as_ref(), b"404 page not found\n");
    }

    #[test]
    fn test_wrong_method_is_405() {
        let mut routes = RouteTable::new();
        routes.register("POST /items", entry(handler(|_req, res| res.send("ok"))));
        let app = compose(&routes, &[], None);

        let response = app.dispatch(get("/items"), None);
        assert_eq!(response.status(), 405);
        assert_eq!(response.headers()["allow"], "POST");
    }

    #[test]
    fn test_duplicate_pattern_keeps_first() {
        let mut routes = RouteTable::new();
        routes.register("GET /", entry(handler(|_req, res| res.send("first"))));
        routes.register("GET /", entry(handler(|_req, res| res.send("second"))));
        let app = compose(&routes, &[], None);

        assert_eq!(app.len(), 1);
        assert_eq!(app.dispatch(get("/"), None).body().as_ref(), b"first");
    }

    #[test]
    fn test_guard_rejects_subtree_paths() {
        let mut routes = RouteTable::new();
        routes.register("GET /docs/", entry(handler(|_req, res| res.send("docs"))));
        let app = compose(&routes, &[], None);

        assert_eq!(app.dispatch(get("/docs/"), None).status(), 200);
        assert_eq!(app.dispatch(get("/docs/intro"), None).status(), 404);
    }

    #[test]
    fn test_static_routes_skip_guard() {
        let mut routes = RouteTable::new();
        routes.register(
            "GET /assets/",
            RouteEntry {
                handler: handler(|_req, res| res.send("file")),
                middlewares: Vec::new(),
                serving_files: true,
            },
        );
        routes.register("GET /", entry(handler(|_req, res| res.send("home"))));
        let app = compose(&routes, &[], None);

        assert_eq!(app.endpoint(&Method::GET, "/assets/app.js").map(Endpoint::layers), Some(1));
        assert_eq!(app.endpoint(&Method::GET, "/").map(Endpoint::layers), Some(2));
        assert_eq!(app.dispatch(get("/assets/app.js"), None).body().as_ref(), b"file");
    }

    #[test]
    fn test_preflight_per_path() {
        let mut routes = RouteTable::new();
        routes.register("GET /items", entry(handler(|_req, res| res.send("list"))));
        routes.register("POST /items", entry(handler(|_req, res| res.send("create"))));
        let cors = handler(|_req, res| res.send_status(204));
        let app = compose(&routes, &[], Some(&cors));

        assert_eq!(app.len(), 3);
        let preflight = app.endpoint(&Method::OPTIONS, "/items").unwrap();
        assert_eq!(preflight.pattern(), "OPTIONS /items");
        assert_eq!(preflight.layers(), 1);
    }
}
