//! End-to-end behavior of composed servers, exercised in memory.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use nine_core::{handler, with_context, DynHandler, Json, RegistrationError, ServerError};
use nine_server::{cors, CorsConfig, RouteManager, Server};
use parking_lot::Mutex;

#[test]
fn test_hello_world_json() {
    let mut server = Server::new(5050);
    server
        .get(
            "/hello",
            with_context(|c| c.json(&Json::new().with("message", "hello world"))),
        )
        .unwrap();

    let response = server.test().get("/hello").send();
    response
        .assert_status(200)
        .assert_header("content-type", "application/json")
        .assert_body("{\"message\":\"hello world\"}\n");
}

#[test]
fn test_root_hello_world() {
    let mut server = Server::new(5050);
    server
        .get(
            "/",
            with_context(|c| c.json(&Json::new().with("message", "hello world"))),
        )
        .unwrap();

    server
        .test()
        .get("/")
        .send()
        .assert_status(200)
        .assert_header("content-type", "application/json")
        .assert_body("{\"message\":\"hello world\"}\n");
}

#[test]
fn test_auth_middleware_stops_chain() {
    let reached = Arc::new(AtomicUsize::new(0));
    let mut server = Server::new(5050);

    let auth = with_context(|c| {
        if c.header("Authorization").is_empty() {
            return c.status(401).json(&Json::new().with("error", "Unauthorized"));
        }
        Ok(())
    });
    let counter = Arc::clone(&reached);
    server
        .get(
            "/me",
            (
                auth,
                handler(move |_req, res| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    res.send("me")
                }),
            ),
        )
        .unwrap();

    let client = server.test();
    client
        .get("/me")
        .send()
        .assert_status(401)
        .assert_body("{\"error\":\"Unauthorized\"}\n");
    assert_eq!(reached.load(Ordering::SeqCst), 0);

    client
        .get("/me")
        .header("Authorization", "Bearer token")
        .send()
        .assert_status(200)
        .assert_body("me");
    assert_eq!(reached.load(Ordering::SeqCst), 1);
}

#[test]
fn test_global_server_error_short_circuits() {
    let mut server = Server::new(5050);
    server
        .use_middleware(handler(|_req, _res| {
            Err(ServerError::json(401, "Unauthorized").into())
        }))
        .unwrap();
    server
        .get("/", handler(|_req, res| res.send("hello world")))
        .unwrap();

    let response = server.test().get("/").send();
    response
        .assert_status(401)
        .assert_body("{\"err\":\"Unauthorized\"}\n");
    assert!(!response.text().unwrap().contains("hello world"));
}

#[test]
fn test_global_server_error_skips_group_and_route_middlewares() {
    let group_hits = Arc::new(AtomicUsize::new(0));
    let route_hits = Arc::new(AtomicUsize::new(0));
    let mut server = Server::new(5050);
    server
        .use_middleware(handler(|_req, _res| {
            Err(ServerError::json(401, "Unauthorized").into())
        }))
        .unwrap();

    let counter = Arc::clone(&group_hits);
    let group_count = handler(move |_req, _res| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    let counter = Arc::clone(&route_hits);
    let route_count = handler(move |_req, _res| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    {
        let mut api = server.group("/api", group_count);
        api.get(
            "/items",
            (route_count, handler(|_req, res| res.send("items"))),
        )
        .unwrap();
    }

    server
        .test()
        .get("/api/items")
        .send()
        .assert_status(401)
        .assert_header("content-type", "application/json")
        .assert_body("{\"err\":\"Unauthorized\"}\n");
    assert_eq!(group_hits.load(Ordering::SeqCst), 0);
    assert_eq!(route_hits.load(Ordering::SeqCst), 0);
}

#[test]
fn test_server_error_renders_json() {
    let mut server = Server::new(5050);
    server
        .get(
            "/secret",
            handler(|_req, _res| Err(ServerError::json(403, "forbidden area").into())),
        )
        .unwrap();
    server
        .get(
            "/plain",
            handler(|_req, _res| Err(ServerError::new(418, "short and stout").into())),
        )
        .unwrap();
    server
        .get("/boom", handler(|_req, _res| Err(anyhow::anyhow!("boom"))))
        .unwrap();

    let client = server.test();
    client
        .get("/secret")
        .send()
        .assert_status(403)
        .assert_header("content-type", "application/json")
        .assert_body("{\"err\":\"forbidden area\"}\n");
    client
        .get("/plain")
        .send()
        .assert_status(418)
        .assert_body("short and stout\n");
    client.get("/boom").send().assert_status(500).assert_body("boom\n");
}

#[test]
fn test_group_with_counter_middleware() {
    let hits = Arc::new(AtomicUsize::new(0));
    let mut server = Server::new(5050);

    let counter = Arc::clone(&hits);
    let count = handler(move |_req, _res| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    {
        let mut posts = server.group("/posts", count);
        posts
            .post(
                "/create",
                with_context(|c| {
                    let post: serde_json::Value = c.body_parser()?;
                    if post["title"].is_null() {
                        return Err(ServerError::json(400, "title is required").into());
                    }
                    c.status(201).json(&Json::new().with("created", true))
                }),
            )
            .unwrap();
        posts
            .get("/:id", with_context(|c| c.send_string(&c.params("id"))))
            .unwrap();
    }

    let client = server.test();
    client
        .post("/posts/create")
        .json(&Json::new().with("title", "first post"))
        .send()
        .assert_status(201)
        .assert_body("{\"created\":true}\n");
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    client
        .post("/posts/create")
        .json(&Json::new())
        .send()
        .assert_status(400)
        .assert_body("{\"err\":\"title is required\"}\n");
    client.get("/posts/42").send().assert_status(200).assert_body("42");
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[test]
fn test_execution_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let step = |name: &'static str| {
        let log = Arc::clone(&log);
        handler(move |_req, _res| {
            log.lock().push(name);
            Ok(())
        })
    };

    let mut server = Server::new(5050);
    server.use_middleware(step("global")).unwrap();
    {
        let mut api = server.group("/api", step("group"));
        let done = Arc::clone(&log);
        api.get(
            "/items",
            (
                step("route"),
                handler(move |_req, res| {
                    done.lock().push("handler");
                    res.send("ok")
                }),
            ),
        )
        .unwrap();
    }

    server.test().get("/api/items").send().assert_status(200);
    assert_eq!(*log.lock(), vec!["global", "group", "route", "handler"]);
}

#[test]
fn test_nested_group_inherits_middlewares() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut server = Server::new(5050);

    let outer = {
        let log = Arc::clone(&log);
        handler(move |_req, _res| {
            log.lock().push("outer");
            Ok(())
        })
    };
    let inner = {
        let log = Arc::clone(&log);
        handler(move |_req, _res| {
            log.lock().push("inner");
            Ok(())
        })
    };
    {
        let mut api = server.group("/api", outer);
        let mut v1 = api.group("/v1", inner);
        v1.get("/ping", handler(|_req, res| res.send("pong"))).unwrap();
    }

    server
        .test()
        .get("/api/v1/ping")
        .send()
        .assert_status(200)
        .assert_body("pong");
    assert_eq!(*log.lock(), vec!["outer", "inner"]);
}

#[test]
fn test_route_closure_registers_group() {
    let mut server = Server::new(5050);
    server.route("/users", |users| {
        users.get("/", handler(|_req, res| res.send("list"))).unwrap();
        users
            .delete("/{id}", with_context(|c| c.send_status(204)))
            .unwrap();
    });

    let client = server.test();
    client.get("/users").send().assert_status(200).assert_body("list");
    client.delete("/users/3").send().assert_status(204);
}

#[test]
fn test_unknown_route_and_method() {
    let mut server = Server::new(5050);
    server
        .post("/items", handler(|_req, res| res.send("created")))
        .unwrap();

    let client = server.test();
    client
        .get("/missing")
        .send()
        .assert_status(404)
        .assert_body("404 page not found\n");
    client
        .get("/items")
        .send()
        .assert_status(405)
        .assert_header("allow", "POST");
}

#[test]
fn test_percent_encoded_paths_are_decoded() {
    let mut server = Server::new(5050);
    server
        .get("/hello/:name", with_context(|c| c.send_string(&c.params("name"))))
        .unwrap();
    server
        .get("/café", handler(|_req, res| res.send("coffee")))
        .unwrap();

    let client = server.test();
    client
        .get("/hello/Jo%C3%A3o%20Silva")
        .send()
        .assert_status(200)
        .assert_body("João Silva");
    client
        .get("/hello/a%2Fb")
        .send()
        .assert_status(200)
        .assert_body("a/b");
    client
        .get("/caf%C3%A9")
        .send()
        .assert_status(200)
        .assert_body("coffee");
}

#[test]
fn test_end_anchor_and_wildcard_routes() {
    let mut server = Server::new(5050);
    server
        .get("/docs/{$}", handler(|_req, res| res.send("docs index")))
        .unwrap();
    server
        .get(
            "/files/{path...}",
            with_context(|c| c.send_string(&c.params("path"))),
        )
        .unwrap();

    let client = server.test();
    client
        .get("/docs/")
        .send()
        .assert_status(200)
        .assert_body("docs index");
    client.get("/docs/page").send().assert_status(404);
    client
        .get("/files/a/b.txt")
        .send()
        .assert_status(200)
        .assert_body("a/b.txt");
    client.get("/files/").send().assert_status(404);
}

#[test]
fn test_registration_errors() {
    let mut server = Server::new(5050);

    assert_eq!(
        server.get("/", ()),
        Err(RegistrationError::PutAHandler)
    );

    let err = server
        .get("/", vec![DynHandler::new("not a handler")])
        .unwrap_err();
    assert!(matches!(err, RegistrationError::FinalHandler { .. }));

    let err = server
        .use_middleware(vec![DynHandler::new(42_u32)])
        .unwrap_err();
    assert!(matches!(err, RegistrationError::InvalidMiddleware { .. }));
    assert!(matches!(err.root(), RegistrationError::InvalidHandler { .. }));

    assert_eq!(server.patterns().count(), 0);
}

#[test]
fn test_cors_preflight_defaults() {
    let mut server = Server::new(5050);
    let middleware = cors(&mut server, CorsConfig::default());
    server.use_middleware(middleware).unwrap();
    server
        .get("/items", handler(|_req, res| res.send("items")))
        .unwrap();

    let client = server.test();
    client
        .options("/items")
        .header("Origin", "https://app.example")
        .send()
        .assert_status(204)
        .assert_header("access-control-allow-origin", "*")
        .assert_header(
            "access-control-allow-methods",
            "GET,POST,PUT,PATCH,DELETE,OPTIONS",
        )
        .assert_header(
            "access-control-allow-headers",
            "Origin,Content-Type,Accept,Authorization",
        )
        .assert_header("access-control-max-age", "86400");

    client
        .get("/items")
        .header("Origin", "https://app.example")
        .send()
        .assert_status(200)
        .assert_header("access-control-allow-origin", "*")
        .assert_body("items");
}

#[test]
fn test_cors_named_origin_with_credentials() {
    let mut server = Server::new(5050);
    let config = CorsConfig {
        allow_origins: vec!["https://example.com".to_string()],
        allow_methods: vec!["GET".to_string(), "POST".to_string()],
        allow_credentials: true,
        max_age: 600,
        ..Default::default()
    };
    let middleware = cors(&mut server, config);
    server.use_middleware(middleware).unwrap();
    server
        .post("/items", handler(|_req, res| res.send("ok")))
        .unwrap();

    let client = server.test();
    client
        .options("/items")
        .header("Origin", "https://example.com")
        .send()
        .assert_status(204)
        .assert_header("access-control-allow-origin", "https://example.com")
        .assert_header("access-control-allow-credentials", "true")
        .assert_header("access-control-allow-methods", "GET,POST")
        .assert_header("access-control-max-age", "600");

    let blocked = client
        .options("/items")
        .header("Origin", "https://notallowed.com")
        .send();
    blocked.assert_status(204);
    assert_eq!(blocked.header("access-control-allow-origin"), Some(""));
    assert_eq!(blocked.header("access-control-allow-credentials"), None);
}

#[test]
fn test_serve_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("static")).unwrap();
    std::fs::write(dir.path().join("static/app.css"), "body { margin: 0 }").unwrap();
    std::fs::write(dir.path().join("static/index.html"), "<h1>home</h1>").unwrap();

    let mut server = Server::new(5050);
    server.serve_files("/static/", dir.path()).unwrap();

    let client = server.test();
    client
        .get("/static/app.css")
        .send()
        .assert_status(200)
        .assert_header("content-type", "text/css; charset=utf-8")
        .assert_body("body { margin: 0 }");
    client
        .get("/static/")
        .send()
        .assert_status(200)
        .assert_body("<h1>home</h1>");
    client.get("/static/missing.js").send().assert_status(404);

    let gzipped = client
        .get("/static/app.css")
        .header("Accept-Encoding", "gzip, deflate")
        .send();
    gzipped
        .assert_status(200)
        .assert_header("content-encoding", "gzip")
        .assert_header("vary", "accept-encoding");
}

#[test]
fn test_handler_snapshot_ignores_later_routes() {
    let mut server = Server::new(5050);
    server.get("/a", handler(|_req, res| res.send("a"))).unwrap();
    let app = server.handler();
    server.get("/b", handler(|_req, res| res.send("b"))).unwrap();

    assert_eq!(app.len(), 1);
    assert_eq!(server.handler().len(), 2);
}
