//! Serving over a real socket.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use nine_core::handler;
use nine_server::{ListenError, RouteManager, Server, ServerConfig, ShutdownHandle};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

fn local_server() -> Server {
    let config = ServerConfig::builder().host("127.0.0.1").port("").build();
    let mut server = Server::with_config(config);
    server
        .get("/hello", handler(|_req, res| res.send("Hello World")))
        .unwrap();
    server
}

async fn bound_addr(handle: &ShutdownHandle) -> SocketAddr {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(addr) = handle.local_addr() {
                return addr;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("server did not bind")
}

async fn get(addr: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();
    raw
}

#[tokio::test]
async fn test_listen_serves_and_shuts_down() {
    let server = Arc::new(local_server());
    let handle = server.shutdown_handle();
    let task = tokio::spawn({
        let server = Arc::clone(&server);
        async move { server.listen().await }
    });

    let addr = bound_addr(&handle).await;
    assert_eq!(server.port(), addr.port().to_string());

    let raw = get(addr, "/hello").await;
    assert!(raw.starts_with("HTTP/1.1 200 OK"), "{raw}");
    assert!(raw.ends_with("Hello World"), "{raw}");

    let raw = get(addr, "/missing").await;
    assert!(raw.starts_with("HTTP/1.1 404 Not Found"), "{raw}");
    assert!(raw.ends_with("404 page not found\n"), "{raw}");

    handle.shutdown(Duration::from_secs(5)).await.unwrap();
    assert!(handle.is_shutdown());
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_listen_returns_when_already_shut_down() {
    let server = local_server();
    server.shutdown_handle().trigger();

    tokio::time::timeout(Duration::from_secs(5), server.listen())
        .await
        .expect("listen did not return")
        .unwrap();
}

#[tokio::test]
async fn test_bind_error() {
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = taken.local_addr().unwrap().port();

    let config = ServerConfig::builder().host("127.0.0.1").port(port).build();
    let server = Server::with_config(config);

    match server.listen().await {
        Err(ListenError::Bind { addr, .. }) => assert_eq!(addr, format!("127.0.0.1:{port}")),
        other => panic!("expected a bind error, got {other:?}"),
    }
}
