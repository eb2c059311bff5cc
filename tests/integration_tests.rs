//! End-to-end scenarios against the request handler, driven over real
//! loopback TCP connections rather than in-process string buffers —
//! this exercises the acceptor-free path (`serve_client` directly)
//! the same way the worker pool would, including a genuine upstream
//! dial.

use tinysquid::{serve_client, ObjectCache, MAX_OBJECT_SIZE};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

async fn connected_pair() -> (TcpStream, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let client = TcpStream::connect(addr).await.unwrap();
    let (server, _) = listener.accept().await.unwrap();
    (client, server)
}

async fn spawn_origin(response: Vec<u8>) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 4096];
        // Drain the forwarded request so the write below isn't racing
        // a half-closed read side.
        let _ = stream.read(&mut buf).await;
        stream.write_all(&response).await.unwrap();
        stream.shutdown().await.unwrap();
    });
    port
}

#[tokio::test]
async fn plain_hit_scenario_second_request_served_from_cache() {
    let canned = b"HTTP/1.0 200 OK\r\nContent-Length: 3\r\n\r\nabc".to_vec();
    let origin_port = spawn_origin(canned.clone()).await;
    let cache = ObjectCache::new();
    let uri = format!("http://127.0.0.1:{origin_port}/a");

    // First request: miss, fetched from the mock origin.
    let (mut client, server) = connected_pair().await;
    let request = format!("GET {uri} HTTP/1.0\r\n\r\n");
    client.write_all(request.as_bytes()).await.unwrap();
    client.shutdown().await.unwrap();
    serve_client(server, &cache).await.unwrap();
    let mut response = Vec::new();
    client.read_to_end(&mut response).await.unwrap();
    assert_eq!(response, canned);
    assert_eq!(cache.len().await, 1);

    // Second identical request: the origin listener has already been
    // consumed by the first connection and torn down, so a hit can
    // only be served from cache — a miss would fail to dial at all.
    let (mut client2, server2) = connected_pair().await;
    client2.write_all(request.as_bytes()).await.unwrap();
    client2.shutdown().await.unwrap();
    serve_client(server2, &cache).await.unwrap();
    let mut response2 = Vec::new();
    client2.read_to_end(&mut response2).await.unwrap();
    assert_eq!(response2, canned);
}

#[tokio::test]
async fn oversize_response_is_relayed_but_not_cached() {
    let mut canned = b"HTTP/1.0 200 OK\r\n\r\n".to_vec();
    canned.extend(std::iter::repeat(b'x').take(MAX_OBJECT_SIZE + 50_000));
    let origin_port = spawn_origin(canned.clone()).await;
    let cache = ObjectCache::new();
    let uri = format!("http://127.0.0.1:{origin_port}/big");

    let (mut client, server) = connected_pair().await;
    client
        .write_all(format!("GET {uri} HTTP/1.0\r\n\r\n").as_bytes())
        .await
        .unwrap();
    client.shutdown().await.unwrap();
    serve_client(server, &cache).await.unwrap();

    let mut response = Vec::new();
    client.read_to_end(&mut response).await.unwrap();
    assert_eq!(response, canned);
    assert_eq!(cache.len().await, 0);
}

#[tokio::test]
async fn bad_header_yields_400_mentioning_bad_header() {
    let cache = ObjectCache::new();
    let (mut client, server) = connected_pair().await;
    client
        .write_all(b"GET http://x/ HTTP/1.0\r\nFoo\r\n\r\n")
        .await
        .unwrap();
    client.shutdown().await.unwrap();
    serve_client(server, &cache).await.unwrap();

    let mut response = Vec::new();
    client.read_to_end(&mut response).await.unwrap();
    let text = String::from_utf8_lossy(&response);
    assert!(text.starts_with("HTTP/1.0 400"));
    assert!(text.contains("Bad header"));
}

#[tokio::test]
async fn upstream_dns_failure_yields_1000() {
    let cache = ObjectCache::new();
    let (mut client, server) = connected_pair().await;
    client
        .write_all(b"GET http://nonexistent.invalid/ HTTP/1.0\r\n\r\n")
        .await
        .unwrap();
    client.shutdown().await.unwrap();
    serve_client(server, &cache).await.unwrap();

    let mut response = Vec::new();
    client.read_to_end(&mut response).await.unwrap();
    let text = String::from_utf8_lossy(&response);
    assert!(text.starts_with("HTTP/1.0 1000"));
    assert!(text.contains("DNS failed"));
}

#[tokio::test]
async fn missing_host_header_is_synthesized_from_the_uri() {
    // Grounded in B-parse: no Host header on the wire still produces a
    // forwarded Host derived from the URI. We can't inspect the
    // forwarded headers directly through this black-box entry point,
    // so this asserts the weaker but still meaningful property: the
    // request still completes successfully end to end.
    let canned = b"HTTP/1.0 200 OK\r\nContent-Length: 2\r\n\r\nok".to_vec();
    let origin_port = spawn_origin(canned.clone()).await;
    let cache = ObjectCache::new();

    let (mut client, server) = connected_pair().await;
    client
        .write_all(format!("GET http://127.0.0.1:{origin_port}/ HTTP/1.0\r\n\r\n").as_bytes())
        .await
        .unwrap();
    client.shutdown().await.unwrap();
    serve_client(server, &cache).await.unwrap();

    let mut response = Vec::new();
    client.read_to_end(&mut response).await.unwrap();
    assert_eq!(response, canned);
}

#[tokio::test]
async fn concurrent_identical_misses_both_served_and_cache_converges() {
    // One mock origin, willing to answer two requests with the same
    // body — simulating two clients racing a miss for the same URI
    // before either insert has happened (§8 scenario 6: both fetches
    // are permitted, the cache ends with a single entry).
    let canned = b"HTTP/1.0 200 OK\r\nContent-Length: 4\r\n\r\nsame".to_vec();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let origin_port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        for _ in 0..2 {
            let (mut stream, _) = listener.accept().await.unwrap();
            let body = canned.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf).await;
                stream.write_all(&body).await.unwrap();
                stream.shutdown().await.unwrap();
            });
        }
    });

    let cache = ObjectCache::new();
    let uri = format!("http://127.0.0.1:{origin_port}/shared");
    let request = format!("GET {uri} HTTP/1.0\r\n\r\n");

    let (mut client_a, server_a) = connected_pair().await;
    let (mut client_b, server_b) = connected_pair().await;
    client_a.write_all(request.as_bytes()).await.unwrap();
    client_a.shutdown().await.unwrap();
    client_b.write_all(request.as_bytes()).await.unwrap();
    client_b.shutdown().await.unwrap();

    let (result_a, result_b) =
        tokio::join!(serve_client(server_a, &cache), serve_client(server_b, &cache));
    result_a.unwrap();
    result_b.unwrap();

    let mut response_a = Vec::new();
    client_a.read_to_end(&mut response_a).await.unwrap();
    let mut response_b = Vec::new();
    client_b.read_to_end(&mut response_b).await.unwrap();

    let canned = b"HTTP/1.0 200 OK\r\nContent-Length: 4\r\n\r\nsame".to_vec();
    assert_eq!(response_a, canned);
    assert_eq!(response_b, canned);
    assert_eq!(cache.len().await, 1);
}
