//! Integration tests for the HTTP client and the fetch session flow
//!
//! These tests run small raw TCP servers that answer each request with a canned response, so
//! the exact bytes on the wire (chunk framing, gzip bodies, session headers) are under control.

use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use sumi_mirror::connections::ConnectionCache;
use sumi_mirror::graph::{Downloader, FetchSettings, FetchedContent};
use sumi_mirror::http::{ConnectOptions, RequestHeaders};
use sumi_mirror::{HttpError, MirrorError};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Serves `responses` in order on one connection; yields the requests it read
async fn serve(responses: Vec<Vec<u8>>) -> (String, JoinHandle<Vec<String>>) {
    let (host, handle) = serve_connections(vec![responses]).await;
    let handle = tokio::spawn(async move {
        handle
            .await
            .map(|connections| connections.into_iter().flatten().collect())
            .unwrap_or_default()
    });
    (host, handle)
}

/// Accepts one connection per entry of `connections` and serves that entry's responses in order
///
/// A connection is closed once its responses are written, so a truncated response leaves the
/// client at end of stream. Yields the requests read on each connection.
async fn serve_connections(
    connections: Vec<Vec<Vec<u8>>>,
) -> (String, JoinHandle<Vec<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind listener");
    let host = listener
        .local_addr()
        .expect("Failed to read local address")
        .to_string();

    let handle = tokio::spawn(async move {
        let mut seen = Vec::new();
        for responses in connections {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let (read_half, mut write_half) = stream.into_split();
            let mut reader = BufReader::new(read_half);
            let mut requests = Vec::new();

            'responses: for response in responses {
                let mut request = String::new();
                loop {
                    let mut line = String::new();
                    match reader.read_line(&mut line).await {
                        Ok(0) | Err(_) => break 'responses,
                        Ok(_) => {}
                    }
                    request.push_str(&line);
                    if line == "\r\n" {
                        break;
                    }
                }
                requests.push(request);
                if write_half.write_all(&response).await.is_err() {
                    break;
                }
            }
            seen.push(requests);
        }
        seen
    });

    (host, handle)
}

fn settings(max_session_attempts: u32) -> FetchSettings {
    FetchSettings {
        headers: RequestHeaders {
            user_agent: "test-agent".to_string(),
            accept_language: "en".to_string(),
        },
        use_referrer: false,
        max_session_attempts,
        max_redirects: 3,
    }
}

fn cache() -> ConnectionCache {
    ConnectionCache::new(4, ConnectOptions::default())
}

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Frames `body` as two chunks plus the terminating zero-length chunk
fn chunked(body: &[u8]) -> Vec<u8> {
    let (first, second) = body.split_at(body.len() / 2);
    let mut framed = Vec::new();
    for chunk in [first, second] {
        framed.extend_from_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
        framed.extend_from_slice(chunk);
        framed.extend_from_slice(b"\r\n");
    }
    framed.extend_from_slice(b"0\r\n\r\n");
    framed
}

const CHALLENGE: &[u8] = b"HTTP/1.1 200 OK\r\nLocation: /?token=abc\r\nContent-Length: 0\r\n\r\n";

#[tokio::test]
async fn test_chunked_gzip_page() {
    let page = "<html><body>héllo, wörld</body></html>";
    let mut response = b"HTTP/1.1 200 OK\r\n\
        Content-Type: text/html; charset=utf-8\r\n\
        Content-Encoding: gzip\r\n\
        Transfer-Encoding: chunked\r\n\r\n"
        .to_vec();
    response.extend(chunked(&gzip(page.as_bytes())));

    let (host, server) = serve(vec![response]).await;
    let mut downloader = Downloader::new(format!("http://{}/index.html", host), 0, None);
    let content = downloader
        .perform(&mut cache(), &settings(5))
        .await
        .expect("Fetch failed");

    assert_eq!(content, FetchedContent::Page(page.to_string()));

    let requests = server.await.expect("Server task failed");
    assert_eq!(requests.len(), 1);
    assert!(requests[0].starts_with("GET /index.html HTTP/1.1\r\n"));
    assert!(requests[0].contains(&format!("Host: {}\r\n", host)));
    assert!(requests[0].contains("Accept-Encoding: gzip, deflate\r\n"));
}

#[tokio::test]
async fn test_session_exchange_fetches_page_with_cookie() {
    let responses = vec![
        CHALLENGE.to_vec(),
        b"HTTP/1.1 200 OK\r\nSet-Cookie: slave=xyz; path=/\r\nContent-Length: 0\r\n\r\n".to_vec(),
        b"HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 9\r\n\r\n<p>in</p>".to_vec(),
    ];
    let (host, server) = serve(responses).await;

    let mut downloader = Downloader::new(format!("http://{}/gated", host), 0, None);
    let content = downloader
        .perform(&mut cache(), &settings(5))
        .await
        .expect("Session exchange failed");
    assert_eq!(content, FetchedContent::Page("<p>in</p>".to_string()));

    let requests = server.await.expect("Server task failed");
    assert_eq!(requests.len(), 3);
    assert!(requests[1].starts_with("GET /?responseToken=abc HTTP/1.1\r\n"));
    assert!(requests[1].contains("Cookie: test=1\r\n"));
    assert!(requests[2].starts_with("GET /gated HTTP/1.1\r\n"));
    assert!(requests[2].contains("Cookie: test=1; slave=xyz\r\n"));
}

#[tokio::test]
async fn test_session_exchange_gives_up() {
    let responses = vec![CHALLENGE.to_vec(), CHALLENGE.to_vec(), CHALLENGE.to_vec()];
    let (host, server) = serve(responses).await;

    let mut downloader = Downloader::new(format!("http://{}/gated", host), 0, None);
    let result = downloader.perform(&mut cache(), &settings(2)).await;

    assert!(matches!(
        result,
        Err(MirrorError::SessionExhausted { attempts: 2, .. })
    ));
    assert_eq!(server.await.expect("Server task failed").len(), 3);
}

#[tokio::test]
async fn test_malformed_chunk_fails_fetch() {
    let response = b"HTTP/1.1 200 OK\r\n\
        Content-Type: text/html\r\n\
        Transfer-Encoding: chunked\r\n\r\n\
        zz\r\nbroken\r\n0\r\n\r\n"
        .to_vec();
    let (host, _server) = serve(vec![response]).await;

    let mut downloader = Downloader::new(format!("http://{}/", host), 0, None);
    let result = downloader.perform(&mut cache(), &settings(5)).await;

    assert!(matches!(
        result,
        Err(MirrorError::Http(HttpError::MalformedChunk(_)))
    ));
}

#[tokio::test]
async fn test_refused_connection_fails_fetch() {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind listener");
    let host = listener.local_addr().expect("No local address").to_string();
    drop(listener);

    let mut downloader = Downloader::new(format!("http://{}/", host), 0, None);
    let result = downloader.perform(&mut cache(), &settings(5)).await;

    assert!(matches!(result, Err(MirrorError::ConnectFailed { .. })));
}

#[tokio::test]
async fn test_plain_response_pointing_at_https_restarts_securely() {
    // The secure side accepts and hangs up, so the handshake fails
    let (secure_host, secure_server) = serve_connections(vec![vec![]]).await;
    let response = format!(
        "HTTP/1.1 200 OK\r\n\
        Location: https://{}/login\r\n\
        Content-Type: text/plain\r\n\
        Content-Length: 5\r\n\r\nplain",
        secure_host
    );
    let (host, server) = serve(vec![response.into_bytes()]).await;

    let mut downloader = Downloader::new(format!("http://{}/account", host), 0, None);
    let result = downloader.perform(&mut cache(), &settings(5)).await;

    assert_eq!(downloader.actual_url(), format!("https://{}/login", secure_host));
    match result {
        Err(MirrorError::ConnectFailed { host, secure }) => {
            assert_eq!(host, secure_host);
            assert!(secure);
        }
        other => panic!("expected a failed secure connect, got {:?}", other),
    }

    assert_eq!(server.await.expect("Server task failed").len(), 1);
    let secure_connections = secure_server.await.expect("Server task failed");
    assert_eq!(secure_connections.len(), 1);
}

#[tokio::test]
async fn test_exchange_repeats_after_connection_drops_mid_response() {
    let connections = vec![
        vec![b"HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Le".to_vec()],
        vec![b"HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 6\r\n\r\nsecond".to_vec()],
    ];
    let (host, server) = serve_connections(connections).await;

    let mut downloader = Downloader::new(format!("http://{}/page.html", host), 0, None);
    let content = downloader
        .perform(&mut cache(), &settings(5))
        .await
        .expect("Repeated exchange failed");
    assert_eq!(content, FetchedContent::Page("second".to_string()));

    let seen = server.await.expect("Server task failed");
    assert_eq!(seen.len(), 2);
    for requests in &seen {
        assert_eq!(requests.len(), 1);
        assert!(requests[0].starts_with("GET /page.html HTTP/1.1\r\n"));
    }
}

#[tokio::test]
async fn test_exchange_gives_up_after_two_interruptions() {
    let truncated = b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nabc".to_vec();
    let connections = vec![vec![truncated.clone()], vec![truncated], vec![]];
    let (host, _server) = serve_connections(connections).await;

    let mut downloader = Downloader::new(format!("http://{}/", host), 0, None);
    let result = downloader.perform(&mut cache(), &settings(5)).await;

    assert!(matches!(result, Err(MirrorError::ExchangeFailed { .. })));
}
