//! Integration tests for the crawl session
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full mirror cycle end-to-end.

use sumi_mirror::config::Config;
use sumi_mirror::graph::ObjectKind;
use sumi_mirror::storage::MemoryStorage;
use sumi_mirror::url::to_file_path;
use sumi_mirror::{mirror, Crawler, ProcessedEvent};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::mpsc::UnboundedReceiver;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration starting at `seed`
fn create_test_config(seed: &str) -> Config {
    let mut config = Config::default();
    config.crawl.seed_url = Some(seed.to_string());
    config.crawl.use_referrer = false;
    config.connection.connect_timeout_ms = 1000;
    config
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/html; charset=utf-8")
}

/// Local path the mirror stores `url` under
fn stored_at(url: &str) -> String {
    to_file_path(url).to_string()
}

fn drain(mut events: UnboundedReceiver<ProcessedEvent>) -> Vec<ProcessedEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

/// Answers every request on every connection with `response`, then closes the connection
async fn serve_raw(response: &'static [u8]) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind listener");
    let host = listener
        .local_addr()
        .expect("Failed to read local address")
        .to_string();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let (read_half, mut write_half) = stream.into_split();
            let mut reader = BufReader::new(read_half);
            loop {
                let mut line = String::new();
                match reader.read_line(&mut line).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) if line == "\r\n" => {
                        let _ = write_half.write_all(response).await;
                        break;
                    }
                    Ok(_) => {}
                }
            }
        }
    });

    host
}

fn assert_send<T: Send>(_: &T) {}

#[test]
fn test_crawl_futures_are_send() {
    let config = create_test_config("http://127.0.0.1:1/");
    let mut crawler =
        Crawler::new(&config, MemoryStorage::new()).expect("Failed to create crawler");
    assert_send(&crawler.run());
    assert_send(&mirror(config));
}

/// Runs a crawl of `seed` on its own task so a panic shows up as a join error
async fn crawl_spawned(seed: String) -> sumi_mirror::CrawlSummary {
    let mut crawler = Crawler::new(&create_test_config(&seed), MemoryStorage::new())
        .expect("Failed to create crawler");
    tokio::spawn(async move { crawler.run().await })
        .await
        .expect("Crawl task panicked")
}

#[tokio::test]
async fn test_huge_content_length_fails_only_that_fetch() {
    let host = serve_raw(
        b"HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 18446744073709551615\r\n\r\n<p>",
    )
    .await;

    let summary = crawl_spawned(format!("http://{}/", host)).await;

    assert_eq!(summary.statistics.fetches_failed, 1);
    assert_eq!(summary.statistics.fetches_succeeded, 0);
    assert!(summary.statistics.failures[0].message.contains("Content-Length"));
}

#[tokio::test]
async fn test_huge_chunk_length_fails_only_that_fetch() {
    let host = serve_raw(
        b"HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nTransfer-Encoding: chunked\r\n\r\nffffffffffffffff\r\n<p>",
    )
    .await;

    let summary = crawl_spawned(format!("http://{}/", host)).await;

    assert_eq!(summary.statistics.fetches_failed, 1);
    assert_eq!(summary.statistics.fetches_succeeded, 0);
}

#[tokio::test]
async fn test_full_mirror_single_host() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><head><link rel="stylesheet" href="style.css"></head><body>
            <img src="/img/logo.png">
            <a href="page.html#intro">Page</a>
            <a href="mailto:someone@example.com">Mail</a>
            </body></html>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/style.css"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(b"body { color: black; }".to_vec(), "text/css"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/img/logo.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0x89, b'P', b'N', b'G'], "image/png"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page.html"))
        .respond_with(html(r#"<a href="/">Home</a> <a href='img/logo.png'>Logo</a>"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    let seed = format!("{}/", base_url);
    let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
    let mut crawler = Crawler::new(&create_test_config(&seed), MemoryStorage::new())
        .expect("Failed to create crawler")
        .with_observer(sender);

    let summary = crawler.run().await;
    let storage = crawler.into_storage();

    // Verify the rewritten seed page points at the local copies
    let index = storage
        .get_text(&stored_at(&seed))
        .expect("Seed page not stored");
    assert!(index.contains(r#"href="./style.css""#));
    assert!(index.contains(r#"src="./img/logo.png""#));
    assert!(index.contains(r#"href="./page.html#intro""#));
    assert!(index.contains(r#"href="mailto:someone@example.com""#));

    let page = storage
        .get_text(&stored_at(&format!("{}/page.html", base_url)))
        .expect("Sub page not stored");
    assert_eq!(
        page,
        r#"<a href="./index.html">Home</a> <a href='./img/logo.png'>Logo</a>"#
    );

    assert_eq!(
        storage.get(&stored_at(&format!("{}/img/logo.png", base_url))),
        Some(&[0x89, b'P', b'N', b'G'][..])
    );
    assert_eq!(
        storage.get_text(&stored_at(&format!("{}/style.css", base_url))),
        Some("body { color: black; }")
    );

    // Verify statistics and notifications
    assert_eq!(summary.statistics.fetches_succeeded, 4);
    assert_eq!(summary.statistics.fetches_failed, 0);
    assert_eq!(summary.statistics.pages_parsed, 2);
    assert_eq!(summary.pages_flushed_incomplete, 0);

    let events = drain(receiver);
    assert_eq!(events.len(), 6);
    assert!(events.iter().all(|e| e.success));
    assert_eq!(events[0].kind, ObjectKind::Fetch);
    assert_eq!(events[0].level, 0);
    assert_eq!(events[1].kind, ObjectKind::Parse);
    let levels: Vec<u32> = events.iter().map(|e| e.level).collect();
    assert!(levels.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn test_redirect_sets_actual_url() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("Location", format!("{}/new/", base_url).as_str()),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/new/"))
        .respond_with(html("<p>moved</p><a href=\"../old\">again</a>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let seed = format!("{}/old", base_url);
    let mut crawler = Crawler::new(&create_test_config(&seed), MemoryStorage::new())
        .expect("Failed to create crawler");
    let summary = crawler.run().await;
    let storage = crawler.into_storage();

    // Stored under the redirect target; the link back to the old URL resolves to the same copy
    let page = storage
        .get_text(&stored_at(&format!("{}/new/", base_url)))
        .expect("Redirect target not stored");
    assert_eq!(page, "<p>moved</p><a href=\"./index.html\">again</a>");
    assert!(storage.get(&stored_at(&seed)).is_none());

    assert_eq!(summary.statistics.fetches_succeeded, 1);
    assert_eq!(summary.urls_seen, 2);
}

#[tokio::test]
async fn test_max_depth_stops_following_links() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<a href="a.html">A</a>"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/a.html"))
        .respond_with(html(r#"<a href="b.html">B</a>"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/b.html"))
        .respond_with(html("unreachable"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let seed = format!("{}/", base_url);
    let mut config = create_test_config(&seed);
    config.crawl.max_depth = 1;
    let mut crawler = Crawler::new(&config, MemoryStorage::new()).expect("Failed to create crawler");
    crawler.run().await;
    let storage = crawler.into_storage();

    let a = storage
        .get_text(&stored_at(&format!("{}/a.html", base_url)))
        .expect("Depth 1 page not stored");
    assert_eq!(a, format!(r#"<a href="{}/b.html">B</a>"#, base_url));
}

#[tokio::test]
async fn test_failed_fetch_does_not_stop_crawl() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<img src="http://unreachable.invalid/x.png"><a href="ok.html">ok</a>"#,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/ok.html"))
        .respond_with(html("fine"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let seed = format!("{}/", base_url);
    let mut crawler = Crawler::new(&create_test_config(&seed), MemoryStorage::new())
        .expect("Failed to create crawler");
    let summary = crawler.run().await;

    assert_eq!(summary.statistics.fetches_failed, 1);
    assert_eq!(summary.statistics.failures.len(), 1);
    assert_eq!(
        summary.statistics.failures[0].url,
        "http://unreachable.invalid/x.png"
    );
    assert!(crawler
        .storage()
        .get_text(&stored_at(&format!("{}/ok.html", base_url)))
        .is_some());
}
