//! Integration tests for querying feeds over HTTP.
//!
//! Each test starts its own wiremock server, so the fetcher is built with
//! `allow_private_hosts(true)` to reach it on localhost.

use pretty_assertions::assert_eq;
use wiremock::matchers::{header, headers, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use feedsniff::{
    conditional_headers, FeedQuery, FetchError, HttpFetcher, QueryError, QueryOutcome,
};

const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Example News</title>
    <link>https://example.com/</link>
    <description>All the news</description>
    <item>
      <guid>first</guid>
      <title>First</title>
      <link>https://example.com/1</link>
    </item>
    <item>
      <guid>second</guid>
      <title>Second</title>
      <link>https://example.com/2</link>
    </item>
    <item>
      <guid>third</guid>
      <title>Third</title>
      <link>https://example.com/3</link>
    </item>
  </channel>
</rss>"#;

const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Example Atom</title>
  <id>urn:uuid:60a76c80-d399-11d9-b93C-0003939e0af6</id>
  <updated>2024-01-01T00:00:00Z</updated>
  <link href="https://example.com/"/>
  <entry>
    <title>Entry One</title>
    <id>urn:entry:1</id>
    <updated>2024-01-01T00:00:00Z</updated>
  </entry>
</feed>"#;

const JSON_FEED: &str = r#"{
  "version": "https://jsonfeed.org/version/1.1",
  "title": "Example JSON",
  "home_page_url": "https://example.com/",
  "items": [
    { "id": "j1", "title": "Json One", "url": "https://example.com/j1" }
  ]
}"#;

fn query() -> FeedQuery<HttpFetcher> {
    FeedQuery::new(HttpFetcher::new(reqwest::Client::new()).allow_private_hosts(true))
}

async fn serve(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

fn feed_response(body: &str, mime: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), mime)
}

// ============================================================================
// Format detection
// ============================================================================

#[tokio::test]
async fn test_each_format_by_content_type() {
    let server = MockServer::start().await;
    serve(&server, "/rss", feed_response(RSS, "application/rss+xml")).await;
    serve(&server, "/atom", feed_response(ATOM, "application/atom+xml")).await;
    serve(&server, "/json", feed_response(JSON_FEED, "application/feed+json")).await;

    let q = query();
    let expected = [
        ("/rss", "Example News", 3),
        ("/atom", "Example Atom", 1),
        ("/json", "Example JSON", 1),
    ];
    for (route, title, count) in expected {
        let url = format!("{}{}", server.uri(), route);
        let parsed = q.query_feed(&url, None, true).await.unwrap().parsed().unwrap();
        assert_eq!(parsed.feed.title.as_deref(), Some(title), "{route}");
        assert_eq!(parsed.items.len(), count, "{route}");
    }
}

#[tokio::test]
async fn test_generic_content_type_sniffed() {
    let server = MockServer::start().await;
    serve(&server, "/rss", feed_response(RSS, "text/plain; charset=utf-8")).await;
    serve(&server, "/atom", feed_response(ATOM, "application/xml")).await;
    serve(&server, "/json", feed_response(JSON_FEED, "text/plain")).await;

    let q = query();
    for route in ["/rss", "/atom", "/json"] {
        let url = format!("{}{}", server.uri(), route);
        let outcome = q.query_feed(&url, None, false).await;
        assert!(matches!(outcome, Ok(QueryOutcome::Parsed(_))), "{route}");
    }
}

#[tokio::test]
async fn test_html_page_is_unknown_format() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/",
        feed_response("<!DOCTYPE html><html><body></body></html>", "text/html"),
    )
    .await;

    let url = format!("{}/", server.uri());
    let result = query().query_feed(&url, None, false).await;
    assert!(matches!(result, Err(QueryError::UnknownFormat { url: u }) if u == url));
}

// ============================================================================
// Items
// ============================================================================

#[tokio::test]
async fn test_items_only_when_requested_and_in_order() {
    let server = MockServer::start().await;
    serve(&server, "/feed", feed_response(RSS, "application/rss+xml")).await;
    let url = format!("{}/feed", server.uri());
    let q = query();

    let without = q.query_feed(&url, None, false).await.unwrap().parsed().unwrap();
    assert!(without.items.is_empty());

    let with = q.query_feed(&url, None, true).await.unwrap().parsed().unwrap();
    let guids: Vec<_> = with.items.iter().map(|i| i.guid.as_str()).collect();
    assert_eq!(guids, vec!["first", "second", "third"]);
    assert_eq!(with.feed, without.feed);
}

// ============================================================================
// Status handling
// ============================================================================

#[tokio::test]
async fn test_server_error_reports_status() {
    let server = MockServer::start().await;
    serve(&server, "/feed", ResponseTemplate::new(503)).await;
    let url = format!("{}/feed", server.uri());

    match query().query_feed(&url, None, true).await {
        Err(QueryError::Network {
            url: u,
            status,
            message,
        }) => {
            assert_eq!(u, url);
            assert_eq!(status, 503);
            assert_eq!(message, "Service Unavailable");
        }
        other => panic!("Expected Network error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_conditional_request_not_modified() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .and(header("If-None-Match", "\"v1\""))
        .respond_with(ResponseTemplate::new(304))
        .with_priority(1)
        .mount(&server)
        .await;
    serve(&server, "/feed", feed_response(RSS, "application/rss+xml")).await;

    let url = format!("{}/feed", server.uri());
    let headers = conditional_headers(Some("\"v1\""), None);
    let outcome = query().query_feed(&url, Some(&headers), true).await.unwrap();
    assert!(outcome.is_not_modified());
}

#[tokio::test]
async fn test_caching_tokens_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .and(header("If-None-Match", "\"rev-7\""))
        // the matcher splits values on commas, HTTP dates included
        .and(headers(
            "If-Modified-Since",
            vec!["Wed", "21 Oct 2015 07:28:00 GMT"],
        ))
        .respond_with(ResponseTemplate::new(304))
        .with_priority(1)
        .mount(&server)
        .await;
    serve(
        &server,
        "/feed",
        feed_response(ATOM, "application/atom+xml")
            .insert_header("ETag", "\"rev-7\"")
            .insert_header("Last-Modified", "Wed, 21 Oct 2015 07:28:00 GMT"),
    )
    .await;

    let url = format!("{}/feed", server.uri());
    let q = query();

    let first = q.query_feed(&url, None, false).await.unwrap().parsed().unwrap();
    assert_eq!(first.feed.etag.as_deref(), Some("\"rev-7\""));
    assert_eq!(
        first.feed.last_modified.as_deref(),
        Some("Wed, 21 Oct 2015 07:28:00 GMT")
    );

    let second = q
        .query_feed(&url, Some(&first.feed.conditional_headers()), false)
        .await
        .unwrap();
    assert!(second.is_not_modified());
}

// ============================================================================
// Fetcher limits
// ============================================================================

#[tokio::test]
async fn test_oversized_body_rejected() {
    let server = MockServer::start().await;
    serve(&server, "/feed", feed_response(RSS, "application/rss+xml")).await;
    let url = format!("{}/feed", server.uri());

    let fetcher = HttpFetcher::new(reqwest::Client::new())
        .allow_private_hosts(true)
        .with_max_body_size(64);
    let result = FeedQuery::new(fetcher).query_feed(&url, None, false).await;
    assert!(matches!(
        result,
        Err(QueryError::Io(FetchError::ResponseTooLarge))
    ));
}

#[tokio::test]
async fn test_private_host_refused_by_default() {
    let server = MockServer::start().await;
    serve(&server, "/feed", feed_response(RSS, "application/rss+xml")).await;
    let url = format!("{}/feed", server.uri());

    let q = FeedQuery::new(HttpFetcher::new(reqwest::Client::new()));
    let result = q.query_feed(&url, None, false).await;
    assert!(matches!(result, Err(QueryError::Io(FetchError::InvalidUrl(_)))));
}

// ============================================================================
// is_feed_url
// ============================================================================

#[tokio::test]
async fn test_is_feed_url() {
    let server = MockServer::start().await;
    serve(&server, "/rss", feed_response(RSS, "application/rss+xml")).await;
    serve(&server, "/sniffed", feed_response(ATOM, "text/xml")).await;
    serve(&server, "/page", feed_response("<html></html>", "text/html")).await;
    serve(&server, "/missing", ResponseTemplate::new(404)).await;

    let q = query();
    let check = |route: &str| format!("{}{}", server.uri(), route);

    assert!(q.is_feed_url(&check("/rss")).await.unwrap());
    assert!(q.is_feed_url(&check("/sniffed")).await.unwrap());
    assert!(!q.is_feed_url(&check("/page")).await.unwrap());
    assert!(!q.is_feed_url(&check("/missing")).await.unwrap());
}
