//! Integration tests for search backends using wiremock

use crawlify::config::SearchSettings;
use crawlify::{SearchError, SearchRequest, SearchService};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn firecrawl(server: &MockServer) -> SearchService {
    SearchService::new(SearchSettings {
        firecrawl_api_key: Some("fc-key".to_string()),
        firecrawl_base_url: Some(server.uri()),
        ..Default::default()
    })
}

#[tokio::test]
async fn test_firecrawl_search() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/search"))
        .and(header("authorization", "Bearer fc-key"))
        .and(body_json(json!({"query": "rust", "limit": 2, "sources": ["web"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "warning": "partial results",
            "data": {"web": [
                {
                    "title": "Rust",
                    "description": "A language empowering everyone",
                    "url": "https://www.rust-lang.org",
                    "position": 1,
                    "metadata": {"sourceURL": "https://www.rust-lang.org/", "statusCode": 200}
                },
                {"title": "Docs", "url": "https://doc.rust-lang.org"},
                {"title": "Extra", "url": "https://example.com"}
            ]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = firecrawl(&server)
        .search(&SearchRequest::new("  rust ").limit(2))
        .await
        .unwrap();

    assert_eq!(result.query, "rust");
    assert_eq!(result.limit, 2);
    assert_eq!(result.count, 2);
    assert_eq!(result.warning.as_deref(), Some("partial results"));
    let first = &result.results[0];
    assert_eq!(first.title.as_deref(), Some("Rust"));
    assert_eq!(first.description.as_deref(), Some("A language empowering everyone"));
    assert_eq!(first.metadata["source_url"], "https://www.rust-lang.org/");
    assert_eq!(first.metadata["status_code"], 200);
    assert_eq!(first.metadata["position"], 1);
    assert_eq!(result.results[1].description, None);
}

#[tokio::test]
async fn test_firecrawl_default_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_json(json!({"query": "rust", "limit": 5, "sources": ["web"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"web": []}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = firecrawl(&server)
        .search(&SearchRequest::new("rust"))
        .await
        .unwrap();
    assert_eq!(result.limit, 5);
    assert_eq!(result.count, 0);
    assert_eq!(result.warning, None);
}

#[tokio::test]
async fn test_firecrawl_upstream_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let err = firecrawl(&server)
        .search(&SearchRequest::new("rust"))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 429);
    assert_eq!(err.to_string(), "Unable to complete search request.");
}

#[tokio::test]
async fn test_firecrawl_unsuccessful_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": false})))
        .mount(&server)
        .await;

    let err = firecrawl(&server)
        .search(&SearchRequest::new("rust"))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 502);
    assert_eq!(err.to_string(), "Unexpected error occurred while searching.");
}

#[tokio::test]
async fn test_firecrawl_invalid_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = firecrawl(&server)
        .search(&SearchRequest::new("rust"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Unexpected error occurred while searching.");
}

#[tokio::test]
async fn test_firecrawl_missing_key_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let service = SearchService::new(SearchSettings {
        backend: Some("".to_string()),
        firecrawl_api_key: Some("  ".to_string()),
        firecrawl_base_url: Some(server.uri()),
        ..Default::default()
    });
    let err = service
        .search(&SearchRequest::new("rust"))
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::Unavailable(_)));
    assert_eq!(err.status_code(), 503);
}

#[tokio::test]
async fn test_brave_search() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/res/v1/web/search"))
        .and(query_param("q", "rust async"))
        .and(query_param("count", "3"))
        .and(query_param("country", "us"))
        .and(header("x-subscription-token", "brave-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "search",
            "web": {"results": [
                {"title": "Tokio", "url": "https://tokio.rs", "description": "An async runtime", "age": "2 days ago"},
                {"title": "async-std", "url": "https://async.rs", "description": "Async std"},
                {"title": "smol", "url": "https://github.com/smol-rs/smol", "description": "Small runtime"},
                {"title": "glommio", "url": "https://github.com/DataDog/glommio", "description": "io_uring"}
            ]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let service = SearchService::new(SearchSettings {
        backend: Some("brave".to_string()),
        brave_api_key: Some("brave-key".to_string()),
        brave_base_url: Some(server.uri()),
        brave_country: Some("us".to_string()),
        ..Default::default()
    });
    let result = service
        .search(&SearchRequest::new("rust async").limit(3))
        .await
        .unwrap();

    assert_eq!(result.count, 3);
    assert_eq!(result.results[0].url.as_deref(), Some("https://tokio.rs"));
    assert_eq!(result.results[0].description.as_deref(), Some("An async runtime"));
    assert_eq!(result.results[0].metadata["age"], "2 days ago");
}

#[tokio::test]
async fn test_tavily_search() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(header("authorization", "Bearer tvly-key"))
        .and(body_json(json!({"query": "rust", "max_results": 2, "search_depth": "advanced"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": "rust",
            "results": [
                {"title": "Rust", "url": "https://www.rust-lang.org", "content": "Fast and safe", "score": 0.98}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let service = SearchService::new(SearchSettings {
        backend: Some("tavily".to_string()),
        tavily_api_key: Some("tvly-key".to_string()),
        tavily_base_url: Some(server.uri()),
        tavily_search_depth: Some("advanced".to_string()),
        ..Default::default()
    });
    let result = service
        .search(&SearchRequest::new("rust").limit(2))
        .await
        .unwrap();

    assert_eq!(result.count, 1);
    assert_eq!(result.results[0].description.as_deref(), Some("Fast and safe"));
    assert_eq!(result.results[0].metadata["score"], 0.98);
}

#[tokio::test]
async fn test_searxng_search() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "rust"))
        .and(query_param("format", "json"))
        .and(query_param("engines", "duckduckgo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": "rust",
            "results": [
                {"title": "Rust", "url": "https://www.rust-lang.org", "content": "A language", "engine": "duckduckgo"}
            ],
            "unresponsive_engines": [["google", "timeout"]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let service = SearchService::new(SearchSettings {
        backend: Some("searxng".to_string()),
        searxng_base_url: Some(format!("{}/", server.uri())),
        searxng_engines: Some("duckduckgo".to_string()),
        ..Default::default()
    });
    let result = service.search(&SearchRequest::new("rust")).await.unwrap();

    assert_eq!(result.count, 1);
    assert_eq!(result.results[0].metadata["engine"], "duckduckgo");
    assert_eq!(
        result.warning.as_deref(),
        Some("Unresponsive engines: google (timeout)")
    );
}

#[tokio::test]
async fn test_unknown_backend_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let service = SearchService::new(SearchSettings {
        backend: Some("yahoo".to_string()),
        firecrawl_api_key: Some("fc-key".to_string()),
        firecrawl_base_url: Some(server.uri()),
        ..Default::default()
    });
    let err = service
        .search(&SearchRequest::new("rust"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Unsupported search backend: yahoo");
}
