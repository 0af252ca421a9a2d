//! Proxy transport against a mock rendering proxy
use std::sync::Arc;
use std::time::Duration;

use sephora_scraper::crawling::{BatchCoordinator, FetchError, PageFetcher};
use sephora_scraper::infrastructure::{ProxyConfig, ProxyFetcher};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TARGET: &str = "https://www.sephora.com/product/soft-pinch-liquid-blush-P97989778";

fn config_for(server: &MockServer) -> ProxyConfig {
    ProxyConfig {
        base_url: format!("{}/v1/", server.uri()),
        api_key: "secret-key".to_string(),
        timeout_seconds: 1,
        ..Default::default()
    }
}

#[tokio::test]
async fn successful_response_returns_the_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/"))
        .and(query_param("api_key", "secret-key"))
        .and(query_param("url", TARGET))
        .and(query_param("render_js", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><h1>Blush</h1></html>"))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = ProxyFetcher::new(&config_for(&server)).unwrap();
    let body = fetcher.fetch(TARGET).await.unwrap();

    assert_eq!(body, "<html><h1>Blush</h1></html>");
}

#[tokio::test]
async fn country_is_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/"))
        .and(query_param("country", "us"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let config = ProxyConfig {
        country: Some("us".to_string()),
        ..config_for(&server)
    };
    let fetcher = ProxyFetcher::new(&config).unwrap();

    assert_eq!(fetcher.fetch(TARGET).await.unwrap(), "ok");
}

#[tokio::test]
async fn server_error_maps_to_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("x".repeat(1000)))
        .mount(&server)
        .await;

    let fetcher = ProxyFetcher::new(&config_for(&server)).unwrap();
    let err = fetcher.fetch(TARGET).await.unwrap_err();

    match &err {
        FetchError::Status { status, body } => {
            assert_eq!(*status, 500);
            assert_eq!(body.len(), 200);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!err.to_string().contains("secret-key"));
}

#[tokio::test]
async fn slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("too late")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let fetcher = ProxyFetcher::new(&config_for(&server)).unwrap();
    let err = fetcher.fetch(TARGET).await.unwrap_err();

    assert!(err.is_timeout());
    assert!(err.to_string().to_lowercase().contains("timeout"));
}

#[tokio::test]
async fn connection_failure_hides_the_api_key() {
    let config = ProxyConfig {
        base_url: "http://127.0.0.1:1/v1/".to_string(),
        api_key: "secret-key".to_string(),
        timeout_seconds: 1,
        ..Default::default()
    };

    let fetcher = ProxyFetcher::new(&config).unwrap();
    let err = fetcher.fetch(TARGET).await.unwrap_err();

    assert!(matches!(err, FetchError::Network(_) | FetchError::Timeout { .. }));
    assert!(!err.to_string().contains("secret-key"));
}

#[tokio::test]
async fn batch_through_the_proxy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("url", "https://www.sephora.com/product/a"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><span data-at="product_name">Alpha</span></body></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("url", "https://www.sephora.com/product/b"))
        .respond_with(ResponseTemplate::new(403).set_body_string("blocked"))
        .mount(&server)
        .await;

    let fetcher: Arc<dyn PageFetcher> = Arc::new(ProxyFetcher::new(&config_for(&server)).unwrap());
    let report = BatchCoordinator::new(fetcher)
        .run_batch(
            &["https://www.sephora.com/product/a", "https://www.sephora.com/product/b"],
            2,
        )
        .await
        .unwrap();

    assert_eq!(report.successful, 1);
    assert_eq!(
        report.results[0].extraction.as_ref().unwrap().name.as_deref(),
        Some("Alpha")
    );
    assert_eq!(report.results[1].error_message.as_deref(), Some("HTTP error 403: blocked"));
}
