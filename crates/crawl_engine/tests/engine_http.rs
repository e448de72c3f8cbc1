use std::fs;

use crawl_core::{CrawlConfig, RequestConfig};
use crawl_engine::Engine;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn crawl_over_http_counts_error_statuses_as_fetched() {
    engine_logging::initialize_for_tests();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("hello", "text/plain"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let ok = format!("{}/ok", server.uri());
    let broken = format!("{}/broken", server.uri());
    let config = CrawlConfig {
        urls: vec![ok.clone(), broken.clone()],
        workers: 2,
        results_path: temp.path().join("results.txt"),
        request: RequestConfig {
            retry_delay_ms: 10,
            ..RequestConfig::default()
        },
        ..CrawlConfig::default()
    };

    let summary = Engine::new(config).unwrap().run().await.unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 0);

    let content = fs::read_to_string(temp.path().join("results.txt")).unwrap();
    let mut lines: Vec<&str> = content.lines().collect();
    lines.sort();
    let mut expected = vec![
        format!(r#"{{"url":"{ok}","status":200,"message":"OK","text":"hello"}}"#),
        format!(
            r#"{{"url":"{broken}","status":500,"message":"Internal Server Error","text":""}}"#
        ),
    ];
    expected.sort();
    assert_eq!(lines, expected);
}

#[tokio::test]
async fn unreachable_host_is_counted_failed_after_retries() {
    engine_logging::initialize_for_tests();
    let temp = TempDir::new().unwrap();
    let config = CrawlConfig {
        urls: vec!["http://127.0.0.1:1/".to_string()],
        workers: 1,
        results_path: temp.path().join("results.txt"),
        request: RequestConfig {
            retries: 2,
            retry_delay_ms: 10,
            ..RequestConfig::default()
        },
        ..CrawlConfig::default()
    };

    let summary = Engine::new(config).unwrap().run().await.unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.completed, 1);
    assert!(!temp.path().join("results.txt").exists());
}

#[tokio::test]
async fn item_that_is_not_a_url_fails_without_retrying() {
    engine_logging::initialize_for_tests();
    let temp = TempDir::new().unwrap();
    let config = CrawlConfig {
        urls: vec!["not a url".to_string()],
        workers: 1,
        results_path: temp.path().join("results.txt"),
        request: RequestConfig {
            retry_delay_ms: 10,
            ..RequestConfig::default()
        },
        ..CrawlConfig::default()
    };

    let summary = Engine::new(config).unwrap().run().await.unwrap();

    assert_eq!(summary.total, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.succeeded, 0);
    assert!(!temp.path().join("results.txt").exists());
}
