use std::fs;
use std::path::PathBuf;

use crawl_core::{check_url, parse_url_list, ConfigError, CrawlConfig, RequestConfig};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

#[test]
fn ron_config_fills_missing_fields_with_defaults() {
    let config = CrawlConfig::from_ron_str(
        r#"(
            urls: ["http://a", "http://b"],
            workers: 2,
            request: (retries: 5, proxy: Some("http://127.0.0.1:8080")),
        )"#,
    )
    .unwrap();

    assert_eq!(config.urls, vec!["http://a".to_string(), "http://b".to_string()]);
    assert_eq!(config.workers, 2);
    assert_eq!(config.loader_concurrency, 16);
    assert_eq!(config.results_path, PathBuf::from("results.txt"));
    assert_eq!(
        config.request,
        RequestConfig {
            retries: 5,
            proxy: Some("http://127.0.0.1:8080".to_string()),
            ..RequestConfig::default()
        }
    );
    config.validate().unwrap();
}

#[test]
fn load_reads_file_and_reports_missing_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("crawl.ron");
    fs::write(&path, "(workers: 1, results_path: \"out.txt\")").unwrap();

    let config = CrawlConfig::load(&path).unwrap();
    assert_eq!(config.workers, 1);
    assert_eq!(config.results_path, PathBuf::from("out.txt"));

    let err = CrawlConfig::load(&temp.path().join("missing.ron")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn malformed_ron_is_a_parse_error() {
    let err = CrawlConfig::from_ron_str("(workers: \"many\")").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn validate_rejects_zero_workers_and_zero_attempts() {
    let config = CrawlConfig {
        workers: 0,
        ..CrawlConfig::default()
    };
    assert!(matches!(config.validate(), Err(ConfigError::NoWorkers)));

    let config = CrawlConfig {
        loader_concurrency: 0,
        ..CrawlConfig::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::NoLoaderConcurrency)
    ));

    let mut config = CrawlConfig::default();
    config.request.retries = 0;
    assert!(matches!(config.validate(), Err(ConfigError::NoAttempts)));
}

#[test]
fn validate_rejects_bad_urls_and_proxy() {
    let mut config = CrawlConfig::default();
    config.extend_urls(vec!["ftp://example.com/file".to_string()]);
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidUrl { .. })
    ));

    let mut config = CrawlConfig::default();
    config.request.proxy = Some("not a proxy".to_string());
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidProxy { .. })
    ));
}

#[test]
fn pipeline_validation_accepts_items_that_are_not_urls() {
    let mut config = CrawlConfig::default();
    config.extend_urls(["job-1".to_string(), "not a url".to_string(), "ftp://x".to_string()]);
    config.validate_pipeline().unwrap();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidUrl { .. })
    ));

    config.workers = 0;
    assert!(matches!(
        config.validate_pipeline(),
        Err(ConfigError::NoWorkers)
    ));
}

#[test]
fn url_list_trims_skips_comments_and_keeps_duplicates() {
    let raw = concat!(
        "  http://a.example.com \n\n# seed list\n",
        "http://b.example.com\nhttp://a.example.com\n   \n",
    );
    assert_eq!(
        parse_url_list(raw),
        vec![
            "http://a.example.com".to_string(),
            "http://b.example.com".to_string(),
            "http://a.example.com".to_string(),
        ]
    );
    assert!(parse_url_list("\n  \n").is_empty());
}

#[test]
fn check_url_accepts_http_and_https_only() {
    assert!(check_url("http://a").is_ok());
    assert!(check_url("https://example.com/path?q=1").is_ok());
    assert!(check_url("relative/path").is_err());
    assert!(check_url("mailto:someone@example.com").is_err());
}
