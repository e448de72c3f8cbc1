use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::urls::check_url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("worker count must be at least 1")]
    NoWorkers,
    #[error("loader concurrency must be at least 1")]
    NoLoaderConcurrency,
    #[error("retry count must be at least 1")]
    NoAttempts,
    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("invalid proxy {proxy:?}: {reason}")]
    InvalidProxy { proxy: String, reason: String },
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// Top-level crawl configuration, usually read from a RON file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Seed URLs, loaded in order.
    pub urls: Vec<String>,
    /// Number of fetch workers.
    pub workers: usize,
    /// Maximum number of concurrent enqueue operations during loading.
    pub loader_concurrency: usize,
    /// File the default result handler appends to.
    pub results_path: PathBuf,
    pub request: RequestConfig,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            workers: 4,
            loader_concurrency: 16,
            results_path: PathBuf::from("results.txt"),
            request: RequestConfig::default(),
        }
    }
}

impl CrawlConfig {
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron_str(&text)
    }

    /// Appends URLs after the ones already configured.
    pub fn extend_urls<I>(&mut self, urls: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.urls.extend(urls);
    }

    /// Checks the pipeline shape and request settings. Work items are left
    /// alone: a registered fetch handler may accept items that are not URLs.
    pub fn validate_pipeline(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.loader_concurrency == 0 {
            return Err(ConfigError::NoLoaderConcurrency);
        }
        self.request.validate()
    }

    /// Full check used by the command line: pipeline settings plus every
    /// configured URL.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_pipeline()?;
        for url in &self.urls {
            check_url(url)?;
        }
        Ok(())
    }
}

/// Settings for the HTTP client each fetch worker owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    /// Total attempts per request; transport errors and timeouts are retried.
    pub retries: u32,
    pub retry_delay_ms: u64,
    pub timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub proxy: Option<String>,
    /// Reuse responses for identical requests made through the same client.
    pub cache: bool,
    pub user_agent: Option<String>,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            retry_delay_ms: 1_000,
            timeout_ms: 30_000,
            connect_timeout_ms: 10_000,
            proxy: None,
            cache: true,
            user_agent: None,
        }
    }
}

impl RequestConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retries == 0 {
            return Err(ConfigError::NoAttempts);
        }
        if let Some(proxy) = &self.proxy {
            url::Url::parse(proxy).map_err(|err| ConfigError::InvalidProxy {
                proxy: proxy.clone(),
                reason: err.to_string(),
            })?;
        }
        Ok(())
    }
}
