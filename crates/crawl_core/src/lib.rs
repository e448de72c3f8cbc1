//! Crawl core: pure configuration model and URL list helpers.
mod config;
mod urls;

pub use config::{ConfigError, CrawlConfig, RequestConfig};
pub use urls::{check_url, parse_url_list};
