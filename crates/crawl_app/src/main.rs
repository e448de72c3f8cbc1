//! Command line entry point.
//!
//! Usage: `crawl_app <config.ron> [urls.txt]`
//!
//! URLs from the optional list file are appended to the ones in the config.
//! Logs go to the terminal and to `./crawl.log`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::LevelFilter;

use crawl_core::{parse_url_list, CrawlConfig};
use crawl_engine::Engine;
use engine_logging::{engine_error, LogDestination};

const LOG_FILE: &str = "./crawl.log";

fn main() {
    engine_logging::initialize(LogDestination::Both(PathBuf::from(LOG_FILE)), LevelFilter::Info);

    if let Err(err) = run() {
        engine_error!("{:#}", err);
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let mut args = std::env::args_os().skip(1);
    let Some(config_path) = args.next().map(PathBuf::from) else {
        bail!("usage: crawl_app <config.ron> [urls.txt]");
    };
    let config = load_config(&config_path, args.next().map(PathBuf::from).as_deref())?;

    // The pipeline stages cooperate on a single thread.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    let summary = runtime.block_on(async {
        let engine = Engine::new(config).context("failed to set up crawl engine")?;
        engine.run().await.context("crawl failed")
    })?;

    println!("{summary}");
    Ok(())
}

fn load_config(config_path: &Path, url_list: Option<&Path>) -> Result<CrawlConfig> {
    let mut config = CrawlConfig::load(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    if let Some(list) = url_list {
        let raw = fs::read_to_string(list)
            .with_context(|| format!("failed to read url list {}", list.display()))?;
        config.extend_urls(parse_url_list(&raw));
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}
