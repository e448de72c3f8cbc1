use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crawl_core::ConfigError;
use engine_logging::engine_debug;

use crate::http::{HttpError, Response};

/// One record produced by a fetch handler and consumed by result handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    /// The work item this record was produced for.
    pub url: String,
    pub status: u16,
    pub message: String,
    /// Decoded body text, when the producer had one.
    pub text: Option<String>,
    pub response: Option<Response>,
}

impl FetchResult {
    pub fn new(url: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status,
            message: message.into(),
            text: None,
            response: None,
        }
    }

    /// Wraps a transport response. Bodies that do not decode as text keep
    /// `text` empty.
    pub fn from_response(url: impl Into<String>, response: Response) -> Self {
        let url = url.into();
        let text = match response.text() {
            Ok(text) => Some(text),
            Err(err) => {
                engine_debug!("Body of {} is not text: {}", url, err);
                None
            }
        };
        Self {
            url,
            status: response.status,
            message: response.reason.clone(),
            text,
            response: Some(response),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

#[derive(Serialize)]
struct Record<'a> {
    url: &'a str,
    status: u16,
    message: &'a str,
    text: Option<&'a str>,
}

/// One JSON object per record, as written by the default results sink.
/// Newlines and tabs inside the body are escaped, so a record never spans
/// more than one line.
impl fmt::Display for FetchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = Record {
            url: &self.url,
            status: self.status,
            message: &self.message,
            text: self.text.as_deref(),
        };
        let line = serde_json::to_string(&record).map_err(|_| fmt::Error)?;
        f.write_str(&line)
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error("dispatcher needs at least one worker queue")]
    NoWorkerQueues,
}
