//! Pluggable per-item handlers for the fetch and processing stages.

use std::any::Any;
use std::sync::Arc;

use futures_util::stream::{self, BoxStream, StreamExt};
use thiserror::Error;

use crate::http::{HttpClient, HttpError};
use crate::sink::{ResultSink, SinkError};
use crate::FetchResult;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    Failed(String),
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl HandlerError {
    pub fn msg(message: impl Into<String>) -> Self {
        HandlerError::Failed(message.into())
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(text) = payload.downcast_ref::<&str>() {
            (*text).to_string()
        } else if let Some(text) = payload.downcast_ref::<String>() {
            text.clone()
        } else {
            "non-string panic payload".to_string()
        };
        HandlerError::Panicked(message)
    }
}

/// Turns one work item into a sequence of results.
///
/// Every yielded `Ok` is forwarded to the result queue as it arrives; the
/// first `Err` ends the item and marks it failed.
pub trait FetchHandler: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxStream<'a, Result<FetchResult, HandlerError>>;
}

/// Consumes one result at the end of the pipeline.
#[async_trait::async_trait]
pub trait ResultHandler: Send + Sync {
    async fn handle(&self, result: &FetchResult) -> Result<(), HandlerError>;
}

/// Built-in fetch: a single GET whose response becomes one result.
pub struct HttpFetchHandler {
    client: Arc<dyn HttpClient>,
}

impl HttpFetchHandler {
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self { client }
    }
}

impl FetchHandler for HttpFetchHandler {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxStream<'a, Result<FetchResult, HandlerError>> {
        stream::once(async move {
            let response = self.client.get(url).await?;
            Ok::<_, HandlerError>(FetchResult::from_response(url, response))
        })
        .boxed()
    }
}

/// Built-in result handler: echo to stdout and append to the results file.
pub struct SinkResultHandler {
    sink: ResultSink,
}

impl SinkResultHandler {
    pub fn new(sink: ResultSink) -> Self {
        Self { sink }
    }
}

#[async_trait::async_trait]
impl ResultHandler for SinkResultHandler {
    async fn handle(&self, result: &FetchResult) -> Result<(), HandlerError> {
        let record = result.to_string();
        println!("{record}");
        self.sink.append(&record)?;
        Ok(())
    }
}

/// Ordered, append-only list of registered handlers.
pub struct HandlerTable<H: ?Sized> {
    handlers: Vec<Arc<H>>,
}

impl<H: ?Sized> HandlerTable<H> {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn register(&mut self, handler: Arc<H>) {
        self.handlers.push(handler);
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Shared snapshot handed to a stage at spawn time.
    pub fn snapshot(&self) -> Vec<Arc<H>> {
        self.handlers.clone()
    }
}

impl<H: ?Sized> Default for HandlerTable<H> {
    fn default() -> Self {
        Self::new()
    }
}
