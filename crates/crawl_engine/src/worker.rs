use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::{FutureExt, StreamExt};
use tokio_util::sync::CancellationToken;

use engine_logging::{engine_debug, engine_warn};

use crate::handler::{FetchHandler, HandlerError};
use crate::{FetchResult, TaskCounter, WorkQueue};

/// Drains one worker queue, turning each URL into results on the shared
/// result queue.
pub struct FetchWorker {
    id: usize,
    queue: Arc<WorkQueue<String>>,
    results: Arc<WorkQueue<FetchResult>>,
    handlers: Vec<Arc<dyn FetchHandler>>,
    fallback: Arc<dyn FetchHandler>,
    counter: Arc<TaskCounter>,
}

impl FetchWorker {
    pub fn new(
        id: usize,
        queue: Arc<WorkQueue<String>>,
        results: Arc<WorkQueue<FetchResult>>,
        handlers: Vec<Arc<dyn FetchHandler>>,
        fallback: Arc<dyn FetchHandler>,
        counter: Arc<TaskCounter>,
    ) -> Self {
        Self {
            id,
            queue,
            results,
            handlers,
            fallback,
            counter,
        }
    }

    /// Runs until `shutdown` is cancelled. Item failures are counted and
    /// logged; they never end the loop.
    pub async fn run(self, shutdown: CancellationToken) {
        loop {
            let (url, _ack) = tokio::select! {
                _ = shutdown.cancelled() => break,
                claimed = self.queue.claim() => claimed,
            };
            engine_debug!("Worker {} fetching {}", self.id, url);

            let outcome = AssertUnwindSafe(self.handle(&url))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(HandlerError::from_panic(panic)));
            match outcome {
                Ok(()) => self.counter.increment_succeeded(),
                Err(err) => {
                    engine_warn!("Worker {} failed on {}: {}", self.id, url, err);
                    self.counter.increment_failed();
                }
            }
        }
        engine_debug!("Worker {} stopped", self.id);
    }

    async fn handle(&self, url: &str) -> Result<(), HandlerError> {
        if self.handlers.is_empty() {
            return self.forward(self.fallback.as_ref(), url, false).await;
        }
        for handler in &self.handlers {
            self.forward(handler.as_ref(), url, true).await?;
        }
        Ok(())
    }

    async fn forward(
        &self,
        handler: &dyn FetchHandler,
        url: &str,
        registered: bool,
    ) -> Result<(), HandlerError> {
        let mut results = handler.fetch(url);
        while let Some(result) = results.next().await {
            self.results.put(result?).await;
            if registered {
                self.counter.increment_produced();
            }
        }
        Ok(())
    }
}
