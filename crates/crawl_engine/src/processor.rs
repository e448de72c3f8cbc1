use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio_util::sync::CancellationToken;

use engine_logging::{engine_debug, engine_error};

use crate::handler::{HandlerError, ResultHandler};
use crate::{FetchResult, WorkQueue};

/// Hands each processed result to the registered result handlers, or to the
/// fallback handler when none are registered.
pub struct Processor {
    queue: Arc<WorkQueue<FetchResult>>,
    handlers: Vec<Arc<dyn ResultHandler>>,
    fallback: Arc<dyn ResultHandler>,
}

impl Processor {
    pub fn new(
        queue: Arc<WorkQueue<FetchResult>>,
        handlers: Vec<Arc<dyn ResultHandler>>,
        fallback: Arc<dyn ResultHandler>,
    ) -> Self {
        Self {
            queue,
            handlers,
            fallback,
        }
    }

    pub async fn run(self, shutdown: CancellationToken) {
        loop {
            let (result, _ack) = tokio::select! {
                _ = shutdown.cancelled() => break,
                claimed = self.queue.claim() => claimed,
            };
            if self.handlers.is_empty() {
                invoke(self.fallback.as_ref(), &result).await;
            } else {
                for handler in &self.handlers {
                    invoke(handler.as_ref(), &result).await;
                }
            }
        }
        engine_debug!("Processor stopped");
    }
}

// A failing handler does not stop later handlers from seeing the result.
async fn invoke(handler: &dyn ResultHandler, result: &FetchResult) {
    let outcome = AssertUnwindSafe(handler.handle(result))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(HandlerError::from_panic(panic)));
    if let Err(err) = outcome {
        engine_error!("Result handler failed for {}: {}", result.url, err);
    }
}
