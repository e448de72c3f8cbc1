use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use engine_logging::engine_debug;

use crate::{FetchResult, WorkQueue};

/// Relays results from the result queue to the processing queue.
pub struct Collector {
    results: Arc<WorkQueue<FetchResult>>,
    processing: Arc<WorkQueue<FetchResult>>,
}

impl Collector {
    pub fn new(
        results: Arc<WorkQueue<FetchResult>>,
        processing: Arc<WorkQueue<FetchResult>>,
    ) -> Self {
        Self {
            results,
            processing,
        }
    }

    pub async fn run(self, shutdown: CancellationToken) {
        loop {
            let (result, _ack) = tokio::select! {
                _ = shutdown.cancelled() => break,
                claimed = self.results.claim() => claimed,
            };
            self.processing.put(result).await;
        }
        engine_debug!("Collector stopped");
    }
}
