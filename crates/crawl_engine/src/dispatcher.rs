use std::sync::{Arc, PoisonError, RwLock};

use tokio_util::sync::CancellationToken;

use engine_logging::{engine_debug, engine_trace};

use crate::{EngineError, WorkQueue};

/// Round-robin fan-out from the request queue to the worker queues.
pub struct Dispatcher {
    requests: Arc<WorkQueue<String>>,
    workers: RwLock<Vec<Arc<WorkQueue<String>>>>,
}

impl Dispatcher {
    pub fn new(
        requests: Arc<WorkQueue<String>>,
        workers: Vec<Arc<WorkQueue<String>>>,
    ) -> Result<Self, EngineError> {
        if workers.is_empty() {
            return Err(EngineError::NoWorkerQueues);
        }
        Ok(Self {
            requests,
            workers: RwLock::new(workers),
        })
    }

    /// Adds a queue to the end of the rotation.
    ///
    /// The rotation index wraps on the current length, so the new queue is
    /// served as soon as the index reaches its slot.
    pub fn add_worker_queue(&self, queue: Arc<WorkQueue<String>>) {
        self.workers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(queue);
    }

    pub fn worker_count(&self) -> usize {
        self.workers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns the queue at `next` and advances the index.
    fn pick(&self, next: &mut usize) -> (usize, Arc<WorkQueue<String>>) {
        let workers = self.workers.read().unwrap_or_else(PoisonError::into_inner);
        let slot = *next % workers.len();
        *next = (slot + 1) % workers.len();
        (slot, workers[slot].clone())
    }

    /// Runs until `shutdown` is cancelled.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut next = 0;
        loop {
            let (url, _ack) = tokio::select! {
                _ = shutdown.cancelled() => break,
                claimed = self.requests.claim() => claimed,
            };
            let (slot, target) = self.pick(&mut next);
            engine_trace!("Dispatching {} to worker {}", url, slot);
            target.put(url).await;
        }
        engine_debug!("Dispatcher stopped");
    }
}
