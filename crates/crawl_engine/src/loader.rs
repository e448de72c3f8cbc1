use std::sync::Arc;

use futures_util::stream::{self, StreamExt};

use crate::{TaskCounter, WorkQueue};

/// Seeds a queue from a fixed URL list.
pub struct Loader {
    counter: Arc<TaskCounter>,
}

impl Loader {
    pub fn new(counter: Arc<TaskCounter>) -> Self {
        Self { counter }
    }

    /// Puts every URL into `destination`, with at most `concurrency_limit`
    /// enqueue operations in flight. Returns once all of them are enqueued.
    pub async fn load(
        &self,
        urls: &[String],
        destination: &WorkQueue<String>,
        concurrency_limit: usize,
    ) {
        let counter = self.counter.as_ref();
        stream::iter(urls.iter().cloned())
            .for_each_concurrent(concurrency_limit.max(1), |url| async move {
                destination.put(url).await;
                counter.increment_total();
            })
            .await;
    }
}
