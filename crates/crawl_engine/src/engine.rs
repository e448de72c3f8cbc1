//! Pipeline wiring: Loader -> Dispatcher -> FetchWorkers -> Collector -> Processor.
//!
//! A run loads every URL, starts the long-running stages, then joins the
//! queues in pipeline order (requests, each worker queue, results,
//! processing). Joining the request queue alone only proves every URL reached
//! *some* worker queue, so the per-worker joins must come before the result
//! queue join means anything. Once the last join returns the stages are idle
//! and are cancelled.

use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crawl_core::CrawlConfig;
use engine_logging::{engine_debug, engine_error, engine_info};

use crate::collector::Collector;
use crate::dispatcher::Dispatcher;
use crate::handler::{
    FetchHandler, HandlerTable, HttpFetchHandler, ResultHandler, SinkResultHandler,
};
use crate::http::{HttpClient, ReqwestClient};
use crate::loader::Loader;
use crate::processor::Processor;
use crate::sink::ResultSink;
use crate::worker::FetchWorker;
use crate::{EngineError, FetchResult, Summary, TaskCounter, WorkQueue};

/// Handles to every queue of one pipeline.
#[derive(Debug, Clone)]
pub struct PipelineQueues {
    pub requests: Arc<WorkQueue<String>>,
    pub workers: Vec<Arc<WorkQueue<String>>>,
    pub results: Arc<WorkQueue<FetchResult>>,
    pub processing: Arc<WorkQueue<FetchResult>>,
}

impl PipelineQueues {
    pub fn new(worker_count: usize) -> Self {
        Self {
            requests: Arc::new(WorkQueue::new()),
            workers: (0..worker_count)
                .map(|_| Arc::new(WorkQueue::new()))
                .collect(),
            results: Arc::new(WorkQueue::new()),
            processing: Arc::new(WorkQueue::new()),
        }
    }

    /// Joins every queue in pipeline order.
    pub async fn drain(&self) {
        self.requests.join().await;
        engine_debug!("Request queue drained");
        for (id, queue) in self.workers.iter().enumerate() {
            queue.join().await;
            engine_debug!("Worker queue {} drained", id);
        }
        self.results.join().await;
        engine_debug!("Result queue drained");
        self.processing.join().await;
        engine_debug!("Processing queue drained");
    }

    /// Sum of in-flight items across all queues.
    pub fn in_flight(&self) -> usize {
        self.requests.in_flight()
            + self.workers.iter().map(|q| q.in_flight()).sum::<usize>()
            + self.results.in_flight()
            + self.processing.in_flight()
    }
}

/// Owns the queues, the shared counter and the handler tables of one crawl.
pub struct Engine {
    config: CrawlConfig,
    counter: Arc<TaskCounter>,
    queues: PipelineQueues,
    clients: Vec<Arc<dyn HttpClient>>,
    spider_processes: HandlerTable<dyn FetchHandler>,
    result_processes: HandlerTable<dyn ResultHandler>,
}

impl Engine {
    /// Builds an engine whose workers each own a [`ReqwestClient`], so the
    /// request cache is per worker.
    ///
    /// Work items are not checked as URLs here; an item the HTTP client
    /// cannot request becomes a failed [`FetchResult`].
    pub fn new(config: CrawlConfig) -> Result<Self, EngineError> {
        config.validate_pipeline()?;
        let clients = (0..config.workers)
            .map(|_| {
                ReqwestClient::new(config.request.clone())
                    .map(|client| Arc::new(client) as Arc<dyn HttpClient>)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::assemble(config, clients))
    }

    /// Builds an engine whose workers all share `client`.
    pub fn with_client(
        config: CrawlConfig,
        client: Arc<dyn HttpClient>,
    ) -> Result<Self, EngineError> {
        config.validate_pipeline()?;
        let clients = vec![client; config.workers];
        Ok(Self::assemble(config, clients))
    }

    fn assemble(config: CrawlConfig, clients: Vec<Arc<dyn HttpClient>>) -> Self {
        Self {
            queues: PipelineQueues::new(config.workers),
            config,
            counter: Arc::new(TaskCounter::new()),
            clients,
            spider_processes: HandlerTable::new(),
            result_processes: HandlerTable::new(),
        }
    }

    /// Registers a fetch handler. Registered handlers replace the built-in
    /// GET and run in registration order for every URL.
    pub fn register_spider_process<H>(&mut self, handler: H) -> &mut Self
    where
        H: FetchHandler + 'static,
    {
        self.spider_processes.register(Arc::new(handler));
        self
    }

    /// Registers a result handler. Registered handlers replace the built-in
    /// results file sink and run in registration order for every result.
    pub fn register_result_process<H>(&mut self, handler: H) -> &mut Self
    where
        H: ResultHandler + 'static,
    {
        self.result_processes.register(Arc::new(handler));
        self
    }

    pub fn counter(&self) -> Arc<TaskCounter> {
        Arc::clone(&self.counter)
    }

    pub fn queues(&self) -> PipelineQueues {
        self.queues.clone()
    }

    /// Runs the crawl to completion and returns the final counters.
    pub async fn run(self) -> Result<Summary, EngineError> {
        let Engine {
            config,
            counter,
            queues,
            clients,
            spider_processes,
            result_processes,
        } = self;

        engine_info!(
            "Crawl starting: urls={} workers={} fetch_handlers={} result_handlers={}",
            config.urls.len(),
            queues.workers.len(),
            spider_processes.len(),
            result_processes.len()
        );

        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&queues.requests),
            queues.workers.clone(),
        )?);
        let fetch_handlers = spider_processes.snapshot();
        let workers: Vec<FetchWorker> = queues
            .workers
            .iter()
            .zip(clients)
            .enumerate()
            .map(|(id, (queue, client))| {
                FetchWorker::new(
                    id,
                    Arc::clone(queue),
                    Arc::clone(&queues.results),
                    fetch_handlers.clone(),
                    Arc::new(HttpFetchHandler::new(client)),
                    Arc::clone(&counter),
                )
            })
            .collect();
        let collector = Collector::new(Arc::clone(&queues.results), Arc::clone(&queues.processing));
        let processor = Processor::new(
            Arc::clone(&queues.processing),
            result_processes.snapshot(),
            Arc::new(SinkResultHandler::new(ResultSink::new(
                config.results_path.clone(),
            ))),
        );

        Loader::new(Arc::clone(&counter))
            .load(&config.urls, &queues.requests, config.loader_concurrency)
            .await;
        engine_info!("Loaded {} urls", config.urls.len());

        let shutdown = CancellationToken::new();
        let mut tasks = JoinSet::new();
        {
            let dispatcher = Arc::clone(&dispatcher);
            let shutdown = shutdown.clone();
            tasks.spawn(async move { dispatcher.run(shutdown).await });
        }
        for worker in workers {
            tasks.spawn(worker.run(shutdown.clone()));
        }
        tasks.spawn(collector.run(shutdown.clone()));
        tasks.spawn(processor.run(shutdown.clone()));

        queues.drain().await;
        engine_info!("All queues drained, stopping pipeline");

        shutdown.cancel();
        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                engine_error!("Pipeline task failed during shutdown: {}", err);
            }
        }

        let summary = counter.summary();
        engine_info!("Crawl finished. {}", summary);
        Ok(summary)
    }
}
