//! Crawl engine: queue-based fetch pipeline with pluggable handlers.
mod cache;
mod collector;
mod counter;
mod decode;
mod dispatcher;
mod engine;
mod handler;
mod http;
mod loader;
mod processor;
mod queue;
mod sink;
mod types;
mod worker;

pub use cache::{RequestCache, RequestKey};
pub use collector::Collector;
pub use counter::{Summary, TaskCounter};
pub use decode::{decode_body, DecodeError, DecodedText};
pub use dispatcher::Dispatcher;
pub use engine::{Engine, PipelineQueues};
pub use handler::{
    FetchHandler, HandlerError, HandlerTable, HttpFetchHandler, ResultHandler, SinkResultHandler,
};
pub use http::{HttpClient, HttpError, Method, ReqwestClient, Request, Response};
pub use loader::Loader;
pub use processor::Processor;
pub use queue::{Ack, QueueError, WorkQueue};
pub use sink::{ensure_parent_dir, ResultSink, SinkError};
pub use types::{EngineError, FetchResult};
pub use worker::FetchWorker;

pub use futures_util::stream::BoxStream;
pub use tokio_util::sync::CancellationToken;
