//! HTTP collaborator used by the default fetch handler.
//!
//! [`HttpClient`] is the seam the pipeline depends on; [`ReqwestClient`] is
//! the production implementation with fixed-delay retries on transport
//! failures and an optional per-client response cache.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crawl_core::RequestConfig;
use engine_logging::{engine_debug, engine_trace, engine_warn};

use crate::cache::{RequestCache, RequestKey};
use crate::decode::{decode_body, DecodeError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpError {
    #[error("failed to build http client: {0}")]
    Client(String),
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("transport error for {url}: {message}")]
    Transport { url: String, message: String },
    #[error("request to {url} failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last: Box<HttpError>,
    },
    #[error("invalid json body: {0}")]
    Json(String),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl HttpError {
    /// Transport failures and timeouts are retried; everything else is final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, HttpError::Timeout { .. } | HttpError::Transport { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }

    fn to_reqwest(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub body: Option<Vec<u8>>,
    pub headers: BTreeMap<String, String>,
    pub cookies: BTreeMap<String, String>,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            body: None,
            headers: BTreeMap::new(),
            cookies: BTreeMap::new(),
        }
    }

    pub fn post(url: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            method: Method::Post,
            body: Some(data.into()),
            ..Self::get(url)
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }
}

/// A fully buffered HTTP response. Non-2xx statuses are ordinary responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub url: String,
    pub status: u16,
    pub reason: String,
    /// Lower-cased header names.
    pub headers: BTreeMap<String, String>,
    pub cookies: BTreeMap<String, String>,
    pub body: Bytes,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn content(&self) -> &Bytes {
        &self.body
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE.as_str()).map(String::as_str)
    }

    pub fn text(&self) -> Result<String, HttpError> {
        Ok(decode_body(&self.body, self.content_type())?.text)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        serde_json::from_slice(&self.body).map_err(|err| HttpError::Json(err.to_string()))
    }
}

#[async_trait::async_trait]
pub trait HttpClient: Send + Sync {
    async fn send(&self, request: Request) -> Result<Response, HttpError>;

    async fn get(&self, url: &str) -> Result<Response, HttpError> {
        self.send(Request::get(url)).await
    }

    async fn post(&self, url: &str, data: Vec<u8>) -> Result<Response, HttpError> {
        self.send(Request::post(url, data)).await
    }
}

#[derive(Debug)]
pub struct ReqwestClient {
    client: reqwest::Client,
    settings: RequestConfig,
    cache: Option<RequestCache>,
}

impl ReqwestClient {
    pub fn new(settings: RequestConfig) -> Result<Self, HttpError> {
        let mut builder = reqwest::Client::builder()
            .timeout(settings.timeout())
            .connect_timeout(settings.connect_timeout());
        if let Some(proxy) = &settings.proxy {
            let proxy = reqwest::Proxy::all(proxy.as_str())
                .map_err(|err| HttpError::Client(err.to_string()))?;
            builder = builder.proxy(proxy);
        }
        if let Some(agent) = &settings.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        let client = builder
            .build()
            .map_err(|err| HttpError::Client(err.to_string()))?;
        let cache = settings.cache.then(RequestCache::new);

        Ok(Self {
            client,
            settings,
            cache,
        })
    }

    /// Number of responses currently held by the request cache.
    pub fn cached_responses(&self) -> usize {
        self.cache.as_ref().map_or(0, RequestCache::len)
    }

    async fn send_once(&self, request: &Request) -> Result<Response, HttpError> {
        let mut builder = self
            .client
            .request(request.method.to_reqwest(), request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.cookies.is_empty() {
            builder = builder.header(COOKIE, cookie_header(&request.cookies));
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|err| map_reqwest_error(&request.url, err))?;

        let status = response.status();
        let url = response.url().to_string();
        let mut headers = BTreeMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers.insert(name.as_str().to_string(), value.to_string());
            }
        }
        let cookies = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(parse_set_cookie)
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|err| map_reqwest_error(&request.url, err))?;

        Ok(Response {
            url,
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            cookies,
            body,
        })
    }
}

#[async_trait::async_trait]
impl HttpClient for ReqwestClient {
    async fn send(&self, request: Request) -> Result<Response, HttpError> {
        let key = self.cache.as_ref().map(|_| RequestKey::of(&request));
        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            if let Some(hit) = cache.get(key) {
                engine_trace!("Cache hit for {} {}", request.method, request.url);
                return Ok(hit);
            }
        }

        let attempts = self.settings.retries.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.send_once(&request).await {
                Ok(response) => {
                    engine_debug!(
                        "{} {} -> {} (attempt {})",
                        request.method,
                        request.url,
                        response.status,
                        attempt
                    );
                    if let (Some(cache), Some(key)) = (&self.cache, key) {
                        cache.insert(key, response.clone());
                    }
                    return Ok(response);
                }
                Err(err) if err.is_retryable() && attempt < attempts => {
                    engine_warn!(
                        "Attempt {}/{} for {} failed: {}; retrying in {:?}",
                        attempt,
                        attempts,
                        request.url,
                        err,
                        self.settings.retry_delay()
                    );
                    tokio::time::sleep(self.settings.retry_delay()).await;
                }
                Err(err) if err.is_retryable() => {
                    return Err(HttpError::RetriesExhausted {
                        url: request.url.clone(),
                        attempts,
                        last: Box::new(err),
                    });
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn cookie_header(cookies: &BTreeMap<String, String>) -> String {
    cookies
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("; ")
}

fn parse_set_cookie(raw: &str) -> Option<(String, String)> {
    let pair = raw.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}

fn map_reqwest_error(url: &str, err: reqwest::Error) -> HttpError {
    if err.is_timeout() {
        return HttpError::Timeout {
            url: url.to_string(),
        };
    }
    if err.is_builder() {
        return HttpError::Client(err.to_string());
    }
    HttpError::Transport {
        url: url.to_string(),
        message: err.to_string(),
    }
}
