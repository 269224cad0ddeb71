//! HTTP client abstraction used by the transport layer.
//!
//! A trait object keeps the transport testable offline: production code
//! uses [`ReqwestHttpClient`], deterministic tests use [`NoopHttpClient`]
//! or [`QueueHttpClient`].

use std::collections::{BTreeMap, VecDeque};
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

/// Minimal method set needed by the dashboard REST surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Outgoing request envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
    pub timeout_ms: u64,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
            timeout_ms: 10_000,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// Response envelope. `body` is always text; a failed body read is
/// substituted with an empty string so status diagnostics survive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok_json(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn with_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Transport-level failure (endpoint unreachable, timeout, TLS, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    message: String,
}

impl HttpError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for HttpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HttpError {}

/// Transport contract with async execution via boxed futures.
pub trait HttpClient: Send + Sync {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>>;
}

/// Default no-op client for deterministic offline behavior: every call
/// succeeds with an empty JSON object, which normalizers reject, which in
/// turn exercises the fallback path.
#[derive(Debug, Default)]
pub struct NoopHttpClient;

impl HttpClient for NoopHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        let _ = request;
        Box::pin(async move { Ok(HttpResponse::ok_json("{}")) })
    }
}

/// One scripted exchange for [`QueueHttpClient`]. The optional delay lets
/// tests stage out-of-order completions.
#[derive(Debug, Clone)]
pub struct ScriptedExchange {
    pub delay_ms: u64,
    pub result: Result<HttpResponse, HttpError>,
}

impl ScriptedExchange {
    pub fn reply(response: HttpResponse) -> Self {
        Self {
            delay_ms: 0,
            result: Ok(response),
        }
    }

    pub fn reply_after(delay_ms: u64, response: HttpResponse) -> Self {
        Self {
            delay_ms,
            result: Ok(response),
        }
    }

    pub fn fail(error: HttpError) -> Self {
        Self {
            delay_ms: 0,
            result: Err(error),
        }
    }
}

/// Scriptable client that replays queued exchanges in order and records
/// every request it sees. An exhausted queue reports a network failure.
#[derive(Debug, Default)]
pub struct QueueHttpClient {
    queue: Mutex<VecDeque<ScriptedExchange>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl QueueHttpClient {
    pub fn new(exchanges: impl IntoIterator<Item = ScriptedExchange>) -> Self {
        Self {
            queue: Mutex::new(exchanges.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, exchange: ScriptedExchange) {
        self.queue
            .lock()
            .expect("exchange queue is not poisoned")
            .push_back(exchange);
    }

    pub fn recorded_requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .expect("request store is not poisoned")
            .clone()
    }
}

impl HttpClient for QueueHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        self.requests
            .lock()
            .expect("request store is not poisoned")
            .push(request);
        let next = self
            .queue
            .lock()
            .expect("exchange queue is not poisoned")
            .pop_front();
        Box::pin(async move {
            match next {
                Some(exchange) => {
                    if exchange.delay_ms > 0 {
                        tokio::time::sleep(std::time::Duration::from_millis(exchange.delay_ms))
                            .await;
                    }
                    exchange.result
                }
                None => Err(HttpError::new("scripted exchange queue exhausted")),
            }
        })
    }
}

/// Production client backed by reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Arc<reqwest::Client>,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self {
            client: Arc::new(
                reqwest::Client::builder()
                    .user_agent("advisordeck/0.1.0")
                    .build()
                    .unwrap_or_else(|_| reqwest::Client::new()),
            ),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for ReqwestHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move {
            let mut builder = match request.method {
                HttpMethod::Get => self.client.get(&request.url),
                HttpMethod::Post => self.client.post(&request.url),
            };

            for (name, value) in &request.headers {
                builder = builder.header(name, value);
            }

            builder = builder.timeout(std::time::Duration::from_millis(request.timeout_ms));

            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let response = builder.send().await.map_err(|e| {
                if e.is_timeout() {
                    HttpError::new(format!("request timeout: {e}"))
                } else if e.is_connect() {
                    HttpError::new(format!("connection failed: {e}"))
                } else {
                    HttpError::new(format!("request failed: {e}"))
                }
            })?;

            let status = response.status().as_u16();
            // Keep the status even when the body cannot be read.
            let body = response.text().await.unwrap_or_default();

            Ok(HttpResponse { status, body })
        })
    }
}
