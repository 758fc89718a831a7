//! Scripted doubles for unit testing without a network.
//!
//! Enabled with the `test-support` feature:
//!
//! ```toml
//! [dev-dependencies]
//! fetcher = { path = "...", features = ["test-support"] }
//! ```

use std::collections::VecDeque;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;
use url::Url;

use crate::{
    ApiResponse, EndpointResolver, JsonObject, ParameterError, Parameters, TokenKind, Transport,
    TransportError,
};

// ── Replies ──────────────────────────────────────────────────────────────────

/// What the [`MockTransport`] answers to the next call.
#[derive(Debug)]
pub enum Reply {
    /// Succeed with this body and status 200.
    Json(JsonObject),
    /// Fail with this error.
    Error(TransportError),
    /// Never complete; the exchange only ends when the fetcher drops it.
    Hang,
}

impl Reply {
    /// Succeeds with `value`, which must be a JSON object.
    pub fn json(value: Value) -> Self {
        Reply::Json(json_object(value))
    }

    /// Succeeds with a token-query envelope carrying `value`.
    pub fn token(kind: TokenKind, value: &str) -> Self {
        let mut tokens = JsonObject::new();
        tokens.insert(kind.response_field(), Value::String(value.to_string()));
        Reply::json(serde_json::json!({ "query": { "tokens": tokens } }))
    }
}

/// Unwraps a JSON object, panicking on any other value.
pub fn json_object(value: Value) -> JsonObject {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

// ── MockTransport ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One exchange the fetcher asked the transport to perform.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub url: Url,
    /// Form body for POSTs; `None` for GETs.
    pub body: Option<Parameters>,
}

impl RecordedCall {
    /// Looks up a query parameter on the request URL.
    pub fn query(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }
}

/// Transport that answers from a FIFO script and records every call.
///
/// When the script runs dry, calls fail with [`TransportError::Connection`].
#[derive(Clone)]
pub struct MockTransport {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    call_count: Arc<watch::Sender<usize>>,
    abandoned: Arc<AtomicUsize>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(watch::Sender::new(0)),
            abandoned: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport with `replies` queued in order.
    pub fn with_replies(replies: impl IntoIterator<Item = Reply>) -> Self {
        let transport = Self::new();
        for reply in replies {
            transport.push(reply);
        }
        transport
    }

    pub fn push(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Calls made with `method`.
    pub fn calls_with(&self, method: Method) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.method == method)
            .collect()
    }

    /// Number of hanging exchanges the fetcher dropped before completion.
    pub fn abandoned(&self) -> usize {
        self.abandoned.load(Ordering::SeqCst)
    }

    /// Resolves once at least `count` calls have reached the transport.
    pub async fn wait_for_calls(&self, count: usize) {
        let mut rx = self.call_count.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|seen| *seen >= count).await;
    }

    async fn exchange(&self, call: RecordedCall) -> Result<ApiResponse, TransportError> {
        let reply = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(call);
            self.call_count.send_replace(calls.len());
            self.replies.lock().unwrap().pop_front()
        };
        match reply {
            Some(Reply::Json(json)) => Ok(ApiResponse::ok(json)),
            Some(Reply::Error(error)) => Err(error),
            Some(Reply::Hang) => {
                let _guard = AbandonGuard(Arc::clone(&self.abandoned));
                std::future::pending().await
            }
            None => Err(TransportError::Connection("no scripted reply".into())),
        }
    }
}

struct AbandonGuard(Arc<AtomicUsize>);

impl Drop for AbandonGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, url: Url) -> Result<ApiResponse, TransportError> {
        self.exchange(RecordedCall {
            method: Method::Get,
            url,
            body: None,
        })
        .await
    }

    async fn post_form(&self, url: Url, body: &Parameters) -> Result<ApiResponse, TransportError> {
        self.exchange(RecordedCall {
            method: Method::Post,
            url,
            body: Some(body.clone()),
        })
        .await
    }
}

// ── StaticEndpoints ──────────────────────────────────────────────────────────

/// Resolves every host to `https://<host>/w/api.php`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticEndpoints;

impl EndpointResolver for StaticEndpoints {
    fn resolve(&self, host: &str, query: Option<&Parameters>) -> Result<Url, ParameterError> {
        if host.is_empty() {
            return Err(ParameterError::MissingHost);
        }
        let mut url = Url::parse(&format!("https://{host}/w/api.php"))?;
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            url.query_pairs_mut().extend_pairs(query.iter());
        }
        Ok(url)
    }
}
