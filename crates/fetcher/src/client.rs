//! The [`Fetcher`] façade: plain GET/POST, cancellation, and the plumbing
//! shared by the token and tokenized-write paths.
//!
//! Every operation runs inside a [`TrackedCall`]. The call registers a
//! [`CancellationToken`] under its key before touching the transport and
//! releases it when dropped, so the key leaves the registry on every exit path:
//! success, error, cancellation, or the caller abandoning the future.

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::ports::validate_parameters;
use crate::registry::InFlight;
use crate::{
    ApiResponse, CancellationKey, CancellationRegistry, EndpointResolver, Parameters,
    RequestError, Transport, TransportError,
};

/// Client for a MediaWiki-style JSON API.
///
/// Cheap to clone; clones share the transport, the resolver and the
/// [`CancellationRegistry`], so a key issued by one clone can be cancelled
/// through another.
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    endpoints: Arc<dyn EndpointResolver>,
    registry: Arc<CancellationRegistry>,
}

impl Fetcher {
    /// Creates a fetcher with its own empty registry.
    pub fn new(transport: Arc<dyn Transport>, endpoints: Arc<dyn EndpointResolver>) -> Self {
        Self::with_registry(transport, endpoints, Arc::new(CancellationRegistry::new()))
    }

    /// Creates a fetcher that tracks requests in an existing registry.
    pub fn with_registry(
        transport: Arc<dyn Transport>,
        endpoints: Arc<dyn EndpointResolver>,
        registry: Arc<CancellationRegistry>,
    ) -> Self {
        Self {
            transport,
            endpoints,
            registry,
        }
    }

    pub fn registry(&self) -> &Arc<CancellationRegistry> {
        &self.registry
    }

    // -----------------------------------------------------------------------
    // Plain requests
    // -----------------------------------------------------------------------

    /// Performs an API GET with `query` appended to the endpoint URL.
    #[instrument(skip(self, query, cancellation_key), fields(key = tracing::field::Empty))]
    pub async fn get(
        &self,
        host: &str,
        query: &Parameters,
        cancellation_key: Option<CancellationKey>,
    ) -> Result<ApiResponse, RequestError> {
        let call = self.begin(cancellation_key);
        tracing::Span::current().record("key", call.key().as_str());
        self.perform_get(&call, host, query).await
    }

    /// Performs a form-encoded API POST without a token.
    #[instrument(skip(self, body, cancellation_key), fields(key = tracing::field::Empty))]
    pub async fn post(
        &self,
        host: &str,
        body: &Parameters,
        cancellation_key: Option<CancellationKey>,
    ) -> Result<ApiResponse, RequestError> {
        let call = self.begin(cancellation_key);
        tracing::Span::current().record("key", call.key().as_str());
        self.perform_post(&call, host, body).await
    }

    /// Starts [`Fetcher::get`] on the runtime and returns its key immediately.
    ///
    /// The request is cancellable as soon as this returns.
    pub fn spawn_get(
        &self,
        host: impl Into<String>,
        query: Parameters,
        cancellation_key: Option<CancellationKey>,
    ) -> PendingRequest<ApiResponse> {
        let host = host.into();
        self.spawn_tracked(cancellation_key, move |fetcher, call| async move {
            fetcher.perform_get(&call, &host, &query).await
        })
    }

    /// Starts [`Fetcher::post`] on the runtime and returns its key immediately.
    pub fn spawn_post(
        &self,
        host: impl Into<String>,
        body: Parameters,
        cancellation_key: Option<CancellationKey>,
    ) -> PendingRequest<ApiResponse> {
        let host = host.into();
        self.spawn_tracked(cancellation_key, move |fetcher, call| async move {
            fetcher.perform_post(&call, &host, &body).await
        })
    }

    // -----------------------------------------------------------------------
    // Cancellation
    // -----------------------------------------------------------------------

    /// Cancels the request registered under `key`.
    ///
    /// Unknown or already-finished keys are ignored; returns whether a request
    /// was cancelled.
    pub fn cancel(&self, key: &CancellationKey) -> bool {
        self.registry.cancel(key)
    }

    /// Cancels every in-flight request and returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        self.registry.cancel_all()
    }

    // -----------------------------------------------------------------------
    // Shared plumbing
    // -----------------------------------------------------------------------

    /// Resolves or generates the key and registers a fresh handle under it.
    pub(crate) fn begin(&self, cancellation_key: Option<CancellationKey>) -> TrackedCall {
        TrackedCall::start(
            Arc::clone(&self.registry),
            CancellationKey::or_generate(cancellation_key),
        )
    }

    /// Registers synchronously, then drives `operation` on a spawned task.
    pub(crate) fn spawn_tracked<T, F, Fut>(
        &self,
        cancellation_key: Option<CancellationKey>,
        operation: F,
    ) -> PendingRequest<T>
    where
        T: Send + 'static,
        F: FnOnce(Fetcher, TrackedCall) -> Fut,
        Fut: Future<Output = Result<T, RequestError>> + Send + 'static,
    {
        let call = self.begin(cancellation_key);
        let key = call.key().clone();
        let task = tokio::spawn(operation(self.clone(), call));
        PendingRequest { key, task }
    }

    pub(crate) async fn perform_get(
        &self,
        call: &TrackedCall,
        host: &str,
        query: &Parameters,
    ) -> Result<ApiResponse, RequestError> {
        validate_parameters(query)?;
        let url = self.endpoints.resolve(host, Some(query))?;
        debug!(key = %call.key(), %url, "GET");
        call.run(self.transport.get(url)).await
    }

    pub(crate) async fn perform_post(
        &self,
        call: &TrackedCall,
        host: &str,
        body: &Parameters,
    ) -> Result<ApiResponse, RequestError> {
        validate_parameters(body)?;
        let url = self.endpoints.resolve(host, None)?;
        debug!(key = %call.key(), %url, params = body.len(), "POST");
        call.run(self.transport.post_form(url, body)).await
    }
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tracked calls
// ---------------------------------------------------------------------------

/// One logical operation's registration in the [`CancellationRegistry`].
///
/// Released exactly once, on drop.
pub(crate) struct TrackedCall {
    registry: Arc<CancellationRegistry>,
    key: CancellationKey,
    token: CancellationToken,
    handle: Arc<dyn InFlight>,
}

impl TrackedCall {
    fn start(registry: Arc<CancellationRegistry>, key: CancellationKey) -> Self {
        let token = CancellationToken::new();
        let handle: Arc<dyn InFlight> = Arc::new(token.clone());
        registry.track(key.clone(), Some(Arc::clone(&handle)));
        Self {
            registry,
            key,
            token,
            handle,
        }
    }

    pub(crate) fn key(&self) -> &CancellationKey {
        &self.key
    }

    /// Drives `exchange` unless the call is cancelled first.
    ///
    /// Cancellation wins ties: once cancelled, a transport result arriving in
    /// the same instant is discarded and the exchange future is dropped.
    pub(crate) async fn run<T, F>(&self, exchange: F) -> Result<T, RequestError>
    where
        F: Future<Output = Result<T, TransportError>>,
    {
        if self.token.is_cancelled() {
            return Err(RequestError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.token.cancelled() => {
                debug!(key = %self.key, "request aborted");
                Err(RequestError::Cancelled)
            }
            result = exchange => result.map_err(RequestError::from),
        }
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for TrackedCall {
    fn drop(&mut self) {
        self.registry.release(&self.key, &self.handle);
    }
}

// ---------------------------------------------------------------------------
// Pending requests
// ---------------------------------------------------------------------------

/// A request running on the tokio runtime.
///
/// Carries the [`CancellationKey`] the request was registered under; pass it to
/// [`Fetcher::cancel`] to abort. Dropping a `PendingRequest` does not cancel
/// the request.
#[derive(Debug)]
pub struct PendingRequest<T> {
    key: CancellationKey,
    task: JoinHandle<Result<T, RequestError>>,
}

impl<T> PendingRequest<T> {
    pub fn key(&self) -> &CancellationKey {
        &self.key
    }

    /// Waits for the request to finish.
    ///
    /// A panic inside the request task is resumed on the caller. A task torn
    /// down by runtime shutdown reports [`RequestError::Cancelled`].
    pub async fn wait(self) -> Result<T, RequestError> {
        match self.task.await {
            Ok(result) => result,
            Err(join_error) if join_error.is_panic() => {
                std::panic::resume_unwind(join_error.into_panic())
            }
            Err(join_error) => {
                warn!(key = %self.key, error = %join_error, "request task did not complete");
                Err(RequestError::Cancelled)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tracked_call_releases_on_drop() {
        let registry = Arc::new(CancellationRegistry::new());
        let key = CancellationKey::new("k").unwrap();
        let call = TrackedCall::start(Arc::clone(&registry), key.clone());
        assert!(registry.contains(&key));

        drop(call);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn cancelled_call_reports_cancelled_instead_of_the_exchange_result() {
        let registry = Arc::new(CancellationRegistry::new());
        let key = CancellationKey::new("k").unwrap();
        let call = TrackedCall::start(Arc::clone(&registry), key.clone());
        registry.cancel(&key);

        let result: Result<(), _> = call
            .run(async { Err::<(), _>(TransportError::Status { status: 500 }) })
            .await;
        assert!(matches!(result, Err(RequestError::Cancelled)));
        assert!(call.is_cancelled());
    }

    #[tokio::test]
    async fn transport_errors_are_wrapped() {
        let registry = Arc::new(CancellationRegistry::new());
        let call = TrackedCall::start(registry, CancellationKey::generate());

        let result: Result<(), _> = call
            .run(async { Err::<(), _>(TransportError::Status { status: 502 }) })
            .await;
        assert!(matches!(
            result,
            Err(RequestError::Transport(TransportError::Status { status: 502 }))
        ));
    }
}
