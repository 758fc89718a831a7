//! Tokenized writes: fetch a token, then POST with it.
//!
//! Both phases run under one [`CancellationKey`] and one registry entry, so a
//! single cancel aborts whichever phase is active and the caller never needs to
//! know which one that is. The write never starts unless the token fetch
//! succeeded and the call is still live.

use tracing::{debug, instrument};

use crate::client::{PendingRequest, TrackedCall};
use crate::{ApiResponse, CancellationKey, Fetcher, Parameters, RequestError, Token, TokenKind};

/// Returns `body` with `token` added under its kind's parameter name.
///
/// A caller-supplied value under the same name is replaced.
pub fn merge_token(mut body: Parameters, token: &Token) -> Parameters {
    body.insert(
        token.kind().parameter_name().to_string(),
        token.value().to_string(),
    );
    body
}

impl Fetcher {
    /// Fetches a `kind` token from `host` and POSTs `body` with it.
    ///
    /// Token-phase errors are returned as they are and no write is made.
    /// Write-phase results are returned verbatim.
    #[instrument(skip(self, body, cancellation_key), fields(key = tracing::field::Empty))]
    pub async fn tokenized_post(
        &self,
        kind: TokenKind,
        host: &str,
        body: Parameters,
        cancellation_key: Option<CancellationKey>,
    ) -> Result<ApiResponse, RequestError> {
        let call = self.begin(cancellation_key);
        tracing::Span::current().record("key", call.key().as_str());
        self.perform_tokenized_post(&call, kind, host, body).await
    }

    /// Starts [`Fetcher::tokenized_post`] on the runtime and returns its key
    /// immediately.
    ///
    /// The key is registered before this returns, so cancelling it right away
    /// stops the token fetch and guarantees no write is issued.
    pub fn spawn_tokenized_post(
        &self,
        kind: TokenKind,
        host: impl Into<String>,
        body: Parameters,
        cancellation_key: Option<CancellationKey>,
    ) -> PendingRequest<ApiResponse> {
        let host = host.into();
        self.spawn_tracked(cancellation_key, move |fetcher, call| async move {
            fetcher
                .perform_tokenized_post(&call, kind, &host, body)
                .await
        })
    }

    async fn perform_tokenized_post(
        &self,
        call: &TrackedCall,
        kind: TokenKind,
        host: &str,
        body: Parameters,
    ) -> Result<ApiResponse, RequestError> {
        debug!(key = %call.key(), %kind, "requesting token");
        let token = match self.fetch_token(call, host, kind).await {
            Ok(token) => token,
            Err(error) => {
                debug!(key = %call.key(), %error, "token request failed; write skipped");
                return Err(error);
            }
        };

        // A cancel landing between the phases must not let the write through.
        if call.is_cancelled() {
            return Err(RequestError::Cancelled);
        }

        debug!(key = %call.key(), %kind, "performing write");
        let body = merge_token(body, &token);
        self.perform_post(call, host, &body).await
    }
}
