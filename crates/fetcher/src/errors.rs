//! Request error taxonomy.
//!
//! [`RequestError`] is the only error a [`Fetcher`](crate::Fetcher) operation
//! returns. Transport failures are wrapped in [`RequestError::Transport`] as
//! they arrive; the fetcher never reinterprets them. The one classification
//! made locally is a malformed token envelope, which becomes
//! [`RequestError::UnexpectedResponse`].

use thiserror::Error;

/// Boxed source error carried by [`TransportError`] variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// ---------------------------------------------------------------------------
// Request-level errors
// ---------------------------------------------------------------------------

/// Errors surfaced to callers of the fetcher.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The response did not have the expected JSON shape (including an empty
    /// token value).
    #[error("unexpected response from the API")]
    UnexpectedResponse,

    /// Caller-supplied parameters were rejected before any network call.
    #[error("invalid request parameters: {0}")]
    InvalidParameters(#[from] ParameterError),

    /// The server reported that nothing changed.
    ///
    /// Never produced by the fetcher itself; higher layers use it to tell a
    /// no-op write apart from a successful one.
    #[error("no new data")]
    NoNewData,

    /// The operation was aborted through the cancellation registry.
    #[error("request cancelled")]
    Cancelled,

    /// The transport failed to complete the exchange.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl RequestError {
    /// Returns `true` if the request was cancelled rather than failed.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RequestError::Cancelled)
    }
}

// ---------------------------------------------------------------------------
// Parameter validation
// ---------------------------------------------------------------------------

/// Why a request could not be built from the caller's inputs.
#[derive(Debug, Error)]
pub enum ParameterError {
    /// No host was given.
    #[error("host is empty")]
    MissingHost,

    /// The host is not a bare authority (contains a path, query or whitespace).
    #[error("invalid host '{0}'")]
    InvalidHost(String),

    /// A query or body parameter had an empty name.
    #[error("parameter name is empty")]
    EmptyParameterName,

    /// The resolved endpoint is not a valid URL.
    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

/// Failures reported by a [`Transport`](crate::Transport) implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The exchange did not finish within the transport's deadline.
    #[error("request timed out")]
    Timeout(#[source] BoxError),

    /// The connection could not be established or broke mid-exchange.
    #[error("connection failed")]
    Connection(#[source] BoxError),

    /// The server answered with a non-success HTTP status.
    #[error("server responded with HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// The body could not be decoded as a JSON object.
    #[error("response body is not a JSON object")]
    Decode(#[source] BoxError),
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn transport_errors_keep_their_source() {
        let inner: BoxError = "socket closed".into();
        let err = RequestError::from(TransportError::Connection(inner));

        let transport = err.source().expect("transport source");
        assert_eq!(transport.to_string(), "connection failed");
        assert_eq!(transport.source().unwrap().to_string(), "socket closed");
    }

    #[test]
    fn only_cancelled_reports_cancelled() {
        assert!(RequestError::Cancelled.is_cancelled());
        assert!(!RequestError::NoNewData.is_cancelled());
        assert!(!RequestError::UnexpectedResponse.is_cancelled());
    }

    #[test]
    fn parameter_errors_render_their_reason() {
        let err = RequestError::from(ParameterError::InvalidHost("a/b".into()));
        assert_eq!(err.to_string(), "invalid request parameters: invalid host 'a/b'");
    }
}
