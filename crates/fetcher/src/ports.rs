//! Port traits and the values that cross them.
//!
//! The fetcher owns no network code. It consumes an [`EndpointResolver`] to turn
//! a logical host into a URL and a [`Transport`] to perform one HTTP exchange.
//! Infrastructure crates implement both; tests use the doubles in
//! [`crate::mocks`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use url::Url;

use crate::{ParameterError, TransportError};

/// Query or form-body parameters, ordered by name.
pub type Parameters = BTreeMap<String, String>;

/// A decoded top-level JSON object.
pub type JsonObject = serde_json::Map<String, serde_json::Value>;

/// Metadata of the HTTP response that produced an [`ApiResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResponseMeta {
    /// HTTP status code.
    pub status: u16,
    /// Response headers, names lowercased.
    pub headers: BTreeMap<String, String>,
}

/// A successful API exchange: the JSON body plus response metadata.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ApiResponse {
    pub json: JsonObject,
    pub meta: ResponseMeta,
}

impl ApiResponse {
    /// Builds a response with status 200 and no headers.
    pub fn ok(json: JsonObject) -> Self {
        Self {
            json,
            meta: ResponseMeta {
                status: 200,
                headers: BTreeMap::new(),
            },
        }
    }
}

/// Maps a logical host and optional query parameters to a request URL.
///
/// Implementations must be deterministic and free of I/O.
pub trait EndpointResolver: Send + Sync {
    fn resolve(&self, host: &str, query: Option<&Parameters>) -> Result<Url, ParameterError>;
}

/// Performs a single HTTP exchange.
///
/// Dropping a returned future must abort the exchange; that is how the fetcher
/// cancels in-flight work. Timeouts belong to the implementation and surface as
/// [`TransportError::Timeout`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `url` and decode the JSON object body.
    async fn get(&self, url: Url) -> Result<ApiResponse, TransportError>;

    /// POST `body` form-encoded to `url` and decode the JSON object body.
    async fn post_form(&self, url: Url, body: &Parameters) -> Result<ApiResponse, TransportError>;
}

/// Rejects parameter sets that contain an empty name.
pub(crate) fn validate_parameters(parameters: &Parameters) -> Result<(), ParameterError> {
    if parameters.keys().any(String::is_empty) {
        return Err(ParameterError::EmptyParameterName);
    }
    Ok(())
}
