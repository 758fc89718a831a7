//! `reqwest`-backed [`Transport`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use fetcher::{ApiResponse, Parameters, ResponseMeta, Transport, TransportError};
use reqwest::{header, Client, RequestBuilder, Response};
use tracing::{debug, trace};
use url::Url;

use crate::HttpConfig;

/// Performs API exchanges over HTTP(S) with a shared [`reqwest::Client`].
///
/// The client keeps a cookie store, so the session cookie set while fetching a
/// token is sent back with the write that uses it. Dropping an exchange future
/// aborts the underlying request.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Builds a client from `config`.
    pub fn new(config: &HttpConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .cookie_store(true)
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .build()?;
        Ok(Self { client })
    }

    /// Wraps an already-configured client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    async fn exchange(&self, request: RequestBuilder) -> Result<ApiResponse, TransportError> {
        let response = request
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(classify)?;
        decode(response).await
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: Url) -> Result<ApiResponse, TransportError> {
        trace!(%url, "sending GET");
        self.exchange(self.client.get(url)).await
    }

    async fn post_form(&self, url: Url, body: &Parameters) -> Result<ApiResponse, TransportError> {
        trace!(%url, params = body.len(), "sending form POST");
        self.exchange(self.client.post(url).form(body)).await
    }
}

async fn decode(response: Response) -> Result<ApiResponse, TransportError> {
    let status = response.status();
    if !status.is_success() {
        debug!(status = status.as_u16(), "non-success response");
        return Err(TransportError::Status {
            status: status.as_u16(),
        });
    }

    let headers: BTreeMap<String, String> = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    let bytes = response.bytes().await.map_err(classify)?;
    let json = match serde_json::from_slice::<serde_json::Value>(&bytes) {
        Ok(serde_json::Value::Object(map)) => map,
        Ok(other) => {
            return Err(TransportError::Decode(
                format!("expected a JSON object, got {}", json_kind(&other)).into(),
            ))
        }
        Err(error) => return Err(TransportError::Decode(Box::new(error))),
    };

    Ok(ApiResponse {
        json,
        meta: ResponseMeta {
            status: status.as_u16(),
            headers,
        },
    })
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

fn classify(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(Box::new(error))
    } else if error.is_decode() {
        TransportError::Decode(Box::new(error))
    } else {
        TransportError::Connection(Box::new(error))
    }
}
