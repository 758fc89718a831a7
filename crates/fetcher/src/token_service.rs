//! Auth-token acquisition.
//!
//! Tokens are read with `action=query&meta=tokens&type=<kind>&format=json` and
//! come back as `{"query": {"tokens": {"<kind>token": "<value>"}}}`.

use tracing::{debug, instrument};

use crate::client::TrackedCall;
use crate::{
    CancellationKey, Fetcher, JsonObject, Parameters, RequestError, Token, TokenKind,
};

/// The fixed query parameters that request a token of `kind`.
pub fn token_request_parameters(kind: TokenKind) -> Parameters {
    [
        ("action", "query"),
        ("meta", "tokens"),
        ("type", kind.api_type()),
        ("format", "json"),
    ]
    .into_iter()
    .map(|(name, value)| (name.to_string(), value.to_string()))
    .collect()
}

/// Extracts the `kind` token from a token-query response.
///
/// A missing path, a non-string value, or an empty string is
/// [`RequestError::UnexpectedResponse`].
pub fn parse_token(json: &JsonObject, kind: TokenKind) -> Result<Token, RequestError> {
    json.get("query")
        .and_then(|query| query.get("tokens"))
        .and_then(|tokens| tokens.get(kind.response_field()))
        .and_then(serde_json::Value::as_str)
        .and_then(|value| Token::new(value, kind))
        .ok_or(RequestError::UnexpectedResponse)
}

impl Fetcher {
    /// Requests a fresh authorization token of `kind` from `host`.
    ///
    /// The request is registered under `cancellation_key` (generated when
    /// `None`) for as long as it runs.
    #[instrument(skip(self, cancellation_key), fields(key = tracing::field::Empty))]
    pub async fn request_auth_token(
        &self,
        host: &str,
        kind: TokenKind,
        cancellation_key: Option<CancellationKey>,
    ) -> Result<Token, RequestError> {
        let call = self.begin(cancellation_key);
        tracing::Span::current().record("key", call.key().as_str());
        self.fetch_token(&call, host, kind).await
    }

    /// Token fetch within an already-registered call.
    pub(crate) async fn fetch_token(
        &self,
        call: &TrackedCall,
        host: &str,
        kind: TokenKind,
    ) -> Result<Token, RequestError> {
        let response = self
            .perform_get(call, host, &token_request_parameters(kind))
            .await?;
        let token = parse_token(&response.json, kind)?;
        debug!(
            key = %call.key(),
            %kind,
            authorized = token.is_authorized(),
            "acquired auth token"
        );
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object(value: serde_json::Value) -> JsonObject {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("expected an object, got {other}"),
        }
    }

    #[test]
    fn request_parameters_are_fixed() {
        let params = token_request_parameters(TokenKind::Login);
        assert_eq!(params.len(), 4);
        assert_eq!(params["action"], "query");
        assert_eq!(params["meta"], "tokens");
        assert_eq!(params["type"], "login");
        assert_eq!(params["format"], "json");
    }

    #[test]
    fn parses_a_csrf_token() {
        let json = object(json!({"query": {"tokens": {"csrftoken": "abc123"}}}));
        let token = parse_token(&json, TokenKind::Csrf).unwrap();
        assert_eq!(token.value(), "abc123");
        assert_eq!(token.kind(), TokenKind::Csrf);
        assert!(token.is_authorized());
    }

    #[test]
    fn anonymous_token_parses_as_unauthorized() {
        let json = object(json!({"query": {"tokens": {"csrftoken": "+\\"}}}));
        assert!(!parse_token(&json, TokenKind::Csrf).unwrap().is_authorized());
    }

    #[test]
    fn malformed_envelopes_are_unexpected() {
        let cases = [
            json!({"query": {"tokens": {"csrftoken": ""}}}),
            json!({"query": {"tokens": {"csrftoken": 42}}}),
            json!({"query": {"tokens": {"logintoken": "abc"}}}),
            json!({"query": {"tokens": "abc"}}),
            json!({"batchcomplete": ""}),
        ];
        for case in cases {
            let result = parse_token(&object(case.clone()), TokenKind::Csrf);
            assert!(
                matches!(result, Err(RequestError::UnexpectedResponse)),
                "{case} should be rejected"
            );
        }
    }
}
