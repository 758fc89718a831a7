//! Authorization token types.
//!
//! MediaWiki gates every write behind a short-lived token fetched with
//! `action=query&meta=tokens`. The kind of token decides both the `type` value
//! sent when requesting it and the body parameter it travels in afterwards.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Token value the API hands out to sessions that are not logged in.
pub const ANONYMOUS_TOKEN: &str = "+\\";

// ---------------------------------------------------------------------------
// Token kinds
// ---------------------------------------------------------------------------

/// The kind of authorization token to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Cross-site request forgery token; required by most write actions.
    #[default]
    Csrf,
    /// Token for `action=login` / `action=clientlogin`.
    Login,
    /// Token for `action=createaccount`.
    CreateAccount,
}

impl TokenKind {
    /// All kinds, in declaration order.
    pub const ALL: [TokenKind; 3] = [TokenKind::Csrf, TokenKind::Login, TokenKind::CreateAccount];

    // (api type, body parameter name)
    const fn strings(self) -> (&'static str, &'static str) {
        match self {
            TokenKind::Csrf => ("csrf", "token"),
            TokenKind::Login => ("login", "logintoken"),
            TokenKind::CreateAccount => ("createaccount", "createtoken"),
        }
    }

    /// The `type` value sent when requesting this token.
    pub const fn api_type(self) -> &'static str {
        self.strings().0
    }

    /// The POST body parameter the token is submitted under.
    pub const fn parameter_name(self) -> &'static str {
        self.strings().1
    }

    /// The field under `query.tokens` that carries the token in the response.
    pub fn response_field(self) -> String {
        format!("{}token", self.api_type())
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.api_type())
    }
}

/// Returned when a string names no known [`TokenKind`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown token kind '{0}' (expected csrf, login or createaccount)")]
pub struct ParseTokenKindError(String);

impl std::str::FromStr for TokenKind {
    type Err = ParseTokenKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TokenKind::ALL
            .into_iter()
            .find(|kind| kind.api_type().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseTokenKindError(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

/// A fetched authorization token.
///
/// Immutable once built and never persisted; each tokenized write fetches its
/// own. `Debug` output omits the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    value: String,
    kind: TokenKind,
    is_authorized: bool,
}

impl Token {
    /// Creates a token, returning `None` if `value` is empty.
    pub fn new(value: impl Into<String>, kind: TokenKind) -> Option<Self> {
        let value = value.into();
        if value.is_empty() {
            return None;
        }
        let is_authorized = value != ANONYMOUS_TOKEN;
        Some(Self {
            value,
            kind,
            is_authorized,
        })
    }

    /// The secret token value.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    /// `false` when the API issued the anonymous placeholder token.
    pub fn is_authorized(&self) -> bool {
        self.is_authorized
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("value", &"<redacted>")
            .field("kind", &self.kind)
            .field("is_authorized", &self.is_authorized)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_strings_match_the_api() {
        assert_eq!(TokenKind::Csrf.api_type(), "csrf");
        assert_eq!(TokenKind::Csrf.parameter_name(), "token");
        assert_eq!(TokenKind::Login.api_type(), "login");
        assert_eq!(TokenKind::Login.parameter_name(), "logintoken");
        assert_eq!(TokenKind::CreateAccount.api_type(), "createaccount");
        assert_eq!(TokenKind::CreateAccount.parameter_name(), "createtoken");
        assert_eq!(TokenKind::CreateAccount.response_field(), "createaccounttoken");
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("LOGIN".parse::<TokenKind>().unwrap(), TokenKind::Login);
        assert_eq!("createaccount".parse::<TokenKind>().unwrap(), TokenKind::CreateAccount);
        assert!("watch".parse::<TokenKind>().is_err());
    }

    #[test]
    fn kind_serialises_as_api_type() {
        let json = serde_json::to_string(&TokenKind::CreateAccount).unwrap();
        assert_eq!(json, "\"createaccount\"");
    }

    #[test]
    fn anonymous_token_is_not_authorized() {
        let anon = Token::new(ANONYMOUS_TOKEN, TokenKind::Csrf).unwrap();
        assert!(!anon.is_authorized());

        let real = Token::new("abc123+\\", TokenKind::Csrf).unwrap();
        assert!(real.is_authorized());
    }

    #[test]
    fn empty_token_is_rejected() {
        assert!(Token::new("", TokenKind::Login).is_none());
    }

    #[test]
    fn debug_hides_the_value() {
        let token = Token::new("s3cr3t", TokenKind::Csrf).unwrap();
        let rendered = format!("{token:?}");
        assert!(!rendered.contains("s3cr3t"));
        assert!(rendered.contains("redacted"));
    }
}
