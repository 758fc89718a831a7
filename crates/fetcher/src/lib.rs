//! Core of mwfetch, a client for MediaWiki-style JSON APIs.
//!
//! The [`Fetcher`] issues GET and form POST calls through an injected
//! [`Transport`], performs the two-phase "fetch auth token, then write"
//! protocol, and tracks every in-flight request in a [`CancellationRegistry`]
//! so callers can cancel one request or all of them from any thread.
//!
//! ## Architectural Layer
//!
//! **Protocol logic + port definitions.** This crate has no HTTP client
//! dependency. It defines [`Transport`] and [`EndpointResolver`]; the
//! `http-transport` crate supplies the `reqwest`-backed implementations.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | [`CancellationKey`] |
//! | [`tokens`] | [`TokenKind`], [`Token`] |
//! | [`errors`] | [`RequestError`], [`ParameterError`], [`TransportError`] |
//! | [`ports`] | [`Transport`], [`EndpointResolver`] and the values crossing them |
//! | [`registry`] | [`CancellationRegistry`], [`InFlight`] |
//! | [`token_service`] | Token request parameters and response parsing |
//! | [`write_protocol`] | Token merging for tokenized writes |
//!
//! ## Example
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use fetcher::{Fetcher, Parameters, TokenKind, Transport, EndpointResolver};
//! # async fn demo(transport: Arc<dyn Transport>, endpoints: Arc<dyn EndpointResolver>) {
//! let fetcher = Fetcher::new(transport, endpoints);
//! let body = Parameters::from([
//!     ("action".to_string(), "edit".to_string()),
//!     ("title".to_string(), "Sandbox".to_string()),
//! ]);
//! let pending = fetcher.spawn_tokenized_post(TokenKind::Csrf, "en.wikipedia.org", body, None);
//! let key = pending.key().clone();
//! // From any thread: fetcher.cancel(&key);
//! let result = pending.wait().await;
//! # let _ = (key, result);
//! # }
//! ```

mod client;
pub mod errors;
pub mod identifiers;
pub mod ports;
pub mod registry;
pub mod token_service;
pub mod tokens;
pub mod write_protocol;

#[cfg(any(test, feature = "test-support"))]
pub mod mocks;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use client::{Fetcher, PendingRequest};
pub use errors::{BoxError, ParameterError, RequestError, TransportError};
pub use identifiers::CancellationKey;
pub use ports::{ApiResponse, EndpointResolver, JsonObject, Parameters, ResponseMeta, Transport};
pub use registry::{CancellationRegistry, InFlight};
pub use token_service::{parse_token, token_request_parameters};
pub use tokens::{ParseTokenKindError, Token, TokenKind, ANONYMOUS_TOKEN};
pub use write_protocol::merge_token;
