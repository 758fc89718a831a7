//! mwfetch HTTP adapter.
//!
//! Implements the [`fetcher::Transport`] and [`fetcher::EndpointResolver`]
//! ports over HTTP(S):
//!
//! - [`ReqwestTransport`] performs GET and form-encoded POST exchanges and
//!   decodes the JSON object body.
//! - [`MediaWikiEndpoints`] maps a host to `<scheme>://<host><api_path>`.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Client construction, timeouts, cookies, status handling
//! and body decoding all live here. The [`fetcher`] crate sees only the port
//! traits and [`fetcher::TransportError`].

pub mod config;
pub mod endpoints;
pub mod transport;

pub use config::{ConfigError, HttpConfig};
pub use endpoints::MediaWikiEndpoints;
pub use transport::ReqwestTransport;
