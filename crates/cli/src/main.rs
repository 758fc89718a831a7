//! mwfetch CLI entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse configuration**: command line via `clap`, HTTP settings from
//!    `MWFETCH_*` environment variables ([`HttpConfig::from_env`]).
//! 2. **Wire observability**: `tracing-subscriber` with an `EnvFilter`
//!    (`RUST_LOG`, default `info`) writing to stderr, as text or JSON.
//! 3. **Construct infrastructure**: a [`ReqwestTransport`] and
//!    [`MediaWikiEndpoints`] injected into a [`Fetcher`].
//! 4. **Dispatch**: run one command and print the JSON result to stdout.
//!    Ctrl-C cancels every in-flight request through [`Fetcher::cancel_all`].

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fetcher::{ApiResponse, Fetcher, Parameters, TokenKind};
use http_transport::{HttpConfig, MediaWikiEndpoints, ReqwestTransport};
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Client for MediaWiki-style JSON APIs")]
struct Cli {
    /// Wiki host to talk to
    #[arg(long, env = "MWFETCH_HOST", default_value = "en.wikipedia.org")]
    host: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch an auth token and report whether the session is authorized
    Token {
        #[arg(long, default_value_t = TokenKind::Csrf)]
        kind: TokenKind,
    },

    /// Perform an API GET
    Get {
        /// Query parameter as name=value (repeatable)
        #[arg(short = 'p', long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },

    /// Perform an API POST without a token
    Post {
        /// Body parameter as name=value (repeatable)
        #[arg(short = 'p', long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },

    /// Fetch a token, then POST with it
    Write {
        #[arg(long, default_value_t = TokenKind::Csrf)]
        kind: TokenKind,

        /// Body parameter as name=value (repeatable)
        #[arg(short = 'p', long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, _)) if name.is_empty() => Err(format!("'{raw}' has an empty name")),
        Some((name, value)) => Ok((name.to_string(), value.to_string())),
        None => Err(format!("'{raw}' is not of the form name=value")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = HttpConfig::from_env().context("invalid MWFETCH_* configuration")?;
    let transport = ReqwestTransport::new(&config).context("failed to build the HTTP client")?;
    let fetcher = Fetcher::new(
        Arc::new(transport),
        Arc::new(MediaWikiEndpoints::from_config(&config)),
    );

    let interrupt = fetcher.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let cancelled = interrupt.cancel_all();
            warn!(cancelled, "interrupted; cancelling in-flight requests");
        }
    });

    let output = run(&fetcher, &cli.host, cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run(fetcher: &Fetcher, host: &str, command: Command) -> Result<serde_json::Value> {
    match command {
        Command::Token { kind } => {
            let token = fetcher
                .request_auth_token(host, kind, None)
                .await
                .with_context(|| format!("failed to fetch a {kind} token from {host}"))?;
            Ok(json!({
                "kind": token.kind(),
                "authorized": token.is_authorized(),
            }))
        }
        Command::Get { params } => {
            let response = fetcher
                .get(host, &collect(params), None)
                .await
                .with_context(|| format!("GET {host} failed"))?;
            Ok(body(response))
        }
        Command::Post { params } => {
            let response = fetcher
                .post(host, &collect(params), None)
                .await
                .with_context(|| format!("POST {host} failed"))?;
            Ok(body(response))
        }
        Command::Write { kind, params } => {
            let pending = fetcher.spawn_tokenized_post(kind, host, collect(params), None);
            info!(key = %pending.key(), %kind, "tokenized write started");
            let response = pending
                .wait()
                .await
                .with_context(|| format!("tokenized write to {host} failed"))?;
            Ok(body(response))
        }
    }
}

fn collect(params: Vec<(String, String)>) -> Parameters {
    params.into_iter().collect()
}

fn body(response: ApiResponse) -> serde_json::Value {
    serde_json::Value::Object(response.json)
}

fn init_tracing(json_logs: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}
