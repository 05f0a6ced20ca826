#![allow(missing_docs)]

//! Larkgate — Lark/Feishu bot gateway.
//!
//! Single Rust binary that serves the webhook endpoint, verifies and
//! dispatches inbound events, and replies through the Lark Open API.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use larkgate::api::LarkClient;
use larkgate::config::Config;
use larkgate::event::{EventDispatcher, EventKind};
use larkgate::handler::{GreetingHandler, HandlerRegistry, CATCH_ALL_PRIORITY};
use larkgate::token::{HttpAuthEndpoint, TokenManager};
use larkgate::webhook::{endpoint, AppState};

/// Help-button target on the default greeting card.
const DOCS_URL: &str = "https://github.com/larkgate/larkgate";

#[derive(Parser)]
#[command(name = "larkgate", version, about = "Lark/Feishu bot gateway")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the webhook server.
    Serve,
    /// Fetch the app access token and print it (diagnostics).
    Token,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Precedence: env vars > ./larkgate.toml > defaults.
    let config = Config::load().context("failed to load configuration")?;

    match cli.command {
        Command::Serve => serve(config).await,
        Command::Token => print_token(config).await,
    }
}

/// Wire the component graph and serve the webhook endpoint.
async fn serve(config: Config) -> Result<()> {
    let _guard = larkgate::logging::init_server(
        Path::new(&config.logging.dir),
        &config.logging.level,
    )?;
    info!(version = env!("CARGO_PKG_VERSION"), "larkgate starting");

    if config.lark.verification_token.is_empty() || config.lark.encrypt_key.is_empty() {
        tracing::warn!(
            "verification token or encrypt key is empty; every webhook will be rejected"
        );
    }

    let config = Arc::new(config);
    let auth = Arc::new(HttpAuthEndpoint::new(&config.lark));
    let tokens = Arc::new(TokenManager::new(auth, Path::new(&config.cache.dir)));
    let client = Arc::new(LarkClient::new(&config.lark, Arc::clone(&tokens)));

    let registry = Arc::new(HandlerRegistry::new());
    registry
        .register(
            Arc::new(GreetingHandler::new(client, DOCS_URL)),
            CATCH_ALL_PRIORITY,
        )
        .await;

    let dispatcher = Arc::new(EventDispatcher::new());
    dispatcher
        .add_listener(EventKind::Message, registry, 0)
        .await;

    let state = AppState::new(Arc::clone(&config), dispatcher);
    endpoint::serve(state, &config.server.listen_addr).await
}

/// Fetch the app access token once and print it with its expiry.
async fn print_token(config: Config) -> Result<()> {
    larkgate::logging::init_cli();

    let auth = Arc::new(HttpAuthEndpoint::new(&config.lark));
    let tokens = TokenManager::new(auth, Path::new(&config.cache.dir));
    let token = tokens
        .get_token()
        .await
        .context("failed to fetch app access token")?;

    println!("{token}");
    if let Some(expires_at) = tokens.expires_at().await {
        eprintln!("valid until {expires_at} (refresh buffer already applied)");
    }
    Ok(())
}
