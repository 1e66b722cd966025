//! Ask Gateway Server
//!
//! Runs the Gemini ask gateway as a standalone HTTP server.

use anyhow::Result;
use ask_gateway::{AskServer, ServerConfig, Settings};
use clap::Parser;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "ask-server")]
#[command(about = "HTTP gateway exposing Google Gemini behind a single ask endpoint")]
struct Args {
    /// Server port
    #[arg(short, long, default_value = "8080", env = "ASK_PORT")]
    port: u16,

    /// Server host
    #[arg(long, default_value = "0.0.0.0", env = "ASK_HOST")]
    host: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ask_gateway=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    let settings = Settings::from_env();

    info!("Starting {} v{}", settings.app_name, settings.app_version);
    info!("  Model: {}", settings.model);
    info!("  Listening on: {}:{}", args.host, args.port);

    if settings.gemini_api_key.is_none() {
        warn!("GEMINI_API_KEY is not set; requests will fail until it is provided");
    }

    let server = AskServer::new(
        ServerConfig {
            host: args.host,
            port: args.port,
        },
        settings,
    );

    server.start().await
}
