use std::sync::Arc;

use clap::Parser;
use quill_core::identity::{HttpIdentityClient, IdentityConfig};
use quill_core::QuillConfig;
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use quill_auth::{start_http_server, AuthState};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "quill.toml")]
    config: String,

    /// Bind address for the auth service.
    #[arg(long, default_value = "0.0.0.0:8080")]
    listen: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience — production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let config = match QuillConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level)),
        )
        .init();

    let identity = HttpIdentityClient::new(IdentityConfig::new(
        config.auth.provider_url.clone(),
    ))?;

    let state = Arc::new(AuthState {
        identity: Arc::new(identity),
    });

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    start_http_server(args.listen, state, tx.subscribe()).await?;

    Ok(())
}
