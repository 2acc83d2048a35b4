use std::sync::Arc;

use clap::Parser;
use quill_core::identity::{HttpIdentityClient, IdentityConfig};
use quill_core::{QuillConfig, RecordStore, Resource};
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use quill_server::http::{start_http_server, HttpState};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "quill.toml")]
    config: String,

    /// Which record resource this instance serves.
    #[arg(short, long, default_value = "notes")]
    resource: Resource,

    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience — production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config
    let config = match QuillConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Init logging
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level)),
        )
        .init();

    // Connect to DB
    let pool = match quill_core::db::create_pool(&config.database).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    if args.health {
        match quill_core::db::health_check(&pool).await {
            Ok(v) => println!("✅ PostgreSQL connected: {}", v),
            Err(e) => {
                println!("❌ PostgreSQL connection failed: {}", e);
                std::process::exit(1);
            }
        }

        println!("✅ Quill DB health check passed");
        return Ok(());
    }

    quill_core::db::ensure_schema(&pool).await?;

    let identity = HttpIdentityClient::new(IdentityConfig::new(
        config.auth.provider_url.clone(),
    ))?;

    let state = Arc::new(HttpState {
        store: RecordStore::new(pool, args.resource),
        config,
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

    start_http_server(state, tx.subscribe()).await?;

    Ok(())
}
