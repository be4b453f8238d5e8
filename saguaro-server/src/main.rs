use std::sync::Arc;

use clap::Parser;
use saguaro_core::classify::{AnthropicClient, ClassifierBackend, ClassifierConfig};
use saguaro_core::receipts::{ReceiptStore, ReceiptStoreConfig};
use saguaro_core::SaguaroConfig;
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use saguaro_server::http;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "saguaro.toml")]
    config: String,

    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience — production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Init logging
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    // Load config
    let config = match SaguaroConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Deferred-connect pool: an unreachable database degrades requests
    // rather than aborting startup.
    let pool = match saguaro_core::db::create_pool_lazy(&config.database) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Invalid database configuration: {}", e);
            std::process::exit(1);
        }
    };

    if args.health {
        match saguaro_core::db::health_check(&pool).await {
            Ok(v) => println!("✅ PostgreSQL connected: {}", v),
            Err(e) => {
                println!("❌ PostgreSQL connection failed: {}", e);
                std::process::exit(1);
            }
        }

        println!("✅ Saguaro DB health check passed");
        return Ok(());
    }

    // Classifier backend; chat requests fail individually without it.
    let classifier_config = ClassifierConfig::new(
        None,
        config.model.model.clone(),
        config.model.max_tokens,
    );
    let classifier: Option<Arc<dyn ClassifierBackend>> = match AnthropicClient::new(classifier_config)
    {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            tracing::warn!("Classifier unavailable: {} (chat requests will fail)", e);
            None
        }
    };

    // Receipt store; submissions proceed without receipt URLs when absent.
    let receipts = match ReceiptStore::new(ReceiptStoreConfig::from_env(config.receipts.bucket.clone()))
    {
        Ok(store) => Some(store),
        Err(e) => {
            tracing::warn!("Receipt store unavailable: {} (receipts will be skipped)", e);
            None
        }
    };

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    http::start_http_server(pool, config, classifier, receipts, tx.subscribe()).await?;

    Ok(())
}
