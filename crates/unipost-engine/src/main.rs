//! Batch publishing binary.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use unipost_engine::{BatchRunner, EngineConfig, LocalDirStore};
use unipost_models::BatchRequest;
use unipost_provider::ProviderClient;

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("unipost=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting unipost-engine");

    let request_path = match std::env::args().nth(1) {
        Some(path) => path,
        None => {
            error!("Usage: unipost-engine <batch-request.json>");
            std::process::exit(2);
        }
    };

    let request = match read_request(&request_path) {
        Ok(request) => request,
        Err(e) => {
            error!("Failed to read batch request from {}: {}", request_path, e);
            std::process::exit(2);
        }
    };

    let config = EngineConfig::from_env();
    info!("Engine config: {:?}", config);

    let publisher = match ProviderClient::from_env() {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create provider client: {}", e);
            std::process::exit(1);
        }
    };

    let store = LocalDirStore::new(&config.store_dir, &config.public_base_url);
    let runner = Arc::new(BatchRunner::new(
        config,
        Arc::new(publisher),
        Arc::new(store),
    ));

    // Ctrl-C cancels the batch: in-flight work finishes, nothing new starts
    let cancel_runner = Arc::clone(&runner);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal, cancelling batch");
        cancel_runner.cancel();
    });

    match runner.run(request).await {
        Ok(result) => {
            info!(
                published = result.published,
                total_videos = result.total_videos,
                failures = result.failures.len(),
                "Batch finished"
            );
            let rendered = serde_json::to_string_pretty(&result)
                .unwrap_or_else(|_| format!("{:?}", result));
            println!("{}", rendered);
        }
        Err(e) => {
            error!("Batch failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn read_request(path: &str) -> anyhow::Result<BatchRequest> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
