use std::sync::Arc;

use clap::Parser;
use failsight_core::{DashboardContext, FailsightConfig};
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "failsight.toml")]
    config: String,

    /// Load both sources, print a summary and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience; production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config
    let config = match FailsightConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Init logging; RUST_LOG wins over service.log_level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    fmt().with_env_filter(filter).init();

    // Both sources are read exactly once; failure ends the session
    let context = match DashboardContext::load(&config) {
        Ok(ctx) => ctx,
        Err(e) => {
            tracing::error!("Failed to load dashboard sources: {}", e);
            if e.is_not_found() {
                eprintln!(
                    "❌ {} (check sources.document_path and sources.dataset_path in {})",
                    e, args.config
                );
            } else {
                eprintln!("❌ {}", e);
            }
            std::process::exit(1);
        }
    };

    if args.check {
        for fp in context.fingerprints() {
            println!("✅ {} ({} bytes, sha256 {})", fp.path, fp.bytes, fp.sha256);
        }
        for entry in context.report() {
            let mark = if entry.narrative.is_some() { "✅" } else { "⚠️ " };
            let readings: usize = context
                .get_sensor_series(&entry.work_order)
                .iter()
                .map(|s| s.points.len())
                .sum();
            println!(
                "{} WorkOrderID {}: narrative {}, {} sensor readings",
                mark,
                entry.work_order,
                if entry.narrative.is_some() { "found" } else { "missing" },
                readings
            );
        }
        println!("✅ Failsight source check passed");
        return Ok(());
    }

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    failsight_server::http::start_http_server(Arc::new(context), config, tx.subscribe()).await?;

    Ok(())
}
