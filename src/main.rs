use anyhow::Result;
use clap::Parser;

use txn_load::cli::{Cli, Executor};
use txn_load::executor::{constant_vus, ramping_vus};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize tracing
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = cli.run_config();

    tracing::info!("Transaction API Load Test Starting...");
    tracing::info!("Target: {}", config.base_url);
    tracing::info!("Stages: {:?}", config.stages);
    tracing::info!("Graceful ramp-down: {:?}", config.graceful_ramp_down);
    tracing::info!("Request timeout: {:?}", config.request_timeout);

    let summary = match cli.executor {
        Executor::RampingVus(_) => {
            tracing::info!("Running ramping-vus executor");
            ramping_vus::run(config).await?
        }
        Executor::ConstantVus(_) => {
            tracing::info!("Running constant-vus executor");
            constant_vus::run(config).await?
        }
    };

    tracing::info!("Load test complete");

    if !summary.passed {
        tracing::error!("One or more thresholds failed");
        std::process::exit(1);
    }

    Ok(())
}
