//! Gateway - HTTP front end for the leaderboard rank-prediction engine

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use forecast::Forecaster;
use gateway::{config::Args, server, DonationStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("gateway={0},forecast={0},info", log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Gateway - Leaderboard Forecasts");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Scope: {}", args.leaderboard_scope);
    info!("History period: {}", args.history_period);
    info!("Prediction cache TTL: {}s", args.prediction_cache_ttl_secs);
    info!("======================================");

    let forecast_config = args.load_forecast_config()?;
    let forecaster = Forecaster::with_config(forecast_config)?;

    let store = match &args.data_file {
        Some(path) => {
            let store = DonationStore::load(path).await?;
            info!("Loaded seed data from {}", path.display());
            store
        }
        None => {
            warn!("No DATA_FILE set, starting with an empty donation store");
            DonationStore::new()
        }
    };

    let state = Arc::new(server::AppState::new(args, store, forecaster));

    if let Err(e) = server::run(state).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
