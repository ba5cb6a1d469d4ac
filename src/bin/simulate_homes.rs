use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use home_iot_client::api::{HomeApiClient, HomeDataProvider};
use home_iot_client::models::Config;
use home_iot_client::simulator::{self, HouseBootstrap};

/// House and temperature simulator: fetches the house listing, then keeps
/// submitting fresh simulated readings for every device and a periodic
/// bulk heartbeat, until Ctrl-C.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("home_iot_client=info,simulate_homes=info")),
        )
        .init();

    let config = Config::from_env()?;
    let provider: Arc<dyn HomeDataProvider> = Arc::new(HomeApiClient::new(&config)?);
    info!("🏠 Simulating against {}", config.base_url());

    // poll until the server reports at least one house
    let bootstrap = HouseBootstrap::start(Arc::clone(&provider), config.simulation_interval());
    let mut listing_updates = bootstrap.subscribe();
    let listing = listing_updates
        .wait_for(|s| s.houses.is_some())
        .await?
        .houses
        .clone()
        .unwrap_or_default();
    bootstrap.stop();

    info!("📋 Found {} houses, starting simulators", listing.len());

    let heartbeat = simulator::spawn_heartbeat(Arc::clone(&provider), config.heartbeat_interval());
    let simulators =
        simulator::simulators_for_listing(&provider, &listing, config.simulation_interval());

    tokio::signal::ctrl_c().await?;
    info!("Shutting down {} simulators", simulators.len());

    heartbeat.stop();
    for sim in &simulators {
        sim.stop();
    }

    Ok(())
}
