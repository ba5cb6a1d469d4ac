use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use home_iot_client::api::{HomeApiClient, HomeDataProvider};
use home_iot_client::models::Config;
use home_iot_client::monitor::{HeatingView, HomeView, HousesListView};

#[derive(Parser)]
#[command(name = "home-iot-client", about = "House and heating viewer for the IoT home server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Follow the list of known houses
    Houses,
    /// Follow one home's averaged temperature and heating panel
    Watch {
        /// Home name as known to the server
        home_name: String,
    },
    /// Flip the heating block for one home and exit
    Toggle {
        /// Home name as known to the server
        home_name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("home_iot_client=info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            eprintln!("❌ Configuration Error: {}", e);
            std::process::exit(1);
        }
    };

    let provider: Arc<dyn HomeDataProvider> = Arc::new(HomeApiClient::new(&config)?);
    info!("📡 Watching IoT home server at {}", config.base_url());

    match cli.command {
        Command::Houses => follow_houses(provider, &config).await,
        Command::Watch { home_name } => follow_home(provider, &home_name, &config).await,
        Command::Toggle { home_name } => toggle_heating(provider, &home_name).await,
    }
}

/// Print the houses list every time it changes, until Ctrl-C.
async fn follow_houses(provider: Arc<dyn HomeDataProvider>, config: &Config) -> Result<()> {
    let view = HousesListView::start(provider, config.listing_interval());
    let mut updates = view.subscribe();

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow().clone();
                match state.houses {
                    Some(houses) if !houses.is_empty() => {
                        println!("Houses: {}", houses.join(", "));
                    }
                    _ => println!("No houses available"),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    view.stop();
    Ok(())
}

/// Print temperature and heating updates for one home, until Ctrl-C.
async fn follow_home(
    provider: Arc<dyn HomeDataProvider>,
    home_name: &str,
    config: &Config,
) -> Result<()> {
    let home = HomeView::start(Arc::clone(&provider), home_name, config.temperature_interval());
    let heating = HeatingView::start(provider, home_name, config.heating_interval());

    let mut home_updates = home.subscribe();
    let mut heating_updates = heating.subscribe();

    loop {
        tokio::select! {
            changed = home_updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = home_updates.borrow().clone();
                if !state.home_exists {
                    println!("Home {} does not exist", state.home_name);
                } else if let Some(temperature) = state.temperature {
                    println!("{}: {}", state.home_name, temperature);
                }
            }
            changed = heating_updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = heating_updates.borrow().clone();
                println!(
                    "Heating: {:?} (button: {})",
                    state.indicator(),
                    state.toggle.action().label()
                );
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    home.stop();
    heating.stop();
    Ok(())
}

/// One-shot toggle: read the current block state, send the opposite.
async fn toggle_heating(provider: Arc<dyn HomeDataProvider>, home_name: &str) -> Result<()> {
    use home_iot_client::models::ToggleState;

    let setting = provider.fetch_heating(home_name).await?;
    let action = ToggleState::from_user_turned_off(setting.user_turned_off).action();

    info!("🔘 {} -> {}", home_name, action.label());
    provider
        .set_heating_blocked(home_name, action.turn_off())
        .await?;
    println!("Sent {} for {}", action.label(), home_name);
    Ok(())
}
