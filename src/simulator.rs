//! Helper-app screens: bootstrap fetch of the house listing, the bulk
//! heartbeat loop, and one reading simulator per house. The simulators
//! replace every device's reading on each tick and push the batch to the
//! server; the server's averaged view is what the desktop binary reads
//! back.

use anyhow::Result;
use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::api::HomeDataProvider;
use crate::models::{DeviceReading, HouseListing, Temperatures};
use crate::poller::{self, PollHandle, PollSeq, StateCell};
use crate::reconcile;

/// Bootstrap state: the raw listing, absent until the first non-null
/// payload arrives.
#[derive(Debug, Clone, Default)]
pub struct BootstrapState {
    pub houses: Option<HouseListing>,
}

/// Polls the listing endpoint until a listing shows up, then stops
/// itself. `refresh()` re-fetches on demand afterwards.
pub struct HouseBootstrap {
    provider: Arc<dyn HomeDataProvider>,
    state: StateCell<BootstrapState>,
    seq: PollSeq,
    poll: PollHandle,
}

impl HouseBootstrap {
    pub fn start(provider: Arc<dyn HomeDataProvider>, interval: Duration) -> Self {
        let state = StateCell::new(BootstrapState::default());
        let seq = PollSeq::default();

        let poll = poller::spawn(interval, seq.clone(), {
            let provider = Arc::clone(&provider);
            let state = state.clone();
            move |tick| {
                let provider = Arc::clone(&provider);
                let state = state.clone();
                async move {
                    match provider.list_houses().await {
                        Ok(Some(listing)) => {
                            info!("Listing arrived with {} houses", listing.len());
                            state.apply(tick, |s| s.houses = Some(listing));
                            // data is here, the schedule has done its job
                            ControlFlow::Break(())
                        }
                        Ok(None) => ControlFlow::Continue(()),
                        Err(e) => {
                            warn!("Listing fetch failed: {}", e);
                            ControlFlow::Continue(())
                        }
                    }
                }
            }
        });

        Self {
            provider,
            state,
            seq,
            poll,
        }
    }

    /// One-shot re-fetch of the listing, outside the poll schedule.
    pub async fn refresh(&self) -> Result<()> {
        info!("Refreshing house listing");
        let listing = self.provider.list_houses().await?;
        if let Some(listing) = listing {
            self.state.apply(self.seq.next(), |s| s.houses = Some(listing));
        }
        Ok(())
    }

    pub fn state(&self) -> BootstrapState {
        self.state.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<BootstrapState> {
        self.state.subscribe()
    }

    /// True once the poller ended, either through `stop()` or because a
    /// listing arrived.
    pub fn is_stopped(&self) -> bool {
        self.poll.is_stopped()
    }

    pub fn stop(&self) {
        self.poll.stop();
        self.state.close();
    }
}

/// Bulk heartbeat: `PUT iot/heating` on a fixed interval, keeping every
/// home's heating cycle alive server-side.
pub fn spawn_heartbeat(provider: Arc<dyn HomeDataProvider>, interval: Duration) -> PollHandle {
    poller::spawn(interval, PollSeq::default(), move |_tick| {
        let provider = Arc::clone(&provider);
        async move {
            if let Err(e) = provider.send_heartbeat().await {
                warn!("Heartbeat failed: {}", e);
            }
            ControlFlow::Continue(())
        }
    })
}

/// State of one house's simulator.
#[derive(Debug, Clone)]
pub struct HouseSimulatorState {
    pub home_name: String,
    pub devices: Vec<DeviceReading>,
    /// False until the first batch of readings went out.
    pub submitted: bool,
}

/// Per-house reading simulator: every tick regenerates all device
/// readings, submits the batch, and keeps the new readings locally.
/// Local state updates before the POST resolves; a failed submission is
/// logged and the readings stand.
pub struct HouseSimulator {
    state: StateCell<HouseSimulatorState>,
    poll: PollHandle,
}

impl HouseSimulator {
    pub fn start(
        provider: Arc<dyn HomeDataProvider>,
        home_name: &str,
        device_entries: &[HashMap<String, Option<f64>>],
        interval: Duration,
    ) -> Self {
        // entries with anything but a single key carry no usable device
        let devices: Vec<DeviceReading> = device_entries
            .iter()
            .filter_map(reconcile::device_from_entry)
            .collect();

        let state = StateCell::new(HouseSimulatorState {
            home_name: home_name.to_string(),
            devices,
            submitted: false,
        });
        let seq = PollSeq::default();

        let poll = poller::spawn(interval, seq, {
            let state = state.clone();
            let home_name = home_name.to_string();
            move |tick| {
                let provider = Arc::clone(&provider);
                let state = state.clone();
                let home_name = home_name.clone();
                async move {
                    let next = reconcile::simulate_readings(&state.get().devices);
                    let payload = Temperatures {
                        home_name: home_name.clone(),
                        device_to_temperature: next
                            .iter()
                            .filter_map(|d| d.reading.map(|r| (d.name.clone(), r)))
                            .collect(),
                    };

                    // keep the fresh readings before the POST resolves
                    state.apply(tick, |s| {
                        s.devices = next;
                        s.submitted = true;
                    });

                    if let Err(e) = provider.submit_readings(&payload).await {
                        warn!("Reading submission for {} failed: {}", home_name, e);
                    }
                    ControlFlow::Continue(())
                }
            }
        });

        Self { state, poll }
    }

    pub fn state(&self) -> HouseSimulatorState {
        self.state.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<HouseSimulatorState> {
        self.state.subscribe()
    }

    pub fn stop(&self) {
        self.poll.stop();
        self.state.close();
    }
}

/// Spawn one simulator per house in a listing.
pub fn simulators_for_listing(
    provider: &Arc<dyn HomeDataProvider>,
    listing: &HouseListing,
    interval: Duration,
) -> Vec<HouseSimulator> {
    listing
        .iter()
        .map(|(home_name, devices)| {
            HouseSimulator::start(Arc::clone(provider), home_name, devices, interval)
        })
        .collect()
}
