//! Desktop-viewer screens: the houses list, a single home's averaged
//! temperature behind its existence gate, and the heating panel with its
//! user block toggle. Each screen owns its pollers and a state cell;
//! callers observe state through `subscribe()` and must call `stop()`
//! when the screen goes away.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::warn;

use crate::api::HomeDataProvider;
use crate::models::{DisplayTemperature, HeatingSetting, ToggleState};
use crate::poller::{self, PollHandle, PollSeq, StateCell};
use crate::reconcile::{self, HeatingIndicator};

/// State of the houses list screen. `None` means the server has not yet
/// reported any listing ("no houses available").
#[derive(Debug, Clone, Default)]
pub struct HousesListState {
    pub houses: Option<Vec<String>>,
}

/// Houses list screen: polls the listing endpoint and keeps the sorted
/// home names current.
pub struct HousesListView {
    state: StateCell<HousesListState>,
    poll: PollHandle,
}

impl HousesListView {
    pub fn start(provider: Arc<dyn HomeDataProvider>, interval: Duration) -> Self {
        let state = StateCell::new(HousesListState::default());
        let seq = PollSeq::default();

        let poll = poller::spawn(interval, seq, {
            let state = state.clone();
            move |tick| {
                let provider = Arc::clone(&provider);
                let state = state.clone();
                async move {
                    match provider.list_houses().await {
                        Ok(listing) => {
                            // a null listing keeps whatever was shown before
                            if let Some(names) = reconcile::merge_house_names(listing.as_ref()) {
                                state.apply(tick, |s| s.houses = Some(names));
                            }
                        }
                        Err(e) => warn!("Houses listing fetch failed: {}", e),
                    }
                    ControlFlow::Continue(())
                }
            }
        });

        Self { state, poll }
    }

    pub fn state(&self) -> HousesListState {
        self.state.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<HousesListState> {
        self.state.subscribe()
    }

    pub fn stop(&self) {
        self.poll.stop();
        self.state.close();
    }
}

/// State of a single home's screen.
#[derive(Debug, Clone)]
pub struct HomeViewState {
    pub home_name: String,
    /// Existence gate: temperature polling only runs while this is true.
    /// Starts optimistic, the first existence tick corrects it.
    pub home_exists: bool,
    pub temperature: Option<DisplayTemperature>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Single home screen: an existence poller keeps the gate current, and a
/// temperature poller (active only while the gate is open) reconciles the
/// averaged reading.
pub struct HomeView {
    state: StateCell<HomeViewState>,
    exists_poll: PollHandle,
    temperature_poll: PollHandle,
}

impl HomeView {
    pub fn start(
        provider: Arc<dyn HomeDataProvider>,
        home_name: &str,
        interval: Duration,
    ) -> Self {
        let state = StateCell::new(HomeViewState {
            home_name: home_name.to_string(),
            home_exists: true,
            temperature: None,
            last_updated: None,
        });
        let seq = PollSeq::default();

        let exists_poll = poller::spawn(interval, seq.clone(), {
            let provider = Arc::clone(&provider);
            let state = state.clone();
            let home_name = home_name.to_string();
            move |tick| {
                let provider = Arc::clone(&provider);
                let state = state.clone();
                let home_name = home_name.clone();
                async move {
                    match provider.home_exists(&home_name).await {
                        Ok(exists) => {
                            state.apply(tick, |s| s.home_exists = exists);
                        }
                        Err(e) => warn!("Existence check for {} failed: {}", home_name, e),
                    }
                    ControlFlow::Continue(())
                }
            }
        });

        let temperature_poll = poller::spawn(interval, seq, {
            let state = state.clone();
            let home_name = home_name.to_string();
            move |tick| {
                let provider = Arc::clone(&provider);
                let state = state.clone();
                let home_name = home_name.clone();
                async move {
                    // gated: no request while the home is not known to exist
                    if !state.get().home_exists {
                        return ControlFlow::Continue(());
                    }

                    match provider.fetch_temperatures(&home_name).await {
                        Ok(temperatures) => {
                            // absent readings leave the previous display alone
                            if let Some(display) =
                                reconcile::average_and_round(temperatures.as_ref())
                            {
                                state.apply(tick, |s| {
                                    s.temperature = Some(display);
                                    s.last_updated = Some(Utc::now());
                                });
                            }
                        }
                        Err(e) => warn!("Temperature fetch for {} failed: {}", home_name, e),
                    }
                    ControlFlow::Continue(())
                }
            }
        });

        Self {
            state,
            exists_poll,
            temperature_poll,
        }
    }

    pub fn state(&self) -> HomeViewState {
        self.state.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<HomeViewState> {
        self.state.subscribe()
    }

    pub fn stop(&self) {
        self.exists_poll.stop();
        self.temperature_poll.stop();
        self.state.close();
    }
}

/// State of the heating panel.
#[derive(Debug, Clone)]
pub struct HeatingViewState {
    pub home_name: String,
    pub setting: Option<HeatingSetting>,
    pub toggle: ToggleState,
}

impl HeatingViewState {
    /// What the panel displays for the current setting and block state.
    pub fn indicator(&self) -> HeatingIndicator {
        reconcile::heating_indicator(self.setting.as_ref(), self.toggle)
    }
}

/// Heating panel: polls the heating endpoint and lets the user toggle the
/// block. The toggle updates local state optimistically before the PUT
/// resolves; there is no rollback on failure.
pub struct HeatingView {
    provider: Arc<dyn HomeDataProvider>,
    home_name: String,
    state: StateCell<HeatingViewState>,
    seq: PollSeq,
    poll: PollHandle,
}

impl HeatingView {
    pub fn start(
        provider: Arc<dyn HomeDataProvider>,
        home_name: &str,
        interval: Duration,
    ) -> Self {
        let state = StateCell::new(HeatingViewState {
            home_name: home_name.to_string(),
            setting: None,
            toggle: ToggleState::Unknown,
        });
        let seq = PollSeq::default();

        let poll = poller::spawn(interval, seq.clone(), {
            let provider = Arc::clone(&provider);
            let state = state.clone();
            let home_name = home_name.to_string();
            move |tick| {
                let provider = Arc::clone(&provider);
                let state = state.clone();
                let home_name = home_name.clone();
                async move {
                    match provider.fetch_heating(&home_name).await {
                        Ok(setting) => {
                            let toggle = ToggleState::from_user_turned_off(setting.user_turned_off);
                            state.apply(tick, |s| {
                                s.setting = Some(setting);
                                s.toggle = toggle;
                            });
                        }
                        Err(e) => warn!("Heating fetch for {} failed: {}", home_name, e),
                    }
                    ControlFlow::Continue(())
                }
            }
        });

        Self {
            provider,
            home_name: home_name.to_string(),
            state,
            seq,
            poll,
        }
    }

    /// Fire the toggle button. The opposite block state goes to the
    /// server; local state flips first so the panel reacts immediately.
    /// In the `Unknown` state the request still fires with a null body
    /// and local state stays put.
    pub async fn toggle(&self) -> Result<()> {
        let action = self.state.get().toggle.action();

        if let Some(turn_off) = action.turn_off() {
            // stamped after every in-flight poll, so a stale heating
            // response cannot undo the flip
            self.state.apply(self.seq.next(), |s| {
                s.toggle = if turn_off {
                    ToggleState::Off
                } else {
                    ToggleState::On
                };
            });
        }

        self.provider
            .set_heating_blocked(&self.home_name, action.turn_off())
            .await?;
        Ok(())
    }

    pub fn state(&self) -> HeatingViewState {
        self.state.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<HeatingViewState> {
        self.state.subscribe()
    }

    pub fn stop(&self) {
        self.poll.stop();
        self.state.close();
    }
}
