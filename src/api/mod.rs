use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

use crate::models::{HeatingSetting, HouseListing, Temperatures};

pub mod client;
pub use client::HomeApiClient;

/// Failure taxonomy of the remote API. Pollers swallow both kinds after a
/// warning; the next scheduled tick is the only recovery.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("transport failure: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed response body: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Seam between the views and the HTTP transport, so tests can substitute
/// the remote source of truth.
#[async_trait]
pub trait HomeDataProvider: Send + Sync {
    /// `GET iot` — listing of all homes and their devices; null while the
    /// server knows no homes.
    async fn list_houses(&self) -> Result<Option<HouseListing>, ApiError>;

    /// `GET api/home/{name}/exists` — bare boolean.
    async fn home_exists(&self, home_name: &str) -> Result<bool, ApiError>;

    /// `GET api/home/{name}/temperature` — per-device readings, absent
    /// while the home has none.
    async fn fetch_temperatures(
        &self,
        home_name: &str,
    ) -> Result<Option<HashMap<String, f64>>, ApiError>;

    /// `GET api/home/{name}/heating` — current heating setting.
    async fn fetch_heating(&self, home_name: &str) -> Result<HeatingSetting, ApiError>;

    /// `PUT api/home/{name}/heating` — user block toggle; `None` leaves
    /// the block state alone.
    async fn set_heating_blocked(
        &self,
        home_name: &str,
        turn_off: Option<bool>,
    ) -> Result<(), ApiError>;

    /// `PUT iot/heating` — bulk heartbeat, no body.
    async fn send_heartbeat(&self) -> Result<(), ApiError>;

    /// `POST iot` — submit one home's simulated readings.
    async fn submit_readings(&self, readings: &Temperatures) -> Result<serde_json::Value, ApiError>;
}
