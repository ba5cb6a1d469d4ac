use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{ApiError, HomeDataProvider};
use crate::models::{BlockHeating, Config, HeatingSetting, HouseListing, TemperatureResponse, Temperatures};

/// Remote IoT API client
pub struct HomeApiClient {
    client: Client,
    base_url: String,
}

impl HomeApiClient {
    /// Create a client against the configured host and port
    pub fn new(config: &Config) -> Result<Self> {
        Self::from_base_url(&config.base_url())
    }

    /// Create a client against an explicit base URL (used by tests to
    /// point at a mock server)
    pub fn from_base_url(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("home-iot-client/0.1")
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.endpoint(path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(ApiError::Transport)?;

        if !response.status().is_success() {
            return Err(ApiError::Status(response.status()));
        }

        response.json().await.map_err(ApiError::Decode)
    }

    async fn put_json<B: Serialize>(&self, path: &str, body: Option<&B>) -> Result<(), ApiError> {
        let url = self.endpoint(path);
        debug!("PUT {}", url);

        let mut request = self.client.put(&url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(ApiError::Transport)?;
        if !response.status().is_success() {
            return Err(ApiError::Status(response.status()));
        }

        Ok(())
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.endpoint(path);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(ApiError::Transport)?;

        if !response.status().is_success() {
            return Err(ApiError::Status(response.status()));
        }

        response.json().await.map_err(ApiError::Decode)
    }
}

#[async_trait]
impl HomeDataProvider for HomeApiClient {
    async fn list_houses(&self) -> Result<Option<HouseListing>, ApiError> {
        self.get_json("iot").await
    }

    async fn home_exists(&self, home_name: &str) -> Result<bool, ApiError> {
        self.get_json(&format!("api/home/{}/exists", home_name)).await
    }

    async fn fetch_temperatures(
        &self,
        home_name: &str,
    ) -> Result<Option<HashMap<String, f64>>, ApiError> {
        let response: TemperatureResponse = self
            .get_json(&format!("api/home/{}/temperature", home_name))
            .await?;
        Ok(response.temperatures)
    }

    async fn fetch_heating(&self, home_name: &str) -> Result<HeatingSetting, ApiError> {
        self.get_json(&format!("api/home/{}/heating", home_name)).await
    }

    async fn set_heating_blocked(
        &self,
        home_name: &str,
        turn_off: Option<bool>,
    ) -> Result<(), ApiError> {
        let body = BlockHeating { turn_off };
        self.put_json(&format!("api/home/{}/heating", home_name), Some(&body))
            .await
    }

    async fn send_heartbeat(&self) -> Result<(), ApiError> {
        self.put_json::<()>("iot/heating", None).await
    }

    async fn submit_readings(&self, readings: &Temperatures) -> Result<Value, ApiError> {
        self.post_json("iot", readings).await
    }
}
