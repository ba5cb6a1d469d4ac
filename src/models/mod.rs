use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Heating state reported by the remote heating endpoint.
///
/// `value` is the delta the server currently applies per heating cycle;
/// `user_turned_off` is absent when nobody ever touched the block switch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatingSetting {
    pub setting: String,
    pub value: Option<f64>,
    #[serde(rename = "userTurnedOff", default)]
    pub user_turned_off: Option<bool>,
}

/// Bulk reading submission body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Temperatures {
    pub home_name: String,
    pub device_to_temperature: HashMap<String, f64>,
}

/// Envelope around the averaged-reading fetch. The server answers with
/// `{"temperatures": null}` while a home has no readings yet.
#[derive(Debug, Clone, Deserialize)]
pub struct TemperatureResponse {
    #[serde(default)]
    pub temperatures: Option<HashMap<String, f64>>,
}

/// Heating toggle request body. `None` serializes as `"turnOff": null`,
/// which the server treats as "leave the block state alone".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockHeating {
    #[serde(rename = "turnOff")]
    pub turn_off: Option<bool>,
}

/// Listing payload of `GET iot`: home name to its devices, each device a
/// single-entry map of device name to last known reading.
pub type HouseListing = HashMap<String, Vec<HashMap<String, Option<f64>>>>;

/// Averaged home temperature split for display: the integer part and the
/// first decimal digit, already rounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayTemperature {
    pub integer: i64,
    pub tenths: u8,
}

impl DisplayTemperature {
    /// Split a mean reading into integer part and rounded first decimal.
    /// A decimal that rounds to 10 normalizes to 0 without carrying into
    /// the integer part, matching the display the viewer always showed.
    pub fn from_celsius(mean: f64) -> Self {
        let integer = mean.floor() as i64;
        let tenths = (mean * 10.0).rem_euclid(10.0).round();
        let tenths = if tenths >= 10.0 { 0 } else { tenths as u8 };

        Self { integer, tenths }
    }
}

impl std::fmt::Display for DisplayTemperature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}°C", self.integer, self.tenths)
    }
}

/// Tri-state of the user-facing heating block, derived from
/// `userTurnedOff` in the heating payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleState {
    /// Heating runs; the user has not blocked it.
    On,
    /// The user blocked heating.
    Off,
    /// The server never reported a block state.
    Unknown,
}

impl ToggleState {
    pub fn from_user_turned_off(user_turned_off: Option<bool>) -> Self {
        match user_turned_off {
            Some(true) => ToggleState::Off,
            Some(false) => ToggleState::On,
            None => ToggleState::Unknown,
        }
    }

    /// The action the heating button offers in this state.
    pub fn action(&self) -> ToggleAction {
        match self {
            ToggleState::On => ToggleAction::TurnOff,
            ToggleState::Off => ToggleAction::TurnOn,
            ToggleState::Unknown => ToggleAction::Disabled,
        }
    }
}

/// What pressing the heating button does next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleAction {
    TurnOff,
    TurnOn,
    Disabled,
}

impl ToggleAction {
    pub fn label(&self) -> &'static str {
        match self {
            ToggleAction::TurnOff => "TURN OFF",
            ToggleAction::TurnOn => "TURN ON",
            ToggleAction::Disabled => "DISABLED",
        }
    }

    /// Body value sent to the heating endpoint when the action fires.
    /// `Disabled` still issues the request, with a null `turnOff`.
    pub fn turn_off(&self) -> Option<bool> {
        match self {
            ToggleAction::TurnOff => Some(true),
            ToggleAction::TurnOn => Some(false),
            ToggleAction::Disabled => None,
        }
    }
}

/// A simulated temperature device on the helper side.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceReading {
    pub name: String,
    pub reading: Option<f64>,
}

/// Configuration for both binaries.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_host: String,
    pub api_port: u16,
    pub temperature_poll_secs: u64,
    pub heating_poll_secs: u64,
    pub listing_poll_secs: u64,
    pub heartbeat_secs: u64,
    pub simulation_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        Ok(Config {
            api_host: std::env::var("IOT_API_HOST")
                .unwrap_or_else(|_| "localhost".to_string()),
            api_port: std::env::var("IOT_API_PORT")
                .unwrap_or_else(|_| "8082".to_string())
                .parse()
                .unwrap_or(8082),
            temperature_poll_secs: std::env::var("IOT_TEMPERATURE_POLL_SECS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .unwrap_or(3),
            heating_poll_secs: std::env::var("IOT_HEATING_POLL_SECS")
                .unwrap_or_else(|_| "6".to_string())
                .parse()
                .unwrap_or(6),
            listing_poll_secs: std::env::var("IOT_LISTING_POLL_SECS")
                .unwrap_or_else(|_| "15".to_string())
                .parse()
                .unwrap_or(15),
            heartbeat_secs: std::env::var("IOT_HEARTBEAT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
            simulation_secs: std::env::var("IOT_SIMULATION_SECS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .unwrap_or(3),
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.api_host, self.api_port)
    }

    pub fn temperature_interval(&self) -> Duration {
        Duration::from_secs(self.temperature_poll_secs)
    }

    pub fn heating_interval(&self) -> Duration {
        Duration::from_secs(self.heating_poll_secs)
    }

    pub fn listing_interval(&self) -> Duration {
        Duration::from_secs(self.listing_poll_secs)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs)
    }

    pub fn simulation_interval(&self) -> Duration {
        Duration::from_secs(self.simulation_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_temperature_rounding() {
        // mean 21.48 -> integer 21, first decimal 4.8 rounded to 5
        let display = DisplayTemperature::from_celsius(21.48);
        assert_eq!(display.integer, 21);
        assert_eq!(display.tenths, 5);
    }

    #[test]
    fn test_display_temperature_digit_ten_normalizes_to_zero() {
        let display = DisplayTemperature::from_celsius(21.96);
        assert_eq!(display.integer, 21);
        assert_eq!(display.tenths, 0);
    }

    #[test]
    fn test_display_temperature_negative_mean() {
        let display = DisplayTemperature::from_celsius(-0.25);
        assert_eq!(display.integer, -1);
        assert_eq!(display.tenths, 8);
    }

    #[test]
    fn test_display_temperature_formats_with_unit() {
        let display = DisplayTemperature::from_celsius(21.48);
        assert_eq!(display.to_string(), "21.5°C");
    }

    #[test]
    fn test_toggle_state_round_trip() {
        assert_eq!(
            ToggleState::from_user_turned_off(Some(false)),
            ToggleState::On
        );
        assert_eq!(ToggleState::On.action().label(), "TURN OFF");
        assert_eq!(ToggleState::On.action().turn_off(), Some(true));

        assert_eq!(
            ToggleState::from_user_turned_off(Some(true)),
            ToggleState::Off
        );
        assert_eq!(ToggleState::Off.action().label(), "TURN ON");
        assert_eq!(ToggleState::Off.action().turn_off(), Some(false));

        assert_eq!(
            ToggleState::from_user_turned_off(None),
            ToggleState::Unknown
        );
        assert_eq!(ToggleState::Unknown.action().label(), "DISABLED");
        assert_eq!(ToggleState::Unknown.action().turn_off(), None);
    }

    #[test]
    fn test_block_heating_serializes_null_turn_off() {
        let body = BlockHeating { turn_off: None };
        assert_eq!(serde_json::to_string(&body).unwrap(), r#"{"turnOff":null}"#);

        let body = BlockHeating {
            turn_off: Some(true),
        };
        assert_eq!(serde_json::to_string(&body).unwrap(), r#"{"turnOff":true}"#);
    }

    #[test]
    fn test_temperature_response_tolerates_missing_payload() {
        let resp: TemperatureResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.temperatures.is_none());

        let resp: TemperatureResponse =
            serde_json::from_str(r#"{"temperatures":null}"#).unwrap();
        assert!(resp.temperatures.is_none());

        let resp: TemperatureResponse =
            serde_json::from_str(r#"{"temperatures":{"device-1":21.5}}"#).unwrap();
        assert_eq!(resp.temperatures.unwrap().get("device-1"), Some(&21.5));
    }

    #[test]
    fn test_heating_setting_wire_names() {
        let json = r#"{"setting":"INCREASING","value":0.5,"userTurnedOff":false}"#;
        let setting: HeatingSetting = serde_json::from_str(json).unwrap();
        assert_eq!(setting.setting, "INCREASING");
        assert_eq!(setting.value, Some(0.5));
        assert_eq!(setting.user_turned_off, Some(false));
    }
}
