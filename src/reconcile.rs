//! Pure reconciliation policies: raw server payload + previous view state
//! in, next view state out. Kept free of I/O so every screen's policy can
//! be tested without a server.

use rand::Rng;
use std::collections::HashMap;

use crate::models::{DeviceReading, DisplayTemperature, HeatingSetting, HouseListing, ToggleState};

/// Average the per-device readings of a home and split the mean for
/// display. An absent or empty reading map yields `None` ("no data")
/// rather than an update.
pub fn average_and_round(
    temperatures: Option<&HashMap<String, f64>>,
) -> Option<DisplayTemperature> {
    let temperatures = temperatures?;
    if temperatures.is_empty() {
        return None;
    }

    let mean = temperatures.values().sum::<f64>() / temperatures.len() as f64;
    Some(DisplayTemperature::from_celsius(mean))
}

/// Reduce a house listing to its sorted home names. A null listing keeps
/// the previous state, so the caller applies nothing on `None`.
pub fn merge_house_names(listing: Option<&HouseListing>) -> Option<Vec<String>> {
    listing.map(|houses| {
        let mut names: Vec<String> = houses.keys().cloned().collect();
        names.sort();
        names
    })
}

/// Parse one device out of its single-entry wire map. Maps with any other
/// key count carry no usable device and are dropped.
pub fn device_from_entry(entry: &HashMap<String, Option<f64>>) -> Option<DeviceReading> {
    if entry.len() != 1 {
        return None;
    }

    entry.iter().next().map(|(name, reading)| DeviceReading {
        name: name.clone(),
        reading: *reading,
    })
}

/// One fresh simulated reading: uniform in [-3.5, 3.5], two decimals.
pub fn simulated_reading<R: Rng>(rng: &mut R) -> f64 {
    let raw: f64 = rng.gen_range(-3.5..=3.5);
    (raw * 100.0).round() / 100.0
}

/// Regenerate every device's reading. The returned set of device names is
/// identical to the input's.
pub fn simulate_readings(devices: &[DeviceReading]) -> Vec<DeviceReading> {
    let mut rng = rand::thread_rng();

    devices
        .iter()
        .map(|device| DeviceReading {
            name: device.name.clone(),
            reading: Some(simulated_reading(&mut rng)),
        })
        .collect()
}

/// What the heating panel shows for the current setting and block state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeatingIndicator {
    NoData,
    TurnedOff,
    Decreasing(String),
    Increasing(String),
    Steady(String),
}

/// Classify the heating payload for display. The user block wins over the
/// reported setting; a missing payload or value reads as "no data".
pub fn heating_indicator(
    setting: Option<&HeatingSetting>,
    toggle: ToggleState,
) -> HeatingIndicator {
    let Some(setting) = setting else {
        return HeatingIndicator::NoData;
    };

    if toggle == ToggleState::Off {
        return HeatingIndicator::TurnedOff;
    }

    match setting.value {
        Some(value) if value < 0.0 => HeatingIndicator::Decreasing(setting.setting.clone()),
        Some(value) if value > 0.0 => HeatingIndicator::Increasing(setting.setting.clone()),
        Some(_) => HeatingIndicator::Steady(setting.setting.clone()),
        None => HeatingIndicator::NoData,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashSet;

    fn readings(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), *value))
            .collect()
    }

    #[test]
    fn test_average_and_round_two_devices() {
        let temps = readings(&[("a", 21.0), ("b", 21.96)]);
        let display = average_and_round(Some(&temps)).unwrap();
        assert_eq!(display.integer, 21);
        assert_eq!(display.tenths, 5);
    }

    #[test]
    fn test_average_and_round_absent_payload_is_no_update() {
        assert!(average_and_round(None).is_none());
    }

    #[test]
    fn test_average_and_round_empty_map_is_no_data() {
        let temps = readings(&[]);
        assert!(average_and_round(Some(&temps)).is_none());
    }

    #[test]
    fn test_merge_house_names_sorts_keys() {
        let mut listing: HouseListing = HashMap::new();
        listing.insert("villa".to_string(), Vec::new());
        listing.insert("cabin".to_string(), Vec::new());

        let names = merge_house_names(Some(&listing)).unwrap();
        assert_eq!(names, vec!["cabin".to_string(), "villa".to_string()]);

        assert!(merge_house_names(None).is_none());
    }

    #[test]
    fn test_device_from_entry_requires_exactly_one_key() {
        let mut entry = HashMap::new();
        entry.insert("device-1".to_string(), Some(1.25));
        let device = device_from_entry(&entry).unwrap();
        assert_eq!(device.name, "device-1");
        assert_eq!(device.reading, Some(1.25));

        entry.insert("device-2".to_string(), None);
        assert!(device_from_entry(&entry).is_none());
        assert!(device_from_entry(&HashMap::new()).is_none());
    }

    #[test]
    fn test_simulated_reading_range_and_precision() {
        let mut rng = rand::thread_rng();
        for _ in 0..1000 {
            let reading = simulated_reading(&mut rng);
            assert!((-3.5..=3.5).contains(&reading), "out of range: {reading}");
            let cents = reading * 100.0;
            assert!(
                (cents - cents.round()).abs() < 1e-9,
                "more than two decimals: {reading}"
            );
        }
    }

    #[test]
    fn test_simulate_readings_preserves_key_set() {
        let devices = vec![
            DeviceReading {
                name: "device-1".to_string(),
                reading: Some(1.0),
            },
            DeviceReading {
                name: "device-2".to_string(),
                reading: None,
            },
        ];

        let next = simulate_readings(&devices);
        let before: HashSet<&str> = devices.iter().map(|d| d.name.as_str()).collect();
        let after: HashSet<&str> = next.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(before, after);
        assert!(next.iter().all(|d| d.reading.is_some()));
    }

    #[test]
    fn test_heating_indicator_classification() {
        let setting = |value: Option<f64>| HeatingSetting {
            setting: "SETTING".to_string(),
            value,
            user_turned_off: Some(false),
        };

        assert_matches!(
            heating_indicator(None, ToggleState::Unknown),
            HeatingIndicator::NoData
        );
        assert_matches!(
            heating_indicator(Some(&setting(Some(0.5))), ToggleState::Off),
            HeatingIndicator::TurnedOff
        );
        assert_eq!(
            heating_indicator(Some(&setting(Some(-0.5))), ToggleState::On),
            HeatingIndicator::Decreasing("SETTING".to_string())
        );
        assert_eq!(
            heating_indicator(Some(&setting(Some(0.5))), ToggleState::On),
            HeatingIndicator::Increasing("SETTING".to_string())
        );
        assert_eq!(
            heating_indicator(Some(&setting(Some(0.0))), ToggleState::On),
            HeatingIndicator::Steady("SETTING".to_string())
        );
        assert_matches!(
            heating_indicator(Some(&setting(None)), ToggleState::On),
            HeatingIndicator::NoData
        );
    }
}
