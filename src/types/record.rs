//! The observation record handed over by the host once per archive interval.

use crate::types::unit_system::UnitSystem;
use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// A finished archive record: a timestamp, the unit system every value is
/// expressed in, and the observed values keyed by observation type
/// (`outTemp`, `soilTemp1`, ...).
///
/// Records deserialize from the host's packet shape, where the observation
/// types sit next to `dateTime` and `usUnits`. Values that are `null` or not
/// numeric are dropped, so a missing sensor and an absent key look the same.
///
/// # Examples
///
/// ```
/// use wns::{ObservationRecord, UnitSystem};
///
/// let record: ObservationRecord = serde_json::from_str(
///     r#"{"dateTime": 1700000000, "usUnits": 16, "outTemp": 20.0, "rain": null}"#,
/// ).unwrap();
///
/// assert_eq!(record.unit_system(), UnitSystem::Metric);
/// assert_eq!(record.get("outTemp"), Some(20.0));
/// assert_eq!(record.get("rain"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    #[serde(rename = "dateTime", with = "chrono::serde::ts_seconds")]
    date_time: DateTime<Utc>,
    #[serde(rename = "usUnits", deserialize_with = "unit_system_code")]
    unit_system: UnitSystem,
    #[serde(flatten, deserialize_with = "numeric_values")]
    values: BTreeMap<String, f64>,
}

/// Accepts the unit code as an integer or as an integral float (`16.0`).
fn unit_system_code<'de, D>(deserializer: D) -> Result<UnitSystem, D::Error>
where
    D: Deserializer<'de>,
{
    let code = f64::deserialize(deserializer)?;
    if code.fract() != 0.0 || !(0.0..=f64::from(u8::MAX)).contains(&code) {
        return Err(D::Error::custom(format!("invalid unit system code {code}")));
    }
    UnitSystem::try_from(code as u8).map_err(D::Error::custom)
}

fn numeric_values<'de, D>(deserializer: D) -> Result<BTreeMap<String, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(key, value)| value.as_f64().map(|v| (key, v)))
        .collect())
}

impl ObservationRecord {
    pub fn new(date_time: DateTime<Utc>, unit_system: UnitSystem) -> Self {
        Self {
            date_time,
            unit_system,
            values: BTreeMap::new(),
        }
    }

    /// Adds or replaces a value, returning the record for chaining.
    pub fn with(mut self, observation: impl Into<String>, value: f64) -> Self {
        self.insert(observation, value);
        self
    }

    pub fn insert(&mut self, observation: impl Into<String>, value: f64) {
        self.values.insert(observation.into(), value);
    }

    pub fn date_time(&self) -> DateTime<Utc> {
        self.date_time
    }

    pub fn unit_system(&self) -> UnitSystem {
        self.unit_system
    }

    pub fn get(&self, observation: &str) -> Option<f64> {
        self.values.get(observation).copied()
    }

    pub fn contains(&self, observation: &str) -> bool {
        self.values.contains_key(observation)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns a copy with the one-hour tendencies filled in where the record
    /// carries the current and the one-hour-old value but not the difference:
    /// `outTempDiff1h = outTemp - outTemp1h` and
    /// `barometerDiff1h = barometer - barometer1h`.
    pub fn with_tendencies(&self) -> ObservationRecord {
        let mut record = self.clone();
        for (diff, now, hour_ago) in [
            ("outTempDiff1h", "outTemp", "outTemp1h"),
            ("barometerDiff1h", "barometer", "barometer1h"),
        ] {
            if record.contains(diff) {
                continue;
            }
            if let (Some(now), Some(hour_ago)) = (self.get(now), self.get(hour_ago)) {
                record.insert(diff, now - hour_ago);
            }
        }
        record
    }
}
