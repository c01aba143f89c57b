use crate::errors::Error;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of physical quantity a sensor reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum SensorType {
    Temperature,
    Motion,
    Humidity,
    Light,
    AirQuality,
    Co2,
    Contact,
    Pressure,
}

impl SensorType {
    pub const ALL: [SensorType; 8] = [
        SensorType::Temperature,
        SensorType::Motion,
        SensorType::Humidity,
        SensorType::Light,
        SensorType::AirQuality,
        SensorType::Co2,
        SensorType::Contact,
        SensorType::Pressure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SensorType::Temperature => "temperature",
            SensorType::Motion => "motion",
            SensorType::Humidity => "humidity",
            SensorType::Light => "light",
            SensorType::AirQuality => "air_quality",
            SensorType::Co2 => "co2",
            SensorType::Contact => "contact",
            SensorType::Pressure => "pressure",
        }
    }
}

impl FromStr for SensorType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SensorType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::invalid("type", s))
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operational state of a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum SensorStatus {
    Active,
    Inactive,
    Error,
}

impl SensorStatus {
    pub const ALL: [SensorStatus; 3] = [
        SensorStatus::Active,
        SensorStatus::Inactive,
        SensorStatus::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SensorStatus::Active => "active",
            SensorStatus::Inactive => "inactive",
            SensorStatus::Error => "error",
        }
    }
}

impl FromStr for SensorStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SensorStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| Error::invalid("status", s))
    }
}

impl fmt::Display for SensorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored sensor record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Sensor {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub sensor_type: SensorType,
    pub location: String,
    pub value: f64,
    pub unit: String,
    pub status: SensorStatus,
    pub last_reading: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A reading as it arrives over JSON. Devices such as contact or motion
/// sensors report booleans, which are stored as 1.0 / 0.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reading {
    Number(f64),
    Flag(bool),
}

impl Reading {
    pub fn as_f64(self) -> f64 {
        match self {
            Reading::Number(v) => v,
            Reading::Flag(true) => 1.0,
            Reading::Flag(false) => 0.0,
        }
    }
}

/// Request body for both create and update.
///
/// Every field is optional so an omitted field stays distinguishable from an
/// explicit zero or empty value. Create requires all of them, update applies
/// only the ones present. A JSON `null` counts as omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub sensor_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Reading>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Fully validated fields for a new sensor
#[derive(Debug, Clone, PartialEq)]
pub struct NewSensor {
    pub name: String,
    pub sensor_type: SensorType,
    pub location: String,
    pub value: f64,
    pub unit: String,
    pub status: SensorStatus,
}

/// Validated partial update; `None` leaves the stored field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorChanges {
    pub name: Option<String>,
    pub sensor_type: Option<SensorType>,
    pub location: Option<String>,
    pub value: Option<f64>,
    pub unit: Option<String>,
    pub status: Option<SensorStatus>,
}

impl SensorChanges {
    pub fn is_empty(&self) -> bool {
        *self == SensorChanges::default()
    }

    /// Applies the supplied fields to `sensor` and stamps it with `now`.
    pub fn apply(&self, sensor: &mut Sensor, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            sensor.name = name.clone();
        }
        if let Some(sensor_type) = self.sensor_type {
            sensor.sensor_type = sensor_type;
        }
        if let Some(location) = &self.location {
            sensor.location = location.clone();
        }
        if let Some(value) = self.value {
            sensor.value = value;
        }
        if let Some(unit) = &self.unit {
            sensor.unit = unit.clone();
        }
        if let Some(status) = self.status {
            sensor.status = status;
        }
        sensor.updated_at = now;
        sensor.last_reading = now;
    }
}

/// Response for `GET /sensors`
#[derive(Debug, Serialize, Deserialize)]
pub struct SensorList {
    pub sensors: Vec<Sensor>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

pub const ID_PREFIX: &str = "sensor-";

/// Formats the id for the `n`th sensor, zero-padded to three digits.
pub fn format_sensor_id(n: i64) -> String {
    format!("{}{:03}", ID_PREFIX, n)
}

/// Numeric suffix of a generated id, `None` unless the id is the exact prefix
/// followed by one or more ASCII digits.
pub fn sensor_id_number(id: &str) -> Option<i64> {
    let digits = id.strip_prefix(ID_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Current UTC time at the precision timestamps are stored with.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}
