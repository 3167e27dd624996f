use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ParseRunStateError;

/// Whether a live location subscription is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunState {
    #[default]
    Stopped,
    Started,
}

impl RunState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "STOPPED",
            Self::Started => "STARTED",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunState {
    type Err = ParseRunStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "STOPPED" => Ok(Self::Stopped),
            "STARTED" => Ok(Self::Started),
            other => Err(ParseRunStateError::new(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderId(pub String);

impl ProviderId {
    pub const GPS: &'static str = "gps";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn gps() -> Self {
        Self(Self::GPS.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    OutOfService,
    TemporarilyUnavailable,
    Available,
}

/// One reading from a provider. The speed is optional: a fix without
/// velocity is still a valid sample.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "SpeedSampleRepr")]
pub struct SpeedSample {
    speed_mps: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
}

impl SpeedSample {
    /// Negative and non-finite speeds are treated as missing.
    pub fn with_speed(speed_mps: f64) -> Self {
        let speed_mps = (speed_mps.is_finite() && speed_mps >= 0.0).then_some(speed_mps);
        Self {
            speed_mps,
            time: None,
        }
    }

    pub fn without_speed() -> Self {
        Self::default()
    }

    pub fn at(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }

    pub fn has_speed(&self) -> bool {
        self.speed_mps.is_some()
    }

    pub fn speed_mps(&self) -> Option<f64> {
        self.speed_mps
    }
}

#[derive(Deserialize)]
struct SpeedSampleRepr {
    #[serde(default)]
    speed_mps: Option<f64>,
    #[serde(default)]
    time: Option<DateTime<Utc>>,
}

impl From<SpeedSampleRepr> for SpeedSample {
    fn from(repr: SpeedSampleRepr) -> Self {
        let sample = match repr.speed_mps {
            Some(speed) => Self::with_speed(speed),
            None => Self::without_speed(),
        };
        Self {
            time: repr.time,
            ..sample
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedReading {
    pub mps: f64,
    pub kmh: i64,
}

impl SpeedReading {
    pub fn from_mps(mps: f64) -> Self {
        Self {
            mps,
            kmh: (mps * 3.6 + 0.5).floor() as i64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionParams {
    pub min_time_millis: u64,
    pub min_distance_meters: u64,
}

impl SubscriptionParams {
    /// Deliver every update, no time or distance throttling.
    pub const UNTHROTTLED: Self = Self {
        min_time_millis: 0,
        min_distance_meters: 0,
    };
}

impl Default for SubscriptionParams {
    fn default() -> Self {
        Self::UNTHROTTLED
    }
}
