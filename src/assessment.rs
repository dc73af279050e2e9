//! Classification of vital readings into display bands.

use serde::{Deserialize, Serialize};

use crate::metrics::HealthMetricsSnapshot;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Low,
    Normal,
    Elevated,
    High,
}

/// Band of every vital in one snapshot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub heart_rate: Band,
    pub blood_oxygen_level: Band,
    pub stress_level: Band,
    pub body_temperature: Band,
}

/// Resting heart rate: below 60 bpm is low, above 100 bpm high
pub fn heart_rate_band(bpm: u32) -> Band {
    match bpm {
        0..=59 => Band::Low,
        60..=100 => Band::Normal,
        _ => Band::High,
    }
}

/// Saturation under 95 % is low; there is no high band
pub fn blood_oxygen_band(percent: u8) -> Band {
    if percent < 95 { Band::Low } else { Band::Normal }
}

pub fn stress_band(score: f64) -> Band {
    if score > 7.0 {
        Band::High
    } else if score > 4.0 {
        Band::Elevated
    } else {
        Band::Normal
    }
}

/// Temperature in °F
pub fn temperature_band(fahrenheit: f64) -> Band {
    if fahrenheit > 99.5 {
        Band::High
    } else if fahrenheit < 97.0 {
        Band::Low
    } else {
        Band::Normal
    }
}

impl Assessment {
    pub fn of(snapshot: &HealthMetricsSnapshot) -> Self {
        Assessment {
            heart_rate: heart_rate_band(snapshot.heart_rate),
            blood_oxygen_level: blood_oxygen_band(snapshot.blood_oxygen_level),
            stress_level: stress_band(snapshot.stress_level),
            body_temperature: temperature_band(snapshot.body_temperature),
        }
    }

    /// True when any vital is outside its normal band
    pub fn needs_attention(&self) -> bool {
        [
            self.heart_rate,
            self.blood_oxygen_level,
            self.stress_level,
            self.body_temperature,
        ]
        .iter()
        .any(|band| *band != Band::Normal)
    }
}
