use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Blood pressure reading in mmHg
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloodPressure {
    pub systolic: u32,
    pub diastolic: u32,
}

/// Full set of current vital-sign readings
///
/// A snapshot is never edited once published: every update from any source
/// builds a new value which replaces the previous one as a whole.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthMetricsSnapshot {
    /// Beats per minute
    pub heart_rate: u32,

    /// Steps counted since midnight; never decreases within a day
    pub steps_today: u32,

    /// Active calories since midnight; never decreases within a day
    pub calories_burned: u32,

    pub blood_pressure: BloodPressure,

    /// SpO2 percentage in `[0, 100]`
    pub blood_oxygen_level: u8,

    pub stress_level: f64,

    /// Degrees Fahrenheit
    pub body_temperature: f64,

    /// When this snapshot was produced
    pub timestamp: DateTime<FixedOffset>,
}

impl HealthMetricsSnapshot {
    /// A snapshot with every reading at zero
    ///
    /// Used as the base when a live payload arrives before any other data,
    /// so fields the device omits show as zero rather than being invented.
    pub fn empty(timestamp: DateTime<FixedOffset>) -> Self {
        HealthMetricsSnapshot {
            heart_rate: 0,
            steps_today: 0,
            calories_burned: 0,
            blood_pressure: BloodPressure::default(),
            blood_oxygen_level: 0,
            stress_level: 0.0,
            body_temperature: 0.0,
            timestamp,
        }
    }

    /// Whether `other` falls on the same calendar day as this snapshot,
    /// judged in this snapshot's UTC offset
    pub fn same_day(&self, other: &DateTime<FixedOffset>) -> bool {
        other.with_timezone(self.timestamp.offset()).date_naive() == self.timestamp.date_naive()
    }
}

/// A real (non-synthetic) source of readings
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiveSource {
    WebSocket,
    Http,
}

/// Connection status owned by the orchestrator
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "via", rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected(LiveSource),
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connecting => "Connecting...",
            ConnectionState::Connected(_) => "Connected",
        }
    }
}

/// Whichever source is currently supplying snapshot updates
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    WebSocket,
    Http,
    Synthetic,
}

/// Read-only view published to observers
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorView {
    /// Absent until the first reading from any source
    pub metrics: Option<HealthMetricsSnapshot>,

    pub status: ConnectionState,

    /// True while the displayed readings are locally generated
    pub synthetic: bool,

    pub last_update: Option<DateTime<FixedOffset>>,

    /// Human-readable note about the last connectivity problem
    pub message: Option<String>,
}

impl MonitorView {
    pub fn active_source(&self) -> Option<DataSource> {
        match self.status {
            ConnectionState::Connected(LiveSource::WebSocket) => Some(DataSource::WebSocket),
            ConnectionState::Connected(LiveSource::Http) => Some(DataSource::Http),
            _ if self.synthetic => Some(DataSource::Synthetic),
            _ => None,
        }
    }

    /// Short label telling live data apart from simulated data
    pub fn data_label(&self) -> &'static str {
        match (self.active_source(), self.status) {
            (Some(DataSource::Synthetic), _) => "Simulated Data",
            (Some(_), _) => "Live Data",
            (None, ConnectionState::Connecting) => "Connecting...",
            (None, _) => "No Connection",
        }
    }
}
