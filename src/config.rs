use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use log::{info, warn};

pub const DEFAULT_WS_URL: &str = "ws://127.0.0.1:8765";
pub const DEFAULT_HTTP_URL: &str = "http://127.0.0.1:8765";
pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000/api";
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Delays and periods used by the orchestrator
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timings {
    /// Wait before polling after an abnormal socket close
    pub close_fallback: Duration,
    /// Wait before polling after a socket error
    pub error_fallback: Duration,
    /// Period of the recurring poll while polling is active
    pub poll_interval: Duration,
    /// Wait before retrying a failed poll in the background
    pub poll_retry: Duration,
    /// Period of the synthetic vitals refresh
    pub synthetic_vitals: Duration,
    /// Period of the synthetic steps/calories increment
    pub synthetic_activity: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Timings {
            close_fallback: Duration::from_secs(2),
            error_fallback: Duration::from_secs(1),
            poll_interval: Duration::from_secs(2),
            poll_retry: Duration::from_secs(30),
            synthetic_vitals: Duration::from_secs(5),
            synthetic_activity: Duration::from_secs(60),
        }
    }
}

/// Runtime configuration for the monitor and its hosts
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MonitorConfig {
    /// WebSocket endpoint pushing vitals
    pub ws_url: String,
    /// REST endpoint returning a vitals snapshot
    pub http_url: String,
    /// Base URL of the backend API (auth, profile, nutrition)
    pub api_base: String,
    /// Address the web host listens on
    pub bind: String,
    pub timings: Timings,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            ws_url: DEFAULT_WS_URL.to_string(),
            http_url: DEFAULT_HTTP_URL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            bind: DEFAULT_BIND.to_string(),
            timings: Timings::default(),
        }
    }
}

impl MonitorConfig {
    /// Load from the process environment
    ///
    /// Recognised variables: `VITALS_WS_URL`, `VITALS_HTTP_URL`,
    /// `NEXUS_API_BASE`, `VITALS_BIND`, and millisecond overrides
    /// `VITALS_CLOSE_FALLBACK_MS`, `VITALS_ERROR_FALLBACK_MS`,
    /// `VITALS_POLL_INTERVAL_MS`, `VITALS_POLL_RETRY_MS`,
    /// `VITALS_SYNTHETIC_VITALS_MS`, `VITALS_SYNTHETIC_ACTIVITY_MS`.
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load using `lookup` in place of the environment
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = MonitorConfig::default();
        let t = defaults.timings;

        MonitorConfig {
            ws_url: text(&lookup, "VITALS_WS_URL", defaults.ws_url),
            http_url: text(&lookup, "VITALS_HTTP_URL", defaults.http_url),
            api_base: text(&lookup, "NEXUS_API_BASE", defaults.api_base),
            bind: text(&lookup, "VITALS_BIND", defaults.bind),
            timings: Timings {
                close_fallback: millis(&lookup, "VITALS_CLOSE_FALLBACK_MS", t.close_fallback),
                error_fallback: millis(&lookup, "VITALS_ERROR_FALLBACK_MS", t.error_fallback),
                poll_interval: millis(&lookup, "VITALS_POLL_INTERVAL_MS", t.poll_interval),
                poll_retry: millis(&lookup, "VITALS_POLL_RETRY_MS", t.poll_retry),
                synthetic_vitals: millis(&lookup, "VITALS_SYNTHETIC_VITALS_MS", t.synthetic_vitals),
                synthetic_activity: millis(
                    &lookup,
                    "VITALS_SYNTHETIC_ACTIVITY_MS",
                    t.synthetic_activity,
                ),
            },
        }
    }
}

fn text(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: String) -> String {
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => {
            info!("{key} not set, using default: {default}");
            default
        }
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T>
where
    T::Err: Display,
{
    let raw = lookup(key)?;
    raw.trim()
        .parse()
        .map_err(|e| warn!("Invalid {key} value {raw:?}: {e}, using default"))
        .ok()
}

fn millis(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: Duration) -> Duration {
    match parsed::<u64>(lookup, key) {
        Some(0) => {
            warn!("{key} must be positive, using default");
            default
        }
        Some(ms) => Duration::from_millis(ms),
        None => default,
    }
}
