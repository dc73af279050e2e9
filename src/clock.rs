use std::sync::Mutex;

use chrono::{DateTime, FixedOffset, Local};

/// Source of wall-clock time for snapshot timestamps and time-of-day rules
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// The host's local time
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Wall clock that moves with the async runtime's clock
///
/// Starts at a chosen instant and advances with `tokio::time`, so when the
/// runtime's time is paused and advanced in tests, timestamps and hour-of-day
/// rules advance with it. `shift` moves it further without waiting.
pub struct ManualClock {
    origin: DateTime<FixedOffset>,
    started: tokio::time::Instant,
    shift: Mutex<chrono::Duration>,
}

impl ManualClock {
    pub fn starting_at(origin: DateTime<FixedOffset>) -> Self {
        ManualClock {
            origin,
            started: tokio::time::Instant::now(),
            shift: Mutex::new(chrono::Duration::zero()),
        }
    }

    pub fn shift(&self, by: chrono::Duration) {
        let mut shift = self.shift.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *shift += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<FixedOffset> {
        let elapsed = chrono::Duration::from_std(self.started.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        let shift = *self.shift.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.origin + elapsed + shift
    }
}
