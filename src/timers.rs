//! Named, independently cancellable timers.
//!
//! Each timer runs as a small task on the runtime's timer wheel and posts an
//! event carrying a [`TimerToken`] when it fires. Cancelling or rescheduling a
//! timer aborts its task and retires its token, so a firing that was already
//! queued before the cancel is recognised as stale by [`Timers::accept`].

use std::collections::HashMap;
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// The six timers the orchestrator owns
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Fallback to polling after an abnormal socket close
    CloseFallback,
    /// Fallback to polling after a socket error
    ErrorFallback,
    /// Background retry of polling while synthetic data is shown
    PollRetry,
    /// Recurring poll while polling is the active source
    PollInterval,
    /// Short synthetic tick (vitals)
    SyntheticVitals,
    /// Long synthetic tick (steps and calories)
    SyntheticActivity,
}

impl TimerKind {
    pub const ALL: [TimerKind; 6] = [
        TimerKind::CloseFallback,
        TimerKind::ErrorFallback,
        TimerKind::PollRetry,
        TimerKind::PollInterval,
        TimerKind::SyntheticVitals,
        TimerKind::SyntheticActivity,
    ];
}

/// Shortest period a repeating timer runs at
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Identifies one scheduling of a timer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerToken {
    pub kind: TimerKind,
    seq: u64,
}

struct Slot {
    seq: u64,
    repeating: bool,
    task: JoinHandle<()>,
}

pub struct Timers<E> {
    events: UnboundedSender<E>,
    wrap: fn(TimerToken) -> E,
    slots: HashMap<TimerKind, Slot>,
    next_seq: u64,
}

impl<E: Send + 'static> Timers<E> {
    /// # Arguments
    /// * `events` - Channel the firings are posted to
    /// * `wrap` - Turns a token into the owner's event type
    pub fn new(events: UnboundedSender<E>, wrap: fn(TimerToken) -> E) -> Self {
        Timers {
            events,
            wrap,
            slots: HashMap::new(),
            next_seq: 0,
        }
    }

    fn token(&mut self, kind: TimerKind) -> TimerToken {
        self.next_seq += 1;
        TimerToken {
            kind,
            seq: self.next_seq,
        }
    }

    /// Fire once after `delay`, replacing any pending timer of the same kind
    pub fn once(&mut self, kind: TimerKind, delay: Duration) {
        self.cancel(kind);
        let token = self.token(kind);
        let events = self.events.clone();
        let event = (self.wrap)(token);

        let task = tokio::spawn(async move {
            time::sleep(delay).await;
            let _ = events.send(event);
        });

        self.slots.insert(
            kind,
            Slot {
                seq: token.seq,
                repeating: false,
                task,
            },
        );
    }

    /// Fire every `period`, first after one full period, replacing any
    /// pending timer of the same kind
    ///
    /// A period shorter than [`MIN_PERIOD`] is raised to it.
    pub fn every(&mut self, kind: TimerKind, period: Duration) {
        let period = if period < MIN_PERIOD {
            warn!("{:?} period {:?} too short, using {:?}", kind, period, MIN_PERIOD);
            MIN_PERIOD
        } else {
            period
        };
        self.cancel(kind);
        let token = self.token(kind);
        let events = self.events.clone();
        let wrap = self.wrap;

        let task = tokio::spawn(async move {
            let mut ticks = time::interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                if events.send(wrap(token)).is_err() {
                    break;
                }
            }
        });

        self.slots.insert(
            kind,
            Slot {
                seq: token.seq,
                repeating: true,
                task,
            },
        );
    }

    /// Returns whether a timer of this kind was pending
    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        match self.slots.remove(&kind) {
            Some(slot) => {
                slot.task.abort();
                debug!("cancelled {:?} timer", kind);
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        for kind in TimerKind::ALL {
            self.cancel(kind);
        }
    }

    pub fn is_pending(&self, kind: TimerKind) -> bool {
        self.slots.contains_key(&kind)
    }

    /// Check a firing against the current scheduling of its timer
    ///
    /// Returns false for firings of cancelled or replaced timers. A one-shot
    /// timer is no longer pending once its firing has been accepted.
    pub fn accept(&mut self, token: TimerToken) -> bool {
        let current = match self.slots.get(&token.kind) {
            Some(slot) => slot.seq == token.seq,
            None => false,
        };

        if current && self.slots.get(&token.kind).is_some_and(|slot| !slot.repeating) {
            self.slots.remove(&token.kind);
        }

        current
    }
}

impl<E> Drop for Timers<E> {
    fn drop(&mut self) {
        for (_, slot) in self.slots.drain() {
            slot.task.abort();
        }
    }
}
