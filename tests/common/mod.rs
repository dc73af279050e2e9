#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use nexus_vitals::{
    FeedConnector, FeedEvent, FeedLink, FeedSink, ManualClock, MonitorBuilder, SyntheticGenerator,
    Timings, TransportError, VitalsFetcher, VitalsMonitor,
};
use serde_json::Value;
use tokio::sync::Notify;
use tokio::time::Instant;

/// What a fake socket does when opened
#[derive(Clone, Copy, Debug)]
pub enum OnOpen {
    /// Nothing until the test emits events through the sink
    Wait,
    /// Report open straight away
    Accept,
    /// Error then abnormal close, like an unreachable host
    Fail,
}

#[derive(Default)]
struct FeedLog {
    script: VecDeque<OnOpen>,
    sinks: Vec<FeedSink>,
    closes: Vec<u16>,
}

/// Socket connector driven by the test
#[derive(Clone, Default)]
pub struct FakeFeed {
    log: Arc<Mutex<FeedLog>>,
}

impl FakeFeed {
    pub fn scripted(script: &[OnOpen]) -> Self {
        let feed = FakeFeed::default();
        feed.log.lock().unwrap().script = script.iter().copied().collect();
        feed
    }

    pub fn opens(&self) -> usize {
        self.log.lock().unwrap().sinks.len()
    }

    pub fn closes(&self) -> Vec<u16> {
        self.log.lock().unwrap().closes.clone()
    }

    /// Sink of the most recent connection
    pub fn sink(&self) -> FeedSink {
        self.log
            .lock()
            .unwrap()
            .sinks
            .last()
            .cloned()
            .expect("no socket opened yet")
    }

    pub fn send(&self, text: &str) {
        self.sink().emit(FeedEvent::Message(text.to_string()));
    }
}

struct FakeLink {
    log: Arc<Mutex<FeedLog>>,
}

impl FeedLink for FakeLink {
    fn close(&mut self, code: u16, _reason: &str) {
        self.log.lock().unwrap().closes.push(code);
    }
}

impl FeedConnector for FakeFeed {
    fn open(&self, sink: FeedSink) -> Box<dyn FeedLink> {
        let behaviour = {
            let mut log = self.log.lock().unwrap();
            log.sinks.push(sink.clone());
            log.script.pop_front().unwrap_or(OnOpen::Wait)
        };

        match behaviour {
            OnOpen::Wait => {}
            OnOpen::Accept => {
                sink.emit(FeedEvent::Open);
            }
            OnOpen::Fail => {
                sink.emit(FeedEvent::Error("connection refused".to_string()));
                sink.emit(FeedEvent::Closed {
                    code: 1006,
                    reason: String::new(),
                });
            }
        }

        Box::new(FakeLink {
            log: Arc::clone(&self.log),
        })
    }
}

pub enum Reply {
    Ok(Value),
    Fail,
    /// Answer only once the notify is triggered
    Gate(Arc<Notify>, Value),
}

#[derive(Default)]
struct FetchLog {
    replies: VecDeque<Reply>,
    calls: Vec<Instant>,
}

/// Vitals endpoint that fails unless told otherwise
#[derive(Clone, Default)]
pub struct FakeFetcher {
    log: Arc<Mutex<FetchLog>>,
}

impl FakeFetcher {
    pub fn reply(&self, reply: Reply) {
        self.log.lock().unwrap().replies.push_back(reply);
    }

    pub fn calls(&self) -> Vec<Instant> {
        self.log.lock().unwrap().calls.clone()
    }
}

#[async_trait]
impl VitalsFetcher for FakeFetcher {
    async fn fetch(&self) -> Result<Value, TransportError> {
        let reply = {
            let mut log = self.log.lock().unwrap();
            log.calls.push(Instant::now());
            log.replies.pop_front().unwrap_or(Reply::Fail)
        };

        match reply {
            Reply::Ok(value) => Ok(value),
            Reply::Fail => Err(TransportError::Status(503)),
            Reply::Gate(gate, value) => {
                gate.notified().await;
                Ok(value)
            }
        }
    }
}

pub fn origin() -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339("2026-03-01T10:00:00+00:00").unwrap()
}

/// Builder over the fakes with a paused-time clock and a fixed seed
pub fn builder(feed: &FakeFeed, fetcher: &FakeFetcher) -> MonitorBuilder {
    VitalsMonitor::builder(feed.clone(), fetcher.clone())
        .clock(ManualClock::starting_at(origin()))
        .timings(Timings::default())
        .generator(SyntheticGenerator::seeded(7))
}

/// Let every ready task run before continuing
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

// The timer wheel rounds deadlines up to the next millisecond
pub fn assert_near(actual: Duration, expected: Duration) {
    assert!(
        actual >= expected && actual <= expected + Duration::from_millis(20),
        "expected ~{:?}, got {:?}",
        expected,
        actual
    );
}
