//! Source selection and lifecycle for the vitals view.
//!
//! The orchestrator is the only owner of the snapshot and the connection
//! state. It runs as a single task that handles one event at a time: control
//! requests from monitor handles, socket events, poll completions and timer
//! firings. Network I/O and timers run as separate tasks that post events
//! back, so nothing here ever blocks.
//!
//! Fallback chain: WebSocket, then HTTP polling, then synthetic readings
//! while polling is retried in the background.
//!
//! Every source activation bumps `generation`. Socket events and poll
//! results carry the generation they were issued under and are dropped when
//! it no longer matches, which keeps a late answer from a retired source from
//! overwriting a newer snapshot.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use log::{debug, info, warn};
use serde_json::Value;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use crate::clock::Clock;
use crate::config::Timings;
use crate::error::TransportError;
use crate::feed::{FeedConnector, FeedEvent, FeedLink, FeedSink, NORMAL_CLOSURE};
use crate::fields;
use crate::metrics::{ConnectionState, HealthMetricsSnapshot, LiveSource, MonitorView};
use crate::poller::VitalsFetcher;
use crate::synthetic::SyntheticGenerator;
use crate::timers::{TimerKind, TimerToken, Timers};

pub const SOCKET_FAILED_MESSAGE: &str = "WebSocket failed. Trying HTTP polling...";
pub const SIMULATED_MESSAGE: &str = "Using simulated data for demonstration";

/// Manual controls exposed through the monitor handle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Connect the WebSocket feed
    Connect,
    /// Switch to HTTP polling
    Poll,
    /// Show synthetic readings without trying any live source
    Demo,
    /// Tear down every source but keep the orchestrator running
    Disconnect,
    /// Tear down every source and end the orchestrator task
    Stop,
}

pub(crate) struct Request {
    pub command: Command,
    pub done: oneshot::Sender<()>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PollKind {
    /// First request after switching to polling
    Attempt,
    /// Recurring request while polling is the active source
    Refresh,
}

pub(crate) enum Event {
    Feed {
        generation: u64,
        event: FeedEvent,
    },
    Poll {
        generation: u64,
        kind: PollKind,
        result: Result<Value, TransportError>,
    },
    Timer(TimerToken),
}

pub(crate) struct Orchestrator {
    connector: Arc<dyn FeedConnector>,
    fetcher: Arc<dyn VitalsFetcher>,
    clock: Arc<dyn Clock>,
    timings: Timings,
    generator: SyntheticGenerator,

    events: UnboundedSender<Event>,
    timers: Timers<Event>,
    view: watch::Sender<MonitorView>,

    state: ConnectionState,
    synthetic_active: bool,
    generation: u64,
    socket: Option<Box<dyn FeedLink>>,
    in_flight: Option<JoinHandle<()>>,

    metrics: Option<HealthMetricsSnapshot>,
    last_update: Option<DateTime<FixedOffset>>,
    message: Option<String>,
}

impl Orchestrator {
    pub(crate) fn new(
        connector: Arc<dyn FeedConnector>,
        fetcher: Arc<dyn VitalsFetcher>,
        clock: Arc<dyn Clock>,
        timings: Timings,
        generator: SyntheticGenerator,
        events: UnboundedSender<Event>,
        view: watch::Sender<MonitorView>,
    ) -> Self {
        let timers = Timers::new(events.clone(), Event::Timer);

        Orchestrator {
            connector,
            fetcher,
            clock,
            timings,
            generator,
            events,
            timers,
            view,
            state: ConnectionState::Disconnected,
            synthetic_active: false,
            generation: 0,
            socket: None,
            in_flight: None,
            metrics: None,
            last_update: None,
            message: None,
        }
    }

    /// Process events until a stop request arrives or every handle is gone
    pub(crate) async fn run(
        mut self,
        mut requests: UnboundedReceiver<Request>,
        mut events: UnboundedReceiver<Event>,
    ) {
        loop {
            tokio::select! {
                request = requests.recv() => match request {
                    Some(Request { command: Command::Stop, done }) => {
                        self.stop();
                        let _ = done.send(());
                        break;
                    }
                    Some(Request { command, done }) => {
                        self.command(command);
                        let _ = done.send(());
                    }
                    None => {
                        debug!("all monitor handles dropped");
                        self.stop();
                        break;
                    }
                },
                Some(event) = events.recv() => self.handle(event),
            }
        }
        info!("vitals orchestrator stopped");
    }

    pub(crate) fn command(&mut self, command: Command) {
        match command {
            Command::Connect => self.start(),
            Command::Poll => self.begin_polling(),
            Command::Demo => self.demo(),
            Command::Disconnect | Command::Stop => self.stop(),
        }
    }

    fn handle(&mut self, event: Event) {
        match event {
            Event::Feed { generation, event } => {
                if generation != self.generation {
                    debug!("discarding event from a retired socket: {:?}", event);
                    return;
                }
                match event {
                    FeedEvent::Open => self.on_socket_open(),
                    FeedEvent::Message(text) => self.on_socket_message(&text),
                    FeedEvent::Closed { code, reason } => self.on_socket_close(code, &reason),
                    FeedEvent::Error(error) => self.on_socket_error(&error),
                }
            }
            Event::Poll {
                generation,
                kind,
                result,
            } => {
                if generation != self.generation {
                    debug!("discarding poll response from a retired source");
                    return;
                }
                self.on_poll_completed(kind, result);
            }
            Event::Timer(token) => {
                if !self.timers.accept(token) {
                    debug!("ignoring stale {:?} firing", token.kind);
                    return;
                }
                self.on_timer(token.kind);
            }
        }
    }

    fn on_timer(&mut self, kind: TimerKind) {
        match kind {
            TimerKind::CloseFallback | TimerKind::ErrorFallback => self.begin_polling(),
            TimerKind::PollRetry => self.try_http_polling(),
            TimerKind::PollInterval => self.issue_poll(PollKind::Refresh),
            TimerKind::SyntheticVitals => self.synthetic_vitals_tick(),
            TimerKind::SyntheticActivity => self.synthetic_activity_tick(),
        }
    }

    fn publish(&self) {
        self.view.send_replace(MonitorView {
            metrics: self.metrics.clone(),
            status: self.state,
            synthetic: self.synthetic_active,
            last_update: self.last_update,
            message: self.message.clone(),
        });
    }

    fn close_socket(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            socket.close(NORMAL_CLOSURE, "Manual disconnect");
        }
    }

    /// Retire the live sources: pending fallbacks, polling, in-flight
    /// requests and the socket. Synthetic generation is left alone.
    fn retire_live_sources(&mut self) {
        self.generation += 1;
        for kind in [
            TimerKind::CloseFallback,
            TimerKind::ErrorFallback,
            TimerKind::PollRetry,
            TimerKind::PollInterval,
        ] {
            self.timers.cancel(kind);
        }
        if let Some(request) = self.in_flight.take() {
            request.abort();
        }
        self.close_socket();
    }

    /// Open the WebSocket feed
    pub fn start(&mut self) {
        if self.state == ConnectionState::Connected(LiveSource::WebSocket) {
            debug!("vitals feed already open");
            return;
        }

        self.retire_live_sources();
        self.state = ConnectionState::Connecting;
        self.message = None;
        let sink = FeedSink::new(self.generation, self.events.clone());
        self.socket = Some(self.connector.open(sink));
        self.publish();
    }

    pub fn on_socket_open(&mut self) {
        info!("vitals feed connected");
        self.timers.cancel(TimerKind::CloseFallback);
        self.timers.cancel(TimerKind::ErrorFallback);
        self.stop_synthetic_generation();
        self.state = ConnectionState::Connected(LiveSource::WebSocket);
        self.message = None;
        self.publish();
    }

    pub fn on_socket_message(&mut self, text: &str) {
        match fields::parse_payload(text) {
            Ok(payload) => self.apply_payload(&payload),
            Err(e) => warn!("Error parsing vitals feed data: {}", e),
        }
    }

    pub fn on_socket_close(&mut self, code: u16, reason: &str) {
        info!("vitals feed closed. Code: {} Reason: {}", code, reason);
        self.socket = None;
        self.state = ConnectionState::Disconnected;

        if code != NORMAL_CLOSURE {
            // An error already scheduled the quicker fallback
            if !self.timers.is_pending(TimerKind::ErrorFallback) {
                warn!("abnormal closure, will try HTTP polling as fallback");
                self.timers
                    .once(TimerKind::CloseFallback, self.timings.close_fallback);
            }
            self.message = Some(SOCKET_FAILED_MESSAGE.to_string());
        }
        self.publish();
    }

    pub fn on_socket_error(&mut self, error: &str) {
        warn!("vitals feed error: {}", error);
        self.state = ConnectionState::Disconnected;
        self.timers.cancel(TimerKind::CloseFallback);
        self.timers
            .once(TimerKind::ErrorFallback, self.timings.error_fallback);
        self.message = Some(SOCKET_FAILED_MESSAGE.to_string());
        self.publish();
    }

    /// Leave whatever live source is active and start polling
    fn begin_polling(&mut self) {
        self.retire_live_sources();
        self.try_http_polling();
    }

    /// One polling attempt; success makes polling the active source
    pub fn try_http_polling(&mut self) {
        // Each attempt is its own activation
        self.generation += 1;
        self.timers.cancel(TimerKind::PollRetry);
        self.timers.cancel(TimerKind::PollInterval);
        if let Some(request) = self.in_flight.take() {
            request.abort();
        }

        self.state = ConnectionState::Connecting;
        self.publish();
        self.issue_poll(PollKind::Attempt);
    }

    fn issue_poll(&mut self, kind: PollKind) {
        if self.in_flight.as_ref().is_some_and(|request| !request.is_finished()) {
            debug!("previous poll still in flight, skipping");
            return;
        }

        let fetcher = Arc::clone(&self.fetcher);
        let events = self.events.clone();
        let generation = self.generation;

        self.in_flight = Some(tokio::spawn(async move {
            let result = fetcher.fetch().await;
            let _ = events.send(Event::Poll {
                generation,
                kind,
                result,
            });
        }));
    }

    fn on_poll_completed(&mut self, kind: PollKind, result: Result<Value, TransportError>) {
        self.in_flight = None;

        match (kind, result) {
            (PollKind::Attempt, Ok(payload)) => {
                info!("HTTP polling successful");
                self.stop_synthetic_generation();
                self.state = ConnectionState::Connected(LiveSource::Http);
                self.message = None;
                self.timers
                    .every(TimerKind::PollInterval, self.timings.poll_interval);
                self.apply_payload(&payload);
            }
            (PollKind::Refresh, Ok(payload)) => self.apply_payload(&payload),
            (PollKind::Attempt, Err(e)) => {
                warn!("HTTP polling failed: {}", e);
                self.state = ConnectionState::Disconnected;
                self.message = Some(SIMULATED_MESSAGE.to_string());
                self.start_synthetic_generation();
                self.timers.once(TimerKind::PollRetry, self.timings.poll_retry);
                self.publish();
            }
            (PollKind::Refresh, Err(e)) => warn!("HTTP polling error: {}", e),
        }
    }

    fn apply_payload(&mut self, payload: &Value) {
        let now = self.clock.now();
        let next = fields::merge(self.metrics.as_ref(), payload, now);
        debug!("received vitals: {:?}", next);

        self.metrics = Some(next);
        self.last_update = Some(now);
        self.publish();
    }

    /// Begin synthetic readings; a no-op if they are already running
    ///
    /// Existing readings are kept as the starting point. Only an empty view
    /// is seeded from the session baseline.
    pub fn start_synthetic_generation(&mut self) {
        if self.synthetic_active {
            return;
        }
        info!("Starting realistic mock data generation...");
        self.synthetic_active = true;

        if self.metrics.is_none() {
            let now = self.clock.now();
            self.metrics = Some(self.generator.seed_snapshot(now));
            self.last_update = Some(now);
        }

        self.timers
            .every(TimerKind::SyntheticVitals, self.timings.synthetic_vitals);
        self.timers
            .every(TimerKind::SyntheticActivity, self.timings.synthetic_activity);
        self.publish();
    }

    fn stop_synthetic_generation(&mut self) {
        if !self.synthetic_active {
            return;
        }
        debug!("stopping synthetic readings");
        self.synthetic_active = false;
        self.timers.cancel(TimerKind::SyntheticVitals);
        self.timers.cancel(TimerKind::SyntheticActivity);
    }

    fn synthetic_tick(
        &mut self,
        step: fn(
            &mut SyntheticGenerator,
            &HealthMetricsSnapshot,
            DateTime<FixedOffset>,
        ) -> HealthMetricsSnapshot,
    ) {
        if !self.synthetic_active {
            return;
        }
        let now = self.clock.now();
        let previous = match self.metrics.take() {
            Some(previous) => previous,
            None => self.generator.seed_snapshot(now),
        };

        self.metrics = Some(step(&mut self.generator, &previous, now));
        self.last_update = Some(now);
        self.publish();
    }

    fn synthetic_vitals_tick(&mut self) {
        self.synthetic_tick(SyntheticGenerator::refresh_vitals);
    }

    fn synthetic_activity_tick(&mut self) {
        self.synthetic_tick(SyntheticGenerator::advance_activity);
    }

    /// Synthetic readings with no live source behind them
    fn demo(&mut self) {
        self.retire_live_sources();
        self.state = ConnectionState::Disconnected;
        self.message = None;
        self.start_synthetic_generation();
        self.publish();
    }

    /// Clear every timer, abort in-flight requests and close the socket
    pub fn stop(&mut self) {
        self.retire_live_sources();
        self.stop_synthetic_generation();
        self.timers.cancel_all();
        self.state = ConnectionState::Disconnected;
        self.message = None;
        self.publish();
    }
}
