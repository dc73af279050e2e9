use std::sync::Arc;

use log::debug;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::sync::{oneshot, watch};

use crate::clock::{Clock, SystemClock};
use crate::config::{MonitorConfig, Timings};
use crate::feed::{FeedConnector, WsConnector};
use crate::metrics::MonitorView;
use crate::orchestrator::{Command, Orchestrator, Request};
use crate::poller::{HttpPoller, VitalsFetcher};
use crate::synthetic::SyntheticGenerator;

/// Handle to a running vitals orchestrator
///
/// Cheap to clone. Every clone talks to the same orchestrator task; the task
/// tears its sources down once the last handle is dropped or [`stop`] is
/// called.
///
/// [`stop`]: VitalsMonitor::stop
#[derive(Clone)]
pub struct VitalsMonitor {
    requests: UnboundedSender<Request>,
    view: watch::Receiver<MonitorView>,
}

impl VitalsMonitor {
    /// Start configuring a monitor over the given transports
    ///
    /// # Arguments
    /// * `connector` - Opens the push feed
    /// * `fetcher` - Performs one poll of the REST endpoint
    pub fn builder(
        connector: impl FeedConnector,
        fetcher: impl VitalsFetcher,
    ) -> MonitorBuilder {
        MonitorBuilder {
            connector: Arc::new(connector),
            fetcher: Arc::new(fetcher),
            clock: Arc::new(SystemClock),
            timings: Timings::default(),
            generator: None,
            autoconnect: true,
        }
    }

    /// Builder wired to the real WebSocket and HTTP endpoints in `config`
    pub fn from_config(config: &MonitorConfig) -> MonitorBuilder {
        Self::builder(
            WsConnector::new(config.ws_url.clone()),
            HttpPoller::new(config.http_url.clone()),
        )
        .timings(config.timings)
    }

    async fn send(&self, command: Command) {
        let (done, ack) = oneshot::channel();
        if self.requests.send(Request { command, done }).is_err() {
            debug!("{:?} ignored, orchestrator already stopped", command);
            return;
        }
        let _ = ack.await;
    }

    /// Open the WebSocket feed, leaving any other live source
    pub async fn connect(&self) {
        self.send(Command::Connect).await
    }

    /// Switch to HTTP polling
    pub async fn poll(&self) {
        self.send(Command::Poll).await
    }

    /// Show synthetic readings with no live source
    pub async fn demo(&self) {
        self.send(Command::Demo).await
    }

    /// Stop every source; the monitor can be reconnected afterwards
    pub async fn disconnect(&self) {
        self.send(Command::Disconnect).await
    }

    /// Stop every source and end the orchestrator task
    pub async fn stop(&self) {
        self.send(Command::Stop).await
    }

    /// Current view
    pub fn view(&self) -> MonitorView {
        self.view.borrow().clone()
    }

    /// Receiver that is notified on every published view
    pub fn subscribe(&self) -> watch::Receiver<MonitorView> {
        self.view.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.requests.is_closed()
    }
}

pub struct MonitorBuilder {
    connector: Arc<dyn FeedConnector>,
    fetcher: Arc<dyn VitalsFetcher>,
    clock: Arc<dyn Clock>,
    timings: Timings,
    generator: Option<SyntheticGenerator>,
    autoconnect: bool,
}

impl MonitorBuilder {
    pub fn clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    /// Synthetic generator to use; defaults to one seeded from entropy
    pub fn generator(mut self, generator: SyntheticGenerator) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Whether to open the feed as soon as the monitor is spawned (default true)
    pub fn autoconnect(mut self, autoconnect: bool) -> Self {
        self.autoconnect = autoconnect;
        self
    }

    /// Spawn the orchestrator task on the current tokio runtime
    ///
    /// With autoconnect the feed is already being opened when this returns,
    /// so the first view a caller sees is `Connecting`.
    pub fn spawn(self) -> VitalsMonitor {
        let (requests_tx, requests_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(MonitorView::default());

        let mut orchestrator = Orchestrator::new(
            self.connector,
            self.fetcher,
            self.clock,
            self.timings,
            self.generator.unwrap_or_default(),
            events_tx,
            view_tx,
        );
        if self.autoconnect {
            orchestrator.start();
        }

        tokio::spawn(orchestrator.run(requests_rx, events_rx));

        VitalsMonitor {
            requests: requests_tx,
            view: view_rx,
        }
    }
}
