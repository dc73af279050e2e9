/*!
# Nexus Vitals

Real-time acquisition of health metrics from a wearable, built in Rust.

## Overview

The crate keeps one current snapshot of a user's vitals (heart rate, blood
pressure, blood oxygen, stress, body temperature, steps and calories) and
the state of the connection that supplies it. Readings come from the first
source that works:

1. A WebSocket feed pushing JSON readings
2. HTTP polling of a REST endpoint returning the same shape
3. Synthetic readings generated locally, flagged as simulated, while
   polling is retried in the background

Consumers only ever read the published view; they never see which transport
is busy or how it failed, apart from the status and an optional message.

## Architecture

### Acquisition
- **Orchestrator** - A single task owning the snapshot, the connection state
  and six cancellable timers. It reacts to socket events, poll results,
  timer firings and manual controls one at a time.
- **Feed / Poller** - Thin transports behind traits (`FeedConnector`,
  `VitalsFetcher`) so tests can script them.
- **Field extraction** - One alias table maps the many names devices use
  (`heartRate`, `heart_rate`, `steps`, ...) onto the snapshot fields.
- **Synthetic generator** - A per-session baseline with time-of-day aware
  jitter, clamped to plausible ranges.

### Surfaces
- `VitalsMonitor` handle with `connect`, `poll`, `demo`, `disconnect`,
  `stop` and a `watch` subscription to the view
- Optional web host (feature `web`) serving the view as JSON
- `ApiClient` for the Nexus backend (accounts, profile, nutrition)

## Modules

- **metrics**: Snapshot, connection state and the published view
- **fields**: Alias table, payload parsing and merging
- **synthetic**: Synthetic vitals and activity counters
- **orchestrator**: Source selection and fallback chain
- **monitor**: Public handle and builder
- **feed**: WebSocket transport
- **poller**: HTTP transport
- **timers**: Named cancellable timers
- **clock**: Wall-clock abstraction
- **config**: Environment configuration
- **assessment**: Low/normal/high bands per vital
- **api**: Backend API client
- **app**: Routing for the web host

## REST API Endpoints (feature `web`)

- `GET /api/vitals` - Current view
- `GET /api/vitals/assessment` - Bands of the current readings
- `POST /api/vitals/connect`, `/poll`, `/demo`, `/disconnect` - Manual controls
*/

pub mod api;
pub mod assessment;
pub mod clock;
pub mod config;
pub mod error;
pub mod feed;
pub mod fields;
pub mod metrics;
pub mod monitor;
mod orchestrator;
pub mod poller;
pub mod synthetic;
pub mod timers;

#[cfg(feature = "web")]
pub mod app;

pub use api::{ApiClient, UserCredentials};
pub use assessment::{Assessment, Band};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{MonitorConfig, Timings};
pub use error::{ApiError, PayloadError, TransportError};
pub use feed::{FeedConnector, FeedEvent, FeedLink, FeedSink, WsConnector};
pub use metrics::{
    BloodPressure, ConnectionState, DataSource, HealthMetricsSnapshot, LiveSource, MonitorView,
};
pub use monitor::{MonitorBuilder, VitalsMonitor};
pub use orchestrator::{SIMULATED_MESSAGE, SOCKET_FAILED_MESSAGE};
pub use poller::{HttpPoller, VitalsFetcher};
pub use synthetic::SyntheticGenerator;
