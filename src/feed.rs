//! WebSocket push feed.
//!
//! The feed carries no acquisition logic: it turns one socket connection into
//! [`FeedEvent`]s and hands them to a [`FeedSink`]. Deciding what an event
//! means is the orchestrator's job.

use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

use crate::error::TransportError;
use crate::orchestrator::Event;

/// Deliberate, user-initiated close
pub const NORMAL_CLOSURE: u16 = 1000;
/// Peer closed without sending a status code
pub const NO_STATUS_RECEIVED: u16 = 1005;
/// Connection dropped without a close handshake
pub const ABNORMAL_CLOSURE: u16 = 1006;

#[derive(Clone, Debug, PartialEq)]
pub enum FeedEvent {
    Open,
    Message(String),
    Closed { code: u16, reason: String },
    Error(String),
}

/// Where one connection's events go
///
/// Every sink is bound to the orchestrator generation that opened it, so
/// events from a connection that has since been replaced are ignored.
#[derive(Clone)]
pub struct FeedSink {
    generation: u64,
    events: UnboundedSender<Event>,
}

impl FeedSink {
    pub(crate) fn new(generation: u64, events: UnboundedSender<Event>) -> Self {
        FeedSink { generation, events }
    }

    /// Returns false once the orchestrator is gone
    pub fn emit(&self, event: FeedEvent) -> bool {
        self.events
            .send(Event::Feed {
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}

/// Handle to an open connection
pub trait FeedLink: Send {
    /// Close the connection; no events follow a deliberate close
    fn close(&mut self, code: u16, reason: &str);
}

/// Opens socket connections
pub trait FeedConnector: Send + Sync + 'static {
    fn open(&self, sink: FeedSink) -> Box<dyn FeedLink>;
}

/// Connects to a `ws://` or `wss://` endpoint
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    pub fn new(url: impl Into<String>) -> Self {
        WsConnector { url: url.into() }
    }
}

impl FeedConnector for WsConnector {
    fn open(&self, sink: FeedSink) -> Box<dyn FeedLink> {
        let (close_tx, close_rx) = oneshot::channel();
        let task = tokio::spawn(run_socket(self.url.clone(), sink, close_rx));

        Box::new(WsLink {
            close: Some(close_tx),
            task,
        })
    }
}

struct WsLink {
    close: Option<oneshot::Sender<(u16, String)>>,
    task: JoinHandle<()>,
}

impl FeedLink for WsLink {
    fn close(&mut self, code: u16, reason: &str) {
        if let Some(close) = self.close.take() {
            if close.send((code, reason.to_string())).is_err() {
                debug!("socket task already finished");
            }
        }
    }
}

impl Drop for WsLink {
    fn drop(&mut self) {
        // Dropped without a close request: nobody is listening any more
        if self.close.is_some() {
            self.task.abort();
        }
    }
}

fn dropped(sink: &FeedSink, error: TransportError) {
    debug!("socket task ending: {:?}", error);
    sink.emit(FeedEvent::Error(error.to_string()));
    sink.emit(FeedEvent::Closed {
        code: ABNORMAL_CLOSURE,
        reason: String::new(),
    });
}

async fn run_socket(url: String, sink: FeedSink, mut close_rx: oneshot::Receiver<(u16, String)>) {
    info!("Attempting to connect to: {}", url);

    let stream = tokio::select! {
        connected = tokio_tungstenite::connect_async(url.as_str()) => match connected {
            Ok((stream, _)) => stream,
            Err(e) => {
                dropped(&sink, e.into());
                return;
            }
        },
        _ = &mut close_rx => return,
    };

    sink.emit(FeedEvent::Open);
    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            request = &mut close_rx => {
                let (code, reason) = request.unwrap_or((NORMAL_CLOSURE, String::new()));
                let frame = CloseFrame {
                    code: CloseCode::from(code),
                    reason: reason.into(),
                };
                if let Err(e) = write.send(Message::Close(Some(frame))).await {
                    debug!("close frame not delivered: {}", e);
                }
                return;
            }
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    sink.emit(FeedEvent::Message(text));
                }
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => {
                        sink.emit(FeedEvent::Message(text));
                    }
                    Err(_) => warn!("ignoring non-UTF-8 binary frame"),
                },
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = frame
                        .map(|f| (u16::from(f.code), f.reason.into_owned()))
                        .unwrap_or((NO_STATUS_RECEIVED, String::new()));
                    sink.emit(FeedEvent::Closed { code, reason });
                    return;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    dropped(&sink, e.into());
                    return;
                }
                None => {
                    sink.emit(FeedEvent::Closed {
                        code: ABNORMAL_CLOSURE,
                        reason: String::new(),
                    });
                    return;
                }
            }
        }
    }
}
