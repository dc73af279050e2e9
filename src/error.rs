use thiserror::Error;

/// A vitals payload that could not be turned into readings
#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("malformed JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Failure of one of the live acquisition transports
///
/// Every variant is transient from the orchestrator's point of view: it is
/// turned into a state transition and a log line, never returned further.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("endpoint answered HTTP {0}")]
    Status(u16),

    #[error("unusable payload: {0}")]
    Payload(#[from] PayloadError),

    #[error("socket error: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Errors returned by the backend API client
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("not signed in")]
    MissingToken,
}
