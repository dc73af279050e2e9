use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde_json::Value;

use crate::error::TransportError;
use crate::fields;

/// One request/parse cycle against a vitals endpoint
///
/// Implementations hold no acquisition state; the orchestrator decides when
/// to call and what to do with the answer.
#[async_trait]
pub trait VitalsFetcher: Send + Sync + 'static {
    async fn fetch(&self) -> Result<Value, TransportError>;
}

/// Fetches vitals with a plain HTTP GET
pub struct HttpPoller {
    client: reqwest::Client,
    url: String,
}

impl HttpPoller {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        HttpPoller {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl VitalsFetcher for HttpPoller {
    async fn fetch(&self) -> Result<Value, TransportError> {
        let response = self
            .client
            .get(&self.url)
            .header(ACCEPT, "application/json")
            // Tunnelled device relays serve an HTML interstitial without this
            .header("ngrok-skip-browser-warning", "true")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        Ok(fields::parse_payload(&body)?)
    }
}
