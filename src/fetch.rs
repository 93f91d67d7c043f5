use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::HubError;

/// Source of raw upstream rate payloads.
///
/// The trait returns the undecoded JSON body so validation stays with the
/// reconciler; tests substitute a scripted source to drive failure paths.
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch(&self) -> Result<Value, HubError>;
}

/// Production source: one GET against the lombard admin endpoint.
pub struct HttpRateSource {
    client: reqwest::Client,
    url: String,
}

impl HttpRateSource {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, HubError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HubError::Internal(format!("http client: {e}")))?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl RateSource for HttpRateSource {
    async fn fetch(&self) -> Result<Value, HubError> {
        let resp = self.client.get(&self.url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(HubError::Fetch(format!("upstream returned {status}")));
        }
        let payload = resp.json::<Value>().await?;
        Ok(payload)
    }
}
