use async_trait::async_trait;
use log::{info, warn};

use crate::error::{FeedError, FeedResult};
use crate::raw::{FeedEnvelope, RawPidRecord};

pub const TFGM_METROLINKS_URL: &str = "https://api.tfgm.com/odata/Metrolinks";

/// Source of raw PID rows. Implemented by the real TfGM client and by
/// whatever fixed-sequence stub the engine's tests want to drive.
#[async_trait]
pub trait FeedClient: Send + Sync {
    async fn fetch(&self) -> FeedResult<Vec<RawPidRecord>>;
}

/// Talks to the live TfGM Metrolinks OData feed.
pub struct TfgmFeedClient {
    subscription_key: Option<String>,
    http: reqwest::Client,
}

impl TfgmFeedClient {
    pub fn new(subscription_key: Option<String>) -> Self {
        Self {
            subscription_key,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl FeedClient for TfgmFeedClient {
    async fn fetch(&self) -> FeedResult<Vec<RawPidRecord>> {
        let Some(key) = self.subscription_key.as_deref() else {
            warn!("no TfGM subscription key configured, returning no data");
            return Err(FeedError::NotConfigured);
        };

        info!("fetching data from {TFGM_METROLINKS_URL}");
        let response = self
            .http
            .get(TFGM_METROLINKS_URL)
            .header("Ocp-Apim-Subscription-Key", key)
            .header("accept", "application/json")
            .send()
            .await?;

        match response.status() {
            reqwest::StatusCode::OK => {
                let envelope: FeedEnvelope = response.json().await?;
                info!("received {} platform rows", envelope.value.len());
                Ok(envelope.value)
            }
            other => Err(FeedError::InvalidResponse {
                status_code: other,
                url: TFGM_METROLINKS_URL.to_owned(),
            }),
        }
    }
}
