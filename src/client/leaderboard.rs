use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use std::{fmt, time::Duration};
use tracing::{debug, warn};

use crate::{
    client::transport::{BufferedTransport, StreamingTransport, Transport},
    config::Settings,
    core::record::RawEntry,
    error::{CacheError, CacheResult},
};

enum Endpoint {
    Page { offset: usize, limit: usize },
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Endpoint::Page { offset, limit } => {
                write!(f, "/leaderboard?offset={}&limit={}", offset, limit)
            }
        }
    }
}

/// Source of leaderboard pages. An empty page means the end of the leaderboard.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch_page(&self, offset: usize, limit: usize) -> CacheResult<Vec<RawEntry>>;
}

/// Leaderboard provider client. Every page is requested on the primary
/// transport first, and once more on the fallback one if that failed for a
/// retryable reason.
pub struct LeaderboardClient {
    base_url: String,
    timeout: Duration,
    primary: Box<dyn Transport>,
    fallback: Box<dyn Transport>,
}

impl LeaderboardClient {
    pub fn new(base_url: &str, timeout: Duration) -> CacheResult<Self> {
        Ok(LeaderboardClient::with_transports(
            base_url,
            timeout,
            Box::new(StreamingTransport::new(timeout)?),
            Box::new(BufferedTransport::new(timeout)?),
        ))
    }

    pub fn from_settings(settings: &Settings) -> CacheResult<Self> {
        LeaderboardClient::new(
            &settings.leaderboard_base_url,
            Duration::from_secs(settings.api_timeout_sec),
        )
    }

    pub fn with_transports(
        base_url: &str,
        timeout: Duration,
        primary: Box<dyn Transport>,
        fallback: Box<dyn Transport>,
    ) -> Self {
        LeaderboardClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            primary,
            fallback,
        }
    }

    async fn attempt(&self, transport: &dyn Transport, url: &str) -> CacheResult<Bytes> {
        match tokio::time::timeout(self.timeout, transport.get(url)).await {
            Ok(body) => body,
            Err(_) => Err(CacheError::Timeout(format!(
                "no response from {} within {}s ({} transport)",
                url,
                self.timeout.as_secs(),
                transport.name()
            ))),
        }
    }

    fn parse_page(body: &[u8]) -> CacheResult<Vec<RawEntry>> {
        let payload = serde_json::from_slice::<Value>(body)
            .map_err(|e| CacheError::MalformedResponse(format!("invalid JSON: {e}")))?;

        match payload {
            Value::Array(entries) => entries.into_iter().map(RawEntry::from_json).collect(),
            other => Err(CacheError::MalformedResponse(format!(
                "expected a JSON array of entries, got {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[async_trait]
impl Fetcher for LeaderboardClient {
    async fn fetch_page(&self, offset: usize, limit: usize) -> CacheResult<Vec<RawEntry>> {
        let url = format!("{}{}", self.base_url, Endpoint::Page { offset, limit });

        let body = match self.attempt(self.primary.as_ref(), &url).await {
            Ok(body) => body,
            Err(e) if e.is_retryable() => {
                warn!(
                    offset,
                    transport = self.fallback.name(),
                    "Page request failed on {} transport ({e}), retrying once",
                    self.primary.name()
                );
                self.attempt(self.fallback.as_ref(), &url).await?
            }
            Err(e) => return Err(e),
        };

        let entries = LeaderboardClient::parse_page(&body)?;
        debug!(offset, limit, received = entries.len(), "Fetched leaderboard page");
        Ok(entries)
    }
}
