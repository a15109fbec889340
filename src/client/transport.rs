use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use reqwest::{Client, Response};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio_util::io::StreamReader;

use crate::error::{CacheError, CacheResult};

/// One way of getting a response body over HTTP.
#[async_trait]
pub trait Transport: Send + Sync {
    fn name(&self) -> &'static str;

    async fn get(&self, url: &str) -> CacheResult<Bytes>;
}

fn check_status(response: Response) -> CacheResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(CacheError::Http {
        status: status.as_u16(),
    })
}

/// Reads the body chunk by chunk as it arrives. Pooled keep-alive connections.
pub struct StreamingTransport {
    http_client: Client,
}

impl StreamingTransport {
    pub fn new(timeout: Duration) -> CacheResult<Self> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self { http_client })
    }
}

#[async_trait]
impl Transport for StreamingTransport {
    fn name(&self) -> &'static str {
        "streaming"
    }

    async fn get(&self, url: &str) -> CacheResult<Bytes> {
        let response = check_status(self.http_client.get(url).send().await?)?;

        let stream = Box::pin(
            response
                .bytes_stream()
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e)),
        );
        let mut reader = StreamReader::new(stream);
        let mut body = Vec::new();
        reader
            .read_to_end(&mut body)
            .await
            .map_err(|e| CacheError::Transport(format!("body stream interrupted: {e}")))?;

        Ok(Bytes::from(body))
    }
}

/// Plain request/response on a fresh HTTP/1.1 connection every time, so a
/// broken pooled connection of the streaming path cannot be reused.
pub struct BufferedTransport {
    http_client: Client,
}

impl BufferedTransport {
    pub fn new(timeout: Duration) -> CacheResult<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .http1_only()
            .pool_max_idle_per_host(0)
            .build()?;
        Ok(Self { http_client })
    }
}

#[async_trait]
impl Transport for BufferedTransport {
    fn name(&self) -> &'static str {
        "buffered"
    }

    async fn get(&self, url: &str) -> CacheResult<Bytes> {
        let response = check_status(self.http_client.get(url).send().await?)?;
        Ok(response.bytes().await?)
    }
}
