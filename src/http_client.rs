use crate::error::XjcError;
use futures::TryStreamExt;
use reqwest::{Client, Response, Url};
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

/// Configuration for fetching remote schemas and binding files
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Number of retry attempts
    pub retry_attempts: u32,
    /// Initial retry delay in milliseconds
    pub retry_delay_ms: u64,
    /// Maximum retry delay in milliseconds (for exponential backoff cap)
    pub max_retry_delay_ms: u64,
    /// User agent string
    pub user_agent: String,
    /// Honor the `HTTP_PROXY`/`HTTPS_PROXY` environment
    pub use_system_proxy: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            retry_attempts: 3,
            retry_delay_ms: 1000,
            max_retry_delay_ms: 30000,
            user_agent: format!("xjc-driver/{}", env!("CARGO_PKG_VERSION")),
            use_system_proxy: true,
        }
    }
}

/// Streams remote resources into local writers
#[derive(Debug, Clone)]
pub struct ResourceFetcher {
    client: Client,
    config: HttpClientConfig,
}

impl ResourceFetcher {
    pub fn new(config: HttpClientConfig) -> Result<Self, XjcError> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(&config.user_agent)
            .pool_idle_timeout(Duration::from_secs(30));
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build().map_err(XjcError::from)?;

        Ok(Self { client, config })
    }

    /// Copy the full body of `url` into `writer`, returning the byte count
    pub async fn fetch_to<W>(&self, url: &Url, writer: &mut W) -> Result<u64, XjcError>
    where
        W: AsyncWrite + Unpin,
    {
        let response = self.get_response_with_retry(url).await?;

        let mut written = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = TryStreamExt::try_next(&mut stream)
            .await
            .map_err(XjcError::from)?
        {
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        writer.flush().await?;

        debug!(url = %url, bytes = written, "fetched remote resource");
        Ok(written)
    }

    /// Fetch the full body of `url` into memory
    pub async fn fetch(&self, url: &Url) -> Result<Vec<u8>, XjcError> {
        let mut buffer = Vec::new();
        self.fetch_to(url, &mut buffer).await?;
        Ok(buffer)
    }

    async fn get_response_with_retry(&self, url: &Url) -> Result<Response, XjcError> {
        let mut attempt = 0;

        loop {
            match self.make_request(url).await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }

                    // Retry on server errors (5xx) but not client errors (4xx)
                    if status.is_server_error() && attempt < self.config.retry_attempts {
                        warn!(url = %url, status = status.as_u16(), attempt, "retrying fetch");
                        sleep(self.retry_delay(attempt)).await;
                        attempt += 1;
                        continue;
                    }

                    return Err(XjcError::HttpStatus {
                        url: url.to_string(),
                        status: status.as_u16(),
                        message: format!(
                            "HTTP {}: {}",
                            status.as_u16(),
                            status.canonical_reason().unwrap_or("Unknown")
                        ),
                    });
                }
                Err(error) => {
                    if attempt < self.config.retry_attempts && self.is_retryable_error(&error) {
                        warn!(url = %url, attempt, error = %error, "retrying fetch");
                        sleep(self.retry_delay(attempt)).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(error);
                }
            }
        }
    }

    async fn make_request(&self, url: &Url) -> Result<Response, XjcError> {
        let request_future = self.client.get(url.clone()).send();

        timeout(
            Duration::from_secs(self.config.timeout_seconds),
            request_future,
        )
        .await
        .map_err(|_| XjcError::Timeout {
            url: url.to_string(),
            timeout_seconds: self.config.timeout_seconds,
        })?
        .map_err(XjcError::from)
    }

    /// Exponential backoff capped at `max_retry_delay_ms`
    fn retry_delay(&self, attempt: u32) -> Duration {
        let delay_ms = self
            .config
            .retry_delay_ms
            .saturating_mul(2_u64.saturating_pow(attempt));
        Duration::from_millis(delay_ms.min(self.config.max_retry_delay_ms))
    }

    fn is_retryable_error(&self, error: &XjcError) -> bool {
        match error {
            XjcError::Http(reqwest_error) => {
                reqwest_error.is_timeout() || reqwest_error.is_connect() || reqwest_error.is_request()
            }
            XjcError::Timeout { .. } => true,
            _ => false,
        }
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }
}
