use super::client::HttpClient;
use anyhow::{Result, bail};
use async_trait::async_trait;
use std::time::Duration;

/// Upper bound for a whole download; the publisher's files are tens of MB.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

pub struct BasicClient(reqwest::Client);

impl BasicClient {
    /// A client using [`DOWNLOAD_TIMEOUT`].
    pub fn new() -> reqwest::Result<Self> {
        Self::with_timeout(DOWNLOAD_TIMEOUT)
    }

    /// A client that gives up on a download after `timeout`.
    pub fn with_timeout(timeout: Duration) -> reqwest::Result<Self> {
        Ok(Self(
            reqwest::Client::builder()
                .timeout(timeout)
                .connect_timeout(Duration::from_secs(10))
                .build()?,
        ))
    }
}

#[async_trait]
impl HttpClient for BasicClient {
    async fn get_text(&self, url: &str) -> Result<String> {
        let resp = self.0.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            bail!("{} {}", status.as_u16(), status.canonical_reason().unwrap_or(""));
        }
        Ok(resp.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_host_fails_within_timeout() {
        let client = BasicClient::with_timeout(Duration::from_millis(500)).unwrap();
        let started = std::time::Instant::now();

        // Reserved TEST-NET-1 address, never routed.
        let result = client.get_text("http://192.0.2.1/data.json").await;

        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_default_client_builds() {
        assert!(BasicClient::new().is_ok());
    }
}
