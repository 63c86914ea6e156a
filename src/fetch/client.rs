use anyhow::Result;
use async_trait::async_trait;

/// Retrieves a remote document as text.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get_text(&self, url: &str) -> Result<String>;
}
