mod basic;
mod client;

pub use basic::{BasicClient, DOWNLOAD_TIMEOUT};
pub use client::HttpClient;

use anyhow::{Context, Result};
use tracing::{debug, info};

/// Downloads `url` as text.
///
/// # Errors
///
/// Fails on transport errors and on any non-success HTTP status.
#[tracing::instrument(skip(client))]
pub async fn fetch_text<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<String> {
    info!("Downloading document");
    let text = client
        .get_text(url)
        .await
        .with_context(|| format!("failed to download {url}"))?;
    debug!(bytes = text.len(), "Document received");
    Ok(text)
}
