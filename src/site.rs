//! One update cycle of the published site.
//!
//! Source documents come from the blob store while fresh and are downloaded
//! again once stale. The pipeline runs only when the documents changed or
//! an update is forced.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use crate::analyzers::pipeline::{PipelineOptions, PreparedData, run};
use crate::cache::BlobStore;
use crate::config::Settings;
use crate::fetch::{HttpClient, fetch_text};
use crate::output::{copy_assets, write_index, write_series};
use crate::parser::parse_records;

pub const PRIMARY_BLOB: &str = "data.json";
pub const AUXILIARY_BLOB: &str = "hosp.json";

/// Raw source documents and whether they were just downloaded.
#[derive(Debug, Clone)]
pub struct Sources {
    pub primary: String,
    pub auxiliary: String,
    pub updated: bool,
}

fn cached<S: BlobStore + ?Sized>(store: &S, max_age: Duration) -> Result<Option<Sources>> {
    if !store.is_fresh(PRIMARY_BLOB, max_age)? {
        return Ok(None);
    }
    Ok(Some(Sources {
        primary: store.get(PRIMARY_BLOB)?,
        auxiliary: store.get(AUXILIARY_BLOB)?,
        updated: false,
    }))
}

/// Returns the cached documents while fresh, otherwise downloads both
/// concurrently and stores them.
#[tracing::instrument(skip_all)]
pub async fn load_sources<S, C>(store: &S, client: &C, settings: &Settings) -> Result<Sources>
where
    S: BlobStore + ?Sized,
    C: HttpClient + ?Sized,
{
    match cached(store, settings.max_age) {
        Ok(Some(sources)) => {
            info!("Using cached source documents");
            return Ok(sources);
        }
        Ok(None) => info!("Cached source documents missing or stale"),
        Err(e) => warn!(error = %e, "Cached source documents unreadable"),
    }

    let (primary, auxiliary) = tokio::try_join!(
        fetch_text(client, &settings.primary_url),
        fetch_text(client, &settings.auxiliary_url),
    )?;
    store.put(PRIMARY_BLOB, &primary)?;
    store.put(AUXILIARY_BLOB, &auxiliary)?;

    Ok(Sources {
        primary,
        auxiliary,
        updated: true,
    })
}

/// Parses the raw documents and runs the pipeline over them.
pub fn prepare(
    primary: &str,
    auxiliary: Option<&str>,
    options: &PipelineOptions,
) -> Result<PreparedData> {
    let primary = parse_records(primary).context("failed to parse primary document")?;
    let auxiliary = auxiliary
        .map(parse_records)
        .transpose()
        .context("failed to parse auxiliary document")?;
    Ok(run(&primary, auxiliary.as_deref(), options)?)
}

/// Writes series, index page and assets into the public directory.
pub fn publish(settings: &Settings, prepared: &PreparedData) -> Result<()> {
    write_series(&settings.public_dir, prepared)?;
    write_index(
        &settings.internal_dir,
        &settings.public_dir,
        prepared,
        env!("CARGO_PKG_VERSION"),
    )?;
    copy_assets(&settings.internal_dir, &settings.public_dir)?;
    Ok(())
}

/// Runs one update cycle. Returns whether the site was regenerated.
///
/// # Errors
///
/// Any failure leaves the previously published site in place and is
/// reported as "site not updated".
pub async fn update_site<S, C>(
    settings: &Settings,
    store: &S,
    client: &C,
    force: bool,
) -> Result<bool>
where
    S: BlobStore + ?Sized,
    C: HttpClient + ?Sized,
{
    async {
        let sources = load_sources(store, client, settings).await?;
        if !sources.updated && !force {
            info!("Source documents unchanged, site left as is");
            return Ok(false);
        }

        let options = PipelineOptions {
            reference_country: settings.reference_country.clone(),
        };
        let prepared = prepare(&sources.primary, Some(&sources.auxiliary), &options)?;
        publish(settings, &prepared)?;
        info!(
            countries = prepared.country_count(),
            last_week = prepared.weeks.last().unwrap_or(""),
            "Site updated"
        );
        Ok::<_, anyhow::Error>(true)
    }
    .await
    .context("site not updated")
}
