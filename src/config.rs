//! Runtime settings, read from the environment.
//!
//! ```text
//! PUBLIC_DIR=public
//! INTERNAL_DIR=internal
//! PRIMARY_URL=https://opendata.ecdc.europa.eu/covid19/nationalcasedeath/json/
//! AUXILIARY_URL=https://opendata.ecdc.europa.eu/covid19/hospitalicuadmissionrates/json/
//! MAX_AGE_HOURS=48
//! UPDATE_INTERVAL_HOURS=72
//! REFERENCE_COUNTRY=Czechia
//! ```

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::analyzers::pipeline::DEFAULT_REFERENCE_COUNTRY;

pub const DEFAULT_PRIMARY_URL: &str =
    "https://opendata.ecdc.europa.eu/covid19/nationalcasedeath/json/";
pub const DEFAULT_AUXILIARY_URL: &str =
    "https://opendata.ecdc.europa.eu/covid19/hospitalicuadmissionrates/json/";

const HOUR: u64 = 60 * 60;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub public_dir: PathBuf,
    pub internal_dir: PathBuf,
    pub primary_url: String,
    pub auxiliary_url: String,
    /// Cached documents older than this are downloaded again.
    pub max_age: Duration,
    pub update_interval: Duration,
    pub reference_country: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            public_dir: PathBuf::from("public"),
            internal_dir: PathBuf::from("internal"),
            primary_url: DEFAULT_PRIMARY_URL.to_string(),
            auxiliary_url: DEFAULT_AUXILIARY_URL.to_string(),
            max_age: Duration::from_secs(48 * HOUR),
            update_interval: Duration::from_secs(72 * HOUR),
            reference_country: DEFAULT_REFERENCE_COUNTRY.to_string(),
        }
    }
}

impl Settings {
    /// Reads settings from the process environment, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let text = |key: &str, default: String| lookup(key).unwrap_or(default);
        let hours = |key: &str, default: Duration| -> Result<Duration> {
            match lookup(key) {
                Some(value) => Ok(Duration::from_secs(parse::<u64>(key, &value)? * HOUR)),
                None => Ok(default),
            }
        };

        Ok(Self {
            public_dir: lookup("PUBLIC_DIR").map(PathBuf::from).unwrap_or(defaults.public_dir),
            internal_dir: lookup("INTERNAL_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.internal_dir),
            primary_url: text("PRIMARY_URL", defaults.primary_url),
            auxiliary_url: text("AUXILIARY_URL", defaults.auxiliary_url),
            max_age: hours("MAX_AGE_HOURS", defaults.max_age)?,
            update_interval: hours("UPDATE_INTERVAL_HOURS", defaults.update_interval)?,
            reference_country: text("REFERENCE_COUNTRY", defaults.reference_country),
        })
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("invalid value for {key}: \"{value}\""))
}
