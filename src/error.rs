//! Errors raised by the normalization and aggregation pipeline.

use std::fmt;

/// A fatal pipeline failure. Any of these aborts the run without output.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// An indicator record named something other than `cases` or `deaths`.
    UnknownIndicator(String),
    /// An auxiliary entry referenced a country missing from the primary data.
    UnknownCountry(String),
    /// The reference country contributed no weeks, so there is no time axis.
    MissingReferenceCountry(String),
    /// A record could not be decoded into the detected schema.
    InvalidRecord {
        schema: &'static str,
        index: usize,
        message: String,
    },
    /// A daily record did not describe a calendar date.
    InvalidDate { year: i64, month: i64, day: i64 },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownIndicator(indicator) => write!(f, "unknown indicator \"{indicator}\""),
            Self::UnknownCountry(country) => write!(f, "unknown country {country}"),
            Self::MissingReferenceCountry(country) => {
                write!(f, "reference country {country} has no weeks")
            }
            Self::InvalidRecord {
                schema,
                index,
                message,
            } => write!(f, "invalid {schema} record #{index}: {message}"),
            Self::InvalidDate { year, month, day } => {
                write!(f, "invalid date {year}-{month:02}-{day:02}")
            }
        }
    }
}

impl std::error::Error for PipelineError {}
