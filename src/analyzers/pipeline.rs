//! The normalize -> week index -> aggregate -> summarize run.
//!
//! Each stage needs the finished output of the one before it, so the stages
//! run strictly in order. A run owns everything it builds and shares nothing
//! with other runs.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::analyzers::aggregate::aggregate;
use crate::analyzers::normalize::{auxiliary_entries, normalize};
use crate::analyzers::summary::summarize;
use crate::analyzers::types::{AggregatedSeries, Summary, WeekIndex};
use crate::analyzers::weeks::build_index;
use crate::error::PipelineError;

/// Country whose reported weeks form the time axis.
pub const DEFAULT_REFERENCE_COUNTRY: &str = "Czechia";

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub reference_country: String,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            reference_country: DEFAULT_REFERENCE_COUNTRY.to_string(),
        }
    }
}

/// Everything one run produces. Serializes as `{weeks, series, summary}`.
#[derive(Debug, Clone, Serialize)]
pub struct PreparedData {
    pub weeks: WeekIndex,
    pub series: AggregatedSeries,
    pub summary: Summary,
    #[serde(skip)]
    pub skipped_weeks: Vec<String>,
    #[serde(skip)]
    pub misaligned_countries: Vec<String>,
}

impl PreparedData {
    pub fn country_count(&self) -> usize {
        self.series.values().map(|countries| countries.len()).sum()
    }
}

/// Runs the whole pipeline over parsed records.
///
/// `auxiliary` holds occupancy records; they are decoded as-is, without
/// schema detection.
///
/// # Errors
///
/// Returns the first stage error unchanged. Nothing is produced on failure.
pub fn run(
    primary: &[Value],
    auxiliary: Option<&[Value]>,
    options: &PipelineOptions,
) -> Result<PreparedData, PipelineError> {
    info!(entries = primary.len(), "Processing primary document");

    let entries = normalize(primary)?;
    let auxiliary = match auxiliary {
        Some(records) => auxiliary_entries(records)?,
        None => Vec::new(),
    };

    let weeks = build_index(&entries, &options.reference_country);
    if weeks.is_empty() {
        return Err(PipelineError::MissingReferenceCountry(
            options.reference_country.clone(),
        ));
    }
    debug!(weeks = ?weeks.as_slice(), "Week index");

    let aggregation = aggregate(&entries, &auxiliary, &weeks)?;
    let summary = summarize(&aggregation.series);

    let prepared = PreparedData {
        weeks,
        series: aggregation.series,
        summary,
        skipped_weeks: aggregation.skipped_weeks,
        misaligned_countries: aggregation.misaligned_countries,
    };
    info!(
        countries = prepared.country_count(),
        weeks = prepared.weeks.len(),
        "Prepared countries and weeks"
    );
    Ok(prepared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::types::{Metric, SummaryEntry, Unit};
    use serde_json::json;

    #[test]
    fn test_two_countries_two_weeks() {
        let primary = vec![
            weekly("Czechia", 1000, "2020-01", 10.0),
            weekly("Slovakia", 5000, "2020-01", 5.0),
            weekly("Czechia", 1000, "2020-02", 20.0),
            weekly("Slovakia", 5000, "2020-02", 15.0),
        ];
        let prepared = run(&primary, None, &PipelineOptions::default()).unwrap();

        assert_eq!(prepared.weeks.as_slice(), ["2020-01", "2020-02"]);
        assert_eq!(
            prepared.series["Europe"]["Czechia"].rel[&Metric::Cases],
            vec![10.0, 20.0]
        );
        assert_eq!(
            prepared.series["Europe"]["Slovakia"].rel[&Metric::Cases],
            vec![1.0, 3.0]
        );
        assert_eq!(
            prepared.summary["Europe"]["Slovakia"][&Unit::Abs][&Metric::Cases],
            SummaryEntry { max: 15.0, last: 15.0 }
        );
        assert_eq!(prepared.country_count(), 2);
    }

    #[test]
    fn test_unknown_auxiliary_week_is_not_fatal() {
        let primary = vec![
            weekly("Czechia", 1000, "2020-01", 10.0),
            weekly("Czechia", 1000, "2020-02", 20.0),
        ];
        let auxiliary = vec![json!({
            "country": "Czechia",
            "indicator": "Daily hospital occupancy",
            "year_week": "2020-W05",
            "value": 12
        })];
        let prepared = run(&primary, Some(&auxiliary), &PipelineOptions::default()).unwrap();

        assert_eq!(prepared.skipped_weeks, vec!["2020-05".to_string()]);
        assert!(
            !prepared.summary["Europe"]["Czechia"][&Unit::Abs].contains_key(&Metric::Hosp)
        );
    }

    #[test]
    fn test_untracked_indicators_do_not_abort() {
        let primary = vec![weekly("Czechia", 1000, "2020-01", 10.0)];
        let auxiliary = vec![
            json!({
                "country": "Czechia",
                "indicator": "Weekly new hospital admissions per 100k",
                "year_week": "2020-W01",
                "value": "n/a"
            }),
            json!({
                "country": "Atlantis",
                "indicator": "Weekly new ICU admissions per 100k",
                "value": 3
            }),
            json!({
                "country": "Czechia",
                "indicator": "Daily hospital occupancy",
                "year_week": "2020-W01",
                "value": 7
            }),
        ];
        let prepared = run(&primary, Some(&auxiliary), &PipelineOptions::default()).unwrap();

        assert_eq!(
            prepared.summary["Europe"]["Czechia"][&Unit::Abs][&Metric::Hosp],
            SummaryEntry { max: 7.0, last: 7.0 }
        );
        assert!(prepared.skipped_weeks.is_empty());
    }

    #[test]
    fn test_unknown_auxiliary_country_is_fatal() {
        let primary = vec![weekly("Czechia", 1000, "2020-01", 10.0)];
        let auxiliary = vec![json!({
            "country": "Atlantis",
            "indicator": "Daily ICU occupancy",
            "year_week": "2020-W01",
            "value": 1
        })];

        assert_eq!(
            run(&primary, Some(&auxiliary), &PipelineOptions::default()).unwrap_err(),
            PipelineError::UnknownCountry("Atlantis".into())
        );
    }

    #[test]
    fn test_missing_reference_country_is_fatal() {
        let primary = vec![weekly("Slovakia", 1000, "2020-01", 10.0)];

        assert_eq!(
            run(&primary, None, &PipelineOptions::default()).unwrap_err(),
            PipelineError::MissingReferenceCountry("Czechia".into())
        );
    }

    #[test]
    fn test_other_reference_country() {
        let primary = vec![weekly("Slovakia", 1000, "2020-01", 10.0)];
        let options = PipelineOptions {
            reference_country: "Slovakia".into(),
        };

        assert_eq!(run(&primary, None, &options).unwrap().weeks.len(), 1);
    }

    #[test]
    fn test_serializes_weeks_series_and_summary() {
        let primary = vec![weekly("Czechia", 1000, "2020-01", 10.0)];
        let prepared = run(&primary, None, &PipelineOptions::default()).unwrap();
        let json = serde_json::to_value(&prepared).unwrap();

        assert_eq!(json["weeks"], json!(["2020-01"]));
        assert_eq!(json["series"]["Europe"]["Czechia"]["abs"]["cases"], json!([10.0]));
        assert_eq!(json["summary"]["Europe"]["Czechia"]["abs"]["cases"], json!([10.0, 10.0]));
        assert!(json.get("skipped_weeks").is_none());
    }

    fn weekly(country: &str, population: u64, week: &str, cases: f64) -> Value {
        json!({
            "countriesAndTerritories": country,
            "continentExp": "Europe",
            "popData2019": population,
            "year_week": week,
            "cases_weekly": cases,
            "deaths_weekly": 0
        })
    }
}
