//! Data types shared by the normalization and aggregation stages.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::analyzers::fields;
use crate::analyzers::utility::relative;

/// Continent label the publisher uses for non-country aggregate rows.
pub const OTHER_CONTINENT: &str = "Other";

/// The layouts a primary document has been published in over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceSchema {
    /// Weekly cases and deaths per row; already canonical.
    WeeklyCaseDeath,
    /// One row per country and day.
    DailyCaseDistribution,
    /// One row per country, week and indicator.
    Indicator,
}

impl SourceSchema {
    pub fn name(self) -> &'static str {
        match self {
            Self::WeeklyCaseDeath => "weekly case/death",
            Self::DailyCaseDistribution => "daily case distribution",
            Self::Indicator => "indicator",
        }
    }
}

/// One country and week of cases and deaths.
///
/// Serializes with the field names of the weekly publication, so a list of
/// entries written out as JSON is itself a valid weekly document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEntry {
    #[serde(rename = "countriesAndTerritories", alias = "country")]
    pub country: String,
    #[serde(rename = "continentExp", alias = "continent")]
    pub continent: String,
    #[serde(
        rename = "popData2019",
        alias = "population",
        default,
        deserialize_with = "fields::population"
    )]
    pub population: Option<u64>,
    #[serde(rename = "year_week")]
    pub week: String,
    #[serde(rename = "cases_weekly", deserialize_with = "fields::count")]
    pub cases: f64,
    #[serde(rename = "deaths_weekly", deserialize_with = "fields::count")]
    pub deaths: f64,
}

/// A row of the daily case distribution.
#[derive(Debug, Clone, Deserialize)]
pub struct DailyRecord {
    #[serde(rename = "countriesAndTerritories", alias = "country")]
    pub country: String,
    #[serde(rename = "continentExp", alias = "continent", default)]
    pub continent: String,
    #[serde(
        rename = "popData2019",
        alias = "population",
        default,
        deserialize_with = "fields::population"
    )]
    pub population: Option<u64>,
    #[serde(deserialize_with = "fields::integer")]
    pub day: i64,
    #[serde(deserialize_with = "fields::integer")]
    pub month: i64,
    #[serde(deserialize_with = "fields::integer")]
    pub year: i64,
    #[serde(default, deserialize_with = "fields::count")]
    pub cases: f64,
    #[serde(default, deserialize_with = "fields::count")]
    pub deaths: f64,
}

/// A row of the national indicator publication: one of cases or deaths.
#[derive(Debug, Clone, Deserialize)]
pub struct IndicatorRecord {
    #[serde(alias = "countriesAndTerritories")]
    pub country: String,
    #[serde(alias = "continentExp", default)]
    pub continent: String,
    #[serde(
        alias = "popData2019",
        default,
        deserialize_with = "fields::population"
    )]
    pub population: Option<u64>,
    pub indicator: String,
    #[serde(default, deserialize_with = "fields::count")]
    pub weekly_count: f64,
    pub year_week: String,
}

/// A row of the hospital/ICU occupancy publication, before filtering.
#[derive(Debug, Clone, Deserialize)]
pub struct RawAuxiliaryRecord {
    pub country: String,
    pub indicator: String,
    pub year_week: String,
    #[serde(default, deserialize_with = "fields::optional_number")]
    pub value: Option<f64>,
}

/// An occupancy value for one country and week.
#[derive(Debug, Clone, PartialEq)]
pub struct AuxiliaryEntry {
    pub country: String,
    pub week: String,
    pub metric: Metric,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Cases,
    Deaths,
    Hosp,
    Icu,
}

impl Metric {
    pub const ALL: [Metric; 4] = [Metric::Cases, Metric::Deaths, Metric::Hosp, Metric::Icu];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cases => "cases",
            Self::Deaths => "deaths",
            Self::Hosp => "hosp",
            Self::Icu => "icu",
        }
    }

    /// Maps an occupancy indicator name to its metric. Other names are not tracked.
    pub fn from_occupancy_indicator(indicator: &str) -> Option<Metric> {
        match indicator {
            "Daily hospital occupancy" => Some(Self::Hosp),
            "Daily ICU occupancy" => Some(Self::Icu),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Abs,
    Rel,
}

impl Unit {
    pub const ALL: [Unit; 2] = [Unit::Abs, Unit::Rel];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Abs => "abs",
            Self::Rel => "rel",
        }
    }
}

/// Ordered, duplicate-free week identifiers (`YYYY-WW`) forming the time axis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct WeekIndex(Vec<String>);

impl WeekIndex {
    pub(crate) fn new(weeks: Vec<String>) -> Self {
        Self(weeks)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn position(&self, week: &str) -> Option<usize> {
        self.0.binary_search_by(|probe| probe.as_str().cmp(week)).ok()
    }

    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

pub type MetricSeries = BTreeMap<Metric, Vec<f64>>;

/// All series of one country, in absolute and per-1000-inhabitant units.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CountrySeries {
    pub abs: MetricSeries,
    pub rel: MetricSeries,
    /// Population used for relative values; 1 when unknown.
    #[serde(skip)]
    pub people: f64,
}

impl CountrySeries {
    pub fn new(population: Option<u64>) -> Self {
        let mut series = Self {
            people: population.map(|p| p as f64).unwrap_or(1.0),
            ..Default::default()
        };
        for metric in [Metric::Cases, Metric::Deaths] {
            series.abs.insert(metric, Vec::new());
            series.rel.insert(metric, Vec::new());
        }
        series
    }

    pub fn unit(&self, unit: Unit) -> &MetricSeries {
        match unit {
            Unit::Abs => &self.abs,
            Unit::Rel => &self.rel,
        }
    }

    /// Appends the next week's value. Base metrics cover every week, so
    /// position in the series is position in the week index.
    pub fn push(&mut self, metric: Metric, value: f64) {
        let rel = relative(value, self.people);
        self.abs.entry(metric).or_default().push(value);
        self.rel.entry(metric).or_default().push(rel);
    }

    /// Writes a value at an explicit week position, creating a zero-filled
    /// series of `len` weeks on first use. Occupancy data has gaps.
    pub fn write_at(&mut self, metric: Metric, index: usize, value: f64, len: usize) {
        let rel = relative(value, self.people);
        for (values, value) in [(&mut self.abs, value), (&mut self.rel, rel)] {
            let series = values.entry(metric).or_insert_with(|| vec![0.0; len]);
            debug_assert!(index < series.len(), "week position {index} outside {len} weeks");
            series[index] = value;
        }
    }
}

/// continent -> country -> series
pub type AggregatedSeries = BTreeMap<String, BTreeMap<String, CountrySeries>>;

/// Highest and latest value of one leaf series. Serializes as `[max, last]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(into = "[f64; 2]")]
pub struct SummaryEntry {
    pub max: f64,
    pub last: f64,
}

impl From<SummaryEntry> for [f64; 2] {
    fn from(entry: SummaryEntry) -> Self {
        [entry.max, entry.last]
    }
}

/// continent -> country -> unit -> metric -> summary
pub type Summary = BTreeMap<String, BTreeMap<String, BTreeMap<Unit, BTreeMap<Metric, SummaryEntry>>>>;
