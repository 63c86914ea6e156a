//! Schema detection and conversion into canonical weekly entries.
//!
//! Three layouts have been published for the primary document. The layout is
//! decided once, from the first record, and every record is then decoded with
//! the converter for that layout.

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::analyzers::types::{
    AuxiliaryEntry, CanonicalEntry, DailyRecord, IndicatorRecord, Metric, RawAuxiliaryRecord,
    SourceSchema,
};
use crate::error::PipelineError;

/// Picks the layout of a primary document by probing the fields of a record.
pub fn detect_schema(record: &Value) -> SourceSchema {
    let has = |field: &str| record.get(field).is_some();
    if has("cases_weekly") {
        SourceSchema::WeeklyCaseDeath
    } else if has("countriesAndTerritories") || has("continentExp") || has("day") {
        SourceSchema::DailyCaseDistribution
    } else {
        SourceSchema::Indicator
    }
}

/// Converts a primary document into canonical entries, at most one per
/// country and week. Output order is not meaningful.
pub fn normalize(records: &[Value]) -> Result<Vec<CanonicalEntry>, PipelineError> {
    let Some(first) = records.first() else {
        return Ok(Vec::new());
    };
    let schema = detect_schema(first);
    info!(
        entries = records.len(),
        schema = schema.name(),
        "Normalizing primary document"
    );

    let entries = match schema {
        SourceSchema::WeeklyCaseDeath => decode_all::<CanonicalEntry>(schema, records)?,
        SourceSchema::DailyCaseDistribution => {
            from_daily(&decode_all::<DailyRecord>(schema, records)?)?
        }
        SourceSchema::Indicator => {
            from_indicators(&decode_all::<IndicatorRecord>(schema, records)?)?
        }
    };

    if schema != SourceSchema::WeeklyCaseDeath {
        info!(aggregated = entries.len(), "Aggregated entries by country and week");
    }
    Ok(entries)
}

fn decode_all<T: DeserializeOwned>(
    schema: SourceSchema,
    records: &[Value],
) -> Result<Vec<T>, PipelineError> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| decode(schema.name(), index, record))
        .collect()
}

fn decode<T: DeserializeOwned>(
    schema: &'static str,
    index: usize,
    record: &Value,
) -> Result<T, PipelineError> {
    T::deserialize(record).map_err(|e| PipelineError::InvalidRecord {
        schema,
        index,
        message: e.to_string(),
    })
}

/// Groups entries by `(country, week)`, keeping first-seen order.
#[derive(Default)]
struct WeeklyBuckets {
    positions: HashMap<(String, String), usize>,
    entries: Vec<CanonicalEntry>,
}

impl WeeklyBuckets {
    fn bucket(
        &mut self,
        country: &str,
        continent: &str,
        population: Option<u64>,
        week: String,
    ) -> &mut CanonicalEntry {
        let key = (country.to_string(), week);
        let index = match self.positions.get(&key).copied() {
            Some(index) => index,
            None => {
                self.entries.push(CanonicalEntry {
                    country: country.to_string(),
                    continent: continent.to_string(),
                    population,
                    week: key.1.clone(),
                    cases: 0.0,
                    deaths: 0.0,
                });
                self.positions.insert(key, self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        let entry = &mut self.entries[index];
        if entry.population.is_none() {
            entry.population = population;
        }
        entry
    }
}

fn from_daily(records: &[DailyRecord]) -> Result<Vec<CanonicalEntry>, PipelineError> {
    let mut buckets = WeeklyBuckets::default();
    for record in records {
        let week = week_of(record.year, record.month, record.day)?;
        let entry = buckets.bucket(&record.country, &record.continent, record.population, week);
        entry.cases += record.cases;
        entry.deaths += record.deaths;
    }
    Ok(buckets.entries)
}

fn from_indicators(records: &[IndicatorRecord]) -> Result<Vec<CanonicalEntry>, PipelineError> {
    let mut buckets = WeeklyBuckets::default();
    for record in records {
        let metric = match record.indicator.as_str() {
            "cases" => Metric::Cases,
            "deaths" => Metric::Deaths,
            other => return Err(PipelineError::UnknownIndicator(other.to_string())),
        };
        let entry = buckets.bucket(
            &record.country,
            &record.continent,
            record.population,
            record.year_week.clone(),
        );
        match metric {
            Metric::Cases => entry.cases = record.weekly_count,
            _ => entry.deaths = record.weekly_count,
        }
    }
    Ok(buckets.entries)
}

/// Week identifier of a calendar day as `YYYY-WW`.
///
/// Weeks start on Sunday and week 1 is the (possibly partial) week holding
/// January 1st: `ceil((weekday(Jan 1) + day_of_year) / 7)` with Sunday = 0 and
/// a 1-based day of year. Stored per-week data uses this numbering, so it must
/// not be replaced by ISO-8601 weeks.
pub fn week_of(year: i64, month: i64, day: i64) -> Result<String, PipelineError> {
    let invalid = || PipelineError::InvalidDate { year, month, day };
    let (Ok(y), Ok(m), Ok(d)) = (i32::try_from(year), u32::try_from(month), u32::try_from(day))
    else {
        return Err(invalid());
    };

    let date = NaiveDate::from_ymd_opt(y, m, d).ok_or_else(invalid)?;
    let start = NaiveDate::from_ymd_opt(y, 1, 1).ok_or_else(invalid)?;
    let offset = start.weekday().num_days_from_sunday();
    let week = (offset + date.ordinal()).div_ceil(7);
    Ok(format!("{year}-{week:02}"))
}

/// Decodes occupancy records into auxiliary entries.
///
/// Indicators other than hospital and ICU occupancy are dropped before any
/// other field is read, so their shape does not matter. Records without a
/// value are dropped too. The `W` in `2020-W05` is removed so the week
/// matches the week index.
pub fn auxiliary_entries(records: &[Value]) -> Result<Vec<AuxiliaryEntry>, PipelineError> {
    let mut entries = Vec::new();
    let mut without_value = 0usize;
    for (index, record) in records.iter().enumerate() {
        let Some(metric) = record
            .get("indicator")
            .and_then(Value::as_str)
            .and_then(Metric::from_occupancy_indicator)
        else {
            continue;
        };
        let raw: RawAuxiliaryRecord = decode("occupancy", index, record)?;
        let Some(value) = raw.value else {
            without_value += 1;
            continue;
        };
        entries.push(AuxiliaryEntry {
            country: raw.country,
            week: raw.year_week.replace('W', ""),
            metric,
            value,
        });
    }
    debug!(
        records = records.len(),
        kept = entries.len(),
        without_value,
        "Decoded occupancy records"
    );
    Ok(entries)
}
