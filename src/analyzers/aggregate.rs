use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

use crate::analyzers::types::{
    AggregatedSeries, AuxiliaryEntry, CanonicalEntry, CountrySeries, Metric, OTHER_CONTINENT,
    WeekIndex,
};
use crate::error::PipelineError;

/// Aggregated series plus the conditions that were tolerated while building them.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub series: AggregatedSeries,
    /// Auxiliary weeks missing from the week index; their entries were dropped.
    pub skipped_weeks: Vec<String>,
    /// Countries whose case series does not span the week index exactly.
    pub misaligned_countries: Vec<String>,
}

/// Folds canonical entries and occupancy entries into per-country series.
///
/// Cases and deaths are appended in week order, so every country is expected
/// to report every week. Occupancy values are written at the position of
/// their week in `weeks` instead, since occupancy reporting has gaps.
///
/// # Errors
///
/// Fails with [`PipelineError::UnknownCountry`] when an auxiliary entry names a
/// country that has no primary data.
pub fn aggregate(
    entries: &[CanonicalEntry],
    auxiliary: &[AuxiliaryEntry],
    weeks: &WeekIndex,
) -> Result<Aggregation, PipelineError> {
    let mut ordered: Vec<&CanonicalEntry> = entries
        .iter()
        .filter(|e| e.continent != OTHER_CONTINENT)
        .collect();
    // Stable, so same-week entries keep their relative order.
    ordered.sort_by(|a, b| a.week.cmp(&b.week));

    let mut series = AggregatedSeries::new();
    let mut continents: HashMap<&str, &str> = HashMap::new();

    for entry in ordered {
        let continent = continents
            .entry(entry.country.as_str())
            .or_insert(entry.continent.as_str());
        let country = series
            .entry(entry.continent.clone())
            .or_default()
            .entry(entry.country.clone())
            .or_insert_with(|| CountrySeries::new(entry.population));
        if *continent != entry.continent {
            debug!(
                country = %entry.country,
                first = %continent,
                other = %entry.continent,
                "Country reported under more than one continent"
            );
        }
        country.push(Metric::Cases, entry.cases);
        country.push(Metric::Deaths, entry.deaths);
    }

    let mut auxiliary: Vec<&AuxiliaryEntry> = auxiliary.iter().collect();
    auxiliary.sort_by(|a, b| a.week.cmp(&b.week));

    let mut skipped = BTreeSet::new();
    for entry in auxiliary {
        let Some(continent) = continents.get(entry.country.as_str()) else {
            debug!(known = ?continents.keys().collect::<BTreeSet<_>>(), "Known countries");
            return Err(PipelineError::UnknownCountry(entry.country.clone()));
        };
        let Some(index) = weeks.position(&entry.week) else {
            skipped.insert(entry.week.clone());
            continue;
        };
        if let Some(country) = series
            .get_mut(*continent)
            .and_then(|countries| countries.get_mut(&entry.country))
        {
            country.write_at(entry.metric, index, entry.value, weeks.len());
        }
    }

    let skipped_weeks: Vec<String> = skipped.into_iter().collect();
    if !skipped_weeks.is_empty() {
        warn!(weeks = ?skipped_weeks, "Skipped unknown weeks");
    }

    let misaligned_countries: Vec<String> = series
        .values()
        .flat_map(|countries| countries.iter())
        .filter(|(_, s)| s.abs.get(&Metric::Cases).map_or(0, Vec::len) != weeks.len())
        .map(|(name, _)| name.clone())
        .collect();
    if !misaligned_countries.is_empty() {
        warn!(
            countries = ?misaligned_countries,
            weeks = weeks.len(),
            "Series length differs from the week index"
        );
    }

    Ok(Aggregation {
        series,
        skipped_weeks,
        misaligned_countries,
    })
}
