use crate::analyzers::types::{AggregatedSeries, Summary, SummaryEntry, Unit};
use crate::analyzers::utility::{series_last, series_max};

/// Computes `[max, last]` for every leaf series that exists.
///
/// Metrics a country has no series for are left out rather than reported as zero.
pub fn summarize(series: &AggregatedSeries) -> Summary {
    let mut summary = Summary::new();
    for (continent, countries) in series {
        let continent_summary = summary.entry(continent.clone()).or_default();
        for (country, country_series) in countries {
            let country_summary = continent_summary.entry(country.clone()).or_default();
            for unit in Unit::ALL {
                let unit_summary = country_summary.entry(unit).or_default();
                for (metric, values) in country_series.unit(unit) {
                    unit_summary.insert(*metric, summarize_series(values));
                }
            }
        }
    }
    summary
}

pub fn summarize_series(values: &[f64]) -> SummaryEntry {
    SummaryEntry {
        max: series_max(values),
        last: series_last(values),
    }
}
