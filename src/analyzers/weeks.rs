use std::collections::BTreeSet;

use crate::analyzers::types::{CanonicalEntry, WeekIndex};

/// Builds the time axis from the weeks reported by `reference_country`.
///
/// `YYYY-WW` identifiers sort chronologically as strings. The index is empty
/// when the reference country is absent; callers decide whether that is fatal.
pub fn build_index(entries: &[CanonicalEntry], reference_country: &str) -> WeekIndex {
    let weeks: BTreeSet<&str> = entries
        .iter()
        .filter(|e| e.country == reference_country)
        .map(|e| e.week.as_str())
        .collect();
    WeekIndex::new(weeks.into_iter().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_and_deduplicated() {
        let entries = vec![
            entry("Czechia", "2020-10"),
            entry("Czechia", "2020-02"),
            entry("Slovakia", "2020-01"),
            entry("Czechia", "2020-02"),
            entry("Czechia", "2019-52"),
        ];
        let index = build_index(&entries, "Czechia");

        assert_eq!(index.as_slice(), ["2019-52", "2020-02", "2020-10"]);
    }

    #[test]
    fn test_missing_reference_country() {
        let entries = vec![entry("Slovakia", "2020-01")];
        assert!(build_index(&entries, "Czechia").is_empty());
    }

    fn entry(country: &str, week: &str) -> CanonicalEntry {
        CanonicalEntry {
            country: country.into(),
            continent: "Europe".into(),
            population: None,
            week: week.into(),
            cases: 0.0,
            deaths: 0.0,
        }
    }
}
