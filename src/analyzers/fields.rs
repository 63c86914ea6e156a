//! Lenient decoders for numeric fields.
//!
//! The publications are not consistent about numbers: the daily distribution
//! writes `"day": "14"`, weekly counts may be `null`, and populations are
//! sometimes missing. These accept a JSON number or a numeric string.

use serde::de::Error;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

fn number_of<E: Error>(value: &Value) -> Result<Option<f64>, E> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| E::custom(format!("number {n} out of range"))),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| E::custom(format!("expected a number, found \"{s}\""))),
        other => Err(E::custom(format!("expected a number, found {other}"))),
    }
}

/// A count; `null` counts as zero.
pub fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(number_of::<D::Error>(&value)?.unwrap_or(0.0))
}

pub fn optional_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<f64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    number_of(&value)
}

/// A whole number such as a day, month or year.
pub fn integer<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    match number_of::<D::Error>(&value)? {
        Some(n) if n.fract() == 0.0 => Ok(n as i64),
        Some(n) => Err(D::Error::custom(format!("expected a whole number, found {n}"))),
        None => Err(D::Error::custom("missing whole number")),
    }
}

/// A population; zero, negative and `null` all mean unknown.
pub fn population<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(number_of::<D::Error>(&value)?
        .filter(|n| *n >= 1.0)
        .map(|n| n.round() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "count")]
        count: f64,
        #[serde(default, deserialize_with = "population")]
        population: Option<u64>,
        #[serde(default, deserialize_with = "optional_number")]
        value: Option<f64>,
    }

    #[derive(Debug, Deserialize)]
    struct Day {
        #[serde(deserialize_with = "integer")]
        day: i64,
    }

    fn sample(value: Value) -> Sample {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_count_accepts_strings_and_null() {
        assert_eq!(sample(json!({ "count": "12" })).count, 12.0);
        assert_eq!(sample(json!({ "count": 7 })).count, 7.0);
        assert_eq!(sample(json!({ "count": null })).count, 0.0);
        assert_eq!(sample(json!({})).count, 0.0);
    }

    #[test]
    fn test_count_rejects_garbage() {
        let result: Result<Sample, _> = serde_json::from_value(json!({ "count": "many" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_population_zero_is_unknown() {
        assert_eq!(sample(json!({ "population": 0 })).population, None);
        assert_eq!(sample(json!({ "population": null })).population, None);
        assert_eq!(
            sample(json!({ "population": 10649800.0 })).population,
            Some(10649800)
        );
    }

    #[test]
    fn test_optional_number_keeps_null() {
        assert_eq!(sample(json!({ "value": null })).value, None);
        assert_eq!(sample(json!({ "value": 3.5 })).value, Some(3.5));
    }

    #[test]
    fn test_integer_from_string() {
        let day: Day = serde_json::from_value(json!({ "day": "07" })).unwrap();
        assert_eq!(day.day, 7);

        let result: Result<Day, _> = serde_json::from_value(json!({ "day": 1.5 }));
        assert!(result.is_err());
    }
}
