/// Rounds to three decimal places, the precision relative values are published with.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Converts an absolute value into a value per 1000 inhabitants.
pub fn relative(value: f64, people: f64) -> f64 {
    round3(value * 1000.0 / people)
}

/// Largest value of a series. Empty series, and series containing NaN, report 0.
pub fn series_max(values: &[f64]) -> f64 {
    if values.iter().any(|v| v.is_nan()) {
        return 0.0;
    }
    values.iter().copied().reduce(f64::max).unwrap_or(0.0)
}

/// Last value of a series, 0 when empty or NaN.
pub fn series_last(values: &[f64]) -> f64 {
    match values.last() {
        Some(v) if !v.is_nan() => *v,
        _ => 0.0,
    }
}
