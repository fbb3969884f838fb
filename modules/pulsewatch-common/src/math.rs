//! Small numeric helpers shared by the aggregator and the detectors.
//!
//! Every function here is total: NaN and infinity never escape, so the
//! downstream formulas can blend values without per-call guards.

/// Replace NaN or infinite values with 0.
pub fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Clamp into the 0..=100 score range after sanitizing.
pub fn clamp_score(value: f64) -> f64 {
    sanitize(value).clamp(0.0, 100.0)
}

/// Percent change from `previous` to `current`.
///
/// Zero baseline rule: growth from nothing reads as 100%, nothing-to-nothing
/// as 0%. This keeps brand-new scopes from producing infinite deltas.
pub fn pct_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        if current > 0.0 {
            100.0
        } else {
            0.0
        }
    } else {
        sanitize((current - previous) / previous * 100.0)
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    sanitize(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median over a copy of the input. Even-length inputs average the two
/// middle values.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        sanitize((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        sorted[mid]
    }
}

/// Population standard deviation.
pub fn stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let avg = mean(values);
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    sanitize(variance.sqrt())
}
