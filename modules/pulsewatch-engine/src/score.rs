//! Composite scoring and classification of a detected scope.
//!
//! Formula:
//!   composite = 0.25 * min(100, |delta_pct|)
//!             + 0.25 * min(100, risk_score)
//!             + 0.20 * min(100, negative_share)
//!             + 0.20 * clamp0..100((impact_ratio - 1) * 100)
//!             + 0.10 * min(100, max(0, volume_z * 20))
//!
//! Severity reads the composite; the primary signal is chosen separately by
//! per-rule tiers so a moderate composite can still lead with the rule that
//! is individually most alarming.

use pulsewatch_common::math::clamp_score;
use pulsewatch_common::{Severity, Signal, SignalType};

/// Scope-level numbers the scorer reads. All are already sanitized by the
/// aggregator.
#[derive(Debug, Clone, Copy)]
pub struct ScoreInputs {
    pub delta_pct: f64,
    pub risk_score: f64,
    pub negative_share: f64,
    pub impact_ratio: f64,
    pub volume_z: f64,
    pub total: u64,
    pub prev_total: u64,
    pub min_volume: u64,
}

/// Everything the classifier derives for one alert. `ranking` orders and
/// deduplicates alerts internally and is never serialized.
#[derive(Debug, Clone)]
pub struct Classification {
    pub composite: f64,
    pub severity: Severity,
    pub primary: SignalType,
    pub confidence: u32,
    pub priority: u32,
    pub ranking: f64,
}

pub fn composite_score(inputs: &ScoreInputs) -> f64 {
    0.25 * inputs.delta_pct.abs().min(100.0)
        + 0.25 * inputs.risk_score.min(100.0)
        + 0.20 * inputs.negative_share.min(100.0)
        + 0.20 * clamp_score((inputs.impact_ratio - 1.0) * 100.0)
        + 0.10 * (inputs.volume_z * 20.0).max(0.0).min(100.0)
}

pub fn severity_for(composite: f64) -> Severity {
    if composite >= 85.0 {
        Severity::Critical
    } else if composite >= 70.0 {
        Severity::High
    } else if composite >= 55.0 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Per-rule severity from type-specific tiers (critical/high/medium
/// cutoffs on the signal's native value, else low).
pub fn signal_severity(signal: &Signal) -> Severity {
    let (critical, high, medium) = match signal.signal_type {
        SignalType::Volume => (60.0, 45.0, 30.0),
        SignalType::SentimentShift => (30.0, 22.0, 15.0),
        SignalType::Negativity => (45.0, 40.0, 35.0),
        SignalType::Risk => (60.0, 50.0, 45.0),
        SignalType::Viral => (3.0, 2.4, 1.8),
        SignalType::TopicNovelty => (90.0, 75.0, 55.0),
        SignalType::CrossPlatform => (4.0, 3.0, 2.0),
        SignalType::Coordination => (0.5, 0.4, 0.3),
        SignalType::GeoExpansion => (150.0, 100.0, 60.0),
    };
    if signal.value >= critical {
        Severity::Critical
    } else if signal.value >= high {
        Severity::High
    } else if signal.value >= medium {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Classify a scope from its fired signals. `None` when nothing fired.
pub fn classify(signals: &[Signal], inputs: &ScoreInputs) -> Option<Classification> {
    let primary = primary_signal(signals)?;
    let composite = composite_score(inputs);
    let severity = severity_for(composite);
    Some(Classification {
        composite,
        severity,
        primary,
        confidence: confidence(signals.len(), inputs),
        priority: priority(severity, inputs.risk_score),
        ranking: composite + (signals.len() as f64 * 5.0).min(20.0),
    })
}

/// The fired signal with the highest per-rule severity weight; ties keep
/// detection order.
fn primary_signal(signals: &[Signal]) -> Option<SignalType> {
    let mut best: Option<(u32, SignalType)> = None;
    for signal in signals {
        let weight = signal_severity(signal).weight();
        match best {
            Some((best_weight, _)) if weight <= best_weight => {}
            _ => best = Some((weight, signal.signal_type)),
        }
    }
    best.map(|(_, signal_type)| signal_type)
}

/// `round(100 * (0.45*volume_term + 0.35*signal_term + 0.20*stability))`.
/// Confidence grows with volume over the gate, the number of independent
/// rules agreeing, and window-over-window stability.
fn confidence(signal_count: usize, inputs: &ScoreInputs) -> u32 {
    let volume_term = (inputs.total as f64 / (2.0 * inputs.min_volume as f64)).min(1.0);
    let signal_term = (signal_count as f64 / 3.0).min(1.0);
    let spread = (inputs.total as f64 - inputs.prev_total as f64).abs();
    let base = inputs.total.max(inputs.prev_total).max(1) as f64;
    let stability = 1.0 - (spread / base).min(1.0);
    (100.0 * (0.45 * volume_term + 0.35 * signal_term + 0.20 * stability)).round() as u32
}

/// `round(min(100, severity_weight*20 + min(40, risk_score*0.6)))`.
fn priority(severity: Severity, risk_score: f64) -> u32 {
    let raw = severity.weight() as f64 * 20.0 + (risk_score * 0.6).min(40.0);
    raw.min(100.0).round() as u32
}
