//! Dashboard aggregations over an evaluated alert list: the rule catalog
//! with activation counts, a per-day severity timeline, and the headline
//! pulse summary with deltas against the previous evaluation.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use pulsewatch_common::math::{mean, pct_change, sanitize};
use pulsewatch_common::{Alert, AlertStatus, AlertThresholds, Severity, SignalType};

/// One detection rule with its configured threshold and how many alerts
/// in this evaluation carry its signal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCatalogEntry {
    pub signal_type: SignalType,
    pub label: String,
    pub threshold: f64,
    pub activations: u64,
}

/// One entry per rule, in detection order.
pub fn rule_catalog(thresholds: &AlertThresholds, alerts: &[Alert]) -> Vec<RuleCatalogEntry> {
    SignalType::ALL
        .into_iter()
        .map(|signal_type| RuleCatalogEntry {
            signal_type,
            label: signal_type.describe().to_string(),
            threshold: thresholds.threshold_for(signal_type),
            activations: alerts
                .iter()
                .filter(|a| a.signals.iter().any(|s| s.signal_type == signal_type))
                .count() as u64,
        })
        .collect()
}

/// Alert counts by severity for one UTC day.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineBucket {
    pub date: NaiveDate,
    pub low: u64,
    pub medium: u64,
    pub high: u64,
    pub critical: u64,
    pub total: u64,
}

/// Buckets alerts by the UTC day they were first seen, ascending.
pub fn alert_timeline(alerts: &[Alert]) -> Vec<TimelineBucket> {
    let mut buckets: BTreeMap<NaiveDate, TimelineBucket> = BTreeMap::new();
    for alert in alerts {
        let date = alert.first_seen_at.date_naive();
        let bucket = buckets.entry(date).or_insert_with(|| TimelineBucket {
            date,
            ..TimelineBucket::default()
        });
        match alert.severity {
            Severity::Low => bucket.low += 1,
            Severity::Medium => bucket.medium += 1,
            Severity::High => bucket.high += 1,
            Severity::Critical => bucket.critical += 1,
        }
        bucket.total += 1;
    }
    buckets.into_values().collect()
}

/// Headline numbers for the dashboard, each with a percent change against
/// the previous evaluation's alert list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PulseSummary {
    pub open_count: u64,
    pub open_delta_pct: f64,
    pub critical_count: u64,
    pub critical_delta_pct: f64,
    pub investigating_count: u64,
    pub investigating_delta_pct: f64,
    pub avg_sla_hours: f64,
    pub sla_delta_pct: f64,
}

pub fn pulse_summary(current: &[Alert], previous: &[Alert]) -> PulseSummary {
    let open = count_open(current);
    let critical = count_critical(current);
    let investigating = count_investigating(current);
    let avg_sla = avg_sla_hours(current);
    PulseSummary {
        open_count: open,
        open_delta_pct: pct_change(open as f64, count_open(previous) as f64),
        critical_count: critical,
        critical_delta_pct: pct_change(critical as f64, count_critical(previous) as f64),
        investigating_count: investigating,
        investigating_delta_pct: pct_change(
            investigating as f64,
            count_investigating(previous) as f64,
        ),
        avg_sla_hours: avg_sla,
        sla_delta_pct: pct_change(avg_sla, avg_sla_hours(previous)),
    }
}

fn count_open(alerts: &[Alert]) -> u64 {
    alerts
        .iter()
        .filter(|a| a.status == AlertStatus::Open)
        .count() as u64
}

fn count_critical(alerts: &[Alert]) -> u64 {
    alerts
        .iter()
        .filter(|a| a.severity == Severity::Critical)
        .count() as u64
}

/// Acknowledged or escalated: someone is on it.
fn count_investigating(alerts: &[Alert]) -> u64 {
    alerts
        .iter()
        .filter(|a| matches!(a.status, AlertStatus::Ack | AlertStatus::Escalated))
        .count() as u64
}

fn avg_sla_hours(alerts: &[Alert]) -> f64 {
    let hours: Vec<f64> = alerts
        .iter()
        .map(|a| a.severity.sla_hours() as f64)
        .collect();
    sanitize(mean(&hours))
}
