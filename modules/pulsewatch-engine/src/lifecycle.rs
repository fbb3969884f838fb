//! Deterministic lifecycle simulation.
//!
//! The engine has no durable workflow store, yet the dashboard needs
//! believable ack/escalate/resolve activity. Each alert hashes its own
//! identity and volume into 0..100 and walks a fixed status table keyed on
//! SLA breach, severity and rank percentile. Same input, same statuses,
//! every run.
//!
//! Real human state can replace all of this: implement [`LifecyclePolicy`]
//! over an audit log and hand it to the engine. Detection and scoring
//! never look at lifecycle fields.

use chrono::{DateTime, Duration, Utc};

use pulsewatch_common::{Alert, AlertStatus, Severity};

use crate::identity::fnv1a32;

/// Applies statuses and lifecycle timestamps to ranked alerts, in place.
/// Alerts arrive sorted by ranking, best first; implementations may use
/// the position as a rank percentile.
pub trait LifecyclePolicy: Send + Sync {
    fn apply(&self, alerts: &mut [Alert], now: DateTime<Utc>);
}

/// Hash-driven demo lifecycle. See the module docs.
#[derive(Debug, Default)]
pub struct SimulatedLifecycle;

impl LifecyclePolicy for SimulatedLifecycle {
    fn apply(&self, alerts: &mut [Alert], now: DateTime<Utc>) {
        assign_statuses(alerts, now);
        backfill_statuses(alerts, now);
    }
}

fn assign_statuses(alerts: &mut [Alert], now: DateTime<Utc>) {
    let n = alerts.len();
    for index in 0..n {
        let alert = &mut alerts[index];
        let h = lifecycle_hash(alert);
        let breached = is_breached(alert, now);
        let percentile = if n <= 1 {
            0.0
        } else {
            index as f64 / (n - 1) as f64
        };
        let status = choose_status(h, breached, alert.severity, percentile);
        apply_status(alert, status, h, breached, now);
    }
}

/// Guarantee the statuses an operations dashboard always shows once the
/// alert list is big enough: an ack from two alerts up, an escalation from
/// four, a resolution from five, a snooze from six. Rules run in order and
/// flip one candidate each, never an alert an earlier rule flipped and
/// never the last holder of a status still under guarantee; when nothing
/// preferred remains a rule falls back to any expendable alert.
fn backfill_statuses(alerts: &mut [Alert], now: DateTime<Utc>) {
    let n = alerts.len();
    let mut taken = vec![false; n];

    if n >= 2 && !has_status(alerts, AlertStatus::Ack) {
        let candidate = first_candidate(alerts, &taken, |a| a.status == AlertStatus::Open)
            .or_else(|| first_candidate(alerts, &taken, |_| true));
        if let Some(i) = candidate {
            taken[i] = true;
            flip(&mut alerts[i], AlertStatus::Ack, now);
        }
    }
    if n >= 4 && !has_status(alerts, AlertStatus::Escalated) {
        let candidate = first_candidate(alerts, &taken, |a| a.severity >= Severity::High)
            .or_else(|| first_candidate(alerts, &taken, |a| a.status == AlertStatus::Open))
            .or_else(|| first_candidate(alerts, &taken, |_| true));
        if let Some(i) = candidate {
            taken[i] = true;
            flip(&mut alerts[i], AlertStatus::Escalated, now);
        }
    }
    if n >= 5 && !has_status(alerts, AlertStatus::Resolved) {
        let candidate = last_candidate(alerts, &taken, |a| {
            matches!(a.status, AlertStatus::Open | AlertStatus::Ack)
        })
        .or_else(|| last_candidate(alerts, &taken, |_| true));
        if let Some(i) = candidate {
            taken[i] = true;
            flip(&mut alerts[i], AlertStatus::Resolved, now);
        }
    }
    if n >= 6 && !has_status(alerts, AlertStatus::Snoozed) {
        let candidate = last_candidate(alerts, &taken, |a| a.status == AlertStatus::Open)
            .or_else(|| last_candidate(alerts, &taken, |_| true));
        if let Some(i) = candidate {
            taken[i] = true;
            flip(&mut alerts[i], AlertStatus::Snoozed, now);
        }
    }
}

/// Top-down scan for the next flippable alert matching `prefer`.
fn first_candidate<F>(alerts: &[Alert], taken: &[bool], prefer: F) -> Option<usize>
where
    F: Fn(&Alert) -> bool,
{
    (0..alerts.len()).find(|&i| !taken[i] && is_expendable(alerts, i) && prefer(&alerts[i]))
}

/// Bottom-up twin of [`first_candidate`].
fn last_candidate<F>(alerts: &[Alert], taken: &[bool], prefer: F) -> Option<usize>
where
    F: Fn(&Alert) -> bool,
{
    (0..alerts.len())
        .rev()
        .find(|&i| !taken[i] && is_expendable(alerts, i) && prefer(&alerts[i]))
}

/// Whether the backfill may restatus this alert: open alerts always,
/// anything else only while it is not the queue's last holder of a status
/// the guarantees still require.
fn is_expendable(alerts: &[Alert], index: usize) -> bool {
    let status = alerts[index].status;
    let guaranteed_from = match status {
        AlertStatus::Open => return true,
        AlertStatus::Ack => 2,
        AlertStatus::Escalated => 4,
        AlertStatus::Resolved => 5,
        AlertStatus::Snoozed => 6,
    };
    alerts.len() < guaranteed_from || alerts.iter().filter(|a| a.status == status).count() > 1
}

fn has_status(alerts: &[Alert], status: AlertStatus) -> bool {
    alerts.iter().any(|a| a.status == status)
}

fn flip(alert: &mut Alert, status: AlertStatus, now: DateTime<Utc>) {
    let h = lifecycle_hash(alert);
    let breached = is_breached(alert, now);
    apply_status(alert, status, h, breached, now);
}

/// Identity-and-volume hash folded into 0..100.
fn lifecycle_hash(alert: &Alert) -> u32 {
    let key = format!(
        "{}|{}|{}|{}",
        alert.id, alert.scope_type, alert.scope_id, alert.volume_current
    );
    fnv1a32(&key) % 100
}

fn is_breached(alert: &Alert, now: DateTime<Utc>) -> bool {
    let age_hours = (now - alert.first_seen_at).num_seconds() as f64 / 3600.0;
    age_hours > alert.severity.sla_hours() as f64
}

/// The status table. Breached urgent alerts skew toward escalation,
/// breached routine ones toward ack/resolve, and low-ranked fresh alerts
/// drain out of the queue.
fn choose_status(h: u32, breached: bool, severity: Severity, percentile: f64) -> AlertStatus {
    if breached && severity >= Severity::High {
        if h < 60 {
            AlertStatus::Escalated
        } else if h < 90 {
            AlertStatus::Ack
        } else {
            AlertStatus::Open
        }
    } else if breached {
        if h < 55 {
            AlertStatus::Ack
        } else if h < 80 {
            AlertStatus::Resolved
        } else {
            AlertStatus::Open
        }
    } else if percentile > 0.55 && severity != Severity::Critical {
        if h < 40 {
            AlertStatus::Resolved
        } else if h < 70 {
            AlertStatus::Snoozed
        } else if h < 85 {
            AlertStatus::Ack
        } else {
            AlertStatus::Open
        }
    } else if h < 70 {
        AlertStatus::Open
    } else {
        AlertStatus::Ack
    }
}

/// Set `status` and synthesize its timeline. Acks land in the first half
/// of the alert's life, second actions in the back half, so `ack_at` is
/// always at or before `resolved_at`.
fn apply_status(
    alert: &mut Alert,
    status: AlertStatus,
    h: u32,
    breached: bool,
    now: DateTime<Utc>,
) {
    let first_seen = alert.first_seen_at;
    let age_seconds = (now - first_seen).num_seconds().max(0);
    let at_fraction = |fraction: f64| {
        first_seen + Duration::seconds((age_seconds as f64 * fraction).round() as i64)
    };
    let ack_fraction = (10 + h % 40) as f64 / 100.0;
    let action_fraction = (55 + h % 30) as f64 / 100.0;

    alert.ack_at = None;
    alert.resolved_at = None;
    alert.snooze_until = None;

    match status {
        AlertStatus::Open => {
            alert.last_status_at = first_seen;
        }
        AlertStatus::Ack => {
            let acked = at_fraction(ack_fraction);
            alert.ack_at = Some(acked);
            alert.last_status_at = acked;
        }
        AlertStatus::Escalated => {
            alert.ack_at = Some(at_fraction(ack_fraction));
            alert.last_status_at = at_fraction(action_fraction);
        }
        AlertStatus::Resolved => {
            alert.ack_at = Some(at_fraction(ack_fraction));
            let resolved = at_fraction(action_fraction);
            alert.resolved_at = Some(resolved);
            alert.last_status_at = resolved;
        }
        AlertStatus::Snoozed => {
            let acked = at_fraction(ack_fraction);
            alert.ack_at = Some(acked);
            alert.snooze_until = Some(now + Duration::hours((4 + h % 20) as i64));
            alert.last_status_at = acked;
        }
    }

    alert.status = status;
    alert.occurrences = 1 + (h % 3) + u32::from(breached);
    alert.active_window_count = 1 + (h % 2);
}
