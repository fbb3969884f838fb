//! Persisted-state overlay.
//!
//! The engine recomputes alerts from scratch every evaluation, so any
//! human edits (acknowledgements, assignments, severity overrides) live
//! in an external store keyed by alert id. After evaluation the caller
//! merges that state back over the fresh alerts; persisted values win
//! wherever they are present. A store failure downgrades to a warning
//! and the engine-computed values stand, so the dashboard always renders.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use pulsewatch_common::{Alert, AlertStatus, Severity};

/// One human action recorded against an alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertAction {
    pub actor: String,
    pub note: String,
    pub at: DateTime<Utc>,
}

/// Human-owned state for one alert. Every field is optional; absent
/// fields leave the engine-computed value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedAlertState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AlertStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snooze_until: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority_override: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity_override: Option<Severity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<AlertAction>,
}

/// Source of persisted alert state, typically a database table keyed by
/// stable alert id.
pub trait AlertStateStore: Send + Sync {
    fn load(&self, ids: &[String]) -> anyhow::Result<HashMap<String, PersistedAlertState>>;
}

/// In-memory store for tests and callers without a database.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    states: HashMap<String, PersistedAlertState>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, state: PersistedAlertState) {
        self.states.insert(id.into(), state);
    }
}

impl AlertStateStore for MemoryStateStore {
    fn load(&self, ids: &[String]) -> anyhow::Result<HashMap<String, PersistedAlertState>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.states.get(id).map(|s| (id.clone(), s.clone())))
            .collect())
    }
}

/// Load persisted state for `alerts` and merge it in. Store failures are
/// logged and swallowed; the alerts keep their engine-computed values.
pub fn load_and_overlay(alerts: &mut [Alert], store: &dyn AlertStateStore) {
    let ids: Vec<String> = alerts.iter().map(|a| a.id.clone()).collect();
    match store.load(&ids) {
        Ok(states) => overlay_persisted(alerts, &states),
        Err(error) => {
            warn!(%error, "alert state store unavailable, keeping computed lifecycle");
        }
    }
}

/// Merge persisted human state over engine-computed alerts.
///
/// A persisted status replaces the simulated one together with all of its
/// timestamps, so a human "open" also clears synthesized ack/resolve
/// times. Assignment fields and overrides apply independently of status.
pub fn overlay_persisted(alerts: &mut [Alert], states: &HashMap<String, PersistedAlertState>) {
    for alert in alerts.iter_mut() {
        let Some(state) = states.get(&alert.id) else {
            continue;
        };

        if let Some(status) = state.status {
            alert.status = status;
            alert.ack_at = state.ack_at;
            alert.resolved_at = state.resolved_at;
            alert.snooze_until = state.snooze_until;
            alert.last_status_at = [state.ack_at, state.resolved_at]
                .into_iter()
                .flatten()
                .max()
                .unwrap_or(alert.first_seen_at);
        }

        if let Some(owner) = &state.owner {
            alert.owner = Some(owner.clone());
        }
        if let Some(team) = &state.team {
            alert.team = Some(team.clone());
        }
        if let Some(assignee) = &state.assignee {
            alert.assignee = Some(assignee.clone());
        }
        if let Some(priority) = state.priority_override {
            alert.priority = priority.min(100);
        }
        if let Some(severity) = state.severity_override {
            alert.severity = severity;
        }
        if let Some(latest) = state.actions.iter().map(|a| a.at).max() {
            alert.last_status_at = latest;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{alert, test_now};
    use chrono::Duration;

    fn persisted() -> PersistedAlertState {
        PersistedAlertState::default()
    }

    // --- overlay tests ---

    #[test]
    fn persisted_status_replaces_simulated_lifecycle() {
        let mut alerts = vec![alert("movilidad").status(AlertStatus::Escalated).build()];
        let resolved_at = test_now() - Duration::hours(1);
        let acked_at = test_now() - Duration::hours(2);
        let mut states = HashMap::new();
        states.insert(
            alerts[0].id.clone(),
            PersistedAlertState {
                status: Some(AlertStatus::Resolved),
                ack_at: Some(acked_at),
                resolved_at: Some(resolved_at),
                ..persisted()
            },
        );

        overlay_persisted(&mut alerts, &states);
        assert_eq!(alerts[0].status, AlertStatus::Resolved);
        assert_eq!(alerts[0].ack_at, Some(acked_at));
        assert_eq!(alerts[0].resolved_at, Some(resolved_at));
        assert_eq!(alerts[0].last_status_at, resolved_at);
    }

    #[test]
    fn persisted_open_clears_synthesized_timestamps() {
        let mut a = alert("movilidad").status(AlertStatus::Ack).build();
        a.ack_at = Some(test_now() - Duration::hours(1));
        let mut alerts = vec![a];
        let mut states = HashMap::new();
        states.insert(
            alerts[0].id.clone(),
            PersistedAlertState {
                status: Some(AlertStatus::Open),
                ..persisted()
            },
        );

        overlay_persisted(&mut alerts, &states);
        assert_eq!(alerts[0].status, AlertStatus::Open);
        assert!(alerts[0].ack_at.is_none());
        assert!(alerts[0].resolved_at.is_none());
        assert_eq!(alerts[0].last_status_at, alerts[0].first_seen_at);
    }

    #[test]
    fn assignments_apply_without_status() {
        let mut alerts = vec![alert("movilidad").build()];
        let engine_status = alerts[0].status;
        let mut states = HashMap::new();
        states.insert(
            alerts[0].id.clone(),
            PersistedAlertState {
                owner: Some("comms".to_string()),
                assignee: Some("lucia".to_string()),
                priority_override: Some(95),
                severity_override: Some(Severity::Critical),
                ..persisted()
            },
        );

        overlay_persisted(&mut alerts, &states);
        assert_eq!(alerts[0].status, engine_status);
        assert_eq!(alerts[0].owner.as_deref(), Some("comms"));
        assert_eq!(alerts[0].assignee.as_deref(), Some("lucia"));
        assert_eq!(alerts[0].priority, 95);
        assert_eq!(alerts[0].severity, Severity::Critical);
    }

    #[test]
    fn priority_override_is_capped() {
        let mut alerts = vec![alert("movilidad").build()];
        let mut states = HashMap::new();
        states.insert(
            alerts[0].id.clone(),
            PersistedAlertState {
                priority_override: Some(400),
                ..persisted()
            },
        );
        overlay_persisted(&mut alerts, &states);
        assert_eq!(alerts[0].priority, 100);
    }

    #[test]
    fn latest_action_moves_last_status_at() {
        let mut alerts = vec![alert("movilidad").build()];
        let older = test_now() - Duration::hours(2);
        let newer = test_now() - Duration::minutes(10);
        let mut states = HashMap::new();
        states.insert(
            alerts[0].id.clone(),
            PersistedAlertState {
                actions: vec![
                    AlertAction {
                        actor: "lucia".to_string(),
                        note: "revisando".to_string(),
                        at: newer,
                    },
                    AlertAction {
                        actor: "marco".to_string(),
                        note: "visto".to_string(),
                        at: older,
                    },
                ],
                ..persisted()
            },
        );

        overlay_persisted(&mut alerts, &states);
        assert_eq!(alerts[0].last_status_at, newer);
    }

    #[test]
    fn unknown_ids_are_left_alone() {
        let mut alerts = vec![alert("movilidad").build()];
        let before = alerts[0].clone();
        let mut states = HashMap::new();
        states.insert(
            "cluster:otra".to_string(),
            PersistedAlertState {
                status: Some(AlertStatus::Resolved),
                ..persisted()
            },
        );
        overlay_persisted(&mut alerts, &states);
        assert_eq!(alerts[0].status, before.status);
        assert_eq!(alerts[0].last_status_at, before.last_status_at);
    }

    // --- store tests ---

    #[test]
    fn memory_store_roundtrips_through_load_and_overlay() {
        let mut alerts = vec![alert("movilidad").build()];
        let mut store = MemoryStateStore::new();
        store.insert(
            alerts[0].id.clone(),
            PersistedAlertState {
                team: Some("prensa".to_string()),
                ..persisted()
            },
        );

        load_and_overlay(&mut alerts, &store);
        assert_eq!(alerts[0].team.as_deref(), Some("prensa"));
    }

    struct FailingStore;

    impl AlertStateStore for FailingStore {
        fn load(&self, _ids: &[String]) -> anyhow::Result<HashMap<String, PersistedAlertState>> {
            Err(anyhow::anyhow!("connection refused"))
        }
    }

    #[test]
    fn store_failure_keeps_engine_values() {
        let mut alerts = vec![alert("movilidad").status(AlertStatus::Ack).build()];
        load_and_overlay(&mut alerts, &FailingStore);
        assert_eq!(alerts[0].status, AlertStatus::Ack);
    }

    #[test]
    fn persisted_state_wire_format_is_camel_case() {
        let state = PersistedAlertState {
            priority_override: Some(90),
            snooze_until: Some(test_now()),
            ..persisted()
        };
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"priorityOverride\":90"));
        assert!(json.contains("\"snoozeUntil\""));
        assert!(!json.contains("\"status\""));
    }
}
