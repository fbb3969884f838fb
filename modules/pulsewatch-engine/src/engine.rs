//! Evaluation entry point: walks every scope of a post batch, runs the
//! detector/scorer pipeline on each, deduplicates the hierarchy, ranks
//! the winners and hands them to the lifecycle policy.
//!
//! ```ignore
//! let engine = AlertEngine::new(AlertThresholds::default());
//! let alerts = engine.evaluate(&PostWindows::new(current, previous));
//! ```
//!
//! `evaluate` is infallible. Empty or undersized windows yield an empty
//! list, never an error.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use tracing::info;

use pulsewatch_common::math::pct_change;
use pulsewatch_common::{
    math, Alert, AlertStatus, AlertThresholds, PostWindows, Scope, Signal, SignalType, WindowStats,
};

use crate::detect::{self, DetectionInput};
use crate::evidence::select_evidence;
use crate::identity;
use crate::lifecycle::{LifecyclePolicy, SimulatedLifecycle};
use crate::scopes::{self, ScopeSlice, ScoredAlert};
use crate::score::{self, ScoreInputs};
use crate::stats;

pub struct AlertEngine {
    thresholds: AlertThresholds,
    lifecycle: Box<dyn LifecyclePolicy>,
}

impl AlertEngine {
    pub fn new(thresholds: AlertThresholds) -> Self {
        Self {
            thresholds,
            lifecycle: Box::new(SimulatedLifecycle),
        }
    }

    /// Same engine, caller-supplied lifecycle (a real workflow store, or
    /// a no-op policy for pipelines that only want detection).
    pub fn with_lifecycle(
        thresholds: AlertThresholds,
        lifecycle: Box<dyn LifecyclePolicy>,
    ) -> Self {
        Self {
            thresholds,
            lifecycle,
        }
    }

    pub fn thresholds(&self) -> &AlertThresholds {
        &self.thresholds
    }

    pub fn evaluate(&self, windows: &PostWindows) -> Vec<Alert> {
        self.evaluate_at(windows, Utc::now())
    }

    /// `evaluate` against an explicit clock. Lifecycle synthesis and the
    /// `created_at` stamps derive from `now`, so a fixed clock makes the
    /// whole run reproducible.
    pub fn evaluate_at(&self, windows: &PostWindows, now: DateTime<Utc>) -> Vec<Alert> {
        let global_total = windows.current.len() as u64;
        let global_impact = stats::global_impact_baseline(&windows.current);

        let slices = scopes::scope_slices(windows);
        let scope_count = slices.len();
        let mut scored: Vec<ScoredAlert> = slices
            .iter()
            .filter_map(|slice| self.evaluate_slice(slice, global_total, global_impact, now))
            .collect();

        scored = scopes::dedup_children(scored);
        scored.sort_by(|a, b| {
            b.ranking
                .partial_cmp(&a.ranking)
                .unwrap_or(Ordering::Equal)
        });
        scored.truncate(self.thresholds.max_alerts);

        let mut alerts: Vec<Alert> = scored.into_iter().map(|s| s.alert).collect();
        self.lifecycle.apply(&mut alerts, now);

        info!(
            alerts = alerts.len(),
            scopes = scope_count,
            posts = windows.current.len(),
            "alert evaluation complete"
        );
        alerts
    }

    /// Full pipeline for one scope. `None` when the scope is under its
    /// volume floor or no detector fires.
    fn evaluate_slice(
        &self,
        slice: &ScopeSlice,
        global_total: u64,
        global_impact: f64,
        now: DateTime<Utc>,
    ) -> Option<ScoredAlert> {
        let stats = stats::window_stats(&slice.current, Some(&slice.previous));
        let prev_stats = stats::window_stats(&slice.previous, None);

        let daily = stats::daily_counts(slice.previous.iter().chain(slice.baseline.iter()));
        let min_volume = detect::effective_min_volume(
            self.thresholds.base_min_volume,
            global_total,
            math::median(&daily),
        );
        let volume_z = detect::volume_z_score(stats.total, &daily);
        let impact_ratio = if global_impact > 0.0 {
            math::sanitize(stats.impact_score / global_impact)
        } else {
            0.0
        };

        let detection = detect::detect(
            &DetectionInput {
                stats: &stats,
                prev_stats: &prev_stats,
                current: &slice.current,
                previous: &slice.previous,
                impact_ratio,
                volume_z,
                min_volume,
            },
            &self.thresholds,
        );

        let delta_pct = pct_change(stats.total as f64, prev_stats.total as f64);
        let classification = score::classify(
            &detection.signals,
            &ScoreInputs {
                delta_pct,
                risk_score: stats.risk_score,
                negative_share: stats.negative_share,
                impact_ratio,
                volume_z,
                total: stats.total,
                prev_total: prev_stats.total,
                min_volume,
            },
        )?;

        let first_seen = stats.earliest.unwrap_or(now);
        let last_seen = stats.latest.unwrap_or(now);
        let scope = &slice.scope;

        let alert = Alert {
            id: scope.alert_id(),
            stable_id: identity::stable_id(scope),
            instance_id: identity::instance_id(scope, classification.primary, last_seen),
            title: alert_title(scope, classification.primary),
            summary: alert_summary(&stats, prev_stats.total, delta_pct, &detection.signals),
            scope_type: scope.scope_type(),
            scope_id: scope.scope_id().to_string(),
            scope_label: scope.label(),
            severity: classification.severity,
            status: AlertStatus::Open,
            priority: classification.priority,
            confidence: classification.confidence,
            primary_signal: classification.primary,
            signals: detection.signals,
            rule_values: detection.rule_values,
            volume_current: stats.total,
            volume_prev: prev_stats.total,
            volume_delta_pct: delta_pct,
            negative_share: stats.negative_share,
            risk_score: stats.risk_score,
            reach: stats.reach,
            engagement: stats.engagement,
            engagement_rate: stats.engagement_rate,
            impact_score: stats.impact_score,
            impact_ratio,
            top_topics: stats.top_topics,
            top_entities: stats.top_entities,
            keywords: stats.keywords,
            unique_authors: stats.unique_authors,
            new_authors_pct: stats.new_authors_pct,
            geo_spread: stats.geo_spread,
            evidence: select_evidence(&slice.current, self.thresholds.max_evidence),
            created_at: now,
            first_seen_at: first_seen,
            last_seen_at: last_seen,
            last_status_at: first_seen,
            ack_at: None,
            resolved_at: None,
            snooze_until: None,
            occurrences: 1,
            active_window_count: 1,
            owner: None,
            team: None,
            assignee: None,
        };

        Some(ScoredAlert {
            alert,
            ranking: classification.ranking,
            parent: slice.parent.clone(),
        })
    }
}

fn alert_title(scope: &Scope, primary: SignalType) -> String {
    match scope {
        Scope::Overall => format!("{} across the feed", primary.headline()),
        other => format!("{} in {}", primary.headline(), other.label()),
    }
}

fn alert_summary(
    stats: &WindowStats,
    prev_total: u64,
    delta_pct: f64,
    signals: &[Signal],
) -> String {
    let names: Vec<&str> = signals.iter().map(|s| s.signal_type.headline()).collect();
    format!(
        "{} posts vs {} in the previous window ({:+.0}%). Negative share {:.0}%, risk {:.0}, reach {}. Triggered: {}.",
        stats.total,
        prev_total,
        delta_pct,
        stats.negative_share,
        stats.risk_score,
        stats.reach,
        names.join(", ")
    )
}
