//! Scope walking: one evaluation per slice of the feed, then suppression
//! of child alerts that merely echo their parent.
//!
//! The walk order is fixed and doubles as the ranking tie-break: overall
//! first, then clusters, subclusters, microclusters, cities, platforms,
//! each group in first-appearance order over the current window.

use std::collections::HashMap;

use tracing::debug;

use pulsewatch_common::{Alert, Post, PostWindows, Scope, ScopeType, SignalType};

/// How much more extreme (on ranking score) a child must be than its
/// parent to survive deduplication.
const CHILD_ESCAPE_FACTOR: f64 = 0.85;

/// One scope's view of the three windows. Slices own copies of their
/// posts so every scope evaluation stays independent.
pub(crate) struct ScopeSlice {
    pub scope: Scope,
    pub parent: Option<(ScopeType, String)>,
    pub current: Vec<Post>,
    pub previous: Vec<Post>,
    pub baseline: Vec<Post>,
}

/// An evaluated alert still carrying its internal ranking score and parent
/// linkage. Both are stripped before the alert leaves the engine.
pub(crate) struct ScoredAlert {
    pub alert: Alert,
    pub ranking: f64,
    pub parent: Option<(ScopeType, String)>,
}

/// All scopes to evaluate, in walk order.
pub(crate) fn scope_slices(windows: &PostWindows) -> Vec<ScopeSlice> {
    let mut slices = vec![ScopeSlice {
        scope: Scope::Overall,
        parent: None,
        current: windows.current.clone(),
        previous: windows.previous.clone(),
        baseline: windows.baseline.clone(),
    }];
    for dimension in [
        ScopeType::Cluster,
        ScopeType::Subcluster,
        ScopeType::Microcluster,
        ScopeType::City,
        ScopeType::Platform,
    ] {
        slices.extend(grouped_slices(windows, dimension));
    }
    slices
}

fn grouped_slices(windows: &PostWindows, dimension: ScopeType) -> Vec<ScopeSlice> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<Post>> = HashMap::new();
    for post in &windows.current {
        let key = scope_key(dimension, post).trim();
        if key.is_empty() {
            continue;
        }
        if !groups.contains_key(key) {
            order.push(key.to_string());
        }
        groups.entry(key.to_string()).or_default().push(post.clone());
    }

    order
        .into_iter()
        .map(|key| {
            let current = groups.remove(&key).unwrap_or_default();
            let previous: Vec<Post> = windows
                .previous
                .iter()
                .filter(|p| scope_key(dimension, p).trim() == key)
                .cloned()
                .collect();
            let baseline: Vec<Post> = windows
                .baseline
                .iter()
                .filter(|p| scope_key(dimension, p).trim() == key)
                .cloned()
                .collect();
            let parent = parent_of(dimension, &current);
            ScopeSlice {
                scope: scope_for(dimension, key),
                parent,
                current,
                previous,
                baseline,
            }
        })
        .collect()
}

fn scope_key(dimension: ScopeType, post: &Post) -> &str {
    match dimension {
        ScopeType::Overall => "overall",
        ScopeType::Cluster => &post.cluster,
        ScopeType::Subcluster => &post.subcluster,
        ScopeType::Microcluster => &post.microcluster,
        ScopeType::City => &post.location.city,
        ScopeType::Platform => &post.platform,
    }
}

fn scope_for(dimension: ScopeType, key: String) -> Scope {
    match dimension {
        ScopeType::Overall => Scope::Overall,
        ScopeType::Cluster => Scope::Cluster(key),
        ScopeType::Subcluster => Scope::Subcluster(key),
        ScopeType::Microcluster => Scope::Microcluster(key),
        ScopeType::City => Scope::City(key),
        ScopeType::Platform => Scope::Platform(key),
    }
}

/// Subclusters hang off the cluster of their first post, microclusters off
/// its subcluster. Other dimensions have no hierarchy.
fn parent_of(dimension: ScopeType, current: &[Post]) -> Option<(ScopeType, String)> {
    let first = current.first()?;
    let (parent_type, parent_id) = match dimension {
        ScopeType::Subcluster => (ScopeType::Cluster, first.cluster.trim()),
        ScopeType::Microcluster => (ScopeType::Subcluster, first.subcluster.trim()),
        _ => return None,
    };
    if parent_id.is_empty() {
        None
    } else {
        Some((parent_type, parent_id.to_string()))
    }
}

/// Drop child alerts that repeat their parent's story: same primary signal
/// and not markedly more extreme than the parent.
pub(crate) fn dedup_children(scored: Vec<ScoredAlert>) -> Vec<ScoredAlert> {
    let index: HashMap<(ScopeType, String), (SignalType, f64)> = scored
        .iter()
        .map(|s| {
            (
                (s.alert.scope_type, s.alert.scope_id.clone()),
                (s.alert.primary_signal, s.ranking),
            )
        })
        .collect();

    let before = scored.len();
    let kept: Vec<ScoredAlert> = scored
        .into_iter()
        .filter(|s| {
            let Some((parent_type, parent_id)) = &s.parent else {
                return true;
            };
            let Some(&(parent_primary, parent_ranking)) =
                index.get(&(*parent_type, parent_id.clone()))
            else {
                return true;
            };
            if parent_primary != s.alert.primary_signal {
                return true;
            }
            parent_ranking < s.ranking * CHILD_ESCAPE_FACTOR
        })
        .collect();

    if kept.len() < before {
        debug!(
            suppressed = before - kept.len(),
            "deduplicated child alerts echoing their parents"
        );
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{alert, post};

    // --- walker tests ---

    #[test]
    fn walk_starts_overall_then_follows_first_appearance() {
        let windows = PostWindows::new(
            vec![
                post("a").cluster("seguridad").city("Quito").build(),
                post("b").cluster("movilidad").city("Cuenca").build(),
                post("c").cluster("seguridad").city("Quito").build(),
            ],
            vec![],
        );
        let slices = scope_slices(&windows);
        let ids: Vec<String> = slices.iter().map(|s| s.scope.alert_id()).collect();
        // Clusters in first-appearance order; cities likewise.
        assert_eq!(ids[0], "overall");
        assert_eq!(ids[1], "cluster:seguridad");
        assert_eq!(ids[2], "cluster:movilidad");
        assert!(ids.contains(&"city:Quito".to_string()));
        assert!(ids.contains(&"city:Cuenca".to_string()));
        let quito = ids.iter().position(|i| i == "city:Quito").unwrap();
        let cuenca = ids.iter().position(|i| i == "city:Cuenca").unwrap();
        assert!(quito < cuenca);
    }

    #[test]
    fn empty_keys_produce_no_scope() {
        let windows = PostWindows::new(
            vec![post("a").cluster("").microcluster("  ").build()],
            vec![],
        );
        let slices = scope_slices(&windows);
        assert!(slices
            .iter()
            .all(|s| s.scope.scope_type() != ScopeType::Cluster));
        assert!(slices
            .iter()
            .all(|s| s.scope.scope_type() != ScopeType::Microcluster));
    }

    #[test]
    fn grouped_slice_carries_matching_previous_and_baseline() {
        let windows = PostWindows::with_baseline(
            vec![post("a").cluster("movilidad").build()],
            vec![
                post("p1").cluster("movilidad").days_ago(1).build(),
                post("p2").cluster("seguridad").days_ago(1).build(),
            ],
            vec![post("b1").cluster("movilidad").days_ago(4).build()],
        );
        let slices = scope_slices(&windows);
        let cluster_slice = slices
            .iter()
            .find(|s| s.scope.alert_id() == "cluster:movilidad")
            .unwrap();
        assert_eq!(cluster_slice.current.len(), 1);
        assert_eq!(cluster_slice.previous.len(), 1);
        assert_eq!(cluster_slice.previous[0].id, "p1");
        assert_eq!(cluster_slice.baseline.len(), 1);
    }

    #[test]
    fn subclusters_and_microclusters_record_parents() {
        let windows = PostWindows::new(
            vec![post("a")
                .cluster("movilidad")
                .subcluster("buses")
                .microcluster("terminal-sur")
                .build()],
            vec![],
        );
        let slices = scope_slices(&windows);
        let sub = slices
            .iter()
            .find(|s| s.scope.alert_id() == "subcluster:buses")
            .unwrap();
        assert_eq!(
            sub.parent,
            Some((ScopeType::Cluster, "movilidad".to_string()))
        );
        let micro = slices
            .iter()
            .find(|s| s.scope.alert_id() == "microcluster:terminal-sur")
            .unwrap();
        assert_eq!(
            micro.parent,
            Some((ScopeType::Subcluster, "buses".to_string()))
        );
        // Cities and platforms stay flat.
        let city = slices
            .iter()
            .find(|s| s.scope.scope_type() == ScopeType::City)
            .unwrap();
        assert!(city.parent.is_none());
    }

    // --- dedup tests ---

    fn scored(alert: Alert, ranking: f64, parent: Option<(ScopeType, String)>) -> ScoredAlert {
        ScoredAlert {
            alert,
            ranking,
            parent,
        }
    }

    fn child_of(sub_id: &str) -> Alert {
        let mut child = alert(sub_id).build();
        child.scope_type = ScopeType::Subcluster;
        child
    }

    #[test]
    fn child_echoing_parent_is_suppressed() {
        let parent = scored(alert("movilidad").build(), 80.0, None);
        let child = scored(
            child_of("buses"),
            90.0,
            Some((ScopeType::Cluster, "movilidad".to_string())),
        );
        // 80 < 90*0.85 = 76.5 is false: suppressed.
        let kept = dedup_children(vec![parent, child]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].alert.scope_id, "movilidad");
    }

    #[test]
    fn markedly_stronger_child_survives() {
        let parent = scored(alert("movilidad").build(), 80.0, None);
        let child = scored(
            child_of("buses"),
            96.0,
            Some((ScopeType::Cluster, "movilidad".to_string())),
        );
        // 80 < 96*0.85 = 81.6: survives.
        let kept = dedup_children(vec![parent, child]);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn different_primary_signal_survives() {
        let parent = scored(alert("movilidad").build(), 80.0, None);
        let mut child_alert = child_of("buses");
        child_alert.primary_signal = SignalType::Negativity;
        let child = scored(
            child_alert,
            60.0,
            Some((ScopeType::Cluster, "movilidad".to_string())),
        );
        let kept = dedup_children(vec![parent, child]);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn orphan_child_survives() {
        // Parent scope never produced an alert.
        let child = scored(
            child_of("buses"),
            40.0,
            Some((ScopeType::Cluster, "movilidad".to_string())),
        );
        let kept = dedup_children(vec![child]);
        assert_eq!(kept.len(), 1);
    }
}
