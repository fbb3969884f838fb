//! The nine signal detectors.
//!
//! Every rule shares one volume gate: a scope must clear its effective
//! minimum volume before any rule may fire. The floor scales with both the
//! batch size and the scope's own daily cadence, so a three-post
//! microcluster cannot alert on noise that would be invisible feed-wide.
//!
//! Detectors are pure functions of their inputs and record a `RuleValue`
//! for each rule they fire, so the dashboard can render measured value vs
//! threshold without re-deriving anything.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use pulsewatch_common::math::{mean, pct_change, sanitize, stddev};
use pulsewatch_common::{AlertThresholds, Post, RuleValue, Signal, SignalType, WindowStats};

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("valid regex"));

/// Longest content prefix considered when grouping near-identical posts.
const CONTENT_KEY_LEN: usize = 160;

/// Everything the nine rules read. `volume_z` and `impact_ratio` are
/// computed once by the walker because they need evaluation-wide context.
pub struct DetectionInput<'a> {
    pub stats: &'a WindowStats,
    pub prev_stats: &'a WindowStats,
    pub current: &'a [Post],
    pub previous: &'a [Post],
    pub impact_ratio: f64,
    pub volume_z: f64,
    pub min_volume: u64,
}

#[derive(Debug, Default)]
pub struct Detection {
    pub signals: Vec<Signal>,
    pub rule_values: BTreeMap<SignalType, RuleValue>,
}

impl Detection {
    fn record(
        &mut self,
        signal_type: SignalType,
        label: String,
        value: f64,
        rule_value: RuleValue,
    ) {
        self.signals.push(Signal {
            signal_type,
            label,
            value,
            delta_pct: rule_value.delta_pct,
        });
        self.rule_values.insert(signal_type, rule_value);
    }
}

/// Volume floor for one scope:
/// `max(base, round(globalTotal*0.01), round(dailyMedian*1.2), 3)`.
pub fn effective_min_volume(base: u64, global_total: u64, daily_median: f64) -> u64 {
    let batch_floor = (global_total as f64 * 0.01).round() as u64;
    let cadence_floor = sanitize(daily_median * 1.2).round() as u64;
    base.max(batch_floor).max(cadence_floor).max(3)
}

/// Z-score of the current total against the scope's per-day history.
/// Zero when there are fewer than two days of history or no variance.
pub fn volume_z_score(total: u64, daily_counts: &[f64]) -> f64 {
    if daily_counts.len() < 2 {
        return 0.0;
    }
    let sd = stddev(daily_counts);
    if sd == 0.0 {
        return 0.0;
    }
    sanitize((total as f64 - mean(daily_counts)) / sd)
}

/// Run all nine rules in evaluation order. Returns an empty detection when
/// the scope does not clear its volume gate.
pub fn detect(input: &DetectionInput<'_>, thresholds: &AlertThresholds) -> Detection {
    let mut detection = Detection::default();
    let stats = input.stats;
    if stats.total < input.min_volume {
        return detection;
    }

    let delta_pct = pct_change(stats.total as f64, input.prev_stats.total as f64);

    // 1. volume
    let spiked = delta_pct >= thresholds.volume_spike_pct;
    let z_spiked = input.volume_z >= thresholds.volume_z_score;
    if spiked || z_spiked {
        let label = if spiked {
            format!("Volume spike {delta_pct:+.0}% vs previous window")
        } else {
            format!("Volume {:.1}σ above daily baseline", input.volume_z)
        };
        detection.record(
            SignalType::Volume,
            label,
            delta_pct.max(input.volume_z * 10.0),
            RuleValue {
                value: delta_pct.max(input.volume_z * 10.0),
                threshold: thresholds.volume_spike_pct,
                delta_pct: Some(delta_pct),
                z_score: Some(input.volume_z),
            },
        );
    }

    // 2. sentiment_shift
    let shift = stats.negative_share - input.prev_stats.negative_share;
    if shift >= thresholds.sentiment_shift_pct {
        detection.record(
            SignalType::SentimentShift,
            format!("Negative share up {shift:.1}pp vs previous window"),
            shift,
            RuleValue {
                value: shift,
                threshold: thresholds.sentiment_shift_pct,
                delta_pct: Some(shift),
                z_score: None,
            },
        );
    }

    // 3. negativity
    if stats.negative_share >= thresholds.negativity_pct {
        detection.record(
            SignalType::Negativity,
            format!("Negative share at {:.0}%", stats.negative_share),
            stats.negative_share,
            RuleValue {
                value: stats.negative_share,
                threshold: thresholds.negativity_pct,
                delta_pct: None,
                z_score: None,
            },
        );
    }

    // 4. risk
    if stats.risk_score >= thresholds.risk_threshold {
        detection.record(
            SignalType::Risk,
            format!("Risk score {:.0} (reach-weighted)", stats.risk_score),
            stats.risk_score,
            RuleValue {
                value: stats.risk_score,
                threshold: thresholds.risk_threshold,
                delta_pct: None,
                z_score: None,
            },
        );
    }

    // 5. viral
    if input.impact_ratio >= thresholds.viral_impact_ratio
        && delta_pct >= thresholds.viral_delta_pct
    {
        detection.record(
            SignalType::Viral,
            format!(
                "Impact {:.1}x feed baseline on {delta_pct:+.0}% volume",
                input.impact_ratio
            ),
            input.impact_ratio,
            RuleValue {
                value: input.impact_ratio,
                threshold: thresholds.viral_impact_ratio,
                delta_pct: Some(delta_pct),
                z_score: None,
            },
        );
    }

    // 6. topic_novelty
    if !stats.top_topics.is_empty() {
        let novelty = topic_novelty(&stats.top_topics, &input.prev_stats.top_topics);
        if novelty >= thresholds.topic_novelty_pct {
            detection.record(
                SignalType::TopicNovelty,
                format!("{novelty:.0}% of leading topics are new"),
                novelty,
                RuleValue {
                    value: novelty,
                    threshold: thresholds.topic_novelty_pct,
                    delta_pct: None,
                    z_score: None,
                },
            );
        }
    }

    // 7. cross_platform
    let surging = surging_platforms(
        input.current,
        input.previous,
        input.min_volume,
        thresholds.cross_platform_delta_pct,
    );
    if surging >= thresholds.cross_platform_min_platforms {
        detection.record(
            SignalType::CrossPlatform,
            format!("Surging on {surging} platforms at once"),
            surging as f64,
            RuleValue {
                value: surging as f64,
                threshold: thresholds.cross_platform_min_platforms as f64,
                delta_pct: None,
                z_score: None,
            },
        );
    }

    // 8. coordination
    let coordinated = coordinated_share(input.current);
    if coordinated >= thresholds.coordination_ratio {
        detection.record(
            SignalType::Coordination,
            format!(
                "{:.0}% of volume is near-identical content",
                coordinated * 100.0
            ),
            coordinated,
            RuleValue {
                value: coordinated,
                threshold: thresholds.coordination_ratio,
                delta_pct: None,
                z_score: None,
            },
        );
    }

    // 9. geo_expansion
    let geo_delta = pct_change(stats.geo_spread as f64, input.prev_stats.geo_spread as f64);
    if geo_delta >= thresholds.geo_spread_delta_pct {
        detection.record(
            SignalType::GeoExpansion,
            format!("City spread {geo_delta:+.0}% vs previous window"),
            geo_delta,
            RuleValue {
                value: geo_delta,
                threshold: thresholds.geo_spread_delta_pct,
                delta_pct: Some(geo_delta),
                z_score: None,
            },
        );
    }

    detection
}

/// Percentage of current leading topics absent from the previous leaders.
fn topic_novelty(current_top: &[String], previous_top: &[String]) -> f64 {
    if current_top.is_empty() {
        return 0.0;
    }
    let previous: HashSet<&str> = previous_top.iter().map(|t| t.as_str()).collect();
    let new = current_top
        .iter()
        .filter(|t| !previous.contains(t.as_str()))
        .count();
    sanitize(new as f64 / current_top.len() as f64 * 100.0)
}

/// Platforms whose current volume exceeds `max(3, round(minVolume*0.25))`
/// and whose window-over-window delta clears the configured percentage.
fn surging_platforms(
    current: &[Post],
    previous: &[Post],
    min_volume: u64,
    delta_threshold: f64,
) -> usize {
    let floor = 3u64.max((min_volume as f64 * 0.25).round() as u64);
    let current_counts = platform_counts(current);
    let previous_counts = platform_counts(previous);
    current_counts
        .iter()
        .filter(|(platform, &count)| {
            count > floor
                && pct_change(
                    count as f64,
                    previous_counts.get(*platform).copied().unwrap_or(0) as f64,
                ) >= delta_threshold
        })
        .count()
}

fn platform_counts(posts: &[Post]) -> HashMap<&str, u64> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for post in posts {
        let platform = post.platform.trim();
        if platform.is_empty() {
            continue;
        }
        *counts.entry(platform).or_insert(0) += 1;
    }
    counts
}

/// Share (0..=1) of posts whose normalized content is shared by at least
/// two distinct authors.
fn coordinated_share(posts: &[Post]) -> f64 {
    if posts.is_empty() {
        return 0.0;
    }
    let mut groups: HashMap<String, (u64, HashSet<String>)> = HashMap::new();
    for post in posts {
        let key = content_key(&post.content);
        if key.is_empty() {
            continue;
        }
        let entry = groups.entry(key).or_default();
        entry.0 += 1;
        entry.1.insert(post.author_key());
    }
    let coordinated: u64 = groups
        .values()
        .filter(|(_, authors)| authors.len() >= 2)
        .map(|(count, _)| *count)
        .sum();
    sanitize(coordinated as f64 / posts.len() as f64)
}

/// Lower-cased content with URLs stripped and whitespace collapsed,
/// truncated to the comparison prefix.
fn content_key(content: &str) -> String {
    let stripped = URL_RE.replace_all(content, " ");
    let lowered = stripped.to_lowercase();
    let collapsed = lowered.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(CONTENT_KEY_LEN).collect()
}
