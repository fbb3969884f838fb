use typed_builder::TypedBuilder;

use crate::error::PulseWatchError;
use crate::types::SignalType;

/// Detection thresholds and output limits for one engine instance.
///
/// Defaults are tuned for a feed of a few hundred posts per window. Callers
/// override individual fields through the builder:
///
/// ```ignore
/// let thresholds = AlertThresholds::builder()
///     .negativity_pct(50.0)
///     .max_alerts(10)
///     .build();
/// ```
#[derive(Debug, Clone, TypedBuilder)]
pub struct AlertThresholds {
    /// Absolute floor on posts-per-scope before any rule may fire. The
    /// effective floor also scales with batch size and daily cadence.
    #[builder(default = 5)]
    pub base_min_volume: u64,
    /// Volume delta (%) vs the previous window that counts as a spike.
    #[builder(default = 50.0)]
    pub volume_spike_pct: f64,
    /// Z-score of current volume against per-day history that counts as a
    /// spike even without a window-over-window delta.
    #[builder(default = 2.5)]
    pub volume_z_score: f64,
    /// Negative-share increase (percentage points) vs the previous window.
    #[builder(default = 15.0)]
    pub sentiment_shift_pct: f64,
    /// Absolute negative-share ceiling (%).
    #[builder(default = 35.0)]
    pub negativity_pct: f64,
    /// Reach-weighted risk score ceiling (0..=100).
    #[builder(default = 45.0)]
    pub risk_threshold: f64,
    /// Scope impact over feed-baseline impact ratio that counts as viral.
    #[builder(default = 1.8)]
    pub viral_impact_ratio: f64,
    /// Volume delta (%) that must accompany a viral impact ratio.
    #[builder(default = 40.0)]
    pub viral_delta_pct: f64,
    /// Share (%) of leading topics that must be new vs the previous window.
    #[builder(default = 50.0)]
    pub topic_novelty_pct: f64,
    /// Per-platform volume delta (%) that marks a platform as surging.
    #[builder(default = 30.0)]
    pub cross_platform_delta_pct: f64,
    /// Surging platforms required for a cross-platform signal.
    #[builder(default = 2)]
    pub cross_platform_min_platforms: usize,
    /// Share of window volume (0..=1) coming from near-identical content.
    #[builder(default = 0.25)]
    pub coordination_ratio: f64,
    /// City-spread delta (%) vs the previous window.
    #[builder(default = 60.0)]
    pub geo_spread_delta_pct: f64,
    /// Hard cap on alerts returned per evaluation.
    #[builder(default = 32)]
    pub max_alerts: usize,
    /// Evidence posts attached per alert.
    #[builder(default = 5)]
    pub max_evidence: usize,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl AlertThresholds {
    /// Reject configurations the detectors cannot run with.
    pub fn validate(&self) -> Result<(), PulseWatchError> {
        if self.max_alerts == 0 {
            return Err(PulseWatchError::Validation(
                "max_alerts must be at least 1".to_string(),
            ));
        }
        if self.coordination_ratio <= 0.0 || self.coordination_ratio > 1.0 {
            return Err(PulseWatchError::Validation(format!(
                "coordination_ratio must be in (0, 1], got {}",
                self.coordination_ratio
            )));
        }
        if self.cross_platform_min_platforms == 0 {
            return Err(PulseWatchError::Validation(
                "cross_platform_min_platforms must be at least 1".to_string(),
            ));
        }
        let percentages = [
            ("volume_spike_pct", self.volume_spike_pct),
            ("sentiment_shift_pct", self.sentiment_shift_pct),
            ("negativity_pct", self.negativity_pct),
            ("risk_threshold", self.risk_threshold),
            ("viral_delta_pct", self.viral_delta_pct),
            ("topic_novelty_pct", self.topic_novelty_pct),
            ("cross_platform_delta_pct", self.cross_platform_delta_pct),
            ("geo_spread_delta_pct", self.geo_spread_delta_pct),
        ];
        for (name, value) in percentages {
            if !value.is_finite() || value < 0.0 {
                return Err(PulseWatchError::Validation(format!(
                    "{name} must be a non-negative finite number, got {value}"
                )));
            }
        }
        if !self.viral_impact_ratio.is_finite() || self.viral_impact_ratio <= 0.0 {
            return Err(PulseWatchError::Validation(format!(
                "viral_impact_ratio must be positive, got {}",
                self.viral_impact_ratio
            )));
        }
        Ok(())
    }

    /// The configured threshold for one rule, in that rule's native unit.
    pub fn threshold_for(&self, signal_type: SignalType) -> f64 {
        match signal_type {
            SignalType::Volume => self.volume_spike_pct,
            SignalType::SentimentShift => self.sentiment_shift_pct,
            SignalType::Negativity => self.negativity_pct,
            SignalType::Risk => self.risk_threshold,
            SignalType::Viral => self.viral_impact_ratio,
            SignalType::TopicNovelty => self.topic_novelty_pct,
            SignalType::CrossPlatform => self.cross_platform_min_platforms as f64,
            SignalType::Coordination => self.coordination_ratio,
            SignalType::GeoExpansion => self.geo_spread_delta_pct,
        }
    }
}
