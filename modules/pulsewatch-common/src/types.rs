use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Geo Types ---

/// City-level location attached to a post by the ingestion layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub city: String,
    pub lat: f64,
    pub lng: f64,
}

// --- Sentiment ---

/// Post sentiment as labeled upstream. Wire values are Spanish to stay
/// compatible with the labeling service and the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentiment {
    #[serde(rename = "positivo")]
    Positive,
    #[serde(rename = "neutral")]
    Neutral,
    #[serde(rename = "negativo")]
    Negative,
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sentiment::Positive => write!(f, "positivo"),
            Sentiment::Neutral => write!(f, "neutral"),
            Sentiment::Negative => write!(f, "negativo"),
        }
    }
}

impl Sentiment {
    /// Multiplier applied when ranking posts as alert evidence. Negative
    /// posts are what reviewers need to see first.
    pub fn evidence_boost(&self) -> f64 {
        match self {
            Sentiment::Negative => 1.2,
            Sentiment::Neutral => 1.0,
            Sentiment::Positive => 0.9,
        }
    }
}

// --- Posts ---

/// A single social post, already enriched by the ingestion pipeline with
/// sentiment, topic and cluster assignments. Field names follow the
/// dashboard wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub author: String,
    pub handle: String,
    pub platform: String,
    pub content: String,
    pub sentiment: Sentiment,
    pub topic: String,
    pub timestamp: DateTime<Utc>,
    pub reach: u64,
    pub engagement: u64,
    pub media_type: String,
    pub cluster: String,
    pub subcluster: String,
    pub microcluster: String,
    pub location: GeoLocation,
}

impl Post {
    /// Canonical author identity for diversity and novelty checks:
    /// lower-cased trimmed handle, falling back to the display author.
    pub fn author_key(&self) -> String {
        let handle = self.handle.trim();
        if handle.is_empty() {
            self.author.trim().to_lowercase()
        } else {
            handle.to_lowercase()
        }
    }

    /// Handle as shown to reviewers, falling back to the author name.
    pub fn display_handle(&self) -> &str {
        if self.handle.trim().is_empty() {
            &self.author
        } else {
            &self.handle
        }
    }
}

/// The three post windows an evaluation runs over. `baseline` is older
/// history used for daily-volume statistics and author novelty; it may be
/// empty when the caller has no history yet.
#[derive(Debug, Clone, Default)]
pub struct PostWindows {
    pub current: Vec<Post>,
    pub previous: Vec<Post>,
    pub baseline: Vec<Post>,
}

impl PostWindows {
    pub fn new(current: Vec<Post>, previous: Vec<Post>) -> Self {
        Self {
            current,
            previous,
            baseline: Vec::new(),
        }
    }

    pub fn with_baseline(current: Vec<Post>, previous: Vec<Post>, baseline: Vec<Post>) -> Self {
        Self {
            current,
            previous,
            baseline,
        }
    }
}

// --- Scopes ---

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ScopeType {
    Overall,
    Cluster,
    Subcluster,
    Microcluster,
    City,
    Platform,
}

impl std::fmt::Display for ScopeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScopeType::Overall => write!(f, "overall"),
            ScopeType::Cluster => write!(f, "cluster"),
            ScopeType::Subcluster => write!(f, "subcluster"),
            ScopeType::Microcluster => write!(f, "microcluster"),
            ScopeType::City => write!(f, "city"),
            ScopeType::Platform => write!(f, "platform"),
        }
    }
}

/// One slice of the feed an alert can fire on. Identifiers keep the casing
/// they carry on the posts themselves.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Overall,
    Cluster(String),
    Subcluster(String),
    Microcluster(String),
    City(String),
    Platform(String),
}

impl Scope {
    pub fn scope_type(&self) -> ScopeType {
        match self {
            Scope::Overall => ScopeType::Overall,
            Scope::Cluster(_) => ScopeType::Cluster,
            Scope::Subcluster(_) => ScopeType::Subcluster,
            Scope::Microcluster(_) => ScopeType::Microcluster,
            Scope::City(_) => ScopeType::City,
            Scope::Platform(_) => ScopeType::Platform,
        }
    }

    pub fn scope_id(&self) -> &str {
        match self {
            Scope::Overall => "overall",
            Scope::Cluster(id)
            | Scope::Subcluster(id)
            | Scope::Microcluster(id)
            | Scope::City(id)
            | Scope::Platform(id) => id,
        }
    }

    /// Rendering id used by the dashboard: `overall`, or `type:identifier`.
    pub fn alert_id(&self) -> String {
        match self {
            Scope::Overall => "overall".to_string(),
            other => format!("{}:{}", other.scope_type(), other.scope_id()),
        }
    }

    /// Key hashed into the stable alert identity.
    pub fn identity_key(&self) -> String {
        format!("{}:{}", self.scope_type(), self.scope_id())
    }

    pub fn label(&self) -> String {
        match self {
            Scope::Overall => "Overall feed".to_string(),
            Scope::Cluster(id) => format!("Cluster {id}"),
            Scope::Subcluster(id) => format!("Subcluster {id}"),
            Scope::Microcluster(id) => format!("Microcluster {id}"),
            Scope::City(id) => id.clone(),
            Scope::Platform(id) => {
                let mut chars = id.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            }
        }
    }
}

// --- Severity and status ---

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

impl Severity {
    /// Numeric weight used by priority scoring.
    pub fn weight(&self) -> u32 {
        match self {
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 3,
            Severity::Critical => 4,
        }
    }

    /// Response-time target before an alert counts as SLA-breached.
    pub fn sla_hours(&self) -> i64 {
        match self {
            Severity::Critical => 2,
            Severity::High => 6,
            Severity::Medium => 12,
            Severity::Low => 24,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Open,
    Ack,
    Escalated,
    Snoozed,
    Resolved,
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertStatus::Open => write!(f, "open"),
            AlertStatus::Ack => write!(f, "ack"),
            AlertStatus::Escalated => write!(f, "escalated"),
            AlertStatus::Snoozed => write!(f, "snoozed"),
            AlertStatus::Resolved => write!(f, "resolved"),
        }
    }
}

// --- Signals ---

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    Volume,
    SentimentShift,
    Negativity,
    Risk,
    Viral,
    TopicNovelty,
    CrossPlatform,
    Coordination,
    GeoExpansion,
}

impl SignalType {
    /// Every detector, in evaluation order.
    pub const ALL: [SignalType; 9] = [
        SignalType::Volume,
        SignalType::SentimentShift,
        SignalType::Negativity,
        SignalType::Risk,
        SignalType::Viral,
        SignalType::TopicNovelty,
        SignalType::CrossPlatform,
        SignalType::Coordination,
        SignalType::GeoExpansion,
    ];

    /// Short phrase used in alert titles.
    pub fn headline(&self) -> &'static str {
        match self {
            SignalType::Volume => "Volume spike",
            SignalType::SentimentShift => "Sentiment shift",
            SignalType::Negativity => "Negativity surge",
            SignalType::Risk => "Reputational risk",
            SignalType::Viral => "Viral momentum",
            SignalType::TopicNovelty => "Topic turnover",
            SignalType::CrossPlatform => "Cross-platform surge",
            SignalType::Coordination => "Coordinated posting",
            SignalType::GeoExpansion => "Geographic spread",
        }
    }

    /// One-line explanation shown in the rule catalog.
    pub fn describe(&self) -> &'static str {
        match self {
            SignalType::Volume => "Post volume jumps against the previous window or daily baseline",
            SignalType::SentimentShift => "Negative share climbing versus the previous window",
            SignalType::Negativity => "Negative share holding above the absolute ceiling",
            SignalType::Risk => "Reach-weighted risk score above threshold",
            SignalType::Viral => "Per-post impact far above the feed baseline while volume grows",
            SignalType::TopicNovelty => "Leading topics replaced since the previous window",
            SignalType::CrossPlatform => "Simultaneous growth across several platforms",
            SignalType::Coordination => "Near-identical content pushed by multiple authors",
            SignalType::GeoExpansion => "Conversation spreading into new cities",
        }
    }
}

impl std::fmt::Display for SignalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalType::Volume => write!(f, "volume"),
            SignalType::SentimentShift => write!(f, "sentiment_shift"),
            SignalType::Negativity => write!(f, "negativity"),
            SignalType::Risk => write!(f, "risk"),
            SignalType::Viral => write!(f, "viral"),
            SignalType::TopicNovelty => write!(f, "topic_novelty"),
            SignalType::CrossPlatform => write!(f, "cross_platform"),
            SignalType::Coordination => write!(f, "coordination"),
            SignalType::GeoExpansion => write!(f, "geo_expansion"),
        }
    }
}

/// A triggered detector, carried on the alert for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signal {
    #[serde(rename = "type")]
    pub signal_type: SignalType,
    pub label: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_pct: Option<f64>,
}

/// Measured value vs. configured threshold for a fired rule, kept
/// alongside the signal so the dashboard can explain the trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleValue {
    pub value: f64,
    pub threshold: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_score: Option<f64>,
}

// --- Window statistics ---

/// Aggregates for one scope over one window. Percentages are 0..=100.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowStats {
    pub total: u64,
    pub reach: u64,
    pub engagement: u64,
    pub negative_share: f64,
    pub engagement_rate: f64,
    pub risk_score: f64,
    pub impact_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earliest: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest: Option<DateTime<Utc>>,
    pub top_topics: Vec<String>,
    pub top_entities: Vec<String>,
    pub keywords: Vec<String>,
    pub unique_authors: u64,
    pub new_authors_pct: f64,
    pub geo_spread: u64,
}

// --- Alerts ---

/// A fully-assembled alert, ready for the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    /// Rendering id, scope-derived: `overall` or `type:identifier`.
    pub id: String,
    /// Stable across runs for the same scope; dedupe key for storage.
    pub stable_id: String,
    /// Changes when the leading signal or the day changes.
    pub instance_id: String,
    pub title: String,
    pub summary: String,
    pub scope_type: ScopeType,
    pub scope_id: String,
    pub scope_label: String,
    pub severity: Severity,
    pub status: AlertStatus,
    pub priority: u32,
    pub confidence: u32,
    pub primary_signal: SignalType,
    pub signals: Vec<Signal>,
    pub rule_values: BTreeMap<SignalType, RuleValue>,
    pub volume_current: u64,
    pub volume_prev: u64,
    pub volume_delta_pct: f64,
    pub negative_share: f64,
    pub risk_score: f64,
    pub reach: u64,
    pub engagement: u64,
    pub engagement_rate: f64,
    pub impact_score: f64,
    pub impact_ratio: f64,
    pub top_topics: Vec<String>,
    pub top_entities: Vec<String>,
    pub keywords: Vec<String>,
    pub unique_authors: u64,
    pub new_authors_pct: f64,
    pub geo_spread: u64,
    pub evidence: Vec<Post>,
    pub created_at: DateTime<Utc>,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub last_status_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snooze_until: Option<DateTime<Utc>>,
    pub occurrences: u32,
    pub active_window_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
}
