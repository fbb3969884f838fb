// Test fixtures for the alert pipeline.
//
// Two builders with believable defaults:
// - `post(id)`: a single enriched post; setters override one field each.
// - `alert(scope_id)`: an assembled alert, for lifecycle/report/overlay
//   tests that do not need the full detection pipeline.
//
// Plus `batch` for bulk post generation and `test_now` as the fixed clock
// every deterministic test runs against.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, TimeZone, Utc};

use pulsewatch_common::{
    Alert, AlertStatus, GeoLocation, Post, PostWindows, RuleValue, Scope, Sentiment, Severity,
    Signal, SignalType,
};

use crate::identity;

/// Fixed evaluation clock: 2026-03-14 12:00:00 UTC.
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap()
}

// ---------------------------------------------------------------------------
// Post fixture
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PostFixture {
    post: Post,
}

/// A neutral Quito transit post from one hour ago. Author and handle are
/// derived from `id`, so distinct ids mean distinct authors.
pub fn post(id: &str) -> PostFixture {
    PostFixture {
        post: Post {
            id: id.to_string(),
            author: format!("Autor {id}"),
            handle: format!("@user_{id}"),
            platform: "twitter".to_string(),
            content: format!("nuevo reporte sobre el transporte urbano {id}"),
            sentiment: Sentiment::Neutral,
            topic: "transporte".to_string(),
            timestamp: test_now() - Duration::hours(1),
            reach: 1000,
            engagement: 100,
            media_type: "text".to_string(),
            cluster: "movilidad".to_string(),
            subcluster: "buses".to_string(),
            microcluster: String::new(),
            location: GeoLocation {
                city: "Quito".to_string(),
                lat: -0.1807,
                lng: -78.4678,
            },
        },
    }
}

impl PostFixture {
    pub fn sentiment(mut self, sentiment: Sentiment) -> Self {
        self.post.sentiment = sentiment;
        self
    }

    pub fn negative(self) -> Self {
        self.sentiment(Sentiment::Negative)
    }

    pub fn positive(self) -> Self {
        self.sentiment(Sentiment::Positive)
    }

    pub fn author(mut self, author: &str) -> Self {
        self.post.author = author.to_string();
        self
    }

    pub fn handle(mut self, handle: &str) -> Self {
        self.post.handle = handle.to_string();
        self
    }

    pub fn platform(mut self, platform: &str) -> Self {
        self.post.platform = platform.to_string();
        self
    }

    pub fn content(mut self, content: &str) -> Self {
        self.post.content = content.to_string();
        self
    }

    pub fn topic(mut self, topic: &str) -> Self {
        self.post.topic = topic.to_string();
        self
    }

    pub fn cluster(mut self, cluster: &str) -> Self {
        self.post.cluster = cluster.to_string();
        self
    }

    pub fn subcluster(mut self, subcluster: &str) -> Self {
        self.post.subcluster = subcluster.to_string();
        self
    }

    pub fn microcluster(mut self, microcluster: &str) -> Self {
        self.post.microcluster = microcluster.to_string();
        self
    }

    pub fn city(mut self, city: &str) -> Self {
        self.post.location.city = city.to_string();
        self
    }

    pub fn reach(mut self, reach: u64) -> Self {
        self.post.reach = reach;
        self
    }

    pub fn engagement(mut self, engagement: u64) -> Self {
        self.post.engagement = engagement;
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.post.timestamp = timestamp;
        self
    }

    pub fn hours_ago(mut self, hours: i64) -> Self {
        self.post.timestamp = test_now() - Duration::hours(hours);
        self
    }

    pub fn days_ago(mut self, days: i64) -> Self {
        self.post.timestamp = test_now() - Duration::days(days);
        self
    }

    pub fn build(self) -> Post {
        self.post
    }
}

/// `n` default posts with distinct ids (and therefore distinct authors).
pub fn batch(prefix: &str, n: usize) -> Vec<Post> {
    (0..n)
        .map(|i| post(&format!("{prefix}{i}")).build())
        .collect()
}

pub fn windows(current: Vec<Post>, previous: Vec<Post>) -> PostWindows {
    PostWindows::new(current, previous)
}

// ---------------------------------------------------------------------------
// Alert fixture
// ---------------------------------------------------------------------------

pub struct AlertFixture {
    alert: Alert,
}

/// A medium-severity cluster alert, open, first seen three hours ago.
pub fn alert(scope_id: &str) -> AlertFixture {
    let scope = Scope::Cluster(scope_id.to_string());
    let now = test_now();
    let first_seen = now - Duration::hours(3);
    let signal = Signal {
        signal_type: SignalType::Volume,
        label: "Volume spike +80% vs previous window".to_string(),
        value: 80.0,
        delta_pct: Some(80.0),
    };
    let mut rule_values = BTreeMap::new();
    rule_values.insert(
        SignalType::Volume,
        RuleValue {
            value: 80.0,
            threshold: 50.0,
            delta_pct: Some(80.0),
            z_score: Some(0.0),
        },
    );
    AlertFixture {
        alert: Alert {
            id: scope.alert_id(),
            stable_id: identity::stable_id(&scope),
            instance_id: identity::instance_id(&scope, SignalType::Volume, first_seen),
            title: format!("Volume spike in Cluster {scope_id}"),
            summary: "18 posts (+80% vs previous window).".to_string(),
            scope_type: scope.scope_type(),
            scope_id: scope.scope_id().to_string(),
            scope_label: scope.label(),
            severity: Severity::Medium,
            status: AlertStatus::Open,
            priority: 52,
            confidence: 60,
            primary_signal: SignalType::Volume,
            signals: vec![signal],
            rule_values,
            volume_current: 18,
            volume_prev: 10,
            volume_delta_pct: 80.0,
            negative_share: 20.0,
            risk_score: 30.0,
            reach: 18_000,
            engagement: 1_800,
            engagement_rate: 10.0,
            impact_score: 640.0,
            impact_ratio: 1.2,
            top_topics: vec!["transporte".to_string()],
            top_entities: vec!["@user_a".to_string()],
            keywords: vec!["transporte".to_string()],
            unique_authors: 18,
            new_authors_pct: 0.0,
            geo_spread: 1,
            evidence: Vec::new(),
            created_at: now,
            first_seen_at: first_seen,
            last_seen_at: now - Duration::hours(1),
            last_status_at: first_seen,
            ack_at: None,
            resolved_at: None,
            snooze_until: None,
            occurrences: 1,
            active_window_count: 1,
            owner: None,
            team: None,
            assignee: None,
        },
    }
}

impl AlertFixture {
    pub fn severity(mut self, severity: Severity) -> Self {
        self.alert.severity = severity;
        self
    }

    pub fn status(mut self, status: AlertStatus) -> Self {
        self.alert.status = status;
        self
    }

    pub fn primary(mut self, signal_type: SignalType) -> Self {
        self.alert.primary_signal = signal_type;
        self
    }

    pub fn volume(mut self, volume: u64) -> Self {
        self.alert.volume_current = volume;
        self
    }

    pub fn first_seen(mut self, first_seen: DateTime<Utc>) -> Self {
        self.alert.first_seen_at = first_seen;
        self.alert.last_status_at = first_seen;
        self
    }

    pub fn hours_old(self, hours: i64) -> Self {
        let first_seen = test_now() - Duration::hours(hours);
        self.first_seen(first_seen)
    }

    pub fn build(self) -> Alert {
        self.alert
    }
}
