//! Window statistics: pure aggregation of one scope's posts into the
//! numbers every detector reads.
//!
//! Two impact formulas coexist on purpose. Per-scope `impact_score` is a
//! mean, so a handful of viral posts can pull a small scope far above the
//! feed. The feed-wide baseline uses medians, which ignore those outliers.
//! Their ratio is the `viral` detector's input.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;

use pulsewatch_common::math::{clamp_score, mean, median, sanitize};
use pulsewatch_common::{Post, Sentiment, WindowStats};

/// Combined Spanish/English stopword list for keyword extraction. Only
/// words longer than three characters matter; shorter tokens are dropped
/// before the lookup.
const STOPWORDS: &[&str] = &[
    // Spanish
    "para", "pero", "como", "más", "esta", "este", "esto", "estos", "estas", "entre", "cuando",
    "donde", "sobre", "también", "hasta", "desde", "todo", "toda", "todos", "todas", "otro",
    "otra", "otros", "otras", "porque", "tiene", "tienen", "hace", "hacen", "sido", "está",
    "están", "ellos", "ellas", "nosotros", "ustedes", "antes", "después", "ahora", "aquí",
    "algo", "alguien", "mucho", "mucha", "muchos", "muchas", "poco", "nada", "cada", "unos",
    "unas", "ser", "será", "fueron", "siempre", "nunca", "tanto", "mismo", "misma", "solo",
    // English
    "that", "this", "with", "from", "have", "been", "they", "their", "them", "then", "than",
    "there", "these", "those", "were", "would", "could", "should", "about", "which", "when",
    "what", "where", "will", "just", "like", "more", "some", "very", "your", "into", "only",
    "over", "also", "after", "because", "does", "most", "much", "many", "such", "here", "still",
    // Link debris survives alphanumeric tokenization
    "https", "http",
];

/// Aggregate a post window. `author_baseline` is the comparison set for
/// author novelty (the scope's previous window); when absent or empty,
/// `new_authors_pct` stays 0.
pub fn window_stats(posts: &[Post], author_baseline: Option<&[Post]>) -> WindowStats {
    if posts.is_empty() {
        return WindowStats::default();
    }

    let total = posts.len() as u64;
    let reach: u64 = posts.iter().map(|p| p.reach).sum();
    let engagement: u64 = posts.iter().map(|p| p.engagement).sum();

    let negative = posts
        .iter()
        .filter(|p| p.sentiment == Sentiment::Negative)
        .count();
    let negative_share = sanitize(negative as f64 / total as f64 * 100.0);

    let engagement_rate = if reach > 0 {
        sanitize(engagement as f64 / reach as f64 * 100.0)
    } else {
        0.0
    };

    let reach_values: Vec<f64> = posts.iter().map(|p| p.reach as f64).collect();
    let engagement_values: Vec<f64> = posts.iter().map(|p| p.engagement as f64).collect();
    let impact_score = sanitize(mean(&reach_values) * 0.6 + mean(&engagement_values) * 0.4);

    let authors = author_keys(posts);
    let new_authors_pct = match author_baseline {
        Some(base) if !base.is_empty() && !authors.is_empty() => {
            let base_authors = author_keys(base);
            let new = authors.iter().filter(|a| !base_authors.contains(*a)).count();
            sanitize(new as f64 / authors.len() as f64 * 100.0)
        }
        _ => 0.0,
    };

    let geo_spread = posts
        .iter()
        .map(|p| p.location.city.trim())
        .filter(|c| !c.is_empty())
        .collect::<HashSet<_>>()
        .len() as u64;

    WindowStats {
        total,
        reach,
        engagement,
        negative_share,
        engagement_rate,
        risk_score: risk_score(posts),
        impact_score,
        earliest: posts.iter().map(|p| p.timestamp).min(),
        latest: posts.iter().map(|p| p.timestamp).max(),
        top_topics: top_topics(posts),
        top_entities: top_entities(posts),
        keywords: keywords(posts),
        unique_authors: authors.len() as u64,
        new_authors_pct,
        geo_spread,
    }
}

/// Reach-weighted risk in 0..=100:
/// `(negReach*1.2 + neutralReach*0.5 - posReach*0.3) / totalReach * 100`.
/// Each post weighs `max(reach, 1)` so zero-reach posts still count.
pub fn risk_score(posts: &[Post]) -> f64 {
    let mut negative = 0.0;
    let mut neutral = 0.0;
    let mut positive = 0.0;
    let mut total = 0.0;
    for post in posts {
        let weight = post.reach.max(1) as f64;
        match post.sentiment {
            Sentiment::Negative => negative += weight,
            Sentiment::Neutral => neutral += weight,
            Sentiment::Positive => positive += weight,
        }
        total += weight;
    }
    if total <= 0.0 {
        return 0.0;
    }
    clamp_score((negative * 1.2 + neutral * 0.5 - positive * 0.3) / total * 100.0)
}

/// Feed-wide impact baseline, computed once per evaluation over all
/// current posts: `median(reach)*0.6 + median(engagement)*0.4`.
pub fn global_impact_baseline(posts: &[Post]) -> f64 {
    if posts.is_empty() {
        return 0.0;
    }
    let reach_values: Vec<f64> = posts.iter().map(|p| p.reach as f64).collect();
    let engagement_values: Vec<f64> = posts.iter().map(|p| p.engagement as f64).collect();
    sanitize(median(&reach_values) * 0.6 + median(&engagement_values) * 0.4)
}

/// Post counts per UTC calendar day, ascending by day. Only days present
/// in the data appear, matching a GROUP BY histogram.
pub fn daily_counts<'a, I>(posts: I) -> Vec<f64>
where
    I: IntoIterator<Item = &'a Post>,
{
    let mut per_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for post in posts {
        *per_day.entry(post.timestamp.date_naive()).or_insert(0) += 1;
    }
    per_day.values().map(|&c| c as f64).collect()
}

pub(crate) fn author_keys(posts: &[Post]) -> HashSet<String> {
    posts
        .iter()
        .map(|p| p.author_key())
        .filter(|k| !k.is_empty())
        .collect()
}

fn top_topics(posts: &[Post]) -> Vec<String> {
    ranked_counts(
        posts
            .iter()
            .map(|p| p.topic.trim())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_string()),
        3,
    )
}

fn top_entities(posts: &[Post]) -> Vec<String> {
    ranked_counts(
        posts
            .iter()
            .map(|p| p.display_handle().trim())
            .filter(|h| !h.is_empty())
            .map(|h| h.to_string()),
        4,
    )
}

fn keywords(posts: &[Post]) -> Vec<String> {
    let tokens = posts.iter().flat_map(|p| {
        p.content
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.chars().count() > 3 && !STOPWORDS.iter().any(|w| w == t))
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
    });
    ranked_counts(tokens, 6)
}

/// Top `limit` items by count, descending; ties keep first-seen order.
fn ranked_counts<I: IntoIterator<Item = String>>(items: I, limit: usize) -> Vec<String> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (position, item) in items.into_iter().enumerate() {
        let entry = counts.entry(item).or_insert((0, position));
        entry.0 += 1;
    }
    let mut ranked: Vec<(String, usize, usize)> = counts
        .into_iter()
        .map(|(item, (count, first_seen))| (item, count, first_seen))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    ranked.truncate(limit);
    ranked.into_iter().map(|(item, _, _)| item).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{batch, post};

    // --- window_stats tests ---

    #[test]
    fn empty_window_yields_zero_stats() {
        let stats = window_stats(&[], None);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.risk_score, 0.0);
        assert_eq!(stats.impact_score, 0.0);
        assert_eq!(stats.negative_share, 0.0);
        assert!(stats.earliest.is_none());
        assert!(stats.top_topics.is_empty());
    }

    #[test]
    fn negative_share_is_a_percentage() {
        // 100 posts, 40 negative.
        let mut posts = batch("bg", 60);
        posts.extend((0..40).map(|i| post(&format!("neg{i}")).negative().build()));
        let stats = window_stats(&posts, None);
        assert_eq!(stats.total, 100);
        assert_eq!(stats.negative_share, 40.0);
    }

    #[test]
    fn engagement_rate_is_engagement_over_reach() {
        let posts = vec![
            post("a").reach(8_000).engagement(300).build(),
            post("b").reach(2_000).engagement(200).build(),
        ];
        let stats = window_stats(&posts, None);
        assert_eq!(stats.reach, 10_000);
        assert_eq!(stats.engagement, 500);
        assert!((stats.engagement_rate - 5.0).abs() < 1e-10);
    }

    #[test]
    fn unique_authors_and_geo_spread() {
        let posts = vec![
            post("a").handle("@ana").city("Quito").build(),
            post("b").handle("@ANA").city("Guayaquil").build(),
            post("c").handle("@luis").city("Quito").build(),
        ];
        let stats = window_stats(&posts, None);
        assert_eq!(stats.unique_authors, 2);
        assert_eq!(stats.geo_spread, 2);
    }

    // --- risk_score tests ---

    #[test]
    fn risk_score_matches_formula() {
        // negReach=100, posReach=100: (100*1.2 - 100*0.3) / 200 * 100 = 45.
        let posts = vec![
            post("a").negative().reach(100).build(),
            post("b").positive().reach(100).build(),
        ];
        assert!((risk_score(&posts) - 45.0).abs() < 1e-10);
    }

    #[test]
    fn zero_reach_posts_weigh_one() {
        // Two negative posts with no reach: (2*1.2)/2*100 = 120, clamped to 100.
        let posts = vec![
            post("a").negative().reach(0).build(),
            post("b").negative().reach(0).build(),
        ];
        assert_eq!(risk_score(&posts), 100.0);
    }

    #[test]
    fn all_neutral_feed_sits_at_fifty() {
        let posts = batch("n", 10);
        assert!((risk_score(&posts) - 50.0).abs() < 1e-10);
    }

    // --- impact tests ---

    #[test]
    fn scope_impact_uses_means_baseline_uses_medians() {
        // Reaches 100, 100, 10000: mean 3400, median 100.
        // Engagements 10, 10, 1000: mean 340, median 10.
        let posts = vec![
            post("a").reach(100).engagement(10).build(),
            post("b").reach(100).engagement(10).build(),
            post("c").reach(10_000).engagement(1_000).build(),
        ];
        let stats = window_stats(&posts, None);
        assert!((stats.impact_score - (3400.0 * 0.6 + 340.0 * 0.4)).abs() < 1e-10);
        assert!((global_impact_baseline(&posts) - (100.0 * 0.6 + 10.0 * 0.4)).abs() < 1e-10);
    }

    // --- author novelty tests ---

    #[test]
    fn new_authors_pct_compares_against_baseline() {
        let current = vec![
            post("a").handle("@ana").build(),
            post("b").handle("@luis").build(),
        ];
        let previous = vec![post("x").handle("@Ana").build()];
        let stats = window_stats(&current, Some(&previous));
        assert!((stats.new_authors_pct - 50.0).abs() < 1e-10);
    }

    #[test]
    fn new_authors_pct_is_zero_without_baseline() {
        let current = vec![post("a").build()];
        assert_eq!(window_stats(&current, None).new_authors_pct, 0.0);
        assert_eq!(window_stats(&current, Some(&[])).new_authors_pct, 0.0);
    }

    // --- ranking tests ---

    #[test]
    fn top_topics_ranked_by_count_then_first_seen() {
        let posts = vec![
            post("a").topic("seguridad").build(),
            post("b").topic("transporte").build(),
            post("c").topic("transporte").build(),
            post("d").topic("salud").build(),
        ];
        let stats = window_stats(&posts, None);
        // "seguridad" and "salud" tie at 1; "seguridad" appeared first.
        assert_eq!(stats.top_topics, vec!["transporte", "seguridad", "salud"]);
    }

    #[test]
    fn keywords_skip_stopwords_and_short_tokens() {
        let posts = vec![
            post("a")
                .content("el tráfico en la avenida está imposible hoy")
                .build(),
            post("b")
                .content("tráfico imposible https://t.co/abc123 en Quito")
                .build(),
        ];
        let stats = window_stats(&posts, None);
        assert_eq!(stats.keywords[0], "tráfico");
        assert!(stats.keywords.contains(&"imposible".to_string()));
        assert!(!stats.keywords.contains(&"está".to_string()));
        assert!(!stats.keywords.contains(&"https".to_string()));
    }

    // --- daily histogram tests ---

    #[test]
    fn daily_counts_only_cover_days_present() {
        let posts = vec![
            post("a").days_ago(1).build(),
            post("b").days_ago(1).build(),
            post("c").days_ago(5).build(),
        ];
        assert_eq!(daily_counts(&posts), vec![1.0, 2.0]);
    }
}
