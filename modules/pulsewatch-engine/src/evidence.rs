//! Evidence selection: the handful of posts shown under an alert.
//!
//! Candidates are ranked by audience size with a sentiment boost, then
//! picked greedily while skipping authors already represented, so the
//! panel shows different voices instead of one loud account five times.

use std::cmp::Ordering;
use std::collections::HashSet;

use pulsewatch_common::Post;

/// `(reach*0.6 + engagement*0.4) * sentiment boost`.
fn evidence_score(post: &Post) -> f64 {
    let base = post.reach as f64 * 0.6 + post.engagement as f64 * 0.4;
    base * post.sentiment.evidence_boost()
}

/// Up to `max` posts, score-descending, at most one per author. Posts with
/// neither handle nor author are never deduplicated against each other.
pub fn select_evidence(posts: &[Post], max: usize) -> Vec<Post> {
    let mut ranked: Vec<(f64, &Post)> = posts.iter().map(|p| (evidence_score(p), p)).collect();
    ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

    let mut seen_authors: HashSet<String> = HashSet::new();
    let mut picked = Vec::with_capacity(max.min(posts.len()));
    for (_, post) in ranked {
        if picked.len() >= max {
            break;
        }
        let key = post.author_key();
        if !key.is_empty() && !seen_authors.insert(key) {
            continue;
        }
        picked.push(post.clone());
    }
    picked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::post;
    use pulsewatch_common::Sentiment;

    #[test]
    fn negative_posts_outrank_equal_positive_posts() {
        let posts = vec![
            post("pos").positive().reach(1000).engagement(100).build(),
            post("neg").negative().reach(1000).engagement(100).build(),
        ];
        let picked = select_evidence(&posts, 5);
        assert_eq!(picked[0].id, "neg");
        assert_eq!(picked[1].id, "pos");
    }

    #[test]
    fn score_blends_reach_and_engagement() {
        // 1000*0.6 + 100*0.4 = 640 (neutral boost 1.0).
        let p = post("a").reach(1000).engagement(100).build();
        assert!((evidence_score(&p) - 640.0).abs() < 1e-10);
        let negative = post("b").negative().reach(1000).engagement(100).build();
        assert!((evidence_score(&negative) - 768.0).abs() < 1e-10);
        let positive = post("c").positive().reach(1000).engagement(100).build();
        assert!((evidence_score(&positive) - 576.0).abs() < 1e-10);
    }

    #[test]
    fn one_post_per_author() {
        let posts = vec![
            post("a").handle("@Ana").reach(9000).build(),
            post("b").handle("@ana").reach(8000).build(),
            post("c").handle("@luis").reach(100).build(),
        ];
        let picked = select_evidence(&posts, 5);
        let ids: Vec<&str> = picked.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn author_fallback_when_handle_missing() {
        let posts = vec![
            post("a").handle("").author("Maria Lopez").reach(9000).build(),
            post("b").handle("").author("maria lopez").reach(8000).build(),
        ];
        let picked = select_evidence(&posts, 5);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].id, "a");
    }

    #[test]
    fn respects_the_cap() {
        let posts: Vec<_> = (0..10)
            .map(|i| post(&format!("p{i}")).reach(1000 + i as u64).build())
            .collect();
        assert_eq!(select_evidence(&posts, 5).len(), 5);
        assert_eq!(select_evidence(&posts, 0).len(), 0);
    }

    #[test]
    fn anonymous_posts_are_not_deduplicated() {
        let posts = vec![
            post("a").handle("").author("").build(),
            post("b").handle("").author("").build(),
        ];
        let picked = select_evidence(&posts, 5);
        assert_eq!(picked.len(), 2);
        // Equal scores keep evaluation order.
        assert_eq!(picked[0].sentiment, Sentiment::Neutral);
        assert_eq!(picked[0].id, "a");
    }
}
