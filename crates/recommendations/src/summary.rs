use serde::Serialize;

use crate::record::CacheRecord;

/// Entries at or above this score count as a high match.
pub const HIGH_MATCH_SCORE: f64 = 85.0;

/// Header figures shown above a recommendation list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecommendationSummary {
    pub count: usize,
    /// Mean score rounded to the nearest integer; 0 for an empty record.
    pub average_score: u32,
    pub high_match_count: usize,
    pub degraded: bool,
}

impl RecommendationSummary {
    pub fn of(record: &CacheRecord) -> Self {
        let count = record.len();
        let average_score = if count == 0 {
            0
        } else {
            let sum: f64 = record.entries().iter().map(|e| e.score).sum();
            (sum / count as f64).round().clamp(0.0, 100.0) as u32
        };
        let high_match_count = record
            .entries()
            .iter()
            .filter(|e| e.score >= HIGH_MATCH_SCORE)
            .count();

        Self {
            count,
            average_score,
            high_match_count,
            degraded: record.degraded(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{RecommendationEntry, SubjectSummary, Tier};
    use chrono::{Duration, Utc};
    use topicforge_core::SubjectId;

    fn record(scores: &[f64], tier: Tier) -> CacheRecord {
        let entries = scores
            .iter()
            .enumerate()
            .map(|(i, s)| RecommendationEntry {
                subject: SubjectSummary::new(SubjectId(i as u64), "s"),
                score: *s,
                reasons: vec!["r".to_string()],
                tier,
            })
            .collect();
        CacheRecord::new(entries, Utc::now(), Duration::seconds(120))
    }

    #[test]
    fn summarizes_scores() {
        let summary = RecommendationSummary::of(&record(&[90.0, 85.0, 40.5], Tier::Personalized));

        assert_eq!(summary.count, 3);
        assert_eq!(summary.average_score, 72);
        assert_eq!(summary.high_match_count, 2);
        assert!(!summary.degraded);
    }

    #[test]
    fn empty_record_has_zero_average() {
        let summary = RecommendationSummary::of(&record(&[], Tier::Personalized));
        assert_eq!(summary.average_score, 0);
        assert_eq!(summary.count, 0);
    }

    #[test]
    fn fallback_record_is_flagged() {
        let summary = RecommendationSummary::of(&record(&[100.0, 50.0], Tier::PopularFallback));
        assert!(summary.degraded);
    }
}
