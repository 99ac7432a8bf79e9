use chrono::{DateTime, Duration, Utc};

use crate::entry::{RecommendationEntry, Tier};

/// One ranked result set, as produced by a single successful fetch.
///
/// Records are immutable: the store replaces them wholesale and callers only
/// ever see them behind an `Arc`. Entries are always ordered by score
/// descending; equal scores keep personalized entries ahead of fallback ones,
/// then the order the collaborator returned.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheRecord {
    entries: Vec<RecommendationEntry>,
    fetched_at: DateTime<Utc>,
    ttl: Duration,
    degraded: bool,
}

impl CacheRecord {
    /// Build a record, establishing the ordering invariant.
    ///
    /// `degraded` is derived: any fallback-tier entry marks the whole record.
    pub fn new(mut entries: Vec<RecommendationEntry>, fetched_at: DateTime<Utc>, ttl: Duration) -> Self {
        // Stable sort: ties keep tier order, then collaborator order.
        entries.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.tier.rank().cmp(&b.tier.rank()))
        });
        let degraded = entries.iter().any(|e| e.tier == Tier::PopularFallback);

        Self {
            entries,
            fetched_at,
            ttl,
            degraded,
        }
    }

    /// Keep only the `len` best entries.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }

    pub fn entries(&self) -> &[RecommendationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.fetched_at + self.ttl
    }

    /// True if produced by the fallback tier.
    pub fn degraded(&self) -> bool {
        self.degraded
    }

    /// Servable without refetch iff `now - fetched_at < ttl`.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.fetched_at) < self.ttl
    }

    /// The tier shared by every entry, if the record is uniform.
    pub fn tier(&self) -> Option<Tier> {
        let first = self.entries.first()?.tier;
        self.entries.iter().all(|e| e.tier == first).then_some(first)
    }
}
