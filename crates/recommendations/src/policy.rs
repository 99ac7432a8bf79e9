use chrono::Duration;
use serde::{Deserialize, Serialize};

use topicforge_core::{DomainError, DomainResult};

/// Upper bound accepted for the cache TTL (one year).
const MAX_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Retrieval and caching policy constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationPolicy {
    /// How long a fetched record is served without refetching.
    pub ttl_secs: u64,
    /// Result-count bound passed to the personalized collaborator.
    pub limit: usize,
    /// Result-count bound passed to the popularity fallback.
    pub popular_limit: usize,
}

impl Default for RecommendationPolicy {
    fn default() -> Self {
        Self {
            ttl_secs: 120,
            limit: 20,
            popular_limit: 10,
        }
    }
}

impl RecommendationPolicy {
    pub fn ttl(&self) -> Duration {
        Duration::seconds(self.ttl_secs.min(MAX_TTL_SECS) as i64)
    }

    pub fn with_ttl_secs(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.ttl_secs == 0 {
            return Err(DomainError::validation("ttl_secs must be > 0"));
        }
        if self.ttl_secs > MAX_TTL_SECS {
            return Err(DomainError::validation(format!(
                "ttl_secs must be <= {MAX_TTL_SECS}"
            )));
        }
        if self.limit == 0 || self.popular_limit == 0 {
            return Err(DomainError::validation("limits must be >= 1"));
        }
        Ok(())
    }
}
