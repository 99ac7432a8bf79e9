use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use topicforge_core::{Clock, SubjectId, SystemClock, UserPreferences};

use crate::context::UserContext;
use crate::entry::{PopularSubject, RecommendationEntry, ScoredSubject, Tier};
use crate::error::FetchError;
use crate::policy::RecommendationPolicy;
use crate::record::CacheRecord;
use crate::source::{PopularSource, PreferencesSource, RecommendationSource};
use crate::store::RecordFetcher;

/// Reason attached to every fallback entry.
pub const POPULAR_REASON: &str = "Popular with other students";

/// Tiered retrieval: personalized first, popularity-ranked fallback second.
///
/// Failures of the personalized tier (network, empty answer, unusable
/// context) are absorbed by the fallback. Failures of the fallback are
/// returned to the caller untouched.
pub struct RecommendationFetcher {
    preferences: Arc<dyn PreferencesSource>,
    personalized: Arc<dyn RecommendationSource>,
    popular: Arc<dyn PopularSource>,
    clock: Arc<dyn Clock>,
    policy: RecommendationPolicy,
}

impl RecommendationFetcher {
    pub fn new(
        preferences: Arc<dyn PreferencesSource>,
        personalized: Arc<dyn RecommendationSource>,
        popular: Arc<dyn PopularSource>,
        policy: RecommendationPolicy,
    ) -> Self {
        Self {
            preferences,
            personalized,
            popular,
            clock: Arc::new(SystemClock),
            policy,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn policy(&self) -> &RecommendationPolicy {
        &self.policy
    }

    /// Read preferences and resolve them into a context.
    ///
    /// A failing preferences collaborator does not fail the fetch: the
    /// context is resolved from empty preferences and the tier logic decides.
    pub async fn resolve_context(&self) -> UserContext {
        let preferences = match self.preferences.user_preferences().await {
            Ok(preferences) => preferences,
            Err(err) => {
                warn!(error = %err, "preferences unavailable; resolving empty context");
                UserPreferences::default()
            }
        };
        UserContext::resolve(&preferences)
    }

    /// Run both tiers for an already-resolved context.
    pub async fn fetch_for(&self, context: &UserContext) -> Result<CacheRecord, FetchError> {
        match self.personalized_tier(context).await {
            Ok(record) => {
                info!(
                    tier = Tier::Personalized.as_str(),
                    entries = record.len(),
                    interests_defaulted = context.interests_defaulted,
                    "recommendations fetched"
                );
                Ok(record)
            }
            Err(primary) => {
                warn!(
                    error = %primary,
                    kind = primary.kind(),
                    "personalized tier failed; falling back to popular subjects"
                );
                match self.fallback_tier().await {
                    Ok(record) => {
                        info!(
                            tier = Tier::PopularFallback.as_str(),
                            entries = record.len(),
                            degraded = true,
                            "recommendations fetched"
                        );
                        Ok(record)
                    }
                    Err(fallback) => {
                        warn!(
                            primary = %primary,
                            fallback = %fallback,
                            "both recommendation tiers failed"
                        );
                        Err(fallback)
                    }
                }
            }
        }
    }

    async fn personalized_tier(&self, context: &UserContext) -> Result<CacheRecord, FetchError> {
        if !context.is_actionable() {
            return Err(FetchError::invalid_context(
                "no interests and no known field to derive them from",
            ));
        }

        let scored = self.personalized.personalized(context, self.policy.limit).await?;
        let returned = scored.len();
        let entries = sanitize_personalized(scored);
        if entries.is_empty() {
            return Err(FetchError::EmptyResult);
        }
        debug!(returned, usable = entries.len(), "personalized results sanitized");

        let mut record = CacheRecord::new(entries, self.clock.now(), self.policy.ttl());
        record.truncate(self.policy.limit);
        Ok(record)
    }

    async fn fallback_tier(&self) -> Result<CacheRecord, FetchError> {
        let popular = self.popular.popular_subjects(self.policy.popular_limit).await?;
        let mut entries = synthesize_fallback(popular);
        entries.truncate(self.policy.popular_limit);
        if entries.is_empty() {
            return Err(FetchError::EmptyResult);
        }
        Ok(CacheRecord::new(entries, self.clock.now(), self.policy.ttl()))
    }
}

#[async_trait]
impl RecordFetcher for RecommendationFetcher {
    async fn fetch(&self) -> Result<CacheRecord, FetchError> {
        let context = self.resolve_context().await;
        self.fetch_for(&context).await
    }
}

/// Drop unusable scores, clamp into `[0, 100]`, keep the best entry per subject.
fn sanitize_personalized(scored: Vec<ScoredSubject>) -> Vec<RecommendationEntry> {
    let mut positions: HashMap<SubjectId, usize> = HashMap::new();
    let mut entries: Vec<RecommendationEntry> = Vec::with_capacity(scored.len());

    for item in scored {
        if !item.score.is_finite() {
            continue;
        }
        let entry = RecommendationEntry {
            subject: item.subject,
            score: item.score.clamp(0.0, 100.0),
            reasons: item.reasons.into_iter().filter(|r| !r.trim().is_empty()).collect(),
            tier: Tier::Personalized,
        };
        match positions.get(&entry.subject_id()) {
            Some(&idx) => {
                if entry.score > entries[idx].score {
                    entries[idx] = entry;
                }
            }
            None => {
                positions.insert(entry.subject_id(), entries.len());
                entries.push(entry);
            }
        }
    }
    entries
}

/// Turn a popularity list into entries with strictly decreasing synthetic
/// scores (`100 * (n - i) / n`) and a non-empty reason list.
fn synthesize_fallback(popular: Vec<PopularSubject>) -> Vec<RecommendationEntry> {
    let mut seen: Vec<SubjectId> = Vec::with_capacity(popular.len());
    let unique: Vec<PopularSubject> = popular
        .into_iter()
        .filter(|p| {
            if seen.contains(&p.subject.id) {
                false
            } else {
                seen.push(p.subject.id);
                true
            }
        })
        .collect();

    let n = unique.len();
    unique
        .into_iter()
        .enumerate()
        .map(|(i, p)| {
            let mut reasons = vec![POPULAR_REASON.to_string()];
            if p.view_count > 0 {
                reasons.push(format!("Viewed {} times", p.view_count));
            }
            if p.like_count > 0 {
                reasons.push(format!("Liked by {} students", p.like_count));
            }
            RecommendationEntry {
                subject: p.subject,
                score: 100.0 * (n - i) as f64 / n as f64,
                reasons,
                tier: Tier::PopularFallback,
            }
        })
        .collect()
}
