//! Remote collaborators consumed by the fetcher.
//!
//! Each trait is one capability of the portal API. The fetcher treats them as
//! opaque async functions; transports, retries and timeouts belong to the
//! implementations, which must report every failure as a [`FetchError`]
//! rather than an empty success.

use async_trait::async_trait;

use topicforge_core::UserPreferences;

use crate::context::UserContext;
use crate::entry::{PopularSubject, ScoredSubject};
use crate::error::FetchError;

#[async_trait]
pub trait PreferencesSource: Send + Sync + 'static {
    async fn user_preferences(&self) -> Result<UserPreferences, FetchError>;
}

#[async_trait]
pub trait RecommendationSource: Send + Sync + 'static {
    /// At most `limit` subjects scored for `context`.
    async fn personalized(
        &self,
        context: &UserContext,
        limit: usize,
    ) -> Result<Vec<ScoredSubject>, FetchError>;
}

#[async_trait]
pub trait PopularSource: Send + Sync + 'static {
    /// At most `limit` subjects, most popular first.
    async fn popular_subjects(&self, limit: usize) -> Result<Vec<PopularSubject>, FetchError>;
}
