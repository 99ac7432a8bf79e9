use serde::{Deserialize, Serialize};

use topicforge_core::SubjectId;

/// Which retrieval path produced an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Personalized,
    PopularFallback,
}

impl Tier {
    /// Position used to break score ties: personalized entries sort first.
    pub(crate) fn rank(self) -> u8 {
        match self {
            Tier::Personalized => 0,
            Tier::PopularFallback => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Personalized => "personalized",
            Tier::PopularFallback => "popular_fallback",
        }
    }
}

/// The part of a catalog subject the recommendation views need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectSummary {
    pub id: SubjectId,
    pub title: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
}

impl SubjectSummary {
    pub fn new(id: SubjectId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            domain: None,
            level: None,
            difficulty: None,
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    pub fn with_difficulty(mut self, difficulty: impl Into<String>) -> Self {
        self.difficulty = Some(difficulty.into());
        self
    }
}

/// A subject scored by the personalized-recommendation collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredSubject {
    pub subject: SubjectSummary,
    pub score: f64,
    #[serde(default)]
    pub reasons: Vec<String>,
}

/// A subject as returned by the popularity-ranked collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopularSubject {
    pub subject: SubjectSummary,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub like_count: u64,
}

/// One ranked recommendation inside a [`crate::CacheRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationEntry {
    pub subject: SubjectSummary,
    /// Relevance in `[0, 100]`; higher is more relevant.
    pub score: f64,
    /// "Why recommended" lines, in display order.
    pub reasons: Vec<String>,
    pub tier: Tier,
}

impl RecommendationEntry {
    pub fn subject_id(&self) -> SubjectId {
        self.subject.id
    }
}
