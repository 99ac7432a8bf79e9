//! Caller-side filtering and pagination over a served record.
//!
//! Nothing here touches the store: a query borrows the record's entries and
//! returns clones of the ones that match.

use serde::{Deserialize, Serialize};

use crate::entry::RecommendationEntry;

pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationQuery {
    pub domain: Option<String>,
    pub level: Option<String>,
    pub difficulty: Option<String>,
    pub min_score: Option<f64>,
    /// 1-based; 0 is treated as 1.
    pub page: usize,
    pub page_size: usize,
}

impl Default for RecommendationQuery {
    fn default() -> Self {
        Self {
            domain: None,
            level: None,
            difficulty: None,
            min_score: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationPage {
    pub items: Vec<RecommendationEntry>,
    pub page: usize,
    pub page_size: usize,
    /// Matches across all pages.
    pub total: usize,
    pub total_pages: usize,
}

impl RecommendationPage {
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

impl RecommendationQuery {
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

    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = Some(min_score);
        self
    }

    pub fn with_page(mut self, page: usize, page_size: usize) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    pub fn matches(&self, entry: &RecommendationEntry) -> bool {
        let subject = &entry.subject;
        field_matches(self.domain.as_deref(), subject.domain.as_deref())
            && field_matches(self.level.as_deref(), subject.level.as_deref())
            && field_matches(self.difficulty.as_deref(), subject.difficulty.as_deref())
            && self.min_score.is_none_or(|min| entry.score >= min)
    }

    /// Filter, keep the record's order, then cut out the requested page.
    pub fn apply(&self, entries: &[RecommendationEntry]) -> RecommendationPage {
        let page = self.page.max(1);
        let page_size = if self.page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            self.page_size
        };

        let matching: Vec<&RecommendationEntry> =
            entries.iter().filter(|e| self.matches(e)).collect();
        let total = matching.len();
        let total_pages = total.div_ceil(page_size);

        let items = matching
            .into_iter()
            .skip((page - 1).saturating_mul(page_size))
            .take(page_size)
            .cloned()
            .collect();

        RecommendationPage {
            items,
            page,
            page_size,
            total,
            total_pages,
        }
    }
}

/// An unset or blank filter matches everything; otherwise a case-insensitive
/// equality on the subject's value.
fn field_matches(filter: Option<&str>, value: Option<&str>) -> bool {
    match filter.map(str::trim).filter(|f| !f.is_empty()) {
        None => true,
        Some(wanted) => value.is_some_and(|v| v.trim().to_lowercase() == wanted.to_lowercase()),
    }
}
