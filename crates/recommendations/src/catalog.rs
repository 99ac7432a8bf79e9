use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use similar::TextDiff;

use topicforge_core::{SubjectId, UserPreferences};

use crate::context::{UserContext, fold};
use crate::entry::{PopularSubject, ScoredSubject, SubjectSummary};
use crate::error::FetchError;
use crate::source::{PopularSource, PreferencesSource, RecommendationSource};

/// Share of the score taken by keyword similarity.
const KEYWORD_WEIGHT: f64 = 0.4;
/// Points for each of level, faculty, domain and difficulty.
const CRITERION_POINTS: f64 = 15.0;
/// Keyword similarity (0..=100) above which the match is worth a reason.
const STRONG_KEYWORD_MATCH: f64 = 50.0;
/// Subjects must score strictly above this to be recommended.
const MIN_SCORE: f64 = 20.0;

/// A subject as held by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSubject {
    pub summary: SubjectSummary,
    #[serde(default)]
    pub faculty: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default = "active_default")]
    pub active: bool,
}

fn active_default() -> bool {
    true
}

impl CatalogSubject {
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Self {
            summary: SubjectSummary::new(SubjectId(id), title),
            faculty: None,
            keywords: Vec::new(),
            view_count: 0,
            like_count: 0,
            active: true,
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.summary = self.summary.with_domain(domain);
        self
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.summary = self.summary.with_level(level);
        self
    }

    pub fn with_difficulty(mut self, difficulty: impl Into<String>) -> Self {
        self.summary = self.summary.with_difficulty(difficulty);
        self
    }

    pub fn with_faculty(mut self, faculty: impl Into<String>) -> Self {
        self.faculty = Some(faculty.into());
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_views(mut self, view_count: u64) -> Self {
        self.view_count = view_count;
        self
    }

    /// Score this subject against a context.
    ///
    /// Keyword similarity weighs 40%; level, faculty, domain and difficulty
    /// add 15 points each. `None` unless the total is above 20.
    fn score(&self, context: &UserContext) -> Option<ScoredSubject> {
        let summary = &self.summary;
        let mut score = 0.0;
        let mut reasons = Vec::new();

        let keyword_score = keyword_similarity(&self.keywords, &context.interests);
        score += keyword_score * KEYWORD_WEIGHT;
        if keyword_score > STRONG_KEYWORD_MATCH {
            reasons.push("Keywords match your interests".to_string());
        }

        let criteria = [
            ("Level", criterion(&context.level, &summary.level, same)),
            ("Faculty", criterion(&context.faculty, &self.faculty, within)),
            ("Domain", criterion(&context.field, &summary.domain, overlaps)),
            ("Difficulty", criterion(&context.difficulty, &summary.difficulty, same)),
        ];
        for (label, matched) in criteria {
            if let Some(value) = matched {
                score += CRITERION_POINTS;
                reasons.push(format!("{label}: {value}"));
            }
        }

        (score > MIN_SCORE).then(|| ScoredSubject {
            subject: summary.clone(),
            score: f64::min((score * 100.0).round() / 100.0, 100.0),
            reasons,
        })
    }
}

/// Mean over the interests of each one's best similarity to a subject
/// keyword, scaled to 0..=100.
fn keyword_similarity(keywords: &[String], interests: &[String]) -> f64 {
    let keywords: Vec<String> = keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();
    let interests: Vec<String> = interests
        .iter()
        .map(|i| i.trim().to_lowercase())
        .filter(|i| !i.is_empty())
        .collect();
    if interests.is_empty() {
        return 0.0;
    }

    let total: f64 = interests
        .iter()
        .map(|interest| {
            keywords
                .iter()
                .map(|k| f64::from(TextDiff::from_chars(interest.as_str(), k.as_str()).ratio()))
                .fold(0.0, f64::max)
        })
        .sum();
    total / interests.len() as f64 * 100.0
}

/// The subject's value when the student's value matches it.
fn criterion<'a>(
    wanted: &Option<String>,
    actual: &'a Option<String>,
    matches: fn(&str, &str) -> bool,
) -> Option<&'a str> {
    let wanted = fold(wanted.as_deref()?.trim());
    let actual = actual.as_deref()?;
    (!wanted.is_empty() && matches(&wanted, &fold(actual.trim()))).then_some(actual)
}

fn same(wanted: &str, actual: &str) -> bool {
    wanted == actual
}

fn within(wanted: &str, actual: &str) -> bool {
    actual.contains(wanted)
}

/// Either side may be the longer name, e.g. "Génie Informatique" and "Informatique".
fn overlaps(wanted: &str, actual: &str) -> bool {
    !actual.is_empty() && (actual.contains(wanted) || wanted.contains(actual))
}

/// In-process stand-in for the portal's catalog endpoints.
///
/// Implements all three collaborators. Intended for the demo binary and tests.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    subjects: RwLock<Vec<CatalogSubject>>,
    preferences: RwLock<UserPreferences>,
    personalized_down: AtomicBool,
    popular_down: AtomicBool,
}

impl InMemoryCatalog {
    pub fn new(subjects: Vec<CatalogSubject>) -> Self {
        Self {
            subjects: RwLock::new(subjects),
            ..Self::default()
        }
    }

    pub fn with_preferences(self, preferences: UserPreferences) -> Self {
        *self.preferences.write() = preferences;
        self
    }

    pub fn set_preferences(&self, preferences: UserPreferences) {
        *self.preferences.write() = preferences;
    }

    pub fn insert(&self, subject: CatalogSubject) {
        let mut subjects = self.subjects.write();
        subjects.retain(|s| s.summary.id != subject.summary.id);
        subjects.push(subject);
    }

    pub fn record_view(&self, id: SubjectId) {
        if let Some(subject) = self.subjects.write().iter_mut().find(|s| s.summary.id == id) {
            subject.view_count += 1;
        }
    }

    /// Make the personalized endpoint answer with a network error.
    pub fn set_personalized_outage(&self, down: bool) {
        self.personalized_down.store(down, Ordering::SeqCst);
    }

    /// Make the popular endpoint answer with a network error.
    pub fn set_popular_outage(&self, down: bool) {
        self.popular_down.store(down, Ordering::SeqCst);
    }

    /// A small catalog covering the portal's engineering domains.
    pub fn seeded() -> Self {
        Self::new(vec![
            CatalogSubject::new(1, "Détection d'intrusions par apprentissage automatique")
                .with_domain("Informatique")
                .with_level("Master")
                .with_faculty("Faculté des Sciences et Techniques")
                .with_difficulty("Avancé")
                .with_keywords(["Intelligence artificielle", "Cybersécurité", "réseaux"])
                .with_views(340),
            CatalogSubject::new(2, "Plateforme web de suivi des stages")
                .with_domain("Informatique")
                .with_level("Licence")
                .with_faculty("Faculté des Sciences et Techniques")
                .with_difficulty("Facile")
                .with_keywords(["Développement Web", "Base de données"])
                .with_views(512),
            CatalogSubject::new(3, "Supervision IoT d'une serre connectée")
                .with_domain("Électronique")
                .with_level("Master")
                .with_faculty("Faculté des Sciences et Techniques")
                .with_difficulty("Moyen")
                .with_keywords(["IoT", "Systèmes embarqués", "capteurs"])
                .with_views(128),
            CatalogSubject::new(4, "Gestion d'un micro-réseau photovoltaïque")
                .with_domain("Électrique")
                .with_level("Master")
                .with_faculty("Faculté des Sciences et Techniques")
                .with_difficulty("Moyen")
                .with_keywords(["Énergie renouvelable", "Réseaux électriques intelligents"])
                .with_views(77),
            CatalogSubject::new(5, "Simulation CFD d'un échangeur thermique")
                .with_domain("Mécanique")
                .with_level("Master")
                .with_faculty("Faculté des Sciences et Techniques")
                .with_difficulty("Avancé")
                .with_keywords(["CFD", "Simulation numérique"])
                .with_views(61),
            CatalogSubject::new(6, "Jumeau numérique pour le trafic urbain")
                .with_domain("Civil")
                .with_level("Master")
                .with_faculty("Faculté des Sciences et Techniques")
                .with_difficulty("Moyen")
                .with_keywords(["Smart Cities", "Transport intelligent"])
                .with_views(203),
        ])
    }

    fn active(&self) -> Vec<CatalogSubject> {
        self.subjects.read().iter().filter(|s| s.active).cloned().collect()
    }
}

#[async_trait]
impl PreferencesSource for InMemoryCatalog {
    async fn user_preferences(&self) -> Result<UserPreferences, FetchError> {
        Ok(self.preferences.read().clone())
    }
}

#[async_trait]
impl RecommendationSource for InMemoryCatalog {
    async fn personalized(
        &self,
        context: &UserContext,
        limit: usize,
    ) -> Result<Vec<ScoredSubject>, FetchError> {
        if self.personalized_down.load(Ordering::SeqCst) {
            return Err(FetchError::network("personalized endpoint unavailable"));
        }
        let mut scored: Vec<ScoredSubject> =
            self.active().iter().filter_map(|s| s.score(context)).collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(limit);
        Ok(scored)
    }
}

#[async_trait]
impl PopularSource for InMemoryCatalog {
    async fn popular_subjects(&self, limit: usize) -> Result<Vec<PopularSubject>, FetchError> {
        if self.popular_down.load(Ordering::SeqCst) {
            return Err(FetchError::network("popular endpoint unavailable"));
        }
        let mut subjects = self.active();
        subjects.sort_by(|a, b| b.view_count.cmp(&a.view_count));
        Ok(subjects
            .into_iter()
            .take(limit)
            .map(|s| PopularSubject {
                subject: s.summary,
                view_count: s.view_count,
                like_count: s.like_count,
            })
            .collect())
    }
}
