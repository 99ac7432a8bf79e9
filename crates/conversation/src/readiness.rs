use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use topicforge_core::{DomainError, DomainResult};

/// Project-intent phrases, French first, then English equivalents.
const DEFAULT_KEYWORDS: &[&str] = &[
    "je veux",
    "je souhaite",
    "mon projet",
    "mon idée",
    "projet",
    "développer",
    "créer",
    "faire",
    "réaliser",
    "application",
    "système",
    "logiciel",
    "mobile",
    "web",
    "surveiller",
    "analyser",
    "optimiser",
    "automatiser",
    "mémoire",
    "sujet",
    "thème",
    "problématique",
    "i want",
    "project",
    "develop",
    "thesis",
    "topic",
    "problem",
];

/// Thresholds deciding when enough context has been gathered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessPolicy {
    /// User-authored characters since the last reset must strictly exceed this.
    pub min_user_chars: usize,
    /// Distinct keywords matched since the last reset must reach this.
    pub min_keyword_hits: usize,
    pub keywords: Vec<String>,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            min_user_chars: 200,
            min_keyword_hits: 4,
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl ReadinessPolicy {
    pub fn with_thresholds(mut self, min_user_chars: usize, min_keyword_hits: usize) -> Self {
        self.min_user_chars = min_user_chars;
        self.min_keyword_hits = min_keyword_hits;
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

    pub fn validate(&self) -> DomainResult<()> {
        let usable = self.keywords.iter().filter(|k| !k.trim().is_empty()).count();
        if self.min_keyword_hits > usable {
            return Err(DomainError::validation(format!(
                "min_keyword_hits ({}) exceeds the number of keywords ({usable})",
                self.min_keyword_hits
            )));
        }
        Ok(())
    }
}

/// What has been accumulated since the last reset.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessSignals {
    pub user_chars: usize,
    pub keyword_hits: usize,
}

/// Running totals for one epoch. Only grows until the conversation resets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadinessTally {
    user_chars: usize,
    matched: BTreeSet<usize>,
}

impl ReadinessTally {
    pub fn signals(&self) -> ReadinessSignals {
        ReadinessSignals {
            user_chars: self.user_chars,
            keyword_hits: self.matched.len(),
        }
    }
}

/// Pure evaluation of [`ReadinessPolicy`] against user text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessDetector {
    policy: ReadinessPolicy,
    needles: Vec<String>,
}

impl Default for ReadinessDetector {
    fn default() -> Self {
        Self::new(ReadinessPolicy::default())
    }
}

impl ReadinessDetector {
    pub fn new(policy: ReadinessPolicy) -> Self {
        let needles = policy
            .keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .collect();
        Self { policy, needles }
    }

    pub fn policy(&self) -> &ReadinessPolicy {
        &self.policy
    }

    /// Tally after one more user turn.
    ///
    /// A keyword counts once per epoch however many times it shows up.
    pub fn observe(&self, tally: &ReadinessTally, text: &str) -> ReadinessTally {
        let lowered = text.to_lowercase();
        let mut next = tally.clone();
        next.user_chars = next.user_chars.saturating_add(text.chars().count());
        for (idx, needle) in self.needles.iter().enumerate() {
            if !needle.is_empty() && lowered.contains(needle.as_str()) {
                next.matched.insert(idx);
            }
        }
        next
    }

    pub fn is_satisfied(&self, tally: &ReadinessTally) -> bool {
        tally.user_chars > self.policy.min_user_chars
            && tally.matched.len() >= self.policy.min_keyword_hits
    }

    /// The keywords a tally has matched, in policy order.
    pub fn matched_keywords<'a>(&'a self, tally: &'a ReadinessTally) -> impl Iterator<Item = &'a str> + 'a {
        tally
            .matched
            .iter()
            .filter_map(|idx| self.policy.keywords.get(*idx).map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_counts_once_however_often_repeated() {
        let detector = ReadinessDetector::default();
        let tally = detector.observe(&ReadinessTally::default(), "Mémoire mémoire MÉMOIRE");
        let tally = detector.observe(&tally, "encore un mémoire");

        assert_eq!(tally.signals().keyword_hits, 1);
        assert_eq!(detector.matched_keywords(&tally).collect::<Vec<_>>(), vec!["mémoire"]);
    }

    #[test]
    fn characters_are_counted_as_scalars() {
        let detector = ReadinessDetector::default();
        let tally = detector.observe(&ReadinessTally::default(), "été");
        assert_eq!(tally.signals().user_chars, 3);
    }

    #[test]
    fn length_threshold_is_strict() {
        let detector = ReadinessDetector::new(
            ReadinessPolicy::default()
                .with_thresholds(10, 1)
                .with_keywords(["topic"]),
        );
        let exact = detector.observe(&ReadinessTally::default(), "topic 1234");
        assert_eq!(exact.signals().user_chars, 10);
        assert!(!detector.is_satisfied(&exact));

        let over = detector.observe(&exact, "!");
        assert!(detector.is_satisfied(&over));
    }

    #[test]
    fn policy_rejects_unreachable_keyword_minimum() {
        let policy = ReadinessPolicy::default()
            .with_keywords(["a", " ", "b"])
            .with_thresholds(200, 3);
        assert!(policy.validate().is_err());
        assert!(ReadinessPolicy::default().validate().is_ok());
    }
}
