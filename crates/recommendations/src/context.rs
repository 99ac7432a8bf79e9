use serde::{Deserialize, Serialize};

use topicforge_core::UserPreferences;

/// Preferences resolved into something the personalized collaborator can use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    pub interests: Vec<String>,
    pub level: Option<String>,
    pub faculty: Option<String>,
    pub field: Option<String>,
    pub difficulty: Option<String>,
    /// True when `interests` came from the domain table rather than the student.
    pub interests_defaulted: bool,
}

impl UserContext {
    /// Resolve preferences, substituting domain defaults for a missing
    /// interest list.
    ///
    /// The substitution is a heuristic: the defaults are plausible for the
    /// domain, not a statement about what this student cares about.
    pub fn resolve(preferences: &UserPreferences) -> Self {
        let field = preferences.known_field().map(str::to_string);
        let mut interests: Vec<String> = preferences
            .interests
            .iter()
            .map(|i| i.trim())
            .filter(|i| !i.is_empty())
            .map(str::to_string)
            .collect();

        let mut interests_defaulted = false;
        if interests.is_empty() {
            if let Some(defaults) = field.as_deref().and_then(default_interests_for) {
                interests = defaults.iter().map(|i| i.to_string()).collect();
                interests_defaulted = true;
            }
        }

        Self {
            interests,
            level: preferences.known_level().map(str::to_string),
            faculty: preferences.known_faculty().map(str::to_string),
            field,
            difficulty: preferences.known_difficulty().map(str::to_string),
            interests_defaulted,
        }
    }

    /// A context with no interests cannot be personalized.
    pub fn is_actionable(&self) -> bool {
        !self.interests.is_empty()
    }
}

const DOMAIN_INTERESTS: &[(&[&str], &[&str])] = &[
    (
        &["informatique", "computer"],
        &["Intelligence artificielle", "Développement Web", "Base de données", "Cybersécurité"],
    ),
    (
        &["electronique", "electronic"],
        &["Systèmes embarqués", "IoT", "Traitement du signal", "Robotique"],
    ),
    (
        &["electrique", "electrical"],
        &["Énergie renouvelable", "Réseaux électriques intelligents", "Électronique de puissance", "Automatisation"],
    ),
    (
        &["mecanique", "mechanical"],
        &["Simulation numérique", "CFD", "CAO", "Matériaux avancés"],
    ),
    (
        &["civil"],
        &["Smart Cities", "Développement durable", "Matériaux avancés", "Transport intelligent"],
    ),
];

/// Static domain → interests lookup used when a student gave no interests.
///
/// Matching is case-insensitive and ignores French accents, so
/// "Génie Électrique" and "genie electrique" both resolve.
pub fn default_interests_for(field: &str) -> Option<&'static [&'static str]> {
    let folded = fold(field);
    DOMAIN_INTERESTS
        .iter()
        .find(|(keys, _)| keys.iter().any(|k| folded.contains(k)))
        .map(|(_, interests)| *interests)
}

/// Lowercase and strip French accents.
pub(crate) fn fold(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'à' | 'â' | 'ä' => 'a',
            'î' | 'ï' => 'i',
            'ô' | 'ö' => 'o',
            'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_interests_win_over_domain_defaults() {
        let prefs = UserPreferences {
            interests: vec!["Blockchain".to_string()],
            field: Some("Génie Informatique".to_string()),
            ..UserPreferences::default()
        };
        let ctx = UserContext::resolve(&prefs);
        assert_eq!(ctx.interests, vec!["Blockchain"]);
        assert!(!ctx.interests_defaulted);
    }

    #[test]
    fn empty_interests_use_domain_table() {
        let prefs = UserPreferences {
            field: Some("Génie Électrique".to_string()),
            ..UserPreferences::default()
        };
        let ctx = UserContext::resolve(&prefs);
        assert!(ctx.interests_defaulted);
        assert_eq!(ctx.interests[0], "Énergie renouvelable");
        assert!(ctx.is_actionable());
    }

    #[test]
    fn electronics_is_not_mistaken_for_electrical() {
        let interests = default_interests_for("GENIE ELECTRONIQUE").unwrap();
        assert!(interests.contains(&"Systèmes embarqués"));
    }

    #[test]
    fn unknown_domain_and_no_interests_is_not_actionable() {
        let prefs = UserPreferences {
            field: Some("Philosophie".to_string()),
            ..UserPreferences::default()
        };
        let ctx = UserContext::resolve(&prefs);
        assert!(!ctx.is_actionable());
        assert_eq!(ctx.field.as_deref(), Some("Philosophie"));
    }
}
