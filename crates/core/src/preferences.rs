//! Student preferences as returned by the preferences collaborator.

use serde::{Deserialize, Serialize};

/// What a student told the portal about themselves.
///
/// Every field may be missing; consumers substitute their own defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub faculty: Option<String>,
    /// Field of study / domain (e.g. "Génie Informatique").
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
}

impl UserPreferences {
    /// Split a comma-separated interest list as stored by the portal.
    ///
    /// Entries are trimmed, empty entries dropped, and case-insensitive
    /// duplicates removed (first spelling wins).
    pub fn parse_interests(csv: &str) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        let mut out = Vec::new();
        for raw in csv.split(',') {
            let interest = raw.trim();
            if interest.is_empty() {
                continue;
            }
            let key = interest.to_lowercase();
            if seen.contains(&key) {
                continue;
            }
            seen.push(key);
            out.push(interest.to_string());
        }
        out
    }

    pub fn with_interests_csv(mut self, csv: &str) -> Self {
        self.interests = Self::parse_interests(csv);
        self
    }

    /// A field value that is present and not blank.
    pub fn known_field(&self) -> Option<&str> {
        non_blank(self.field.as_deref())
    }

    pub fn known_level(&self) -> Option<&str> {
        non_blank(self.level.as_deref())
    }

    pub fn known_faculty(&self) -> Option<&str> {
        non_blank(self.faculty.as_deref())
    }

    pub fn known_difficulty(&self) -> Option<&str> {
        non_blank(self.difficulty.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_interests_trims_and_dedupes() {
        let interests = UserPreferences::parse_interests(" IA, Big Data,, ia ,IoT , ");
        assert_eq!(interests, vec!["IA", "Big Data", "IoT"]);
    }

    #[test]
    fn blank_fields_are_not_known() {
        let prefs = UserPreferences {
            field: Some("   ".to_string()),
            level: Some(" M2 ".to_string()),
            ..UserPreferences::default()
        };
        assert_eq!(prefs.known_field(), None);
        assert_eq!(prefs.known_level(), Some("M2"));
        assert_eq!(prefs.known_faculty(), None);
    }
}
