use serde::{Deserialize, Serialize};

/// A subject proposed by the generation model.
///
/// This is an AI result payload, not a catalog entry: it has no identifier
/// until the student decides to save it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedSubject {
    pub title: String,
    pub problem_statement: String,
    /// Comma-separated keywords, as the model returns them.
    pub keywords: String,
    pub description: String,
    #[serde(default)]
    pub methodology: String,
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
    #[serde(default)]
    pub estimated_duration: String,
}

fn default_difficulty() -> String {
    "moyenne".to_string()
}

impl GeneratedSubject {
    fn is_usable(&self) -> bool {
        !self.title.trim().is_empty()
    }
}

pub(crate) fn usable(subjects: Vec<GeneratedSubject>) -> Vec<GeneratedSubject> {
    subjects.into_iter().filter(GeneratedSubject::is_usable).collect()
}
