use serde::{Deserialize, Serialize};

use topicforge_core::UserPreferences;

use crate::result::AiError;

/// Below this many characters a transcript does not describe a project.
pub const MIN_TRANSCRIPT_CHARS: usize = 100;

/// Subjects requested per generation.
pub const DEFAULT_SUBJECT_COUNT: usize = 3;

const MAX_INTERESTS: usize = 5;
const DEFAULT_DOMAIN: &str = "Informatique";
const DEFAULT_LEVEL: &str = "Master";
const DEFAULT_FACULTY: &str = "Sciences";

/// Everything the generation model needs, already resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub interests: Vec<String>,
    pub domain: String,
    pub level: String,
    pub faculty: String,
    pub count: usize,
}

impl GenerationRequest {
    /// Build a request from the user-authored side of a conversation.
    ///
    /// Interests are the first few distinct words longer than three characters;
    /// domain, level and faculty come from the preferences with fixed defaults.
    pub fn from_transcript<'a, I>(user_texts: I, preferences: &UserPreferences) -> Result<Self, AiError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let transcript = user_texts.into_iter().collect::<Vec<_>>().join(" ");
        let chars = transcript.chars().count();
        if chars < MIN_TRANSCRIPT_CHARS {
            return Err(AiError::InvalidInput(format!(
                "transcript too short for generation ({chars} < {MIN_TRANSCRIPT_CHARS} characters)"
            )));
        }

        Ok(Self {
            interests: extract_interests(&transcript),
            domain: preferences.known_field().unwrap_or(DEFAULT_DOMAIN).to_string(),
            level: preferences.known_level().unwrap_or(DEFAULT_LEVEL).to_string(),
            faculty: preferences.known_faculty().unwrap_or(DEFAULT_FACULTY).to_string(),
            count: DEFAULT_SUBJECT_COUNT,
        })
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }
}

fn extract_interests(transcript: &str) -> Vec<String> {
    let mut interests: Vec<String> = Vec::with_capacity(MAX_INTERESTS);
    let words = transcript
        .split(|c: char| c.is_whitespace() || matches!(c, ',' | '.' | '!' | '?'))
        .filter(|w| w.chars().count() > 3);

    for word in words {
        if interests.len() == MAX_INTERESTS {
            break;
        }
        if interests.iter().any(|seen| seen.to_lowercase() == word.to_lowercase()) {
            continue;
        }
        interests.push(word.to_string());
    }
    interests
}
