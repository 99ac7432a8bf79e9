use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use topicforge_core::TurnId;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Assistant,
}

/// One message of the conversation. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: TurnId,
    pub sender: Sender,
    pub text: String,
    pub at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(sender: Sender, text: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: TurnId::new(),
            sender,
            text: text.into(),
            at,
        }
    }

    pub fn user(text: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::new(Sender::User, text, at)
    }

    pub fn assistant(text: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::new(Sender::Assistant, text, at)
    }

    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }

    /// Length in Unicode scalar values.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}
