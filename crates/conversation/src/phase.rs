use serde::{Deserialize, Serialize};

/// Where the conversation stands with respect to subject generation.
///
/// ```text
/// Idle ──user turn──▶ Gathering ──thresholds met──▶ Ready
///                        ▲                            │ confirm
///                        │ user turn                  ▼
///                     Cooldown ◀──completed──── Generating
/// ```
///
/// Every phase returns to `Idle` on reset, and only on reset.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Gathering,
    Ready,
    Generating,
    Cooldown,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Gathering => "gathering",
            Phase::Ready => "ready",
            Phase::Generating => "generating",
            Phase::Cooldown => "cooldown",
        }
    }
}

impl core::fmt::Display for Phase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
