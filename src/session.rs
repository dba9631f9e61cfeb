//! Session identity and lifecycle state.

use serde::{Deserialize, Serialize};

/// Per-launch session identifier. Every outbound request carries it and
/// every inbound push event is filtered by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh identifier. Called once per launch.
    pub fn generate() -> Self {
        SessionId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when an inbound event's `id` field addresses this session.
    pub fn matches(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        SessionId(s.to_string())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of one session. `Ended` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Unstarted,
    Active,
    Ended,
}

impl SessionState {
    pub fn is_active(self) -> bool {
        self == SessionState::Active
    }

    pub fn is_ended(self) -> bool {
        self == SessionState::Ended
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Unstarted => write!(f, "unstarted"),
            SessionState::Active => write!(f, "active"),
            SessionState::Ended => write!(f, "ended"),
        }
    }
}
