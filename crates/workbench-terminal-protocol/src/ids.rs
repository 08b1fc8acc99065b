use std::fmt;

use serde::{Deserialize, Serialize};

/// Suffix that marks a terminal as the agent-conversation ("top") terminal
/// of its owning session.
pub const TOP_TERMINAL_SUFFIX: &str = "-top";

/// Stable identifier for a backend-owned terminal session.
///
/// The id outlives any widget that renders the terminal; mount/unmount of a
/// widget never invalidates it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TerminalId(String);

impl TerminalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Structural check for the agent-conversation terminal of a session.
    /// Auxiliary terminals never carry the suffix.
    pub fn is_top(&self) -> bool {
        self.0.ends_with(TOP_TERMINAL_SUFFIX)
    }
}

impl fmt::Display for TerminalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TerminalId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}
