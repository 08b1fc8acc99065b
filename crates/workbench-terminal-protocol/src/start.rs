use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Typed failure classes for launching the agent program inside a terminal.
///
/// Backend failure messages are free-form; `classify` maps them into a class
/// the surrounding UI can render guidance for. Everything unrecognized lands
/// in `Other` with the original message preserved.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentStartFailure {
    #[error("no project is associated with this session")]
    NoProject,
    #[error("permission denied while starting the agent: {0}")]
    PermissionDenied(String),
    #[error("working directory is not a git repository")]
    NotARepository,
    #[error("agent program failed to spawn: {0}")]
    SpawnFailure(String),
    #[error("agent start failed: {0}")]
    Other(String),
}

impl AgentStartFailure {
    pub fn classify(message: &str) -> Self {
        let normalized = message.to_ascii_lowercase();
        if normalized.contains("no project") || normalized.contains("project not found") {
            Self::NoProject
        } else if normalized.contains("permission denied") || normalized.contains("eacces") {
            Self::PermissionDenied(message.to_owned())
        } else if normalized.contains("not a git repository")
            || normalized.contains("not a repository")
        {
            Self::NotARepository
        } else if normalized.contains("spawn")
            || normalized.contains("no such file")
            || normalized.contains("enoent")
        {
            Self::SpawnFailure(message.to_owned())
        } else {
            Self::Other(message.to_owned())
        }
    }
}
