use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("terminal channel configuration error: {0}")]
    Configuration(String),
    #[error("terminal channel session not found: {0}")]
    SessionNotFound(String),
    #[error("terminal channel process error: {0}")]
    Process(String),
    #[error("terminal channel protocol error: {0}")]
    Protocol(String),
    #[error("terminal channel internal error: {0}")]
    Internal(String),
}

pub type ChannelResult<T> = Result<T, ChannelError>;
