use thiserror::Error;
use workbench_terminal_protocol::ChannelError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ViewError {
    #[error("terminal view configuration error: {0}")]
    Configuration(String),
    #[error("terminal renderer error: {0}")]
    Renderer(String),
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error("terminal view internal error: {0}")]
    Internal(String),
}

pub type ViewResult<T> = Result<T, ViewError>;
