use orion_types::FailureKind;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Server responded with status {status}: {body}")]
    Protocol { status: u16, body: String },

    #[error("Question quota exhausted (limit: {limit:?})")]
    RateLimited { limit: Option<u32> },
}

impl ChatError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            ChatError::Transport(_) => FailureKind::Transport,
            ChatError::Protocol { status, .. } => FailureKind::Protocol { status: *status },
            ChatError::RateLimited { limit } => FailureKind::RateLimited { limit: *limit },
        }
    }
}

/// A frame payload that could not be understood. Logged and dropped, never surfaced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct DecodeSkip {
    pub reason: String,
}

impl DecodeSkip {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
