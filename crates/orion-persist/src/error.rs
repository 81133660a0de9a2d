use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session expired, please sign in again")]
    AuthExpired,

    #[error("Remote conversations require a signed-in session")]
    Unauthenticated,

    #[error("Server responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Thread not found: {0}")]
    ThreadNotFound(String),

    #[error("Message not found: {0}")]
    MessageNotFound(String),

    #[error("Message already rated: {0}")]
    RatingAlreadySet(String),

    #[error("Message is empty")]
    EmptyMessage,
}

pub type Result<T> = std::result::Result<T, PersistError>;
