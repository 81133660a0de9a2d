use orion_persist::PersistError;
use orion_stream::ChatError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Chat error: {0}")]
    Chat(#[from] ChatError),

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Authentication failed: {0}")]
    Auth(String),
}

impl ClientError {
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, ClientError::Persist(PersistError::AuthExpired))
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
