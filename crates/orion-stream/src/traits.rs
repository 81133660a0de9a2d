use async_trait::async_trait;
use orion_types::Credentials;

use crate::buffer_utils::DeltaStream;
use crate::error::Result;

/// Opens the streaming response for one conversational turn.
///
/// Exactly one call per turn; implementations never retry.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn open_stream(&self, request: ChatRequest) -> Result<DeltaStream>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub thread_id: String,
    pub message: String,
    pub credentials: Credentials,
}

impl ChatRequest {
    pub fn new(
        thread_id: impl Into<String>,
        message: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        Self {
            thread_id: thread_id.into(),
            message: message.into(),
            credentials,
        }
    }
}
