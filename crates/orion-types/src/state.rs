use serde::{Deserialize, Serialize};

/// Client-side mirror of the anonymous question quota
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QuotaState {
    pub remaining: Option<u32>,
    pub limit: Option<u32>,
}

impl QuotaState {
    /// State after the server refused a request with 429
    pub fn exhausted(limit: Option<u32>) -> Self {
        Self {
            remaining: Some(0),
            limit,
        }
    }

    pub fn set_remaining(&mut self, remaining: u32) {
        self.remaining = Some(remaining);
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }
}

/// Lifecycle of a single send, from submission to a terminal state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnState {
    /// Input is still being edited and no request exists yet. A turn handed
    /// out by the orchestrator always starts at `Sending`.
    Composing,
    /// Request issued, response not yet open
    Sending,
    /// Response open and frames arriving
    Streaming,
    Completed,
    Failed(FailureKind),
}

impl TurnState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnState::Completed | TurnState::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    Transport,
    Protocol { status: u16 },
    RateLimited { limit: Option<u32> },
    Stream,
    AuthExpired,
}
