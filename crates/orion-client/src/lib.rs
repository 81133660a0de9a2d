pub mod auth;
pub mod error;
pub mod orchestrator;
pub mod sync;

pub use auth::{AuthClient, AuthResponse};
pub use error::{ClientError, Result};
pub use orchestrator::{quota_exceeded_text, SendOrchestrator, TurnHandle, SESSION_EXPIRED_TEXT};
pub use sync::ConversationSync;
