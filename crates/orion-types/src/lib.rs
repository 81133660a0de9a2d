pub mod config;
pub mod conversation;
pub mod events;
pub mod session;
pub mod state;

pub use config::ClientConfig;
pub use conversation::{
    derive_title, Feedback, FeedbackOption, Message, Rating, Role, SharePayload, SharedMessage,
    Thread, NEW_THREAD_TITLE, WELCOME_GREETING, WELCOME_TITLE,
};
pub use events::{Delta, StreamFrame};
pub use session::{Credentials, SessionContext, UserProfile};
pub use state::{FailureKind, QuotaState, TurnState};
