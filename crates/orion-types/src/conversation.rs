use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const WELCOME_TITLE: &str = "Welcome";
pub const WELCOME_GREETING: &str = "Hello! I'm here to help. What would you like to know?";
pub const NEW_THREAD_TITLE: &str = "New Conversation";
const TITLE_ELLIPSIS: &str = "...";

/// One conversation: an insertion-ordered list of messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// `false` for shells listed from the remote API whose messages are not fetched yet
    #[serde(default = "default_loaded")]
    pub is_loaded: bool,
}

fn default_loaded() -> bool {
    true
}

impl Thread {
    /// Empty, loaded thread with the default title
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: NEW_THREAD_TITLE.to_string(),
            messages: Vec::new(),
            created_at: Utc::now(),
            updated_at: None,
            is_loaded: true,
        }
    }

    /// Thread shown on first launch, holding a single assistant greeting
    pub fn welcome() -> Self {
        let mut thread = Self::new();
        thread.title = WELCOME_TITLE.to_string();
        thread.messages.push(Message::assistant(WELCOME_GREETING));
        thread
    }

    /// Thread known only by its listing entry
    pub fn shell(
        id: impl Into<String>,
        title: impl Into<String>,
        created_at: DateTime<Utc>,
        updated_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            messages: Vec::new(),
            created_at,
            updated_at,
            is_loaded: false,
        }
    }

    pub fn message(&self, message_id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == message_id)
    }

    pub fn message_mut(&mut self, message_id: &str) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == message_id)
    }

    /// True until the user has said anything in this thread
    pub fn awaiting_first_user_message(&self) -> bool {
        !self.messages.iter().any(|m| m.role == Role::User)
    }

    pub fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }

    pub fn share_payload(&self) -> SharePayload {
        SharePayload {
            title: self.title.clone(),
            messages: self
                .messages
                .iter()
                .map(|m| SharedMessage {
                    role: m.role,
                    content: m.content.clone(),
                })
                .collect(),
        }
    }

    /// URL-safe token encoding the shareable transcript
    pub fn share_token(&self) -> serde_json::Result<String> {
        let json = serde_json::to_vec(&self.share_payload())?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }
}

impl Default for Thread {
    fn default() -> Self {
        Self::new()
    }
}

/// Title derived from a thread's first user message
pub fn derive_title(content: &str, max_chars: usize) -> String {
    let trimmed = content.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let mut title: String = trimmed.chars().take(max_chars).collect();
    title.push_str(TITLE_ELLIPSIS);
    title
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub rating: Rating,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
}

impl Message {
    pub fn new(id: impl Into<String>, role: Role, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            rating: Rating::None,
            feedback: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), Role::Assistant, content)
    }

    /// A thumbs-down without attached feedback still needs user input
    pub fn is_resolved(&self) -> bool {
        self.rating != Rating::Down || self.feedback.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    #[default]
    None,
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    #[serde(default)]
    pub options: Vec<FeedbackOption>,
    #[serde(default)]
    pub additional_feedback: String,
}

impl Feedback {
    pub fn new(options: Vec<FeedbackOption>, additional_feedback: impl Into<String>) -> Self {
        Self {
            options,
            additional_feedback: additional_feedback.into().trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackOption {
    Incorrect,
    Unhelpful,
    Harmful,
    Incomplete,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharePayload {
    pub title: String,
    pub messages: Vec<SharedMessage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedMessage {
    pub role: Role,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_title_unchanged() {
        assert_eq!(derive_title("hello world", 30), "hello world");
    }

    #[test]
    fn test_long_title_truncated() {
        let content = "a".repeat(40);
        let title = derive_title(&content, 30);
        assert_eq!(title, format!("{}...", "a".repeat(30)));
    }

    #[test]
    fn test_title_counts_chars_not_bytes() {
        let content = "é".repeat(30);
        assert_eq!(derive_title(&content, 30), content);
    }

    #[test]
    fn test_welcome_thread() {
        let thread = Thread::welcome();
        assert_eq!(thread.title, WELCOME_TITLE);
        assert_eq!(thread.messages.len(), 1);
        assert_eq!(thread.messages[0].role, Role::Assistant);
        assert!(thread.awaiting_first_user_message());
    }

    #[test]
    fn test_down_rating_unresolved_until_feedback() {
        let mut message = Message::assistant("answer");
        assert!(message.is_resolved());

        message.rating = Rating::Down;
        assert!(!message.is_resolved());

        message.feedback = Some(Feedback::new(vec![FeedbackOption::Incorrect], "  wrong  "));
        assert!(message.is_resolved());
        assert_eq!(message.feedback.unwrap().additional_feedback, "wrong");
    }

    #[test]
    fn test_share_token_decodes_to_transcript() {
        let mut thread = Thread::new();
        thread.title = "Trip".to_string();
        thread.messages.push(Message::user("hi"));
        thread.messages.push(Message::assistant("hello"));

        let token = thread.share_token().unwrap();
        let bytes = URL_SAFE_NO_PAD.decode(token).unwrap();
        let payload: SharePayload = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(payload.title, "Trip");
        assert_eq!(payload.messages.len(), 2);
        assert_eq!(payload.messages[1].content, "hello");
    }

    #[test]
    fn test_snapshot_shape_is_camel_case() {
        let thread = Thread::welcome();
        let json = serde_json::to_value(&thread).unwrap();
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["isLoaded"], true);
        assert_eq!(json["messages"][0]["rating"], "none");
    }
}
