use chrono::{DateTime, Utc};
use orion_types::{Message, Thread};
use serde::{Deserialize, Serialize};

/// Listing entry returned by `GET /threads`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadSummary {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<ThreadSummary> for Thread {
    fn from(summary: ThreadSummary) -> Self {
        Thread::shell(
            summary.id,
            summary.title,
            summary.created_at,
            summary.updated_at,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadListResponse {
    pub threads: Vec<ThreadSummary>,
    #[serde(default)]
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageListResponse {
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenameRequest<'a> {
    pub title: &'a str,
}
