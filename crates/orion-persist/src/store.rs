use orion_types::{
    derive_title, Delta, Feedback, Message, QuotaState, Rating, Role, Thread,
};
use std::collections::HashMap;

use crate::error::{PersistError, Result};

pub const GENERIC_FAILURE_TEXT: &str = "Sorry, I encountered an error. Please try again.";
const DEFAULT_TITLE_MAX_CHARS: usize = 30;

/// What a delta did to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Assistant message did not exist yet and was inserted
    Created,
    Updated,
    /// Delta carried nothing that touches message content
    Unchanged,
    /// Target thread was deleted while the stream was still running
    ThreadGone,
}

/// Authoritative in-memory model of threads and messages.
///
/// Threads are kept newest first. Messages inside a thread are strictly
/// insertion ordered and only ever mutated in place.
#[derive(Debug, Clone)]
pub struct ConversationStore {
    threads: Vec<Thread>,
    active_thread_id: Option<String>,
    quota: QuotaState,
    /// Placeholder message id -> thread id, for turns still awaiting their first token
    composing: HashMap<String, String>,
    title_max_chars: usize,
}

impl ConversationStore {
    pub fn new(threads: Vec<Thread>) -> Self {
        let active_thread_id = threads.first().map(|t| t.id.clone());
        Self {
            threads,
            active_thread_id,
            quota: QuotaState::default(),
            composing: HashMap::new(),
            title_max_chars: DEFAULT_TITLE_MAX_CHARS,
        }
    }

    /// First-launch state: a single welcome thread
    pub fn with_welcome() -> Self {
        Self::new(vec![Thread::welcome()])
    }

    pub fn with_title_max_chars(mut self, max: usize) -> Self {
        self.title_max_chars = max;
        self
    }

    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    pub fn thread(&self, thread_id: &str) -> Option<&Thread> {
        self.threads.iter().find(|t| t.id == thread_id)
    }

    fn thread_mut(&mut self, thread_id: &str) -> Option<&mut Thread> {
        self.threads.iter_mut().find(|t| t.id == thread_id)
    }

    pub fn active_thread_id(&self) -> Option<&str> {
        self.active_thread_id.as_deref()
    }

    pub fn active_thread(&self) -> Option<&Thread> {
        self.thread(self.active_thread_id.as_deref()?)
    }

    pub fn quota(&self) -> QuotaState {
        self.quota
    }

    /// A turn on this thread is still waiting for its first token
    pub fn is_composing(&self, thread_id: &str) -> bool {
        self.composing.values().any(|t| t == thread_id)
    }

    pub fn message(&self, message_id: &str) -> Option<&Message> {
        self.threads.iter().find_map(|t| t.message(message_id))
    }

    fn message_mut(&mut self, message_id: &str) -> Option<&mut Message> {
        self.threads
            .iter_mut()
            .find_map(|t| t.message_mut(message_id))
    }

    /// Insert an empty thread at the top and make it active
    pub fn create_thread(&mut self) -> String {
        let thread = Thread::new();
        let id = thread.id.clone();
        self.threads.insert(0, thread);
        self.active_thread_id = Some(id.clone());
        id
    }

    /// Remove a thread. Selection moves to the first remaining thread if it was active.
    pub fn delete_thread(&mut self, thread_id: &str) -> Result<Thread> {
        let index = self
            .threads
            .iter()
            .position(|t| t.id == thread_id)
            .ok_or_else(|| PersistError::ThreadNotFound(thread_id.to_string()))?;

        let removed = self.threads.remove(index);
        self.composing.retain(|_, t| t != thread_id);

        if self.active_thread_id.as_deref() == Some(thread_id) {
            self.active_thread_id = self.threads.first().map(|t| t.id.clone());
        }

        Ok(removed)
    }

    pub fn rename_thread(&mut self, thread_id: &str, title: &str) -> Result<()> {
        let thread = self
            .thread_mut(thread_id)
            .ok_or_else(|| PersistError::ThreadNotFound(thread_id.to_string()))?;
        thread.title = title.trim().to_string();
        thread.touch();
        Ok(())
    }

    /// Make a thread active. Returns `true` when its messages still need fetching.
    pub fn select_thread(&mut self, thread_id: &str) -> Result<bool> {
        let needs_load = self
            .thread(thread_id)
            .map(|t| !t.is_loaded)
            .ok_or_else(|| PersistError::ThreadNotFound(thread_id.to_string()))?;
        self.active_thread_id = Some(thread_id.to_string());
        Ok(needs_load)
    }

    /// Swap in a freshly listed set of threads, keeping the selection when it survives
    pub fn replace_threads(&mut self, threads: Vec<Thread>) {
        self.threads = threads;
        let still_present = self
            .active_thread_id
            .as_deref()
            .is_some_and(|id| self.threads.iter().any(|t| t.id == id));
        if !still_present {
            self.active_thread_id = self.threads.first().map(|t| t.id.clone());
        }
        let live: Vec<String> = self.threads.iter().map(|t| t.id.clone()).collect();
        self.composing.retain(|_, t| live.contains(t));
    }

    /// Append the next listing page, skipping threads already known
    pub fn extend_threads(&mut self, threads: Vec<Thread>) {
        for thread in threads {
            if self.thread(&thread.id).is_none() {
                self.threads.push(thread);
            }
        }
        if self.active_thread_id.is_none() {
            self.active_thread_id = self.threads.first().map(|t| t.id.clone());
        }
    }

    /// Fill a lazily listed thread with its fetched messages.
    ///
    /// Server history goes first. Messages added locally before the fetch
    /// returned (a turn sent on the shell) keep their content and stay last.
    pub fn load_messages(&mut self, thread_id: &str, messages: Vec<Message>) -> Result<()> {
        let thread = self
            .thread_mut(thread_id)
            .ok_or_else(|| PersistError::ThreadNotFound(thread_id.to_string()))?;

        let local = std::mem::take(&mut thread.messages);
        let mut merged: Vec<Message> = messages
            .into_iter()
            .filter(|fetched| local.iter().all(|m| m.id != fetched.id))
            .collect();
        merged.extend(local);

        thread.messages = merged;
        thread.is_loaded = true;
        Ok(())
    }

    /// Optimistically add the user's message; the first one also names the thread
    pub fn append_user_message(&mut self, thread_id: &str, content: &str) -> Result<Message> {
        let content = content.trim();
        if content.is_empty() {
            return Err(PersistError::EmptyMessage);
        }

        let title_max_chars = self.title_max_chars;
        let thread = self
            .thread_mut(thread_id)
            .ok_or_else(|| PersistError::ThreadNotFound(thread_id.to_string()))?;

        if thread.awaiting_first_user_message() {
            thread.title = derive_title(content, title_max_chars);
        }

        let message = Message::user(content);
        thread.messages.push(message.clone());
        thread.touch();
        Ok(message)
    }

    /// Raise the composing indicator for a turn whose placeholder id is already chosen
    pub fn begin_response(&mut self, thread_id: &str, placeholder_id: &str) {
        self.composing
            .insert(placeholder_id.to_string(), thread_id.to_string());
    }

    pub fn finish_response(&mut self, placeholder_id: &str) {
        self.composing.remove(placeholder_id);
    }

    /// Apply one delta against `(thread_id, message_id)`, creating the assistant
    /// message on first contact. Deltas for a deleted thread are dropped.
    pub fn apply_delta(&mut self, thread_id: &str, message_id: &str, delta: &Delta) -> ApplyOutcome {
        match delta {
            Delta::TokenAppend { text } => {
                if !text.is_empty() {
                    self.composing.remove(message_id);
                }
                self.upsert_content(thread_id, message_id, text, ContentOp::Append)
            }
            Delta::FullReplace { text } => {
                if !text.is_empty() {
                    self.composing.remove(message_id);
                }
                self.upsert_content(thread_id, message_id, text, ContentOp::Replace)
            }
            Delta::Metadata { remaining_quota } => {
                self.quota.set_remaining(*remaining_quota);
                ApplyOutcome::Unchanged
            }
            Delta::ErrorSignal { message } => {
                tracing::warn!(%thread_id, %message_id, "Stream reported error: {}", message);
                self.composing.remove(message_id);
                self.apply_failure(thread_id, message_id, GENERIC_FAILURE_TEXT)
            }
            Delta::EndOfStream => {
                self.composing.remove(message_id);
                ApplyOutcome::Unchanged
            }
        }
    }

    /// Make sure the assistant message shows something after a failure.
    /// Partial content already streamed is left exactly as it is.
    pub fn apply_failure(&mut self, thread_id: &str, message_id: &str, fallback: &str) -> ApplyOutcome {
        let Some(thread) = self.thread_mut(thread_id) else {
            tracing::debug!(%thread_id, "Dropping failure for deleted thread");
            return ApplyOutcome::ThreadGone;
        };

        match thread.message_mut(message_id) {
            Some(message) if !message.content.is_empty() => ApplyOutcome::Unchanged,
            Some(message) => {
                message.content = fallback.to_string();
                ApplyOutcome::Updated
            }
            None => {
                thread
                    .messages
                    .push(Message::new(message_id, Role::Assistant, fallback));
                ApplyOutcome::Created
            }
        }
    }

    pub fn set_quota(&mut self, quota: QuotaState) {
        self.quota = quota;
    }

    fn upsert_content(
        &mut self,
        thread_id: &str,
        message_id: &str,
        text: &str,
        op: ContentOp,
    ) -> ApplyOutcome {
        let Some(thread) = self.thread_mut(thread_id) else {
            tracing::debug!(%thread_id, %message_id, "Dropping delta for deleted thread");
            return ApplyOutcome::ThreadGone;
        };

        match thread.message_mut(message_id) {
            Some(message) => {
                match op {
                    ContentOp::Append => message.content.push_str(text),
                    ContentOp::Replace => message.content = text.to_string(),
                }
                ApplyOutcome::Updated
            }
            None if text.is_empty() => ApplyOutcome::Unchanged,
            None => {
                thread
                    .messages
                    .push(Message::new(message_id, Role::Assistant, text));
                ApplyOutcome::Created
            }
        }
    }

    /// Rate a message once; ratings only move away from `None`
    pub fn rate_message(&mut self, message_id: &str, rating: Rating) -> Result<()> {
        let message = self
            .message_mut(message_id)
            .ok_or_else(|| PersistError::MessageNotFound(message_id.to_string()))?;

        match (message.rating, rating) {
            (_, Rating::None) => Ok(()),
            (Rating::None, rating) => {
                message.rating = rating;
                Ok(())
            }
            _ => Err(PersistError::RatingAlreadySet(message_id.to_string())),
        }
    }

    /// Attach thumbs-down feedback, rating the message down if it was unrated
    pub fn attach_feedback(&mut self, message_id: &str, feedback: Feedback) -> Result<()> {
        let message = self
            .message_mut(message_id)
            .ok_or_else(|| PersistError::MessageNotFound(message_id.to_string()))?;

        if message.rating == Rating::Up {
            return Err(PersistError::RatingAlreadySet(message_id.to_string()));
        }

        message.rating = Rating::Down;
        message.feedback = Some(feedback);
        Ok(())
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::with_welcome()
    }
}

#[derive(Debug, Clone, Copy)]
enum ContentOp {
    Append,
    Replace,
}
