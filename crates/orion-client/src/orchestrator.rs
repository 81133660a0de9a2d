use futures::{FutureExt, StreamExt};
use orion_persist::{ApplyOutcome, StoreHandle, GENERIC_FAILURE_TEXT};
use orion_stream::{ChatError, ChatRequest, ChatTransport, DeltaStream};
use orion_types::{ClientConfig, Delta, FailureKind, QuotaState, SessionContext, TurnState};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub const SESSION_EXPIRED_TEXT: &str = "Your session has expired. Please sign in again.";

/// Fallback shown when the server refuses a send because the free quota is used up
pub fn quota_exceeded_text(limit: Option<u32>) -> String {
    match limit {
        Some(limit) => format!(
            "You've reached the limit of {} free questions. Sign in to keep chatting.",
            limit
        ),
        None => "You've reached the free question limit. Sign in to keep chatting.".to_string(),
    }
}

/// Drives one network call per send and folds its deltas into the store
pub struct SendOrchestrator {
    transport: Arc<dyn ChatTransport>,
    store: StoreHandle,
    session: SessionContext,
    config: ClientConfig,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl SendOrchestrator {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        store: StoreHandle,
        session: SessionContext,
        config: ClientConfig,
    ) -> Self {
        Self {
            transport,
            store,
            session,
            config,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    /// Send on the active thread. `None` when the input is blank or nothing is selected.
    pub fn send(&self, content: &str) -> Option<TurnHandle> {
        let Some(thread_id) = self.store.read(|s| s.active_thread_id().map(str::to_owned)) else {
            tracing::debug!("Ignoring send: no active thread");
            return None;
        };
        self.send_to(&thread_id, content)
    }

    /// Send on a specific thread. Every side effect of the turn stays on `thread_id`.
    pub fn send_to(&self, thread_id: &str, content: &str) -> Option<TurnHandle> {
        let content = content.trim();
        if content.is_empty() {
            tracing::debug!("Ignoring blank send");
            return None;
        }

        let guard = if self.config.single_flight {
            Some(InFlightGuard::acquire(&self.in_flight, thread_id)?)
        } else {
            None
        };

        if let Err(e) = self.store.update(|s| s.append_user_message(thread_id, content)) {
            tracing::warn!(%thread_id, "Cannot send: {}", e);
            return None;
        }

        let message_id = uuid::Uuid::new_v4().to_string();
        self.store
            .update(|s| s.begin_response(thread_id, &message_id));

        let (state_tx, state_rx) = watch::channel(TurnState::Sending);

        let turn = Turn {
            thread_id: thread_id.to_string(),
            message_id: message_id.clone(),
            content: content.to_string(),
            transport: Arc::clone(&self.transport),
            store: self.store.clone(),
            session: self.session.clone(),
            state: state_tx,
            _guard: guard,
        };

        tracing::info!(%thread_id, %message_id, "Turn started");
        let task = tokio::spawn(turn.run());

        Some(TurnHandle {
            thread_id: thread_id.to_string(),
            message_id,
            state: state_rx,
            task,
        })
    }
}

/// Caller's view of a running turn
pub struct TurnHandle {
    thread_id: String,
    message_id: String,
    state: watch::Receiver<TurnState>,
    task: JoinHandle<TurnState>,
}

impl TurnHandle {
    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    /// Id of the assistant message this turn writes to
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn state(&self) -> TurnState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TurnState> {
        self.state.clone()
    }

    /// Wait for the turn to reach a terminal state
    pub async fn wait(self) -> TurnState {
        match self.task.await {
            Ok(state) => state,
            Err(e) => {
                tracing::error!(thread_id = %self.thread_id, "Turn task aborted: {}", e);
                TurnState::Failed(FailureKind::Transport)
            }
        }
    }
}

struct Turn {
    thread_id: String,
    message_id: String,
    content: String,
    transport: Arc<dyn ChatTransport>,
    store: StoreHandle,
    session: SessionContext,
    state: watch::Sender<TurnState>,
    _guard: Option<InFlightGuard>,
}

impl Turn {
    async fn run(self) -> TurnState {
        let outcome = self.stream().await;

        self.store.update(|s| s.finish_response(&self.message_id));
        self.state.send_replace(outcome.clone());

        match &outcome {
            TurnState::Failed(kind) => {
                tracing::warn!(thread_id = %self.thread_id, ?kind, "Turn failed")
            }
            _ => tracing::info!(thread_id = %self.thread_id, "Turn completed"),
        }

        outcome
    }

    async fn stream(&self) -> TurnState {
        let Some(credentials) = self.session.credentials() else {
            self.fail(SESSION_EXPIRED_TEXT);
            return TurnState::Failed(FailureKind::AuthExpired);
        };

        let request = ChatRequest::new(&self.thread_id, &self.content, credentials);

        let mut deltas = match self.transport.open_stream(request).await {
            Ok(deltas) => deltas,
            Err(ChatError::RateLimited { limit }) => {
                self.store.update(|s| {
                    s.set_quota(QuotaState::exhausted(limit));
                    s.apply_failure(&self.thread_id, &self.message_id, &quota_exceeded_text(limit))
                });
                return TurnState::Failed(FailureKind::RateLimited { limit });
            }
            Err(e) => {
                tracing::warn!(thread_id = %self.thread_id, "Failed to open stream: {}", e);
                self.fail(GENERIC_FAILURE_TEXT);
                return TurnState::Failed(e.failure_kind());
            }
        };

        // Response bytes are arriving; malformed frames still count as traffic
        self.state.send_replace(TurnState::Streaming);

        while let Some(item) = deltas.next().await {
            let delta = match item {
                Ok(delta) => delta,
                Err(e) => {
                    tracing::warn!(thread_id = %self.thread_id, "Stream interrupted: {}", e);
                    self.fail(GENERIC_FAILURE_TEXT);
                    return TurnState::Failed(e.failure_kind());
                }
            };

            let outcome = self
                .store
                .update(|s| s.apply_delta(&self.thread_id, &self.message_id, &delta));
            if outcome == ApplyOutcome::ThreadGone {
                tracing::debug!(thread_id = %self.thread_id, "Thread deleted mid-stream");
            }

            match delta {
                Delta::ErrorSignal { .. } => {
                    self.apply_pending_metadata(&mut deltas);
                    return TurnState::Failed(FailureKind::Stream);
                }
                Delta::EndOfStream => return TurnState::Completed,
                _ => {}
            }
        }

        TurnState::Completed
    }

    /// Apply quota updates already buffered behind an error, such as the
    /// `remaining` field of the frame that carried it. Never waits for the network.
    fn apply_pending_metadata(&self, deltas: &mut DeltaStream) {
        while let Some(Some(Ok(delta @ Delta::Metadata { .. }))) = deltas.next().now_or_never() {
            self.store
                .update(|s| s.apply_delta(&self.thread_id, &self.message_id, &delta));
        }
    }

    fn fail(&self, fallback: &str) {
        self.store
            .update(|s| s.apply_failure(&self.thread_id, &self.message_id, fallback));
    }
}

/// Marks a thread busy for the lifetime of one turn
struct InFlightGuard {
    threads: Arc<Mutex<HashSet<String>>>,
    thread_id: String,
}

impl InFlightGuard {
    fn acquire(threads: &Arc<Mutex<HashSet<String>>>, thread_id: &str) -> Option<Self> {
        let mut busy = threads.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !busy.insert(thread_id.to_string()) {
            tracing::debug!(%thread_id, "Ignoring send: turn already in flight");
            return None;
        }
        Some(Self {
            threads: Arc::clone(threads),
            thread_id: thread_id.to_string(),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.threads
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&self.thread_id);
    }
}
