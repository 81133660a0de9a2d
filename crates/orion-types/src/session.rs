use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub email: String,
    pub name: String,
}

/// How a request identifies its sender
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Bearer(String),
    Anonymous(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SessionState {
    Anonymous { user_id: String },
    Authenticated { token: String, user: UserProfile },
    /// Token rejected by the server; nothing goes out until the next login
    Expired { user_id: String },
}

/// Shared session handle passed to the orchestrator and REST collaborators.
///
/// Created at startup, mutated on login/logout/expiry. Cloning shares state.
#[derive(Debug, Clone)]
pub struct SessionContext {
    inner: Arc<RwLock<SessionState>>,
}

impl SessionContext {
    pub fn anonymous(user_id: impl Into<String>) -> Self {
        Self::from_state(SessionState::Anonymous {
            user_id: user_id.into(),
        })
    }

    pub fn authenticated(token: impl Into<String>, user: UserProfile) -> Self {
        Self::from_state(SessionState::Authenticated {
            token: token.into(),
            user,
        })
    }

    fn from_state(state: SessionState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Credentials for the next network call, `None` while re-authentication is pending
    pub fn credentials(&self) -> Option<Credentials> {
        match &*self.read() {
            SessionState::Anonymous { user_id } => Some(Credentials::Anonymous(user_id.clone())),
            SessionState::Authenticated { token, .. } => Some(Credentials::Bearer(token.clone())),
            SessionState::Expired { .. } => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(&*self.read(), SessionState::Authenticated { .. })
    }

    /// Anonymous sessions own the local snapshot
    pub fn is_anonymous(&self) -> bool {
        matches!(&*self.read(), SessionState::Anonymous { .. })
    }

    pub fn needs_reauth(&self) -> bool {
        matches!(&*self.read(), SessionState::Expired { .. })
    }

    pub fn user(&self) -> Option<UserProfile> {
        match &*self.read() {
            SessionState::Authenticated { user, .. } => Some(user.clone()),
            _ => None,
        }
    }

    /// Id used when talking to the backend without a token
    pub fn anonymous_id(&self) -> Option<String> {
        match &*self.read() {
            SessionState::Anonymous { user_id } | SessionState::Expired { user_id } => {
                Some(user_id.clone())
            }
            SessionState::Authenticated { .. } => None,
        }
    }

    pub fn login(&self, token: impl Into<String>, user: UserProfile) {
        *self.write() = SessionState::Authenticated {
            token: token.into(),
            user,
        };
    }

    /// Drop credentials and fall back to the anonymous identity
    pub fn logout(&self, anonymous_id: impl Into<String>) {
        *self.write() = SessionState::Anonymous {
            user_id: anonymous_id.into(),
        };
    }

    /// Server rejected the token; credentials are cleared until the next login
    pub fn expire(&self, anonymous_id: impl Into<String>) {
        *self.write() = SessionState::Expired {
            user_id: anonymous_id.into(),
        };
    }
}
