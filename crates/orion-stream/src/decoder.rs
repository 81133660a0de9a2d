use orion_types::Delta;
use serde::Deserialize;
use serde_json::Value;

use crate::buffer_utils::FrameDecoder;
use crate::error::DecodeSkip;

/// Legacy single-field token formats, checked in this order
const LEGACY_TOKEN_FIELDS: [&str; 3] = ["token", "content", "text"];
const TOKEN_TYPE: &str = "token";
const ASSISTANT_ROLES: [&str; 2] = ["ai", "assistant"];

/// Every payload shape the backend has emitted, flattened into optional fields
#[derive(Debug, Default, Deserialize)]
struct WirePayload {
    #[serde(default)]
    error: Option<Value>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    orchestrator: Option<OrchestratorUpdate>,
    #[serde(default)]
    remaining: Option<Value>,
    #[serde(flatten)]
    fields: serde_json::Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
struct OrchestratorUpdate {
    #[serde(default)]
    messages: Option<Vec<RoleMessage>>,
}

#[derive(Debug, Deserialize)]
struct RoleMessage {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    content: Option<Value>,
}

impl WirePayload {
    fn error_message(&self) -> Option<String> {
        match self.error.as_ref()? {
            Value::Null | Value::Bool(false) => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Object(map) => Some(
                map.get("message")
                    .and_then(Value::as_str)
                    .map(str::to_owned)
                    .unwrap_or_else(|| Value::Object(map.clone()).to_string()),
            ),
            other => Some(other.to_string()),
        }
    }

    fn token(&self) -> Option<&str> {
        if self.kind.as_deref() != Some(TOKEN_TYPE) {
            return None;
        }
        self.fields
            .get("content")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Orchestrator message list, present even when it holds no assistant entry
    fn orchestrator_messages(&self) -> Option<&[RoleMessage]> {
        self.orchestrator.as_ref()?.messages.as_deref()
    }

    fn legacy_token(&self) -> Option<&str> {
        LEGACY_TOKEN_FIELDS.iter().find_map(|field| {
            self.fields
                .get(*field)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
        })
    }

    fn remaining_quota(&self) -> Option<u32> {
        self.remaining
            .as_ref()
            .and_then(Value::as_u64)
            .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
    }
}

/// Content of the last assistant entry; later entries supersede earlier ones
fn assistant_snapshot(messages: &[RoleMessage]) -> Option<&str> {
    messages
        .iter()
        .filter(|m| {
            m.role
                .as_deref()
                .is_some_and(|role| ASSISTANT_ROLES.contains(&role))
        })
        .filter_map(|m| m.content.as_ref().and_then(Value::as_str))
        .filter(|s| !s.is_empty())
        .last()
}

/// Decoder accepting every wire format without a version flag.
///
/// Precedence: explicit error, token event, orchestrator message list, legacy fields.
/// An orchestrator list without assistant content yields nothing; the legacy
/// fields are only consulted when the list is absent. A remaining-quota field
/// yields a `Metadata` delta ahead of the content delta of the same frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct MultiFormatDecoder;

impl MultiFormatDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl FrameDecoder for MultiFormatDecoder {
    fn decode_payload(&self, payload: &str) -> Result<Vec<Delta>, DecodeSkip> {
        let wire: WirePayload = serde_json::from_str(payload)
            .map_err(|e| DecodeSkip::new(format!("invalid payload: {}", e)))?;

        let mut deltas = Vec::with_capacity(2);

        // Quota first so a terminating error in the same frame cannot hide it
        if let Some(remaining_quota) = wire.remaining_quota() {
            deltas.push(Delta::Metadata { remaining_quota });
        }

        let content = if let Some(message) = wire.error_message() {
            Some(Delta::ErrorSignal { message })
        } else if let Some(token) = wire.token() {
            Some(Delta::token(token))
        } else if let Some(messages) = wire.orchestrator_messages() {
            assistant_snapshot(messages).map(Delta::replace)
        } else {
            wire.legacy_token().map(Delta::token)
        };

        deltas.extend(content);
        Ok(deltas)
    }
}
