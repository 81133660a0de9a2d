use serde::{Deserialize, Serialize};

/// One `data: ` line pulled off the wire, with the prefix removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFrame {
    pub payload: String,
}

impl StreamFrame {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
        }
    }
}

/// Normalized unit of change decoded from a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Delta {
    /// Incremental token, concatenated onto the message
    TokenAppend {
        text: String,
    },

    /// Cumulative snapshot of the answer so far, replaces the message content
    FullReplace {
        text: String,
    },

    /// Remaining questions for the requester
    Metadata {
        remaining_quota: u32,
    },

    /// Backend reported a failure mid-stream
    ErrorSignal {
        message: String,
    },

    EndOfStream,
}

impl Delta {
    pub fn token(text: impl Into<String>) -> Self {
        Self::TokenAppend { text: text.into() }
    }

    pub fn replace(text: impl Into<String>) -> Self {
        Self::FullReplace { text: text.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::ErrorSignal {
            message: message.into(),
        }
    }

    /// Carries answer text (token or snapshot) that is not empty
    pub fn has_content(&self) -> bool {
        match self {
            Delta::TokenAppend { text } | Delta::FullReplace { text } => !text.is_empty(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_serialization_tag() {
        let json = serde_json::to_string(&Delta::token("Hi")).unwrap();
        assert!(json.contains("\"type\":\"token_append\""));

        let json = serde_json::to_string(&Delta::EndOfStream).unwrap();
        assert_eq!(json, r#"{"type":"end_of_stream"}"#);
    }

    #[test]
    fn test_has_content() {
        assert!(Delta::token("a").has_content());
        assert!(Delta::replace("a").has_content());
        assert!(!Delta::token("").has_content());
        assert!(!Delta::Metadata { remaining_quota: 3 }.has_content());
        assert!(!Delta::EndOfStream.has_content());
    }
}
