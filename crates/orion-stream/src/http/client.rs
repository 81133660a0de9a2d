// HTTP implementation of the streaming chat transport

use async_trait::async_trait;
use orion_types::{ClientConfig, Credentials};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::buffer_utils::{decode_stream, read_frames, DeltaStream, FrameDecoder};
use crate::decoder::MultiFormatDecoder;
use crate::error::{ChatError, Result};
use crate::traits::{ChatRequest, ChatTransport};

/// Body of a 429 refusal: `{"detail": {"limit": 5}}`
#[derive(Debug, Deserialize)]
struct QuotaRefusal {
    detail: QuotaDetail,
}

#[derive(Debug, Deserialize)]
struct QuotaDetail {
    #[serde(default)]
    limit: Option<u32>,
}

/// Quota limit announced in a 429 body, if the body is well formed
pub fn parse_quota_limit(body: &str) -> Option<u32> {
    serde_json::from_str::<QuotaRefusal>(body)
        .ok()
        .and_then(|refusal| refusal.detail.limit)
}

pub struct HttpChatTransport {
    http_client: reqwest::Client,
    config: ClientConfig,
    decoder: Arc<dyn FrameDecoder>,
}

impl HttpChatTransport {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));

        // No request timeout: a stalled stream is faulted by the connection itself
        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ChatError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            config,
            decoder: Arc::new(MultiFormatDecoder::new()),
        })
    }

    pub fn with_decoder(mut self, decoder: Arc<dyn FrameDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    /// Request payload: thread, message and the anonymous id when there is no token
    fn build_body(&self, request: &ChatRequest) -> Value {
        let mut body = serde_json::json!({
            "threadId": request.thread_id,
            "message": request.message,
        });

        if let (Credentials::Anonymous(user_id), Some(obj)) =
            (&request.credentials, body.as_object_mut())
        {
            obj.insert("userId".to_string(), Value::String(user_id.clone()));
        }

        body
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn open_stream(&self, request: ChatRequest) -> Result<DeltaStream> {
        let url = self.config.stream_url();
        let mut builder = self.http_client.post(&url).json(&self.build_body(&request));

        if let Credentials::Bearer(token) = &request.credentials {
            builder = builder.bearer_auth(token);
        }

        tracing::debug!(thread_id = %request.thread_id, "Opening chat stream at {}", url);

        let response = builder
            .send()
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let body = response.text().await.unwrap_or_default();
            let limit = parse_quota_limit(&body);
            tracing::warn!(?limit, "Chat request refused: quota exhausted");
            return Err(ChatError::RateLimited { limit });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Chat request failed");
            return Err(ChatError::Protocol {
                status: status.as_u16(),
                body,
            });
        }

        let frames = read_frames(response.bytes_stream(), self.config.buffer_capacity);
        Ok(decode_stream(frames, Arc::clone(&self.decoder)))
    }
}
