use async_trait::async_trait;
use orion_types::{ClientConfig, Credentials, Message, SessionContext, Thread};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::{PersistError, Result};
use crate::remote::models::{MessageListResponse, RenameRequest, ThreadListResponse};
use crate::trait_client::{ConversationRepository, ThreadPage};

/// REST client for the thread endpoints
pub struct RemoteRepository {
    http_client: reqwest::Client,
    config: ClientConfig,
    session: SessionContext,
}

impl RemoteRepository {
    pub fn new(config: ClientConfig, session: SessionContext) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            config,
            session,
        }
    }

    pub fn with_http_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = http_client;
        self
    }

    fn token(&self) -> Result<String> {
        match self.session.credentials() {
            Some(Credentials::Bearer(token)) => Ok(token),
            Some(Credentials::Anonymous(_)) => Err(PersistError::Unauthenticated),
            None => Err(PersistError::AuthExpired),
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.bearer_auth(self.token()?).send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("Thread API rejected the session token");
            return Err(PersistError::AuthExpired);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PersistError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self.send(builder).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl ConversationRepository for RemoteRepository {
    async fn list_threads(&self, limit: usize, offset: usize) -> Result<ThreadPage> {
        let request = self
            .http_client
            .get(self.config.url("/threads"))
            .query(&[("limit", limit), ("offset", offset)]);

        let page: ThreadListResponse = self.send_json(request).await?;
        tracing::debug!(count = page.threads.len(), offset, "Listed remote threads");

        Ok(ThreadPage {
            threads: page.threads.into_iter().map(Thread::from).collect(),
            has_more: page.has_more,
        })
    }

    async fn get_messages(&self, thread_id: &str) -> Result<Vec<Message>> {
        let request = self
            .http_client
            .get(self.config.url(&format!("/threads/{}/messages", thread_id)));

        let response: MessageListResponse = self.send_json(request).await?;
        Ok(response.messages)
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        let request = self
            .http_client
            .delete(self.config.url(&format!("/threads/{}", thread_id)));

        self.send(request).await?;
        Ok(())
    }

    async fn rename_thread(&self, thread_id: &str, title: &str) -> Result<()> {
        let request = self
            .http_client
            .patch(self.config.url(&format!("/threads/{}", thread_id)))
            .json(&RenameRequest { title });

        self.send(request).await?;
        Ok(())
    }
}
