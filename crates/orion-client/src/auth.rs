use orion_persist::LocalSnapshot;
use orion_types::{ClientConfig, SessionContext, UserProfile};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct SignupRequest<'a> {
    email: &'a str,
    password: &'a str,
    name: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    pub user: UserProfile,
}

#[derive(Debug, Deserialize)]
struct AuthErrorBody {
    detail: String,
}

/// Login, signup and logout against the auth endpoints
pub struct AuthClient {
    http_client: reqwest::Client,
    config: ClientConfig,
    session: SessionContext,
    snapshot: LocalSnapshot,
}

impl AuthClient {
    pub fn new(config: ClientConfig, session: SessionContext, snapshot: LocalSnapshot) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            config,
            session,
            snapshot,
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile> {
        self.authenticate("/auth/login", &LoginRequest { email, password })
            .await
    }

    pub async fn signup(&self, email: &str, password: &str, name: &str) -> Result<UserProfile> {
        self.authenticate(
            "/auth/signup",
            &SignupRequest {
                email,
                password,
                name,
            },
        )
        .await
    }

    /// Forget the token and fall back to the anonymous identity
    pub async fn logout(&self) -> Result<()> {
        self.snapshot.clear_credentials().await?;
        let anonymous_id = self.snapshot.anonymous_id().await?;
        self.session.logout(anonymous_id);
        tracing::info!("Logged out");
        Ok(())
    }

    async fn authenticate<B: Serialize>(&self, path: &str, body: &B) -> Result<UserProfile> {
        let response = self
            .http_client
            .post(self.config.url(path))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let detail = serde_json::from_slice::<AuthErrorBody>(&bytes)
                .map(|b| b.detail)
                .unwrap_or_else(|_| "Authentication failed".to_string());
            tracing::warn!(status = status.as_u16(), "Authentication rejected");
            return Err(ClientError::Auth(detail));
        }

        let auth: AuthResponse = serde_json::from_slice(&bytes)?;
        self.snapshot
            .save_credentials(&auth.access_token, &auth.user)
            .await?;
        self.session.login(auth.access_token, auth.user.clone());

        tracing::info!(user_id = %auth.user.user_id, "Signed in");
        Ok(auth.user)
    }
}
