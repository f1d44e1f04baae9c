use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::error::{AuthError, Result};

/// Metadata stored on the Supabase user created for a Steam account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steam_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: User,
}

/// GoTrue error bodies come in two shapes depending on the server version.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

impl ErrorBody {
    fn into_message(self) -> String {
        self.msg
            .or(self.message)
            .or(self.error_description)
            .or(self.error)
            .unwrap_or_else(|| "unknown error".to_string())
    }
}

/// Minimal Supabase Auth (GoTrue) REST client.
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(client: Client, base_url: &str, anon_key: &str) -> Result<Self> {
        if base_url.trim().is_empty() || anon_key.trim().is_empty() {
            return Err(AuthError::NotConfigured);
        }
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/auth/v1/{}", self.base_url, path))
            .header("apikey", &self.anon_key)
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body: ErrorBody = response.json().await.unwrap_or_default();
        let message = body.into_message();
        if matches!(status, StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED)
            && message.to_lowercase().contains("invalid login credentials")
        {
            return Err(AuthError::InvalidCredentials);
        }
        Err(AuthError::Backend {
            status: status.as_u16(),
            message,
        })
    }

    /// Create a user. Returns a session when the project auto-confirms
    /// e-mail addresses, `None` when confirmation is pending.
    #[tracing::instrument(skip(self, password, metadata))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &UserMetadata,
    ) -> Result<Option<Session>> {
        let response = self
            .request(reqwest::Method::POST, "signup")
            .json(&json!({ "email": email, "password": password, "data": metadata }))
            .send()
            .await?;
        let value: serde_json::Value = Self::check(response).await?.json().await?;

        match value.get("access_token") {
            Some(_) => Ok(Some(serde_json::from_value(value)?)),
            None => {
                tracing::info!("Sign-up succeeded without a session (confirmation pending)");
                Ok(None)
            }
        }
    }

    #[tracing::instrument(skip(self, password))]
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let response = self
            .request(reqwest::Method::POST, "token?grant_type=password")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Trade a refresh token for a new session. Refresh tokens are single use.
    #[tracing::instrument(skip_all)]
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<Session> {
        let response = self
            .request(reqwest::Method::POST, "token?grant_type=refresh_token")
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// The user behind an access token; fails once the token has expired.
    pub async fn get_user(&self, access_token: &str) -> Result<User> {
        let response = self
            .request(reqwest::Method::GET, "user")
            .bearer_auth(access_token)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn sign_out(&self, access_token: &str) -> Result<()> {
        let response = self
            .request(reqwest::Method::POST, "logout")
            .bearer_auth(access_token)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
