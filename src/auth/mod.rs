//! Steam sign-in mapped onto Supabase users.
//!
//! The browser completes Steam OpenID against a loopback callback. The
//! verified Steam ID then becomes a Supabase e-mail/password user
//! (`steam_<id>@steam.local`) whose password is derived from the ID and a
//! configured secret, so the same account signs in again on every visit.

pub mod callback;
pub mod error;
pub mod openid;
pub mod session;
pub mod supabase;

use reqwest::Client;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::api::{SteamClient, SteamId};
use crate::config::AuthConfig;
use crate::internal::models::SteamProfile;

pub use callback::CallbackServer;
pub use error::{AuthError, Result};
pub use openid::{CallbackParams, OpenIdVerifier};
pub use session::SessionStore;
pub use supabase::{Session, SupabaseClient, User, UserMetadata};

pub fn steam_email(steam_id: &SteamId) -> String {
    format!("steam_{}@steam.local", steam_id)
}

pub fn derive_password(steam_id: &SteamId, secret: &str) -> String {
    format!("steam_{}_{}", steam_id, secret)
}

/// Steam ID of the signed-in user. Falls back to the synthetic e-mail for
/// users created without metadata.
pub fn current_steam_id(session: &Session) -> Option<SteamId> {
    let user = &session.user;
    if let Some(id) = user.user_metadata.steam_id.as_deref()
        && let Ok(id) = SteamId::parse(id)
    {
        return Some(id);
    }
    user.email
        .as_deref()
        .and_then(|email| email.strip_prefix("steam_"))
        .and_then(|rest| rest.strip_suffix("@steam.local"))
        .and_then(|id| SteamId::parse(id).ok())
}

/// Browser sign-in that has been started but not yet completed.
pub struct PendingSignIn {
    pub login_url: Url,
    server: CallbackServer,
}

pub struct SteamAuth {
    supabase: SupabaseClient,
    verifier: OpenIdVerifier,
    store: SessionStore,
    openid_endpoint: String,
    password_secret: String,
    callback_port: u16,
    callback_timeout: Duration,
}

impl SteamAuth {
    pub fn from_config(config: &AuthConfig, client: Client, store: SessionStore) -> Result<Self> {
        Ok(Self {
            supabase: SupabaseClient::new(
                client.clone(),
                &config.supabase_url,
                &config.supabase_anon_key,
            )?,
            verifier: OpenIdVerifier::new(client, config.openid_endpoint.clone()),
            store,
            openid_endpoint: config.openid_endpoint.clone(),
            password_secret: config.password_secret.clone(),
            callback_port: config.callback_port,
            callback_timeout: Duration::from_secs(config.callback_timeout_secs),
        })
    }

    /// Bind the callback listener and build the Steam login URL for it.
    pub async fn begin_sign_in(&self) -> Result<PendingSignIn> {
        let server = CallbackServer::bind(self.callback_port).await?;
        let (return_to, realm) = server.urls()?;
        let login_url = openid::login_url(&self.openid_endpoint, &return_to, &realm)?;
        tracing::info!(%return_to, "Waiting for Steam sign-in callback");
        Ok(PendingSignIn { login_url, server })
    }

    /// Wait for the browser to come back, then verify and map the account.
    pub async fn complete_sign_in(
        &self,
        pending: PendingSignIn,
        steam: &SteamClient,
        cancel: CancellationToken,
    ) -> Result<(SteamProfile, Session)> {
        let params = pending
            .server
            .wait_for_callback(cancel, self.callback_timeout)
            .await?;
        self.handle_steam_callback(&params, steam).await
    }

    /// Verify the OpenID assertion, load the profile and sign the matching
    /// Supabase user in. The session is persisted on success.
    #[tracing::instrument(skip_all)]
    pub async fn handle_steam_callback(
        &self,
        params: &CallbackParams,
        steam: &SteamClient,
    ) -> Result<(SteamProfile, Session)> {
        let steam_id = self.verifier.verify(params).await?;
        let profile = steam.fetch_profile(&steam_id).await?;
        let session = self.create_or_get_steam_user(&profile).await?;

        if let Err(e) = self.store.save(&session) {
            tracing::warn!(error = %e, "Failed to persist session");
        }
        Ok((profile, session))
    }

    /// Sign the Steam user in, creating the Supabase account on first use.
    #[tracing::instrument(skip_all, fields(steam_id = %profile.steam_id))]
    pub async fn create_or_get_steam_user(&self, profile: &SteamProfile) -> Result<Session> {
        let email = steam_email(&profile.steam_id);
        let password = derive_password(&profile.steam_id, &self.password_secret);

        match self.supabase.sign_in_with_password(&email, &password).await {
            Ok(session) => {
                tracing::info!("Signed in existing Steam user");
                return Ok(session);
            }
            Err(AuthError::InvalidCredentials) => {}
            Err(e) => return Err(e),
        }

        let metadata = UserMetadata {
            steam_id: Some(profile.steam_id.to_string()),
            username: Some(profile.username.clone()),
            avatar: Some(profile.avatar.clone()),
            profile_url: Some(profile.profile_url.clone()),
            provider: Some("steam".to_string()),
        };
        if let Some(session) = self.supabase.sign_up(&email, &password, &metadata).await? {
            tracing::info!("Created Supabase user for Steam account");
            return Ok(session);
        }

        self.supabase.sign_in_with_password(&email, &password).await
    }

    /// Load the stored session and check it against the backend. An expired
    /// access token is refreshed once; if that is refused too the file is
    /// cleared. A network failure keeps the session.
    pub async fn restore_session(&self) -> Result<Option<Session>> {
        let Some(mut session) = self.store.load()? else {
            return Ok(None);
        };

        match self.supabase.get_user(&session.access_token).await {
            Ok(user) => {
                session.user = user;
                Ok(Some(session))
            }
            Err(AuthError::Backend { status, .. }) if status == 401 || status == 403 => {
                self.refresh_stored_session(session).await
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not validate stored session, keeping it");
                Ok(Some(session))
            }
        }
    }

    async fn refresh_stored_session(&self, session: Session) -> Result<Option<Session>> {
        if session.refresh_token.is_empty() {
            tracing::info!("Stored session expired, signing out");
            self.store.clear()?;
            return Ok(None);
        }

        match self.supabase.refresh_session(&session.refresh_token).await {
            Ok(refreshed) => {
                tracing::info!("Refreshed expired session");
                if let Err(e) = self.store.save(&refreshed) {
                    tracing::warn!(error = %e, "Failed to persist refreshed session");
                }
                Ok(Some(refreshed))
            }
            Err(AuthError::Backend { .. } | AuthError::InvalidCredentials) => {
                tracing::info!("Stored session expired and could not be refreshed, signing out");
                self.store.clear()?;
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not refresh stored session, keeping it");
                Ok(Some(session))
            }
        }
    }

    /// Revoke the token and forget the stored session. The local file is
    /// removed even when the backend call fails.
    pub async fn sign_out(&self, session: &Session) -> Result<()> {
        if let Err(e) = self.supabase.sign_out(&session.access_token).await {
            tracing::warn!(error = %e, "Backend sign-out failed");
        }
        self.store.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> SteamId {
        SteamId::parse("76561197960287930").unwrap()
    }

    fn session_with(steam_id: Option<&str>, email: Option<&str>) -> Session {
        Session {
            access_token: "t".into(),
            refresh_token: String::new(),
            expires_at: None,
            user: User {
                id: "u".into(),
                email: email.map(str::to_string),
                user_metadata: UserMetadata {
                    steam_id: steam_id.map(str::to_string),
                    ..Default::default()
                },
            },
        }
    }

    #[test]
    fn email_and_password_are_deterministic() {
        assert_eq!(steam_email(&id()), "steam_76561197960287930@steam.local");
        assert_eq!(
            derive_password(&id(), "secret"),
            derive_password(&id(), "secret")
        );
        assert_ne!(
            derive_password(&id(), "secret"),
            derive_password(&id(), "other")
        );
    }

    #[test]
    fn current_steam_id_prefers_metadata() {
        let s = session_with(Some("76561197960287930"), Some("someone@example.com"));
        assert_eq!(current_steam_id(&s), Some(id()));

        let s = session_with(None, Some("steam_76561197960287930@steam.local"));
        assert_eq!(current_steam_id(&s), Some(id()));

        let s = session_with(Some("garbage"), Some("someone@example.com"));
        assert_eq!(current_steam_id(&s), None);
    }
}
