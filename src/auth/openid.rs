//! Steam OpenID 2.0 relying-party helpers.
//!
//! Steam only supports the `identifier_select` flow: the user picks the
//! account on steamcommunity.com and the provider redirects back with a
//! signed assertion whose `openid.claimed_id` ends in the 64-bit Steam ID.
//! The assertion is checked by posting it back with
//! `openid.mode=check_authentication` (stateless verification).

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use std::collections::BTreeMap;
use url::Url;

use super::error::{AuthError, Result};
use crate::api::SteamId;

pub const STEAM_OPENID_URL: &str = "https://steamcommunity.com/openid/login";

const OPENID_NS: &str = "http://specs.openid.net/auth/2.0";
const IDENTIFIER_SELECT: &str = "http://specs.openid.net/auth/2.0/identifier_select";

static CLAIMED_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://steamcommunity\.com/openid/id/([0-9]{17})/?$").expect("regex compiles")
});

/// Query parameters delivered to the callback URL.
pub type CallbackParams = BTreeMap<String, String>;

/// Provider URL the browser is sent to.
pub fn login_url(endpoint: &str, return_to: &str, realm: &str) -> Result<Url> {
    let url = Url::parse_with_params(
        endpoint,
        &[
            ("openid.ns", OPENID_NS),
            ("openid.mode", "checkid_setup"),
            ("openid.return_to", return_to),
            ("openid.realm", realm),
            ("openid.identity", IDENTIFIER_SELECT),
            ("openid.claimed_id", IDENTIFIER_SELECT),
        ],
    )?;
    Ok(url)
}

/// Steam ID from `openid.claimed_id`, if it has the Steam shape.
pub fn claimed_steam_id(params: &CallbackParams) -> Option<SteamId> {
    let claimed = params.get("openid.claimed_id")?;
    let caps = CLAIMED_ID_RE.captures(claimed)?;
    SteamId::parse(&caps[1]).ok()
}

pub struct OpenIdVerifier {
    client: Client,
    endpoint: String,
}

impl OpenIdVerifier {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Ask the provider to confirm the assertion and return the Steam ID it names.
    #[tracing::instrument(skip(self, params))]
    pub async fn verify(&self, params: &CallbackParams) -> Result<SteamId> {
        match params.get("openid.mode").map(String::as_str) {
            Some("id_res") => {}
            Some("cancel") => return Err(AuthError::Cancelled),
            _ => return Err(AuthError::MalformedCallback),
        }

        let steam_id = claimed_steam_id(params).ok_or(AuthError::VerificationFailed)?;

        let mut verify_params = params.clone();
        verify_params.insert(
            "openid.mode".to_string(),
            "check_authentication".to_string(),
        );

        let body = self
            .client
            .post(&self.endpoint)
            .form(&verify_params)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        match body.lines().any(|line| line.trim() == "is_valid:true") {
            true => {
                tracing::info!(steam_id = %steam_id, "Steam OpenID assertion verified");
                Ok(steam_id)
            }
            false => {
                tracing::warn!(steam_id = %steam_id, "Steam OpenID assertion rejected");
                Err(AuthError::VerificationFailed)
            }
        }
    }
}
