use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::{Result, SteamApiError};

static STEAM_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{17}$").expect("regex compiles"));

static PROFILE_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:https?://)?(?:www\.)?steamcommunity\.com/profiles/([0-9]{17})/?(?:[?#].*)?$")
        .expect("regex compiles")
});

static VANITY_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:https?://)?(?:www\.)?steamcommunity\.com/id/([^/?#]+)/?(?:[?#].*)?$")
        .expect("regex compiles")
});

static VANITY_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{2,32}$").expect("regex compiles"));

/// A 64-bit Steam community ID in its 17-digit decimal form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SteamId(String);

impl SteamId {
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        if value.is_empty() {
            return Err(SteamApiError::MissingSteamId);
        }
        match STEAM_ID_RE.is_match(value) {
            true => Ok(Self(value.to_string())),
            false => Err(SteamApiError::InvalidSteamId(value.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn profile_url(&self) -> String {
        format!("https://steamcommunity.com/profiles/{}", self.0)
    }
}

impl fmt::Display for SteamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SteamId {
    type Error = SteamApiError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<SteamId> for String {
    fn from(id: SteamId) -> Self {
        id.0
    }
}

/// What the user typed into the Steam ID box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SteamIdInput {
    Id(SteamId),
    Vanity(String),
}

impl SteamIdInput {
    /// Accepts a 17-digit ID, a `/profiles/<id>` URL, a `/id/<vanity>` URL
    /// or a bare vanity name.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(SteamApiError::MissingSteamId);
        }

        if STEAM_ID_RE.is_match(input) {
            return Ok(Self::Id(SteamId(input.to_string())));
        }
        if let Some(caps) = PROFILE_URL_RE.captures(input) {
            return Ok(Self::Id(SteamId(caps[1].to_string())));
        }
        if let Some(caps) = VANITY_URL_RE.captures(input) {
            return Ok(Self::Vanity(caps[1].to_string()));
        }
        // A bare all-digit string of the wrong length is a typo, not a vanity name.
        if !input.chars().all(|c| c.is_ascii_digit()) && VANITY_NAME_RE.is_match(input) {
            return Ok(Self::Vanity(input.to_string()));
        }

        Err(SteamApiError::InvalidSteamId(input.to_string()))
    }
}
