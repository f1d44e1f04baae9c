use thiserror::Error;

use crate::api::SteamApiError;

pub type Result<T> = std::result::Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Supabase URL and anon key are not configured")]
    NotConfigured,

    #[error("Steam sign-in was cancelled")]
    Cancelled,

    #[error("Timed out waiting for the Steam sign-in callback")]
    Timeout,

    #[error("Failed to verify Steam authentication")]
    VerificationFailed,

    #[error("Malformed callback request")]
    MalformedCallback,

    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("Auth backend error {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("Failed to fetch Steam profile: {0}")]
    Profile(#[from] SteamApiError),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session file error: {0}")]
    SessionFile(#[from] serde_json::Error),
}
