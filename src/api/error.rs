use thiserror::Error;

pub type Result<T> = std::result::Result<T, SteamApiError>;

/// Errors surfaced by the Steam Web API client.
///
/// Upstream URLs carry the API key as a query parameter, so request errors
/// are stored with their URL stripped and status errors only name the endpoint.
#[derive(Debug, Error)]
pub enum SteamApiError {
    #[error("Steam ID is required")]
    MissingSteamId,

    #[error("Invalid Steam ID format: {0}")]
    InvalidSteamId(String),

    #[error("Steam API key not configured")]
    MissingApiKey,

    #[error("Player not found")]
    PlayerNotFound,

    #[error("No Steam account matches '{0}'")]
    VanityNotFound(String),

    #[error("Steam API error: {status} from {endpoint}")]
    Status { status: u16, endpoint: String },

    #[error("HTTP request error: {0}")]
    Http(#[source] reqwest::Error),
}

impl SteamApiError {
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        Self::Http(err.without_url())
    }

    /// True for errors caused by the user's input rather than the network.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::MissingSteamId
                | Self::InvalidSteamId(_)
                | Self::PlayerNotFound
                | Self::VanityNotFound(_)
        )
    }
}
