pub mod error;
pub mod steam_id;
pub mod wire;

use futures::StreamExt;
use futures::stream;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};

use crate::config::{NetworkConfig, SteamConfig};
use crate::internal::cache::Cache;
use crate::internal::models::{Achievement, Game, SteamProfile};

pub use error::{Result, SteamApiError};
pub use steam_id::{SteamId, SteamIdInput};

use wire::{OwnedGamesEnvelope, PlayerStatsEnvelope, PlayerSummariesEnvelope, VanityEnvelope};

const PLAYER_SUMMARIES: &str = "ISteamUser/GetPlayerSummaries/v0002/";
const OWNED_GAMES: &str = "IPlayerService/GetOwnedGames/v0001/";
const PLAYER_ACHIEVEMENTS: &str = "ISteamUserStats/GetPlayerAchievements/v0001/";
const RESOLVE_VANITY: &str = "ISteamUser/ResolveVanityURL/v0001/";

/// Steam Web API client.
///
/// Every call is a single keyed GET whose JSON body is reshaped into the
/// dashboard models. Results are cached per Steam ID (and app id for
/// achievements) until the TTL runs out or a refresh invalidates them.
pub struct SteamClient {
    client: Client,
    base_url: String,
    api_key: String,
    max_concurrent_requests: usize,
    enable_metrics: bool,
    profile_cache: Cache<SteamId, SteamProfile>,
    games_cache: Cache<SteamId, Vec<Game>>,
    achievement_cache: Cache<(SteamId, u32), Vec<Achievement>>,
}

impl SteamClient {
    pub fn new(
        steam: &SteamConfig,
        network: &NetworkConfig,
        enable_metrics: bool,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(network.timeout_secs))
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;
        let ttl = Duration::from_secs(network.cache_ttl_secs);

        Ok(Self {
            client,
            base_url: steam.api_base_url.trim_end_matches('/').to_string(),
            api_key: steam.api_key.clone(),
            max_concurrent_requests: network.max_concurrent_requests.max(1),
            enable_metrics,
            profile_cache: Cache::new(ttl, enable_metrics),
            games_cache: Cache::new(ttl, enable_metrics),
            achievement_cache: Cache::new(ttl, enable_metrics),
        })
    }

    /// Client against an arbitrary base URL with default network settings.
    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let ttl = Duration::from_secs(NetworkConfig::default().cache_ttl_secs);
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            max_concurrent_requests: NetworkConfig::default().max_concurrent_requests,
            enable_metrics: false,
            profile_cache: Cache::new(ttl, false),
            games_cache: Cache::new(ttl, false),
            achievement_cache: Cache::new(ttl, false),
        }
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn send(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<reqwest::Response> {
        if !self.has_api_key() {
            return Err(SteamApiError::MissingApiKey);
        }

        let start = Instant::now();
        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self
            .client
            .get(&url)
            .query(&[("key", self.api_key.as_str()), ("format", "json")])
            .query(query)
            .send()
            .await
            .map_err(SteamApiError::from_reqwest)?;

        if self.enable_metrics {
            tracing::debug!(
                elapsed = ?start.elapsed(),
                status = response.status().as_u16(),
                endpoint,
                "steam.request"
            );
        }
        Ok(response)
    }

    async fn get_json<T>(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = self.send(endpoint, query).await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), endpoint, "Steam API returned an error status");
            return Err(SteamApiError::Status {
                status: status.as_u16(),
                endpoint: endpoint.to_string(),
            });
        }
        response
            .json::<T>()
            .await
            .map_err(SteamApiError::from_reqwest)
    }

    /// Profile summary for one account. An empty player list means the ID
    /// does not belong to any account.
    #[tracing::instrument(skip(self, steam_id), fields(steam_id = %steam_id))]
    pub async fn fetch_profile(&self, steam_id: &SteamId) -> Result<SteamProfile> {
        if let Some(profile) = self.profile_cache.get(steam_id) {
            return Ok(profile);
        }

        let envelope: PlayerSummariesEnvelope = self
            .get_json(PLAYER_SUMMARIES, &[("steamids", steam_id.as_str())])
            .await?;
        let profile = wire::first_profile(envelope)?;

        self.profile_cache.set(steam_id.clone(), profile.clone());
        Ok(profile)
    }

    /// Owned games including free-to-play titles. A private library yields
    /// an empty list rather than an error.
    #[tracing::instrument(skip(self, steam_id), fields(steam_id = %steam_id))]
    pub async fn fetch_owned_games(&self, steam_id: &SteamId) -> Result<Vec<Game>> {
        if let Some(games) = self.games_cache.get(steam_id) {
            return Ok(games);
        }

        let envelope: OwnedGamesEnvelope = self
            .get_json(
                OWNED_GAMES,
                &[
                    ("steamid", steam_id.as_str()),
                    ("include_appinfo", "1"),
                    ("include_played_free_games", "1"),
                ],
            )
            .await?;
        let games: Vec<Game> = envelope.response.games.into_iter().map(Game::from).collect();
        tracing::info!(count = games.len(), "Fetched owned games");

        self.games_cache.set(steam_id.clone(), games.clone());
        Ok(games)
    }

    /// Achievement list for one game. Games without stats yield an empty list.
    #[tracing::instrument(skip(self, steam_id), fields(steam_id = %steam_id))]
    pub async fn fetch_achievements(
        &self,
        steam_id: &SteamId,
        app_id: u32,
    ) -> Result<Vec<Achievement>> {
        let key = (steam_id.clone(), app_id);
        if let Some(achievements) = self.achievement_cache.get(&key) {
            return Ok(achievements);
        }

        let app_id_str = app_id.to_string();
        let response = self
            .send(
                PLAYER_ACHIEVEMENTS,
                &[
                    ("steamid", steam_id.as_str()),
                    ("appid", app_id_str.as_str()),
                    ("l", "english"),
                ],
            )
            .await?;

        let status = response.status();
        let achievements = match status {
            s if s.is_success() => {
                let envelope: PlayerStatsEnvelope = response
                    .json()
                    .await
                    .map_err(SteamApiError::from_reqwest)?;
                match envelope.playerstats.has_no_stats() {
                    true => Vec::new(),
                    false => envelope
                        .playerstats
                        .achievements
                        .into_iter()
                        .map(Achievement::from)
                        .collect(),
                }
            }
            StatusCode::BAD_REQUEST => {
                // The body explains whether this is "no stats" or a real error
                match response.json::<PlayerStatsEnvelope>().await {
                    Ok(envelope) if envelope.playerstats.has_no_stats() => Vec::new(),
                    _ => {
                        return Err(SteamApiError::Status {
                            status: status.as_u16(),
                            endpoint: PLAYER_ACHIEVEMENTS.to_string(),
                        });
                    }
                }
            }
            _ => {
                return Err(SteamApiError::Status {
                    status: status.as_u16(),
                    endpoint: PLAYER_ACHIEVEMENTS.to_string(),
                });
            }
        };

        self.achievement_cache.set(key, achievements.clone());
        Ok(achievements)
    }

    /// Fill in `achievements`/`completed` for every game, running at most
    /// `max_concurrent_requests` lookups at once. Order is preserved.
    /// A failed lookup leaves that game at 0/0.
    pub async fn fetch_achievement_counts<F>(
        &self,
        steam_id: &SteamId,
        games: Vec<Game>,
        mut on_progress: F,
    ) -> Vec<Game>
    where
        F: FnMut(usize) + Send,
    {
        let start = Instant::now();
        let total = games.len();

        let updated: Vec<Game> = stream::iter(games.into_iter().map(|mut game| async move {
            match self.fetch_achievements(steam_id, game.id).await {
                Ok(list) => {
                    game.achievements = list.len() as u32;
                    game.completed = list.iter().filter(|a| a.completed).count() as u32;
                }
                Err(e) => {
                    tracing::warn!(app_id = game.id, error = %e, "Achievement count lookup failed");
                }
            }
            game
        }))
        .buffered(self.max_concurrent_requests)
        .enumerate()
        .map(|(i, game)| {
            on_progress(i + 1);
            game
        })
        .collect()
        .await;

        tracing::info!(elapsed = ?start.elapsed(), games = total, "Fetched achievement counts");
        updated
    }

    /// Turn user input into a Steam ID, resolving vanity names through the API.
    #[tracing::instrument(skip(self))]
    pub async fn resolve_steam_id(&self, input: &str) -> Result<SteamId> {
        match SteamIdInput::parse(input)? {
            SteamIdInput::Id(id) => Ok(id),
            SteamIdInput::Vanity(name) => {
                let envelope: VanityEnvelope = self
                    .get_json(RESOLVE_VANITY, &[("vanityurl", name.as_str())])
                    .await?;
                match (envelope.response.success, envelope.response.steamid) {
                    (1, Some(id)) => SteamId::parse(&id),
                    _ => Err(SteamApiError::VanityNotFound(name)),
                }
            }
        }
    }

    /// Forget everything cached for one account so the next fetch hits Steam.
    pub fn invalidate(&self, steam_id: &SteamId) {
        self.profile_cache.invalidate_where(|id| id == steam_id);
        self.games_cache.invalidate_where(|id| id == steam_id);
        self.achievement_cache
            .invalidate_where(|(id, _)| id == steam_id);
    }
}
