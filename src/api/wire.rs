//! Raw Steam Web API payloads and their reshaping into dashboard models.

use jiff::Timestamp;
use serde::Deserialize;

use super::error::{Result, SteamApiError};
use super::steam_id::SteamId;
use crate::internal::models::{Achievement, Game, PersonaState, SteamProfile};

const HEADER_IMAGE_BASE: &str = "https://cdn.cloudflare.steamstatic.com/steam/apps";

#[derive(Debug, Deserialize)]
pub(crate) struct PlayerSummariesEnvelope {
    pub response: PlayerSummaries,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlayerSummaries {
    #[serde(default)]
    pub players: Vec<RawPlayer>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawPlayer {
    pub steamid: String,
    #[serde(default)]
    pub personaname: String,
    #[serde(default)]
    pub avatarfull: String,
    #[serde(default)]
    pub profileurl: String,
    pub realname: Option<String>,
    pub loccountrycode: Option<String>,
    pub lastlogoff: Option<i64>,
    pub timecreated: Option<i64>,
    #[serde(default)]
    pub personastate: u8,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OwnedGamesEnvelope {
    pub response: OwnedGames,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OwnedGames {
    #[serde(default)]
    pub games: Vec<RawGame>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawGame {
    pub appid: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub playtime_forever: u32,
    pub rtime_last_played: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlayerStatsEnvelope {
    pub playerstats: PlayerStats,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlayerStats {
    #[serde(default)]
    pub success: bool,
    pub error: Option<String>,
    #[serde(default)]
    pub achievements: Vec<RawAchievement>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawAchievement {
    pub apiname: String,
    #[serde(default)]
    pub achieved: u8,
    pub unlocktime: Option<i64>,
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VanityEnvelope {
    pub response: VanityResponse,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VanityResponse {
    pub success: u8,
    pub steamid: Option<String>,
}

/// Unix seconds to a timestamp. Steam reports "never" as 0.
pub(crate) fn unix_to_timestamp(secs: Option<i64>) -> Option<Timestamp> {
    match secs {
        Some(s) if s > 0 => Timestamp::from_second(s).ok(),
        _ => None,
    }
}

/// `ACH_WIN_ONE_GAME` -> `Ach Win One Game`.
pub fn prettify_api_name(api_name: &str) -> String {
    api_name
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl RawPlayer {
    pub fn into_profile(self) -> Result<SteamProfile> {
        Ok(SteamProfile {
            steam_id: SteamId::parse(&self.steamid)?,
            username: self.personaname,
            avatar: self.avatarfull,
            profile_url: self.profileurl,
            real_name: non_empty(self.realname),
            country: non_empty(self.loccountrycode),
            last_online: unix_to_timestamp(self.lastlogoff),
            time_created: unix_to_timestamp(self.timecreated),
            status: PersonaState::from_code(self.personastate),
        })
    }
}

impl From<RawGame> for Game {
    fn from(raw: RawGame) -> Self {
        let name = match raw.name.is_empty() {
            true => format!("App {}", raw.appid),
            false => raw.name,
        };
        Game {
            id: raw.appid,
            name,
            image: format!("{}/{}/header.jpg", HEADER_IMAGE_BASE, raw.appid),
            achievements: 0,
            completed: 0,
            playtime_minutes: raw.playtime_forever,
            last_played: unix_to_timestamp(raw.rtime_last_played),
        }
    }
}

impl From<RawAchievement> for Achievement {
    fn from(raw: RawAchievement) -> Self {
        let name = non_empty(raw.name).unwrap_or_else(|| prettify_api_name(&raw.apiname));
        let completed = raw.achieved == 1;
        Achievement {
            id: raw.apiname,
            name,
            description: raw.description.unwrap_or_default(),
            completed,
            unlock_time: match completed {
                true => unix_to_timestamp(raw.unlocktime),
                false => None,
            },
        }
    }
}

impl PlayerStats {
    /// Steam answers "Requested app has no stats" for games without achievements.
    pub fn has_no_stats(&self) -> bool {
        !self.success
            && self
                .error
                .as_deref()
                .is_some_and(|e| e.to_lowercase().contains("no stats"))
    }
}

pub(crate) fn first_profile(envelope: PlayerSummariesEnvelope) -> Result<SteamProfile> {
    envelope
        .response
        .players
        .into_iter()
        .next()
        .ok_or(SteamApiError::PlayerNotFound)?
        .into_profile()
}
