use jiff::Timestamp;
use strum_macros::Display;

use crate::api::SteamId;

/// Persona state as reported by `GetPlayerSummaries`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum PersonaState {
    #[default]
    Offline,
    Online,
    Busy,
    Away,
    Snooze,
    #[strum(to_string = "Looking to trade")]
    LookingToTrade,
    #[strum(to_string = "Looking to play")]
    LookingToPlay,
}

impl PersonaState {
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::Online,
            2 => Self::Busy,
            3 => Self::Away,
            4 => Self::Snooze,
            5 => Self::LookingToTrade,
            6 => Self::LookingToPlay,
            _ => Self::Offline,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SteamProfile {
    pub steam_id: SteamId,
    pub username: String,
    pub avatar: String,
    pub profile_url: String,
    pub real_name: Option<String>,
    pub country: Option<String>,
    pub last_online: Option<Timestamp>,
    pub time_created: Option<Timestamp>,
    pub status: PersonaState,
}

/// A game from the owned-games list. `achievements` and `completed` are zero
/// until the per-game achievement counts have been fetched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Game {
    pub id: u32,
    pub name: String,
    pub image: String,
    pub achievements: u32,
    pub completed: u32,
    pub playtime_minutes: u32,
    pub last_played: Option<Timestamp>,
}

impl Game {
    /// Rounded completion percent; 0 for games without achievements.
    pub fn completion_percent(&self) -> u32 {
        match self.achievements {
            0 => 0,
            total => ((self.completed as f64 / total as f64) * 100.0).round() as u32,
        }
    }

    /// All achievements unlocked. Games without achievements are never perfect.
    pub fn is_perfect(&self) -> bool {
        self.achievements > 0 && self.completed >= self.achievements
    }

    pub fn store_url(&self) -> String {
        format!("https://store.steampowered.com/app/{}", self.id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Achievement {
    pub id: String,
    pub name: String,
    pub description: String,
    pub completed: bool,
    pub unlock_time: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum FetchState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed(String),
}
