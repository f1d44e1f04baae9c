use jiff::Timestamp;

use super::models::{Achievement, Game};

/// Aggregates shown above the games list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LibraryStats {
    pub total_games: usize,
    /// Games with at least one achievement.
    pub games_with_achievements: usize,
    pub total_achievements: u32,
    pub unlocked_achievements: u32,
    /// Mean per-game completion over games that have achievements.
    pub average_completion: u32,
    pub perfect_games: usize,
    pub total_playtime_minutes: u64,
}

impl LibraryStats {
    pub fn from_games(games: &[Game]) -> Self {
        let mut stats = Self {
            total_games: games.len(),
            ..Default::default()
        };
        let mut completion_sum = 0.0;

        for game in games {
            stats.total_playtime_minutes += game.playtime_minutes as u64;
            if game.achievements == 0 {
                continue;
            }
            stats.games_with_achievements += 1;
            stats.total_achievements += game.achievements;
            stats.unlocked_achievements += game.completed.min(game.achievements);
            completion_sum += game.completed.min(game.achievements) as f64 / game.achievements as f64;
            if game.is_perfect() {
                stats.perfect_games += 1;
            }
        }

        if stats.games_with_achievements > 0 {
            stats.average_completion =
                (completion_sum / stats.games_with_achievements as f64 * 100.0).round() as u32;
        }
        stats
    }
}

/// Aggregates for the selected game's achievement list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AchievementStats {
    pub total: usize,
    pub unlocked: usize,
    pub percent: u32,
    pub latest_unlock: Option<Timestamp>,
}

impl AchievementStats {
    pub fn from_achievements(achievements: &[Achievement]) -> Self {
        let total = achievements.len();
        let unlocked = achievements.iter().filter(|a| a.completed).count();
        let percent = match total {
            0 => 0,
            t => ((unlocked as f64 / t as f64) * 100.0).round() as u32,
        };
        let latest_unlock = achievements.iter().filter_map(|a| a.unlock_time).max();

        Self {
            total,
            unlocked,
            percent,
            latest_unlock,
        }
    }
}
