use std::cmp::Ordering;

use strum_macros::EnumIter;

use crate::internal::models::Game;

/// Sort keys, in the order of their number keys.
#[derive(Debug, PartialEq, Clone, Copy, EnumIter)]
pub enum SortBy {
    Name,
    Playtime,
    LastPlayed,
    Completion,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Name => "Name",
            SortBy::Playtime => "Playtime",
            SortBy::LastPlayed => "Last played",
            SortBy::Completion => "Completion",
        }
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn toggle(&self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "↑",
            SortOrder::Descending => "↓",
        }
    }
}

/// Stable sort; ties fall back to the case-insensitive name.
pub fn sort_games(games: &mut [Game], sort_by: SortBy, order: SortOrder) {
    games.sort_by(|a, b| {
        let primary = match sort_by {
            SortBy::Name => Ordering::Equal,
            SortBy::Playtime => a.playtime_minutes.cmp(&b.playtime_minutes),
            SortBy::LastPlayed => a.last_played.cmp(&b.last_played),
            SortBy::Completion => a
                .completion_percent()
                .cmp(&b.completion_percent())
                .then(a.achievements.cmp(&b.achievements)),
        };
        let by_name = a.name.to_lowercase().cmp(&b.name.to_lowercase());
        let ordering = primary.then(by_name);
        match order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::Timestamp;

    fn game(name: &str, playtime: u32, achievements: u32, completed: u32, last: Option<i64>) -> Game {
        Game {
            name: name.to_string(),
            playtime_minutes: playtime,
            achievements,
            completed,
            last_played: last.map(|s| Timestamp::from_second(s).unwrap()),
            ..Default::default()
        }
    }

    fn names(games: &[Game]) -> Vec<&str> {
        games.iter().map(|g| g.name.as_str()).collect()
    }

    #[test]
    fn sort_by_name_ascending_ignores_case() {
        let mut games = vec![
            game("portal", 0, 0, 0, None),
            game("Dota 2", 0, 0, 0, None),
            game("Apex", 0, 0, 0, None),
        ];
        sort_games(&mut games, SortBy::Name, SortOrder::Ascending);
        assert_eq!(names(&games), vec!["Apex", "Dota 2", "portal"]);
    }

    #[test]
    fn sort_by_playtime_descending() {
        let mut games = vec![
            game("A", 10, 0, 0, None),
            game("B", 500, 0, 0, None),
            game("C", 42, 0, 0, None),
        ];
        sort_games(&mut games, SortBy::Playtime, SortOrder::Descending);
        assert_eq!(names(&games), vec!["B", "C", "A"]);
    }

    #[test]
    fn never_played_sorts_last_when_descending() {
        let mut games = vec![
            game("Never", 0, 0, 0, None),
            game("Old", 0, 0, 0, Some(1_500_000_000)),
            game("Recent", 0, 0, 0, Some(1_700_000_000)),
        ];
        sort_games(&mut games, SortBy::LastPlayed, SortOrder::Descending);
        assert_eq!(names(&games), vec!["Recent", "Old", "Never"]);
    }

    #[test]
    fn sort_by_completion() {
        let mut games = vec![
            game("Half", 0, 10, 5, None),
            game("Full", 0, 4, 4, None),
            game("None", 0, 0, 0, None),
        ];
        sort_games(&mut games, SortBy::Completion, SortOrder::Descending);
        assert_eq!(names(&games), vec!["Full", "Half", "None"]);
    }
}
