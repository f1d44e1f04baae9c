use regex::{Regex, RegexBuilder};

use super::models::{Achievement, Game};

/// How to interpret the filter text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchType {
    Literal,
    Regex,
}

impl SearchType {
    pub fn toggle(&self) -> Self {
        match self {
            Self::Literal => Self::Regex,
            Self::Regex => Self::Literal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Literal => "Literal",
            Self::Regex => "Regex",
        }
    }
}

/// Case-insensitive name filter for the games list.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub query: String,
    pub search_type: SearchType,
    compiled_regex: Option<Regex>,
    pub regex_error: Option<String>,
}

impl SearchQuery {
    pub fn new(query: String, search_type: SearchType) -> Self {
        let (compiled_regex, regex_error) = match search_type {
            SearchType::Regex => match RegexBuilder::new(&query).case_insensitive(true).build() {
                Ok(re) => (Some(re), None),
                Err(e) => (None, Some(format!("Regex error: {}", e))),
            },
            SearchType::Literal => (None, None),
        };

        Self {
            query,
            search_type,
            compiled_regex,
            regex_error,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_empty()
    }

    pub fn matches(&self, text: &str) -> bool {
        if self.is_empty() {
            return true;
        }
        match self.search_type {
            SearchType::Literal => text.to_lowercase().contains(&self.query.to_lowercase()),
            SearchType::Regex => self
                .compiled_regex
                .as_ref()
                .is_some_and(|re| re.is_match(text)),
        }
    }

    /// Indices of the games whose name matches, in list order.
    pub fn filter_games(&self, games: &[Game]) -> Vec<usize> {
        games
            .iter()
            .enumerate()
            .filter(|(_, g)| self.matches(&g.name))
            .map(|(i, _)| i)
            .collect()
    }
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self::new(String::new(), SearchType::Literal)
    }
}

/// Which achievements to show for the selected game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AchievementFilter {
    #[default]
    All,
    Unlocked,
    Locked,
}

impl AchievementFilter {
    pub fn next(&self) -> Self {
        match self {
            Self::All => Self::Unlocked,
            Self::Unlocked => Self::Locked,
            Self::Locked => Self::All,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Unlocked => "Unlocked",
            Self::Locked => "Locked",
        }
    }

    pub fn matches(&self, achievement: &Achievement) -> bool {
        match self {
            Self::All => true,
            Self::Unlocked => achievement.completed,
            Self::Locked => !achievement.completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn games() -> Vec<Game> {
        ["Portal 2", "Half-Life 2", "Dota 2", "Portal"]
            .iter()
            .enumerate()
            .map(|(i, name)| Game {
                id: i as u32,
                name: name.to_string(),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn literal_filter_is_case_insensitive() {
        let query = SearchQuery::new("portal".to_string(), SearchType::Literal);
        assert_eq!(query.filter_games(&games()), vec![0, 3]);
    }

    #[test]
    fn regex_filter_and_errors() {
        let query = SearchQuery::new("^(half|dota)".to_string(), SearchType::Regex);
        assert_eq!(query.filter_games(&games()), vec![1, 2]);

        let broken = SearchQuery::new("(".to_string(), SearchType::Regex);
        assert!(broken.regex_error.is_some());
        assert!(broken.filter_games(&games()).is_empty());
    }

    #[test]
    fn empty_query_matches_everything() {
        assert_eq!(SearchQuery::default().filter_games(&games()).len(), 4);
    }

    #[test]
    fn achievement_filter_cycles() {
        let locked = Achievement {
            id: "X".into(),
            name: "X".into(),
            description: String::new(),
            completed: false,
            unlock_time: None,
        };
        assert!(AchievementFilter::All.matches(&locked));
        assert!(!AchievementFilter::Unlocked.matches(&locked));
        assert!(AchievementFilter::Locked.matches(&locked));
        assert_eq!(AchievementFilter::Locked.next(), AchievementFilter::All);
    }
}
