use anyhow::{Context, Result};
use jiff::Zoned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::api::SteamId;
use crate::internal::models::SteamProfile;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentProfile {
    pub steam_id: SteamId,
    pub username: String,
    pub viewed_at: Zoned,
}

/// Most-recent-first list of profiles opened in the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RecentProfiles {
    pub profiles: Vec<RecentProfile>,
    #[serde(skip)]
    file_path: Option<PathBuf>,
    #[serde(skip)]
    max_size: usize,
}

pub(crate) fn app_config_dir() -> Result<PathBuf> {
    let dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
        .join(env!("CARGO_PKG_NAME"));
    if !dir.exists() {
        fs::create_dir_all(&dir).context("Failed to create config directory")?;
    }
    Ok(dir)
}

impl RecentProfiles {
    pub fn new(max_size: usize) -> Self {
        Self {
            profiles: Vec::new(),
            file_path: None,
            max_size,
        }
    }

    pub fn load_or_create(max_size: usize) -> Result<Self> {
        Self::load_from(app_config_dir()?.join("recent.json"), max_size)
    }

    pub fn load_from(file_path: PathBuf, max_size: usize) -> Result<Self> {
        match file_path.exists() {
            true => {
                let content =
                    fs::read_to_string(&file_path).context("Failed to read recent profiles")?;
                let mut recent: RecentProfiles =
                    serde_json::from_str(&content).context("Failed to parse recent profiles")?;
                recent.file_path = Some(file_path);
                recent.max_size = max_size;
                recent.profiles.truncate(max_size);
                Ok(recent)
            }
            false => Ok(Self {
                profiles: Vec::new(),
                file_path: Some(file_path),
                max_size,
            }),
        }
    }

    pub fn save(&self) -> Result<()> {
        if let Some(path) = &self.file_path {
            let content = serde_json::to_string_pretty(self)
                .context("Failed to serialize recent profiles")?;
            fs::write(path, content).context("Failed to write recent profiles")?;
        }
        Ok(())
    }

    pub fn add(&mut self, profile: &SteamProfile) {
        self.profiles.retain(|p| p.steam_id != profile.steam_id);
        self.profiles.insert(
            0,
            RecentProfile {
                steam_id: profile.steam_id.clone(),
                username: profile.username.clone(),
                viewed_at: Zoned::now(),
            },
        );
        self.profiles.truncate(self.max_size);
    }

    pub fn get(&self, index: usize) -> Option<&RecentProfile> {
        self.profiles.get(index)
    }

    pub fn clear(&mut self) {
        self.profiles.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::internal::models::PersonaState;

    fn profile(id: &str, name: &str) -> SteamProfile {
        SteamProfile {
            steam_id: SteamId::parse(id).unwrap(),
            username: name.to_string(),
            avatar: String::new(),
            profile_url: String::new(),
            real_name: None,
            country: None,
            last_online: None,
            time_created: None,
            status: PersonaState::Offline,
        }
    }

    #[test]
    fn add_moves_duplicates_to_front_and_caps() {
        let mut recent = RecentProfiles::new(3);
        recent.add(&profile("76561197960287930", "gabe"));
        recent.add(&profile("76561197960287931", "robin"));
        recent.add(&profile("76561197960287930", "gabe"));
        assert_eq!(recent.profiles.len(), 2);
        assert_eq!(recent.profiles[0].username, "gabe");

        recent.add(&profile("76561197960287932", "erik"));
        recent.add(&profile("76561197960287933", "doug"));
        assert_eq!(recent.profiles.len(), 3);
        assert_eq!(recent.profiles[0].username, "doug");
        assert_eq!(recent.profiles[2].username, "gabe");
    }

    #[test]
    fn save_and_reload() {
        let path = std::env::temp_dir().join("achievement_tracker_recent_test.json");
        let _ = fs::remove_file(&path);

        let mut recent = RecentProfiles::load_from(path.clone(), 5).unwrap();
        recent.add(&profile("76561197960287930", "gabe"));
        recent.save().unwrap();

        let reloaded = RecentProfiles::load_from(path.clone(), 5).unwrap();
        assert_eq!(reloaded.profiles.len(), 1);
        assert_eq!(reloaded.get(0).map(|p| p.username.as_str()), Some("gabe"));

        let _ = fs::remove_file(path);
    }
}
