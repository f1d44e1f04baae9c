use std::fs;
use std::path::{Path, PathBuf};

use super::error::Result;
use super::supabase::Session;
use crate::internal::recent::app_config_dir;

/// The signed-in session, persisted as JSON between runs.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn default_location() -> anyhow::Result<Self> {
        Ok(Self::new(app_config_dir()?.join("session.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<Session>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(session)?)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::supabase::{User, UserMetadata};

    fn session() -> Session {
        Session {
            access_token: "token".into(),
            refresh_token: "refresh".into(),
            expires_at: Some(1_700_000_000),
            user: User {
                id: "user-1".into(),
                email: Some("steam_76561197960287930@steam.local".into()),
                user_metadata: UserMetadata {
                    steam_id: Some("76561197960287930".into()),
                    ..Default::default()
                },
            },
        }
    }

    #[test]
    fn save_load_and_clear() {
        let dir = std::env::temp_dir().join(format!("session-test-{}", std::process::id()));
        let store = SessionStore::new(dir.join("session.json"));

        assert!(store.load().unwrap().is_none());
        store.save(&session()).unwrap();
        assert_eq!(store.load().unwrap(), Some(session()));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        // Clearing twice is fine
        store.clear().unwrap();

        let _ = fs::remove_dir_all(dir);
    }
}
