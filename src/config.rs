use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemeMode {
    #[default]
    Auto,
    Dark,
    Light,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    /// Path to a theme JSON file with dark/light variants.
    pub theme_file: String,
    /// Which variant of the theme to use. `Auto` inspects `COLORFGBG`.
    pub theme_mode: ThemeMode,
    pub steam: SteamConfig,
    pub auth: AuthConfig,
    pub network: NetworkConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SteamConfig {
    /// Steam Web API key. `STEAM_API_KEY` overrides it.
    pub api_key: String,
    pub api_base_url: String,
    /// Loaded on startup when set. Updated after a successful sign-in.
    pub default_steam_id: String,
    pub recent_limit: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AuthConfig {
    /// Supabase project URL. `SUPABASE_URL` overrides it.
    pub supabase_url: String,
    /// Supabase anon key. `SUPABASE_ANON_KEY` overrides it.
    pub supabase_anon_key: String,
    pub openid_endpoint: String,
    /// Loopback port the browser is redirected to after Steam sign-in.
    pub callback_port: u16,
    pub callback_timeout_secs: u64,
    /// Mixed into the derived Supabase password. Changing it locks out existing users.
    pub password_secret: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct NetworkConfig {
    pub timeout_secs: u64,
    pub max_concurrent_requests: usize,
    pub cache_ttl_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub module_levels: HashMap<String, String>,
    pub log_directory: Option<String>,
    pub enable_performance_metrics: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            theme_file: "./themes/flexoki.json".to_string(),
            theme_mode: ThemeMode::Auto,
            steam: SteamConfig::default(),
            auth: AuthConfig::default(),
            network: NetworkConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for SteamConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base_url: "https://api.steampowered.com".to_string(),
            default_steam_id: String::new(),
            recent_limit: 10,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            openid_endpoint: crate::auth::openid::STEAM_OPENID_URL.to_string(),
            callback_port: 47615,
            callback_timeout_secs: 300,
            password_secret: "achievement-tracker".to_string(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            max_concurrent_requests: 8,
            cache_ttl_secs: 300,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            module_levels: HashMap::new(),
            log_directory: None,
            enable_performance_metrics: false,
        }
    }
}

impl LoggingConfig {
    /// `EnvFilter` directive string, e.g. `info,reqwest=warn`.
    pub fn filter_directives(&self) -> String {
        let mut filter = self.level.clone();
        let mut modules: Vec<_> = self.module_levels.iter().collect();
        modules.sort();
        for (module, level) in modules {
            filter.push_str(&format!(",{}={}", module, level));
        }
        filter
    }
}

impl AppConfig {
    pub fn load() -> Self {
        let mut config = Self::load_file();
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    fn load_file() -> Self {
        // config.ron in the working directory, then next to the executable
        let mut candidates = vec![PathBuf::from("config.ron")];
        if let Ok(exe) = std::env::current_exe()
            && let Some(dir) = exe.parent()
        {
            candidates.push(dir.join("config.ron"));
        }

        for path in candidates {
            if path.exists()
                && let Ok(content) = fs::read_to_string(&path)
            {
                match ron::from_str::<AppConfig>(&content) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::error!("Failed to parse config at {}: {}", path.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Self::default()
    }

    /// Secrets usually come from the environment rather than the config file.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("STEAM_API_KEY") {
            self.steam.api_key = key;
        }
        if let Some(url) = non_empty("SUPABASE_URL") {
            self.auth.supabase_url = url;
        }
        if let Some(key) = non_empty("SUPABASE_ANON_KEY") {
            self.auth.supabase_anon_key = key;
        }
    }

    pub fn auth_configured(&self) -> bool {
        !self.auth.supabase_url.is_empty() && !self.auth.supabase_anon_key.is_empty()
    }

    pub fn save(&self) {
        self.save_to(PathBuf::from("config.ron"));
    }

    /// Write the config. An existing file is updated in place so comments
    /// survive; secrets taken from the environment are never written back.
    pub fn save_to(&self, path: PathBuf) {
        let existing_content = fs::read_to_string(&path).unwrap_or_default();

        if existing_content.is_empty() {
            let mut persisted = self.clone();
            persisted.steam.api_key.clear();
            persisted.auth.supabase_anon_key.clear();

            let pretty = ron::ser::PrettyConfig::default().depth_limit(3);
            match ron::ser::to_string_pretty(&persisted, pretty) {
                Ok(content) => {
                    if let Err(e) = fs::write(&path, content) {
                        tracing::error!("Failed to write config to {}: {}", path.display(), e);
                    } else {
                        tracing::info!("Saved config to {}", path.display());
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to serialize config: {}", e);
                }
            }
            return;
        }

        let mut new_content = existing_content.clone();

        let replace_str = |content: &mut String, key: &str, value: &str| -> bool {
            let re = match RegexBuilder::new(&format!(r#"(\s*{}\s*:\s*)"[^"]*""#, regex::escape(key)))
                .build()
            {
                Ok(re) => re,
                Err(e) => {
                    tracing::error!("Invalid config key pattern for {}: {}", key, e);
                    return false;
                }
            };
            let found = re.is_match(content);
            *content = re
                .replace_all(content, format!(r#"${{1}}"{}""#, value))
                .to_string();
            found
        };

        if !replace_str(
            &mut new_content,
            "default_steam_id",
            &self.steam.default_steam_id,
        ) {
            tracing::warn!(
                "default_steam_id not present in {}; add it to remember the signed-in account",
                path.display()
            );
        }

        if let Err(e) = fs::write(&path, new_content) {
            tracing::error!("Failed to update config at {}: {}", path.display(), e);
        } else {
            tracing::info!("Updated config at {} (preserving comments)", path.display());
        }
    }
}
