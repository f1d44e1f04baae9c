use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::api::{SteamApiError, SteamClient, SteamId};
use crate::auth::{self, AuthError, Session, SessionStore, SteamAuth};
use crate::config::AppConfig;
use crate::internal::models::{Achievement, FetchState, Game, SteamProfile};
use crate::internal::notification::Notification;
use crate::internal::recent::RecentProfiles;
use crate::internal::search::{AchievementFilter, SearchQuery};
use crate::internal::stats::{AchievementStats, LibraryStats};
use crate::internal::ui::log_viewer::LogViewer;
use crate::internal::ui::sort::{SortBy, SortOrder, sort_games};
use crate::utils::theme_loader::{TuiTheme, load_theme, resolve_mode};

use ratatui::Frame;
use ratatui::widgets::ListState;
use strum::IntoEnumIterator;

pub const LOAD_ERROR: &str = "Failed to load Steam data. Please check your Steam ID and try again.";
pub const ACHIEVEMENTS_LOAD_ERROR: &str = "Failed to load achievements for this game.";

/// Application view modes.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum ViewMode {
    SteamIdInput,
    Games,
    Achievements,
    SignIn,
}

/// Input modes for the UI.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum InputMode {
    Normal,
    EditingSteamId,
    Search,
}

/// Actions/messages sent through the app action channel.
///
/// Results of background work carry the load generation they were started
/// under so that answers for a profile the user already left are dropped.
#[derive(Debug, Clone)]
pub enum Action {
    Quit,
    NavigateUp,
    NavigateDown,
    Enter,
    Back,
    LoadDashboard {
        input: String,
    },
    DashboardLoaded {
        generation: u64,
        profile: SteamProfile,
        games: Vec<Game>,
    },
    LoadFailed {
        generation: u64,
        message: String,
    },
    CountsProgress(usize),
    CountsLoaded {
        generation: u64,
        games: Vec<Game>,
    },
    LoadAchievements(Game),
    AchievementsLoaded {
        app_id: u32,
        achievements: Vec<Achievement>,
    },
    AchievementsFailed {
        app_id: u32,
        message: String,
    },
    SortBy(SortBy),
    ToggleSortOrder,
    CycleAchievementFilter,
    OpenStorePage,
    OpenProfile,
    Refresh,
    ChangeSteamId,
    SignIn,
    SignInReady(String),
    SignedIn {
        profile: SteamProfile,
        session: Session,
    },
    SignInFailed(String),
    CancelSignIn,
    SignOut,
    SessionRestored(Option<Session>),
    ToggleHelp,
    ClearRecent,
    ClearNotification,
}

pub struct App {
    pub running: bool,
    pub app_version: String,
    pub view_mode: ViewMode,
    pub input_mode: InputMode,
    pub steam_id_input: String,
    pub steam_id: Option<SteamId>,
    pub profile: Option<SteamProfile>,
    pub games: Vec<Game>,
    pub games_state: FetchState,
    pub library_stats: LibraryStats,
    pub counts_progress: Option<(usize, usize)>,
    pub game_list_state: ListState,
    pub selected_game: Option<Game>,
    pub achievements: Vec<Achievement>,
    pub achievements_state: FetchState,
    pub achievement_stats: AchievementStats,
    pub achievement_filter: AchievementFilter,
    pub achievement_list_state: ListState,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    pub search_query: SearchQuery,
    pub temp_search_input: String,
    pub recent: RecentProfiles,
    pub recent_list_state: ListState,
    pub steam: Arc<SteamClient>,
    pub auth: Option<Arc<SteamAuth>>,
    pub session: Option<Session>,
    pub sign_in_url: Option<String>,
    sign_in_cancel: Option<CancellationToken>,
    view_before_sign_in: ViewMode,
    load_generation: u64,
    pub theme: TuiTheme,
    pub notification: Option<Notification>,
    pub spinner_state: usize,
    pub last_spinner_update: Option<tokio::time::Instant>,
    pub show_help: bool,
    pub config: AppConfig,
    pub action_tx: UnboundedSender<Action>,
    pub action_rx: UnboundedReceiver<Action>,
    pub log_viewer: LogViewer,
}

impl App {
    #[tracing::instrument(skip(config))]
    pub fn new(config: AppConfig) -> Result<Self> {
        let recent = match RecentProfiles::load_or_create(config.steam.recent_limit) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!("Failed to load recent profiles: {}", e);
                RecentProfiles::new(config.steam.recent_limit)
            }
        };
        Self::with_recent(config, recent)
    }

    pub fn with_recent(config: AppConfig, recent: RecentProfiles) -> Result<Self> {
        let start = std::time::Instant::now();
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let metrics = config.logging.enable_performance_metrics;

        let steam = Arc::new(
            SteamClient::new(&config.steam, &config.network, metrics)
                .context("Failed to build Steam client")?,
        );
        if !steam.has_api_key() {
            tracing::warn!("STEAM_API_KEY is not set; dashboard loads will fail");
        }

        let auth = Self::build_auth(&config);
        let theme = Self::load_configured_theme(&config);
        let log_dir = config.logging.log_directory.as_deref().unwrap_or("logs");
        let log_viewer = LogViewer::new(log_dir);

        tracing::info!(elapsed = ?start.elapsed(), auth = auth.is_some(), "App initialized");

        let mut recent_list_state = ListState::default();
        if !recent.profiles.is_empty() {
            recent_list_state.select(Some(0));
        }

        Ok(Self {
            running: true,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            view_mode: ViewMode::SteamIdInput,
            input_mode: InputMode::EditingSteamId,
            steam_id_input: String::new(),
            steam_id: None,
            profile: None,
            games: Vec::new(),
            games_state: FetchState::Idle,
            library_stats: LibraryStats::default(),
            counts_progress: None,
            game_list_state: ListState::default(),
            selected_game: None,
            achievements: Vec::new(),
            achievements_state: FetchState::Idle,
            achievement_stats: AchievementStats::default(),
            achievement_filter: AchievementFilter::All,
            achievement_list_state: ListState::default(),
            sort_by: SortBy::Playtime,
            sort_order: SortOrder::Descending,
            search_query: SearchQuery::default(),
            temp_search_input: String::new(),
            recent,
            recent_list_state,
            steam,
            auth,
            session: None,
            sign_in_url: None,
            sign_in_cancel: None,
            view_before_sign_in: ViewMode::SteamIdInput,
            load_generation: 0,
            theme,
            notification: None,
            spinner_state: 0,
            last_spinner_update: None,
            show_help: false,
            config,
            action_tx,
            action_rx,
            log_viewer,
        })
    }

    fn build_auth(config: &AppConfig) -> Option<Arc<SteamAuth>> {
        if !config.auth_configured() {
            tracing::info!("Supabase not configured; Steam sign-in disabled");
            return None;
        }

        let client = match reqwest::Client::builder()
            .timeout(Duration::from_secs(config.network.timeout_secs))
            .build()
        {
            Ok(c) => c,
            Err(e) => {
                tracing::error!("Failed to build auth HTTP client: {}", e);
                return None;
            }
        };
        let store = match SessionStore::default_location() {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("No location for the session file: {}", e);
                return None;
            }
        };

        match SteamAuth::from_config(&config.auth, client, store) {
            Ok(a) => Some(Arc::new(a)),
            Err(e) => {
                tracing::error!("Steam sign-in unavailable: {}", e);
                None
            }
        }
    }

    /// The configured theme file, relative to the working directory or the executable.
    fn load_configured_theme(config: &AppConfig) -> TuiTheme {
        let colorfgbg = std::env::var("COLORFGBG").ok();
        let mode = resolve_mode(config.theme_mode, colorfgbg.as_deref());

        let mut candidates = vec![PathBuf::from(&config.theme_file)];
        if let Ok(exe) = std::env::current_exe()
            && let Some(dir) = exe.parent()
            && let Some(name) = Path::new(&config.theme_file).file_name()
        {
            candidates.push(dir.join("themes").join(name));
        }

        match candidates.iter().find(|p| p.exists()) {
            Some(path) => {
                match load_theme(path, mode, config.logging.enable_performance_metrics) {
                    Ok(theme) => theme,
                    Err(e) => {
                        tracing::error!("Failed to load theme '{}': {}", path.display(), e);
                        TuiTheme::default()
                    }
                }
            }
            None => {
                tracing::info!("Theme file '{}' not found; using default theme", config.theme_file);
                TuiTheme::default()
            }
        }
    }

    pub fn notify_info(&mut self, message: impl Into<String>) {
        self.notification = Some(Notification::info(message));
    }

    pub fn notify_warning(&mut self, message: impl Into<String>) {
        self.notification = Some(Notification::warning(message));
    }

    pub fn notify_error(&mut self, message: impl Into<String>) {
        self.notification = Some(Notification::error(message));
    }

    pub fn clear_notification(&mut self) {
        self.notification = None;
    }

    pub async fn run(&mut self, mut tui: crate::tui::Tui) -> Result<()> {
        let default_id = self.config.steam.default_steam_id.trim().to_string();
        if !default_id.is_empty() {
            let _ = self.action_tx.send(Action::LoadDashboard { input: default_id });
        }

        if let Some(auth) = self.auth.clone() {
            let tx = self.action_tx.clone();
            tokio::spawn(async move {
                match auth.restore_session().await {
                    Ok(session) => {
                        let _ = tx.send(Action::SessionRestored(session));
                    }
                    Err(e) => {
                        tracing::warn!("Failed to restore session: {}", e);
                    }
                }
            });
        }

        let mut event_interval = tokio::time::interval(Duration::from_millis(16));

        loop {
            let now = tokio::time::Instant::now();
            match self.last_spinner_update {
                Some(last_update) => {
                    if now.duration_since(last_update).as_millis() >= 100 {
                        self.spinner_state = self.spinner_state.wrapping_add(1);
                        self.last_spinner_update = Some(now);
                    }
                }
                None => {
                    self.last_spinner_update = Some(now);
                }
            }

            if let Some(notification) = &self.notification
                && notification.should_dismiss()
            {
                self.clear_notification();
            }

            tui.draw(|f| self.ui(f))?;

            tokio::select! {
                _ = event_interval.tick() => {
                    if event::poll(Duration::from_millis(0))?
                        && let Event::Key(key) = event::read()?
                            && key.kind == KeyEventKind::Press {
                                self.handle_key_event(key);
                            }
                }
                Some(action) = self.action_rx.recv() => {
                    self.handle_action(action).await;
                }
            }

            if !self.running {
                break;
            }
        }

        if let Some(cancel) = self.sign_in_cancel.take() {
            cancel.cancel();
        }
        Ok(())
    }

    fn send(&self, action: Action) {
        let _ = self.action_tx.send(action);
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.send(Action::Quit);
            return;
        }

        if key.code == KeyCode::Char('L') && self.input_mode != InputMode::EditingSteamId {
            self.log_viewer.toggle();
            return;
        }

        // Log viewer traps input
        if self.log_viewer.visible {
            match key.code {
                KeyCode::Esc | KeyCode::Char('q') => self.log_viewer.toggle(),
                KeyCode::Char('j') | KeyCode::Down => self.log_viewer.scroll_down(),
                KeyCode::Char('k') | KeyCode::Up => self.log_viewer.scroll_up(),
                KeyCode::Char('G') => self.log_viewer.scroll_to_bottom(),
                KeyCode::Tab => self.log_viewer.next_tab(),
                _ => {}
            }
            return;
        }

        if self.show_help {
            match key.code {
                KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') => self.show_help = false,
                _ => {}
            }
            return;
        }

        match self.input_mode {
            InputMode::EditingSteamId => self.handle_steam_id_input(key),
            InputMode::Search => self.handle_search_input(key),
            InputMode::Normal => self.handle_normal_input(key),
        }
    }

    fn handle_steam_id_input(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char(c) => self.steam_id_input.push(c),
            KeyCode::Backspace => {
                self.steam_id_input.pop();
            }
            KeyCode::Up => self.select_prev(),
            KeyCode::Down => self.select_next(),
            KeyCode::Enter => self.send(Action::Enter),
            KeyCode::Esc => self.input_mode = InputMode::Normal,
            _ => {}
        }
    }

    fn handle_search_input(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.set_search(self.search_query.search_type.toggle());
            }
            KeyCode::F(3) => {
                self.set_search(self.search_query.search_type.toggle());
            }
            KeyCode::Char(c) => {
                self.temp_search_input.push(c);
                self.set_search(self.search_query.search_type);
            }
            KeyCode::Backspace => {
                self.temp_search_input.pop();
                self.set_search(self.search_query.search_type);
            }
            KeyCode::Enter => {
                self.input_mode = InputMode::Normal;
            }
            KeyCode::Esc => {
                self.temp_search_input.clear();
                self.search_query = SearchQuery::default();
                self.reset_game_selection();
                self.input_mode = InputMode::Normal;
            }
            _ => {}
        }
    }

    fn set_search(&mut self, search_type: crate::internal::search::SearchType) {
        self.search_query = SearchQuery::new(self.temp_search_input.clone(), search_type);
        self.reset_game_selection();
    }

    fn handle_normal_input(&mut self, key: KeyEvent) {
        // Keys shared by every view
        match key.code {
            KeyCode::Char('q') => return self.send(Action::Quit),
            KeyCode::Char('?') => return self.send(Action::ToggleHelp),
            KeyCode::Char('j') | KeyCode::Down => return self.send(Action::NavigateDown),
            KeyCode::Char('k') | KeyCode::Up => return self.send(Action::NavigateUp),
            KeyCode::Enter => return self.send(Action::Enter),
            KeyCode::Esc | KeyCode::Backspace => return self.send(Action::Back),
            _ => {}
        }

        match self.view_mode {
            ViewMode::SteamIdInput => match key.code {
                KeyCode::Char('i') | KeyCode::Char('e') => {
                    self.input_mode = InputMode::EditingSteamId;
                }
                KeyCode::Char('l') => self.send(Action::SignIn),
                KeyCode::Char('x') => self.send(Action::SignOut),
                KeyCode::Char('D') => self.send(Action::ClearRecent),
                _ => {}
            },
            ViewMode::Games => match key.code {
                KeyCode::Char(c @ '1'..='9') => {
                    let index = c as usize - '1' as usize;
                    if let Some(sort_by) = SortBy::iter().nth(index) {
                        self.send(Action::SortBy(sort_by));
                    }
                }
                KeyCode::Char('r') => self.send(Action::ToggleSortOrder),
                KeyCode::Char('/') => {
                    self.input_mode = InputMode::Search;
                    self.temp_search_input = self.search_query.query.clone();
                }
                KeyCode::Char('o') => self.send(Action::OpenStorePage),
                KeyCode::Char('p') => self.send(Action::OpenProfile),
                KeyCode::Char('R') => self.send(Action::Refresh),
                KeyCode::Char('c') => self.send(Action::ChangeSteamId),
                KeyCode::Char('l') => self.send(Action::SignIn),
                KeyCode::Char('x') => self.send(Action::SignOut),
                _ => {}
            },
            ViewMode::Achievements => match key.code {
                KeyCode::Char('f') => self.send(Action::CycleAchievementFilter),
                KeyCode::Char('o') => self.send(Action::OpenStorePage),
                KeyCode::Char('p') => self.send(Action::OpenProfile),
                KeyCode::Char('R') => self.send(Action::Refresh),
                KeyCode::Char('c') => self.send(Action::ChangeSteamId),
                _ => {}
            },
            ViewMode::SignIn => {
                if key.code == KeyCode::Char('o')
                    && let Some(url) = self.sign_in_url.clone()
                {
                    self.open_url(&url);
                }
            }
        }
    }

    #[tracing::instrument(skip(self, action))]
    async fn handle_action(&mut self, action: Action) {
        match action {
            Action::Quit => self.running = false,
            Action::NavigateUp => self.select_prev(),
            Action::NavigateDown => self.select_next(),
            Action::Enter => match self.view_mode {
                ViewMode::SteamIdInput => {
                    let input = match self.steam_id_input.trim() {
                        "" => self
                            .recent_list_state
                            .selected()
                            .and_then(|i| self.recent.get(i))
                            .map(|r| r.steam_id.to_string()),
                        typed => Some(typed.to_string()),
                    };
                    match input {
                        Some(input) => self.send(Action::LoadDashboard { input }),
                        None => self.notify_warning("Enter a Steam ID, profile URL or vanity name"),
                    }
                }
                ViewMode::Games => {
                    if let Some(game) = self.selected_game_index().map(|i| self.games[i].clone()) {
                        self.send(Action::LoadAchievements(game));
                    }
                }
                _ => {}
            },
            Action::Back => match self.view_mode {
                ViewMode::Achievements => {
                    self.view_mode = ViewMode::Games;
                    self.selected_game = None;
                    self.achievements.clear();
                    self.achievements_state = FetchState::Idle;
                    self.achievement_list_state = ListState::default();
                }
                ViewMode::Games => {
                    if !self.search_query.is_empty() {
                        self.search_query = SearchQuery::default();
                        self.temp_search_input.clear();
                        self.reset_game_selection();
                    }
                }
                ViewMode::SignIn => self.send(Action::CancelSignIn),
                ViewMode::SteamIdInput => {
                    self.input_mode = InputMode::EditingSteamId;
                }
            },
            Action::LoadDashboard { input } => self.load_dashboard(input),
            Action::DashboardLoaded {
                generation,
                profile,
                games,
            } => {
                if generation != self.load_generation {
                    tracing::debug!(generation, "Dropping stale dashboard result");
                    return;
                }
                self.on_dashboard_loaded(profile, games);
            }
            Action::LoadFailed {
                generation,
                message,
            } => {
                if generation != self.load_generation {
                    return;
                }
                self.games_state = FetchState::Failed(message.clone());
                self.counts_progress = None;
                self.notify_error(message);
                if self.profile.is_none() {
                    self.view_mode = ViewMode::SteamIdInput;
                    self.input_mode = InputMode::EditingSteamId;
                }
            }
            Action::CountsProgress(done) => {
                if let Some((_, total)) = self.counts_progress {
                    self.counts_progress = Some((done.min(total), total));
                }
            }
            Action::CountsLoaded { generation, games } => {
                if generation != self.load_generation {
                    return;
                }
                self.counts_progress = None;
                if let Some(selected) = &self.selected_game
                    && let Some(updated) = games.iter().find(|g| g.id == selected.id)
                    && updated.achievements > 0
                {
                    self.selected_game = Some(updated.clone());
                }
                self.set_games(games);
            }
            Action::LoadAchievements(game) => self.load_achievements(game),
            Action::AchievementsLoaded {
                app_id,
                achievements,
            } => {
                if self.selected_game.as_ref().map(|g| g.id) != Some(app_id) {
                    return;
                }
                self.on_achievements_loaded(app_id, achievements);
            }
            Action::AchievementsFailed { app_id, message } => {
                if self.selected_game.as_ref().map(|g| g.id) != Some(app_id) {
                    return;
                }
                self.achievements_state = FetchState::Failed(message.clone());
                self.notify_error(message);
            }
            Action::SortBy(sort_by) => {
                self.sort_by = sort_by;
                let games = std::mem::take(&mut self.games);
                self.set_games(games);
            }
            Action::ToggleSortOrder => {
                self.sort_order = self.sort_order.toggle();
                let games = std::mem::take(&mut self.games);
                self.set_games(games);
            }
            Action::CycleAchievementFilter => {
                self.achievement_filter = self.achievement_filter.next();
                self.reset_achievement_selection();
            }
            Action::OpenStorePage => {
                let game = match self.view_mode {
                    ViewMode::Achievements => self.selected_game.clone(),
                    _ => self.selected_game_index().map(|i| self.games[i].clone()),
                };
                if let Some(game) = game {
                    self.open_url(&game.store_url());
                }
            }
            Action::OpenProfile => {
                if let Some(url) = self.profile.as_ref().map(|p| p.profile_url.clone()) {
                    self.open_url(&url);
                }
            }
            Action::Refresh => {
                if let Some(id) = self.steam_id.clone() {
                    // Before either load starts, so neither is served from cache
                    self.steam.invalidate(&id);
                    self.send(Action::LoadDashboard { input: id.to_string() });
                    if self.view_mode == ViewMode::Achievements
                        && let Some(game) = self.selected_game.clone()
                    {
                        self.send(Action::LoadAchievements(game));
                    }
                }
            }
            Action::ChangeSteamId => self.reset_dashboard(),
            Action::SignIn => self.start_sign_in(),
            Action::SignInReady(url) => {
                self.sign_in_url = Some(url.clone());
                self.open_url(&url);
            }
            Action::SignedIn { profile, session } => {
                self.finish_sign_in();
                self.session = Some(session);
                self.notify_info(format!("Signed in as {}", profile.username));

                // Remember the account so the next start opens its dashboard
                self.config.steam.default_steam_id = profile.steam_id.to_string();
                self.config.save();

                let id = profile.steam_id.to_string();
                self.send(Action::LoadDashboard { input: id });
            }
            Action::SignInFailed(message) => {
                self.finish_sign_in();
                self.notify_error(message);
            }
            Action::CancelSignIn => {
                if let Some(cancel) = &self.sign_in_cancel {
                    cancel.cancel();
                }
            }
            Action::SignOut => self.sign_out(),
            Action::SessionRestored(session) => {
                let id = session.as_ref().and_then(auth::current_steam_id);
                self.session = session;
                if let Some(id) = id
                    && self.steam_id.is_none()
                    && self.games_state != FetchState::Loading
                {
                    self.send(Action::LoadDashboard { input: id.to_string() });
                }
            }
            Action::ToggleHelp => self.show_help = !self.show_help,
            Action::ClearRecent => {
                self.recent.clear();
                self.recent_list_state.select(None);
                if let Err(e) = self.recent.save() {
                    tracing::error!("Failed to save recent profiles: {}", e);
                }
            }
            Action::ClearNotification => self.clear_notification(),
        }
    }

    fn load_dashboard(&mut self, input: String) {
        let input = input.trim().to_string();
        if input.is_empty() {
            self.notify_warning("Enter a Steam ID, profile URL or vanity name");
            return;
        }
        if !self.steam.has_api_key() {
            self.notify_error(SteamApiError::MissingApiKey.to_string());
            return;
        }

        self.load_generation += 1;
        let generation = self.load_generation;
        self.games_state = FetchState::Loading;
        self.input_mode = InputMode::Normal;

        let steam = self.steam.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let result: crate::api::Result<(SteamProfile, Vec<Game>)> = async {
                let id = steam.resolve_steam_id(&input).await?;
                let profile = steam.fetch_profile(&id).await?;
                let games = steam.fetch_owned_games(&id).await?;
                Ok((profile, games))
            }
            .await;

            let _ = match result {
                Ok((profile, games)) => tx.send(Action::DashboardLoaded {
                    generation,
                    profile,
                    games,
                }),
                Err(e) => {
                    tracing::error!(error = %e, "Dashboard load failed");
                    tx.send(Action::LoadFailed {
                        generation,
                        message: load_error_message(&e),
                    })
                }
            };
        });
    }

    fn on_dashboard_loaded(&mut self, profile: SteamProfile, games: Vec<Game>) {
        let same_profile = self.steam_id.as_ref() == Some(&profile.steam_id);
        self.games_state = FetchState::Loaded;
        self.steam_id = Some(profile.steam_id.clone());
        self.steam_id_input.clear();

        self.recent.add(&profile);
        self.recent_list_state.select(Some(0));
        if let Err(e) = self.recent.save() {
            tracing::error!("Failed to save recent profiles: {}", e);
        }
        tracing::info!(steam_id = %profile.steam_id, games = games.len(), "Dashboard loaded");
        self.profile = Some(profile);

        if !same_profile {
            self.view_mode = ViewMode::Games;
            self.game_list_state = ListState::default();
        }
        self.set_games(games.clone());
        if self.game_list_state.selected().is_none() && !self.games.is_empty() {
            self.game_list_state.select(Some(0));
        }

        self.start_achievement_counts(games);
    }

    fn start_achievement_counts(&mut self, games: Vec<Game>) {
        let Some(steam_id) = self.steam_id.clone() else {
            return;
        };
        if games.is_empty() {
            return;
        }

        self.counts_progress = Some((0, games.len()));
        let generation = self.load_generation;
        let steam = self.steam.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let progress_tx = tx.clone();
            let games = steam
                .fetch_achievement_counts(&steam_id, games, move |done| {
                    let _ = progress_tx.send(Action::CountsProgress(done));
                })
                .await;
            let _ = tx.send(Action::CountsLoaded { generation, games });
        });
    }

    fn load_achievements(&mut self, game: Game) {
        let Some(steam_id) = self.steam_id.clone() else {
            return;
        };

        let app_id = game.id;
        self.selected_game = Some(game);
        self.view_mode = ViewMode::Achievements;
        self.achievements_state = FetchState::Loading;

        let steam = self.steam.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            match steam.fetch_achievements(&steam_id, app_id).await {
                Ok(achievements) => {
                    let _ = tx.send(Action::AchievementsLoaded {
                        app_id,
                        achievements,
                    });
                }
                Err(e) => {
                    tracing::warn!(app_id, error = %e, "Failed to load achievements");
                    let message = match e {
                        SteamApiError::MissingApiKey => e.to_string(),
                        _ => ACHIEVEMENTS_LOAD_ERROR.to_string(),
                    };
                    let _ = tx.send(Action::AchievementsFailed { app_id, message });
                }
            }
        });
    }

    fn on_achievements_loaded(&mut self, app_id: u32, achievements: Vec<Achievement>) {
        self.achievement_stats = AchievementStats::from_achievements(&achievements);
        self.achievements = achievements;
        self.achievements_state = FetchState::Loaded;

        // Counts may still be in flight; fill this game in from the full list
        let (total, unlocked) = (
            self.achievement_stats.total as u32,
            self.achievement_stats.unlocked as u32,
        );
        if let Some(game) = self.selected_game.as_mut() {
            game.achievements = total;
            game.completed = unlocked;
        }
        if let Some(game) = self.games.iter_mut().find(|g| g.id == app_id)
            && (game.achievements, game.completed) != (total, unlocked)
        {
            game.achievements = total;
            game.completed = unlocked;
            self.library_stats = LibraryStats::from_games(&self.games);
        }

        self.reset_achievement_selection();
    }

    /// Replace the games list, keeping the highlighted game selected.
    fn set_games(&mut self, mut games: Vec<Game>) {
        let selected_id = self.selected_game_index().map(|i| self.games[i].id);
        sort_games(&mut games, self.sort_by, self.sort_order);
        self.library_stats = LibraryStats::from_games(&games);
        self.games = games;

        let displayed = self.displayed_game_indices();
        let position = selected_id
            .and_then(|id| displayed.iter().position(|&i| self.games[i].id == id))
            .or(match displayed.is_empty() {
                true => None,
                false => Some(0),
            });
        self.game_list_state.select(position);
    }

    fn reset_game_selection(&mut self) {
        let selection = match self.displayed_game_indices().is_empty() {
            true => None,
            false => Some(0),
        };
        self.game_list_state.select(selection);
    }

    fn reset_achievement_selection(&mut self) {
        let empty = self.displayed_achievements().is_empty();
        self.achievement_list_state
            .select(if empty { None } else { Some(0) });
    }

    /// Back to the landing screen with nothing loaded.
    fn reset_dashboard(&mut self) {
        self.load_generation += 1;
        self.steam_id = None;
        self.profile = None;
        self.games.clear();
        self.games_state = FetchState::Idle;
        self.library_stats = LibraryStats::default();
        self.counts_progress = None;
        self.game_list_state = ListState::default();
        self.selected_game = None;
        self.achievements.clear();
        self.achievements_state = FetchState::Idle;
        self.achievement_stats = AchievementStats::default();
        self.achievement_filter = AchievementFilter::All;
        self.achievement_list_state = ListState::default();
        self.search_query = SearchQuery::default();
        self.temp_search_input.clear();
        self.steam_id_input.clear();
        self.view_mode = ViewMode::SteamIdInput;
        self.input_mode = InputMode::EditingSteamId;
    }

    fn start_sign_in(&mut self) {
        let Some(auth) = self.auth.clone() else {
            self.notify_warning("Steam sign-in is not configured (set SUPABASE_URL and SUPABASE_ANON_KEY)");
            return;
        };
        if self.sign_in_cancel.is_some() {
            return;
        }

        let cancel = CancellationToken::new();
        self.sign_in_cancel = Some(cancel.clone());
        self.sign_in_url = None;
        self.view_before_sign_in = self.view_mode;
        self.view_mode = ViewMode::SignIn;
        self.input_mode = InputMode::Normal;

        let steam = self.steam.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let result: auth::Result<(SteamProfile, Session)> = async {
                let pending = auth.begin_sign_in().await?;
                let _ = tx.send(Action::SignInReady(pending.login_url.to_string()));
                auth.complete_sign_in(pending, &steam, cancel).await
            }
            .await;

            let _ = match result {
                Ok((profile, session)) => tx.send(Action::SignedIn { profile, session }),
                Err(AuthError::Cancelled) => tx.send(Action::SignInFailed(
                    "Steam sign-in was cancelled".to_string(),
                )),
                Err(e) => {
                    tracing::error!(error = %e, "Steam sign-in failed");
                    tx.send(Action::SignInFailed(format!("Sign-in failed: {}", e)))
                }
            };
        });
    }

    fn finish_sign_in(&mut self) {
        self.sign_in_cancel = None;
        self.sign_in_url = None;
        if self.view_mode == ViewMode::SignIn {
            self.view_mode = self.view_before_sign_in;
            if self.view_mode == ViewMode::SteamIdInput {
                self.input_mode = InputMode::EditingSteamId;
            }
        }
    }

    fn sign_out(&mut self) {
        let Some(session) = self.session.take() else {
            self.notify_info("Not signed in");
            return;
        };
        let Some(auth) = self.auth.clone() else {
            return;
        };

        tokio::spawn(async move {
            if let Err(e) = auth.sign_out(&session).await {
                tracing::error!("Failed to clear session: {}", e);
            }
        });
        self.notify_info("Signed out");
    }

    fn open_url(&mut self, url: &str) {
        if let Err(e) = open::that(url) {
            tracing::error!(url, error = %e, "Failed to open browser");
            self.notify_error(format!("Could not open browser: {}", e));
        }
    }

    /// Indices into `games` of the rows currently shown, in display order.
    pub fn displayed_game_indices(&self) -> Vec<usize> {
        self.search_query.filter_games(&self.games)
    }

    /// Index into `games` of the highlighted row.
    pub fn selected_game_index(&self) -> Option<usize> {
        let displayed = self.displayed_game_indices();
        self.game_list_state
            .selected()
            .and_then(|row| displayed.get(row).copied())
    }

    pub fn displayed_achievements(&self) -> Vec<&Achievement> {
        self.achievements
            .iter()
            .filter(|a| self.achievement_filter.matches(a))
            .collect()
    }

    fn list_len_and_state(&mut self) -> (usize, &mut ListState) {
        let len = match self.view_mode {
            ViewMode::Games => self.displayed_game_indices().len(),
            ViewMode::Achievements => self.displayed_achievements().len(),
            ViewMode::SteamIdInput | ViewMode::SignIn => self.recent.profiles.len(),
        };
        let state = match self.view_mode {
            ViewMode::Games => &mut self.game_list_state,
            ViewMode::Achievements => &mut self.achievement_list_state,
            ViewMode::SteamIdInput | ViewMode::SignIn => &mut self.recent_list_state,
        };
        (len, state)
    }

    fn select_next(&mut self) {
        let (len, state) = self.list_len_and_state();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        state.select(Some(i));
    }

    fn select_prev(&mut self) {
        let (len, state) = self.list_len_and_state();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(0) | None => len - 1,
            Some(i) => (i - 1).min(len - 1),
        };
        state.select(Some(i));
    }

    pub fn get_spinner_char(&self) -> &'static str {
        const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
        SPINNER_FRAMES[self.spinner_state % SPINNER_FRAMES.len()]
    }

    pub fn loading_description(&self) -> Option<String> {
        match (
            &self.games_state,
            &self.achievements_state,
            self.counts_progress,
            self.view_mode,
        ) {
            (FetchState::Loading, _, _, _) => Some("Loading Steam profile...".to_string()),
            (_, FetchState::Loading, _, ViewMode::Achievements) => {
                Some("Loading achievements...".to_string())
            }
            (_, _, Some((done, total)), _) => {
                Some(format!("Counting achievements {}/{}", done, total))
            }
            (_, _, _, ViewMode::SignIn) => Some("Waiting for Steam sign-in...".to_string()),
            _ => None,
        }
    }

    pub fn signed_in_as(&self) -> Option<String> {
        let session = self.session.as_ref()?;
        let metadata = &session.user.user_metadata;
        metadata
            .username
            .clone()
            .or_else(|| auth::current_steam_id(session).map(|id| id.to_string()))
    }

    pub fn ui(&mut self, f: &mut Frame) {
        super::view::draw(self, f);
    }
}

/// User-facing text for a failed dashboard load. Input problems are
/// reported as such; everything else gets the generic message.
pub fn load_error_message(err: &SteamApiError) -> String {
    match err {
        SteamApiError::MissingApiKey => err.to_string(),
        e if e.is_user_error() => e.to_string(),
        _ => LOAD_ERROR.to_string(),
    }
}
