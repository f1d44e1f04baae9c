use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, Padding, Paragraph, Wrap},
};

use super::app::{App, InputMode, ViewMode};
use crate::internal::models::{FetchState, Game};
use crate::internal::notification::NotificationType;
use crate::utils::datetime::{format_date, format_playtime, format_relative};

#[tracing::instrument(skip(app, f))]
pub fn draw(app: &mut App, f: &mut Frame) {
    let start = std::time::Instant::now();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(f.area());

    render_top_bar(app, f, chunks[0]);

    let view_start = std::time::Instant::now();
    let view = match app.view_mode {
        ViewMode::SteamIdInput => {
            render_steam_id_input(app, f, chunks[1]);
            "input"
        }
        ViewMode::Games => {
            render_dashboard(app, f, chunks[1]);
            "games"
        }
        ViewMode::Achievements => {
            render_achievements(app, f, chunks[1]);
            "achievements"
        }
        ViewMode::SignIn => {
            render_sign_in(app, f, chunks[1]);
            "sign_in"
        }
    };
    if app.config.logging.enable_performance_metrics && cfg!(debug_assertions) {
        tracing::debug!(elapsed = ?view_start.elapsed(), view, "render.view");
    }

    render_status_bar(app, f, chunks[2]);

    if app.input_mode == InputMode::Search {
        render_search_overlay(app, f);
    }

    if app.notification.is_some() {
        render_notification(app, f);
    }

    if app.show_help {
        render_help_overlay(app, f);
    }

    if app.log_viewer.visible {
        app.log_viewer.render(f, f.area());
    }

    if app.config.logging.enable_performance_metrics && cfg!(debug_assertions) {
        tracing::debug!(elapsed = ?start.elapsed(), "render.draw");
    }
}

/// Wrap an achievement description to `width` columns.
pub fn wrap_description(text: &str, width: usize) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    textwrap::wrap(text, width.max(1))
        .into_iter()
        .map(|line| line.into_owned())
        .collect()
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(2));
    Rect::new(
        area.x + (area.width.saturating_sub(width)) / 2,
        area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    )
}

fn panel<'a>(app: &App, title: impl Into<Line<'a>>) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.border))
        .title(title)
        .padding(Padding::horizontal(1))
        .style(Style::default().bg(app.theme.background))
}

fn render_top_bar(app: &App, f: &mut Frame, area: Rect) {
    let account = match app.signed_in_as() {
        Some(name) => format!("Signed in: {}", name),
        None => "Not signed in".to_string(),
    };
    let text = format!("Steam Achievement Tracker v{}  {}", app.app_version, account);

    let p = Paragraph::new(text)
        .alignment(Alignment::Right)
        .block(Block::default().style(Style::default().bg(app.theme.background)))
        .style(Style::default().fg(app.theme.foreground));
    f.render_widget(p, area);
}

fn render_steam_id_input(app: &mut App, f: &mut Frame, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Min(0),
        ])
        .split(area);

    let editing = app.input_mode == InputMode::EditingSteamId;
    let cursor = if editing { "█" } else { "" };
    let border_color = if editing {
        app.theme.selection_bg
    } else {
        app.theme.border
    };
    let input = Paragraph::new(format!("{}{}", app.steam_id_input, cursor))
        .style(Style::default().fg(app.theme.foreground))
        .block(
            panel(app, " Steam ID, profile URL or vanity name ")
                .border_style(Style::default().fg(border_color)),
        );
    f.render_widget(input, chunks[0]);

    let muted = Style::default().fg(app.theme.muted);
    let mut hints = vec![Line::from(Span::styled(
        "Find your 17-digit ID at steamcommunity.com/my/profile or paste the profile link.",
        muted,
    ))];
    hints.push(Line::from(Span::styled(
        match app.auth.is_some() {
            true => "Press Esc then l to sign in through Steam instead.",
            false => "Steam sign-in is unavailable until Supabase is configured.",
        },
        muted,
    )));
    if let FetchState::Failed(message) = &app.games_state {
        hints.push(Line::from(Span::styled(
            message.clone(),
            Style::default().fg(Color::Red),
        )));
    }
    f.render_widget(
        Paragraph::new(hints)
            .wrap(Wrap { trim: true })
            .block(Block::default().padding(Padding::horizontal(1))),
        chunks[1],
    );

    let items: Vec<ListItem> = app
        .recent
        .profiles
        .iter()
        .map(|p| {
            ListItem::new(Line::from(vec![
                Span::styled(p.username.clone(), Style::default().fg(app.theme.foreground)),
                Span::styled(format!("  {}", p.steam_id), Style::default().fg(app.theme.muted)),
            ]))
        })
        .collect();

    let title = match items.len() {
        0 => " Recent profiles (none yet) ".to_string(),
        n => format!(" Recent profiles ({}) ", n),
    };
    let list = List::new(items)
        .block(panel(app, title))
        .highlight_style(
            Style::default()
                .bg(app.theme.selection_bg)
                .fg(app.theme.selection_fg)
                .add_modifier(Modifier::BOLD),
        );
    f.render_stateful_widget(list, chunks[2], &mut app.recent_list_state);
}

fn render_dashboard(app: &mut App, f: &mut Frame, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Length(5),
            Constraint::Min(0),
        ])
        .split(area);

    render_profile_header(app, f, chunks[0]);
    render_library_stats(app, f, chunks[1]);
    render_games_list(app, f, chunks[2]);
}

fn render_profile_header(app: &App, f: &mut Frame, area: Rect) {
    let Some(profile) = &app.profile else {
        f.render_widget(panel(app, " Profile "), area);
        return;
    };

    let muted = Style::default().fg(app.theme.muted);
    let mut first = vec![
        Span::styled(
            profile.username.clone(),
            Style::default()
                .fg(app.theme.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("  {}", profile.status), muted),
    ];
    if let Some(real_name) = &profile.real_name {
        first.push(Span::styled(format!("  {}", real_name), muted));
    }
    if let Some(country) = &profile.country {
        first.push(Span::styled(format!("  [{}]", country), muted));
    }

    let mut details = vec![format!("Steam ID {}", profile.steam_id)];
    if let Some(created) = &profile.time_created {
        details.push(format!("member since {}", format_date(created)));
    }
    if let Some(last_online) = &profile.last_online {
        details.push(format!("last online {}", format_relative(last_online)));
    }

    let lines = vec![
        Line::from(first),
        Line::from(Span::styled(details.join(" | "), muted)),
        Line::from(Span::styled(profile.profile_url.clone(), muted)),
    ];
    f.render_widget(Paragraph::new(lines).block(panel(app, " Profile ")), area);
}

fn render_library_stats(app: &App, f: &mut Frame, area: Rect) {
    let stats = &app.library_stats;
    let block = panel(app, " Overview ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(inner);

    let value = Style::default()
        .fg(app.theme.foreground)
        .add_modifier(Modifier::BOLD);
    let label = Style::default().fg(app.theme.muted);
    let line = |pairs: Vec<(String, &'static str)>| {
        let mut spans = Vec::new();
        for (v, l) in pairs {
            spans.push(Span::styled(v, value));
            spans.push(Span::styled(format!(" {}   ", l), label));
        }
        Line::from(spans)
    };

    f.render_widget(
        Paragraph::new(line(vec![
            (stats.total_games.to_string(), "games"),
            (stats.games_with_achievements.to_string(), "with achievements"),
            (stats.perfect_games.to_string(), "perfect"),
            (
                format_playtime(stats.total_playtime_minutes),
                "played",
            ),
        ])),
        rows[0],
    );
    f.render_widget(
        Paragraph::new(line(vec![(
            format!(
                "{}/{}",
                stats.unlocked_achievements, stats.total_achievements
            ),
            "achievements unlocked",
        )])),
        rows[1],
    );

    let (gauge_label, percent) = match app.counts_progress {
        Some((done, total)) => (
            format!("Counting achievements {}/{}", done, total),
            match total {
                0 => 0,
                t => (done * 100 / t) as u16,
            },
        ),
        None => (
            format!("{}% average completion", stats.average_completion),
            stats.average_completion.min(100) as u16,
        ),
    };
    let gauge = Gauge::default()
        .gauge_style(
            Style::default()
                .fg(app.theme.unlocked)
                .bg(app.theme.background),
        )
        .label(gauge_label)
        .percent(percent);
    f.render_widget(gauge, rows[2]);
}

fn completion_span(app: &App, game: &Game) -> Span<'static> {
    match (game.achievements, app.counts_progress.is_some()) {
        (0, true) => Span::styled("…", Style::default().fg(app.theme.muted)),
        (0, false) => Span::styled("no achievements", Style::default().fg(app.theme.muted)),
        (total, _) => {
            let color = match game.is_perfect() {
                true => app.theme.unlocked,
                false => app.theme.foreground,
            };
            let marker = if game.is_perfect() { " ★" } else { "" };
            Span::styled(
                format!(
                    "{}/{} ({}%){}",
                    game.completed,
                    total,
                    game.completion_percent(),
                    marker
                ),
                Style::default().fg(color),
            )
        }
    }
}

fn render_games_list(app: &mut App, f: &mut Frame, area: Rect) {
    let displayed = app.displayed_game_indices();
    let muted = Style::default().fg(app.theme.muted);

    let items: Vec<ListItem> = displayed
        .iter()
        .map(|&i| {
            let game = &app.games[i];
            let last_played = match &game.last_played {
                Some(ts) => format!("last played {}", format_relative(ts)),
                None => "last played never".to_string(),
            };
            ListItem::new(vec![
                Line::from(Span::styled(
                    game.name.clone(),
                    Style::default().fg(app.theme.foreground),
                )),
                Line::from(vec![
                    Span::raw("  "),
                    completion_span(app, game),
                    Span::styled(
                        format!(
                            " | {} | {}",
                            format_playtime(game.playtime_minutes as u64),
                            last_played
                        ),
                        muted,
                    ),
                ]),
            ])
        })
        .collect();

    let mut title = format!(
        " Games ({}) | Sort: {} {} ",
        displayed.len(),
        app.sort_by.as_str(),
        app.sort_order.arrow()
    );
    if !app.search_query.is_empty() {
        title.push_str(&format!("| Filter: {} ", app.search_query.query));
    }

    if items.is_empty() {
        let message = match (&app.games_state, app.games.is_empty()) {
            (FetchState::Loading, _) => "Loading games...",
            (_, true) => "No games found. The library may be private.",
            (_, false) => "No games match the filter",
        };
        f.render_widget(
            Paragraph::new(Span::styled(message, muted)).block(panel(app, title)),
            area,
        );
        return;
    }

    let list = List::new(items)
        .block(panel(app, title))
        .highlight_style(
            Style::default()
                .bg(app.theme.selection_bg)
                .fg(app.theme.selection_fg)
                .add_modifier(Modifier::BOLD),
        );
    f.render_stateful_widget(list, area, &mut app.game_list_state);
}

fn render_achievements(app: &mut App, f: &mut Frame, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(area);

    let Some(game) = app.selected_game.clone() else {
        return;
    };

    let stats = &app.achievement_stats;
    let muted = Style::default().fg(app.theme.muted);
    let mut summary = vec![
        Line::from(vec![
            Span::styled(
                format!("{}/{}", stats.unlocked, stats.total),
                Style::default()
                    .fg(app.theme.unlocked)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!(" unlocked ({}%)", stats.percent), muted),
            Span::styled(
                format!(" | {} played", format_playtime(game.playtime_minutes as u64)),
                muted,
            ),
        ]),
    ];
    if let Some(latest) = &stats.latest_unlock {
        summary.push(Line::from(Span::styled(
            format!("Latest unlock {}", format_date(latest)),
            muted,
        )));
    }
    f.render_widget(
        Paragraph::new(summary).block(panel(app, format!(" {} ", game.name))),
        chunks[0],
    );

    let title = format!(
        " Achievements | Show: {} ",
        app.achievement_filter.as_str()
    );
    let displayed = app.displayed_achievements();

    if displayed.is_empty() {
        let message = match (&app.achievements_state, app.achievements.is_empty()) {
            (FetchState::Loading, _) => "Loading achievements...",
            (FetchState::Failed(message), _) => message.as_str(),
            (_, true) => "This game has no achievements",
            (_, false) => "Nothing to show for this filter",
        };
        f.render_widget(
            Paragraph::new(Span::styled(message, muted)).block(panel(app, title)),
            chunks[1],
        );
        return;
    }

    // borders and padding
    let text_width = chunks[1].width.saturating_sub(6) as usize;
    let items: Vec<ListItem> = displayed
        .iter()
        .map(|a| {
            let (marker, color) = match a.completed {
                true => ("✓", app.theme.unlocked),
                false => ("·", app.theme.locked),
            };
            let mut header = vec![
                Span::styled(format!("{} ", marker), Style::default().fg(color)),
                Span::styled(
                    a.name.clone(),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ),
            ];
            if let Some(ts) = &a.unlock_time {
                header.push(Span::styled(format!("  {}", format_date(ts)), muted));
            }

            let mut lines = vec![Line::from(header)];
            lines.extend(
                wrap_description(&a.description, text_width)
                    .into_iter()
                    .map(|l| Line::from(Span::styled(format!("  {}", l), muted))),
            );
            ListItem::new(lines)
        })
        .collect();

    let list = List::new(items)
        .block(panel(app, title))
        .highlight_style(
            Style::default()
                .bg(app.theme.selection_bg)
                .fg(app.theme.selection_fg),
        );
    f.render_stateful_widget(list, chunks[1], &mut app.achievement_list_state);
}

fn render_sign_in(app: &App, f: &mut Frame, area: Rect) {
    let muted = Style::default().fg(app.theme.muted);
    let mut lines = vec![
        Line::from(Span::styled(
            format!("{} Waiting for Steam sign-in", app.get_spinner_char()),
            Style::default()
                .fg(app.theme.accent)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Finish signing in on the Steam page in your browser."),
    ];
    match &app.sign_in_url {
        Some(url) => {
            lines.push(Line::from(Span::styled(
                "If it did not open, press o or visit:",
                muted,
            )));
            lines.push(Line::from(Span::styled(
                url.clone(),
                Style::default().fg(app.theme.foreground),
            )));
        }
        None => lines.push(Line::from(Span::styled("Preparing login link...", muted))),
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Esc: Cancel", muted)));

    let popup = centered(area, 80, 10);
    f.render_widget(Clear, popup);
    f.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(panel(app, " Sign in through Steam ")),
        popup,
    );
}

fn render_status_bar(app: &App, f: &mut Frame, area: Rect) {
    let status = match (app.loading_description(), app.input_mode, app.view_mode) {
        (Some(desc), _, _) => format!("{} {}", app.get_spinner_char(), desc),
        (None, InputMode::Search, _) => {
            "Filter: Type | Ctrl+R/F3: Regex | Enter: OK | Esc: Clear".to_string()
        }
        (None, InputMode::EditingSteamId, _) => {
            "Enter: Load | ↑↓: Recent | Esc: Menu | Ctrl+C: Quit".to_string()
        }
        (None, _, ViewMode::SteamIdInput) => {
            "i: Edit | Enter: Open recent | l: Sign in | x: Sign out | D: Clear recent | ?: Help | q: Quit"
                .to_string()
        }
        (None, _, ViewMode::Games) => {
            "j/k: Nav | Enter: Achievements | 1-4: Sort | r: Reverse | /: Filter | o: Store | R: Refresh | c: Change ID | ?: Help"
                .to_string()
        }
        (None, _, ViewMode::Achievements) => {
            "Esc: Back | j/k: Nav | f: Filter | o: Store | p: Profile | R: Refresh | ?: Help"
                .to_string()
        }
        (None, _, ViewMode::SignIn) => "o: Open browser | Esc: Cancel".to_string(),
    };

    let p = Paragraph::new(status)
        .block(
            Block::default()
                .padding(Padding::horizontal(1))
                .style(Style::default().bg(app.theme.selection_bg)),
        )
        .style(Style::default().fg(app.theme.selection_fg));
    f.render_widget(p, area);
}

fn render_notification(app: &App, f: &mut Frame) {
    let Some(notification) = &app.notification else {
        return;
    };

    let area = f.area();
    let message_width = u16::try_from(notification.message.chars().count()).unwrap_or(u16::MAX);
    let width = message_width
        .saturating_add(4)
        .min(area.width.saturating_sub(4));
    let popup_area = centered(area, width, 3);

    let bg_color = match notification.notification_type {
        NotificationType::Info => Color::Blue,
        NotificationType::Warning => Color::Yellow,
        NotificationType::Error => Color::Red,
    };

    let popup = Paragraph::new(notification.message.as_str())
        .style(
            Style::default()
                .bg(bg_color)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.border))
                .title(notification.notification_type.title()),
        )
        .alignment(Alignment::Center);

    f.render_widget(Clear, popup_area);
    f.render_widget(popup, popup_area);
}

fn render_search_overlay(app: &App, f: &mut Frame) {
    let area = f.area();
    let search_area = centered(area, 60, 4);

    let title = format!(" Filter games | {} ", app.search_query.search_type.as_str());
    let mut lines = vec![Line::from(Span::styled(
        format!("{}█", app.temp_search_input),
        Style::default().fg(app.theme.foreground),
    ))];
    if let Some(error) = &app.search_query.regex_error {
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )));
    }

    let search_box = Paragraph::new(lines)
        .style(Style::default().bg(app.theme.background))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.selection_bg))
                .title(title)
                .title_style(
                    Style::default()
                        .fg(app.theme.selection_fg)
                        .bg(app.theme.selection_bg)
                        .add_modifier(Modifier::BOLD),
                ),
        );

    f.render_widget(Clear, search_area);
    f.render_widget(search_box, search_area);
}

fn help_section<'a>(app: &App, title: &'a str, keys: &[(&'a str, &'a str)]) -> Vec<Line<'a>> {
    let mut lines = vec![Line::from(Span::styled(
        title,
        Style::default()
            .fg(app.theme.accent)
            .add_modifier(Modifier::BOLD),
    ))];
    lines.extend(keys.iter().map(|(key, desc)| {
        Line::from(vec![
            Span::styled(
                format!("  {:<10}", key),
                Style::default().fg(app.theme.foreground),
            ),
            Span::styled(*desc, Style::default().fg(app.theme.muted)),
        ])
    }));
    lines.push(Line::from(""));
    lines
}

fn render_help_overlay(app: &App, f: &mut Frame) {
    let popup_area = centered(f.area(), 56, 32);
    f.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.selection_bg))
        .title(" Keyboard Shortcuts (Esc/q to close) ")
        .title_style(
            Style::default()
                .fg(app.theme.selection_fg)
                .bg(app.theme.selection_bg)
                .add_modifier(Modifier::BOLD),
        )
        .padding(Padding::horizontal(1))
        .style(Style::default().bg(app.theme.background));

    let mut lines = help_section(
        app,
        "Steam ID",
        &[
            ("Enter", "Load dashboard / recent profile"),
            ("↑/↓", "Pick a recent profile"),
            ("Esc", "Leave the input"),
            ("l / x", "Sign in / sign out"),
            ("D", "Clear recent profiles"),
        ],
    );
    lines.extend(help_section(
        app,
        "Games",
        &[
            ("j/k", "Move selection"),
            ("Enter", "Show achievements"),
            ("1-4", "Sort: name, playtime, last played, completion"),
            ("r", "Reverse sort order"),
            ("/", "Filter by name (Ctrl+R: regex)"),
            ("o / p", "Open store page / Steam profile"),
            ("R", "Refresh from Steam"),
            ("c", "Change Steam ID"),
        ],
    ));
    lines.extend(help_section(
        app,
        "Achievements",
        &[
            ("f", "All / unlocked / locked"),
            ("Esc", "Back to games"),
        ],
    ));
    lines.extend(help_section(
        app,
        "General",
        &[("L", "Log viewer"), ("?", "This help"), ("q", "Quit")],
    ));

    f.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        popup_area,
    );
}
