use once_cell::sync::Lazy;
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Padding, Paragraph, Tabs, Wrap};
use regex::Regex;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// File name prefix used by the daily rolling appender.
pub const LOG_FILE_NAME: &str = "tui-achievement-tracker.log";

const MAX_ENTRIES: usize = 1000;
const PAGE: usize = 20;

// 2026-01-01T09:30:15.123456Z  INFO tui_achievement_tracker::api: message
static LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?Z)\s+(\w+)\s+([^:\s]+(?:::[^:\s]+)*):\s+(.*)$")
        .expect("regex compiles")
});

static ANSI_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\x1b\[[0-9;]*m").expect("regex compiles"));

#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: String,
    pub module: String,
    pub message: String,
}

/// Parse one compact `tracing-subscriber` line. Lines that do not match
/// (panic traces, wrapped output) are kept whole with level `UNKNOWN`.
pub fn parse_line(line: &str) -> LogEntry {
    let clean = ANSI_RE.replace_all(line, "");
    match LINE_RE.captures(&clean) {
        Some(caps) => LogEntry {
            timestamp: caps[1].to_string(),
            level: caps[2].to_string(),
            module: caps[3].to_string(),
            message: caps[4].to_string(),
        },
        None => LogEntry {
            timestamp: String::new(),
            level: "UNKNOWN".to_string(),
            module: String::new(),
            message: clean.into_owned(),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTab {
    All,
    /// Steam/Supabase traffic and timing events.
    Requests,
    Problems,
}

impl LogTab {
    const ALL: [LogTab; 3] = [LogTab::All, LogTab::Requests, LogTab::Problems];

    fn title(&self) -> &'static str {
        match self {
            LogTab::All => "Logs",
            LogTab::Requests => "Requests",
            LogTab::Problems => "Warnings",
        }
    }

    fn matches(&self, entry: &LogEntry) -> bool {
        match self {
            LogTab::All => true,
            LogTab::Requests => {
                entry.message.contains("steam.request")
                    || entry.message.contains("elapsed")
                    || entry.module.contains("auth")
            }
            LogTab::Problems => matches!(entry.level.as_str(), "WARN" | "ERROR"),
        }
    }
}

pub struct LogViewer {
    pub visible: bool,
    pub entries: Vec<LogEntry>,
    pub scroll: u16,
    pub active_tab: LogTab,
    pub log_dir: PathBuf,
}

impl LogViewer {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            visible: false,
            entries: Vec::new(),
            scroll: 0,
            active_tab: LogTab::All,
            log_dir: log_dir.into(),
        }
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
        if self.visible {
            self.load_logs();
            self.scroll_to_bottom();
        }
    }

    pub fn next_tab(&mut self) {
        let idx = LogTab::ALL
            .iter()
            .position(|t| *t == self.active_tab)
            .unwrap_or(0);
        self.active_tab = LogTab::ALL[(idx + 1) % LogTab::ALL.len()];
        self.scroll_to_bottom();
    }

    /// Today's file, named the way `tracing_appender::rolling::daily` names it (UTC date).
    fn todays_log_file(&self) -> PathBuf {
        let date = jiff::Timestamp::now().strftime("%Y-%m-%d").to_string();
        self.log_dir.join(format!("{}.{}", LOG_FILE_NAME, date))
    }

    pub fn load_logs(&mut self) {
        let path = self.todays_log_file();
        if let Err(e) = self.load_from(&path) {
            tracing::debug!(path = %path.display(), error = %e, "No log file to show");
        }
    }

    pub fn load_from(&mut self, path: &Path) -> std::io::Result<()> {
        let reader = BufReader::new(File::open(path)?);
        let lines: Vec<String> = reader.lines().map_while(Result::ok).collect();
        let skip = lines.len().saturating_sub(MAX_ENTRIES);
        self.entries = lines.iter().skip(skip).map(|l| parse_line(l)).collect();
        Ok(())
    }

    pub fn scroll_up(&mut self) {
        self.scroll = self.scroll.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        let max = self.filtered_entries().len().saturating_sub(1) as u16;
        self.scroll = (self.scroll + 1).min(max);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll = self.filtered_entries().len().saturating_sub(PAGE) as u16;
    }

    pub fn filtered_entries(&self) -> Vec<&LogEntry> {
        self.entries
            .iter()
            .filter(|e| self.active_tab.matches(e))
            .collect()
    }

    pub fn render(&self, f: &mut Frame, area: Rect) {
        if !self.visible {
            return;
        }

        let width = area.width * 90 / 100;
        let height = area.height * 80 / 100;
        let x = area.x + (area.width.saturating_sub(width)) / 2;
        let y = area.y + (area.height.saturating_sub(height)) / 2;
        let overlay_area = Rect::new(x, y, width, height);
        f.render_widget(Clear, overlay_area);

        let outer_block = Block::default()
            .borders(Borders::ALL)
            .title(" Log Viewer (Tab: Switch, G: Bottom, Esc: Close) ");
        let inner_area = outer_block.inner(overlay_area);
        f.render_widget(outer_block, overlay_area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(0),
            ])
            .split(inner_area);

        let titles: Vec<Line> = LogTab::ALL
            .iter()
            .map(|t| Line::from(Span::styled(t.title(), Style::default().fg(Color::Green))))
            .collect();
        let selected = LogTab::ALL
            .iter()
            .position(|t| *t == self.active_tab)
            .unwrap_or(0);
        let tabs = Tabs::new(titles)
            .select(selected)
            .highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
            .divider(" | ")
            .block(Block::default().padding(Padding::horizontal(1)));
        f.render_widget(tabs, chunks[0]);

        // Separator joins the outer border with ├ and ┤
        let separator_area = Rect::new(overlay_area.x, chunks[1].y, overlay_area.width, 1);
        let border_set = symbols::border::Set {
            top_left: symbols::line::VERTICAL_RIGHT,
            top_right: symbols::line::VERTICAL_LEFT,
            ..symbols::border::PLAIN
        };
        f.render_widget(
            Block::default()
                .borders(Borders::TOP)
                .border_set(border_set)
                .border_style(Style::default().fg(Color::DarkGray)),
            separator_area,
        );

        let filtered = self.filtered_entries();
        let log_lines: Vec<Line> = match filtered.is_empty() {
            true => vec![Line::from(Span::styled(
                "No log entries for today",
                Style::default().fg(Color::DarkGray),
            ))],
            false => filtered
                .iter()
                .skip(self.scroll as usize)
                .map(|entry| {
                    let level_style = match entry.level.as_str() {
                        "ERROR" => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                        "WARN" => Style::default().fg(Color::Yellow),
                        "INFO" => Style::default().fg(Color::Blue),
                        "DEBUG" => Style::default().fg(Color::Green),
                        "TRACE" => Style::default().fg(Color::Magenta),
                        _ => Style::default(),
                    };
                    Line::from(vec![
                        Span::styled(
                            format!("{} ", entry.timestamp),
                            Style::default().fg(Color::DarkGray),
                        ),
                        Span::styled(format!("{:5} ", entry.level), level_style),
                        Span::styled(
                            format!("{}: ", entry.module),
                            Style::default().fg(Color::Cyan),
                        ),
                        Span::raw(entry.message.as_str()),
                    ])
                })
                .collect(),
        };

        let logs = Paragraph::new(log_lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().padding(Padding::horizontal(1)));
        f.render_widget(logs, chunks[2]);
    }
}
