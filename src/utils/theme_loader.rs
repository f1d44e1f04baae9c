use anyhow::{Context, Result};
use ratatui::style::Color;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::config::ThemeMode;

#[derive(Debug, Deserialize, Clone)]
pub struct ThemeFile {
    pub name: String,
    pub themes: Vec<ThemeVariant>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ThemeVariant {
    pub name: String,
    pub mode: String, // "light" or "dark"
    pub colors: HashMap<String, String>,
}

impl ThemeVariant {
    /// First key present wins; `fallback` when none is.
    fn color(&self, keys: &[&str], fallback: Color) -> Color {
        keys.iter()
            .find_map(|key| self.colors.get(*key))
            .map(|hex| parse_color(hex))
            .unwrap_or(fallback)
    }
}

#[derive(Debug, Clone)]
pub struct TuiTheme {
    pub background: Color,
    pub foreground: Color,
    pub selection_bg: Color,
    pub selection_fg: Color,
    pub border: Color,
    pub accent: Color,
    pub unlocked: Color,
    pub locked: Color,
    pub muted: Color,
}

impl Default for TuiTheme {
    fn default() -> Self {
        Self {
            background: Color::Reset,
            foreground: Color::Reset,
            selection_bg: Color::Blue,
            selection_fg: Color::White,
            border: Color::White,
            accent: Color::Cyan,
            unlocked: Color::Green,
            locked: Color::DarkGray,
            muted: Color::DarkGray,
        }
    }
}

/// "dark" or "light" for the configured mode. `Auto` reads `COLORFGBG`
/// (`fg;bg`, background 0-6 is dark) and falls back to dark.
pub fn resolve_mode(mode: ThemeMode, colorfgbg: Option<&str>) -> &'static str {
    match mode {
        ThemeMode::Dark => "dark",
        ThemeMode::Light => "light",
        ThemeMode::Auto => match colorfgbg
            .and_then(|v| v.rsplit(';').next())
            .and_then(|bg| bg.trim().parse::<u8>().ok())
        {
            Some(7..) => "light",
            _ => "dark",
        },
    }
}

#[tracing::instrument(skip(path, mode), fields(path = ?path, mode = %mode))]
pub fn load_theme(path: &Path, mode: &str, enable_performance_metrics: bool) -> Result<TuiTheme> {
    let start = std::time::Instant::now();
    let content = fs::read_to_string(path).context("Failed to read theme file")?;
    let theme_file: ThemeFile =
        serde_json::from_str(&content).context("Failed to parse theme JSON")?;

    let variant = theme_file
        .themes
        .iter()
        .find(|t| t.mode == mode)
        .or_else(|| theme_file.themes.first())
        .context("No matching theme variant found")?;

    let defaults = TuiTheme::default();
    let theme = TuiTheme {
        background: variant.color(&["background"], defaults.background),
        foreground: variant.color(&["foreground"], defaults.foreground),
        selection_bg: variant.color(
            &["selection.background", "list.active.background"],
            defaults.selection_bg,
        ),
        selection_fg: variant.color(
            &["selection.foreground", "accent.foreground", "foreground"],
            defaults.selection_fg,
        ),
        border: variant.color(&["border"], defaults.border),
        accent: variant.color(&["accent", "base.cyan"], defaults.accent),
        unlocked: variant.color(&["achievement.unlocked", "base.green"], defaults.unlocked),
        locked: variant.color(
            &["achievement.locked", "muted.foreground"],
            defaults.locked,
        ),
        muted: variant.color(&["muted.foreground"], defaults.muted),
    };

    tracing::info!(theme = %theme_file.name, variant = %variant.name, "Loaded theme");
    if enable_performance_metrics {
        tracing::debug!(elapsed = ?start.elapsed(), "theme.load");
    }

    Ok(theme)
}

fn parse_color(hex: &str) -> Color {
    if let Ok(c) = hex.parse::<Color>() {
        return c;
    }

    let hex = hex.trim_start_matches('#');
    match hex.len() {
        // Alpha in 8-digit values is ignored
        6 | 8 if hex.is_ascii() => {
            let r = u8::from_str_radix(&hex[0..2], 16).unwrap_or(0);
            let g = u8::from_str_radix(&hex[2..4], 16).unwrap_or(0);
            let b = u8::from_str_radix(&hex[4..6], 16).unwrap_or(0);
            Color::Rgb(r, g, b)
        }
        _ => Color::Reset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_mode_reads_colorfgbg() {
        assert_eq!(resolve_mode(ThemeMode::Auto, Some("15;0")), "dark");
        assert_eq!(resolve_mode(ThemeMode::Auto, Some("0;15")), "light");
        assert_eq!(resolve_mode(ThemeMode::Auto, Some("garbage")), "dark");
        assert_eq!(resolve_mode(ThemeMode::Auto, None), "dark");
        assert_eq!(resolve_mode(ThemeMode::Light, Some("15;0")), "light");
    }

    #[test]
    fn parses_hex_and_named_colors() {
        assert_eq!(parse_color("#100F0F"), Color::Rgb(0x10, 0x0f, 0x0f));
        assert_eq!(parse_color("#100F0Fff"), Color::Rgb(0x10, 0x0f, 0x0f));
        assert_eq!(parse_color("red"), Color::Red);
        assert_eq!(parse_color("#zz"), Color::Reset);
    }

    #[test]
    fn loads_bundled_theme_variants() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("themes/flexoki.json");
        let dark = load_theme(&path, "dark", false).unwrap();
        let light = load_theme(&path, "light", false).unwrap();
        assert_ne!(dark.background, light.background);

        // Unknown variants fall back to the first one
        let fallback = load_theme(&path, "sepia", false).unwrap();
        assert_eq!(fallback.background, dark.background);
    }
}
