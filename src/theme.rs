use std::fs;
use std::path::Path;

use ratatui::style::Color;
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct Theme {
    pub panel_bg: Color,
    pub table_bg: Color,
    pub selected_bg: Color,
    pub status_bg: Color,
    pub text_fg: Color,
    pub muted_fg: Color,
    pub accent_fg: Color,
    pub mode_on_bg: Color,
    pub mode_off_bg: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            panel_bg: Color::Rgb(40, 42, 46),
            table_bg: Color::Rgb(48, 50, 55),
            selected_bg: Color::Rgb(90, 145, 200),
            status_bg: Color::Rgb(32, 33, 36),
            text_fg: Color::Rgb(225, 225, 225),
            muted_fg: Color::Rgb(165, 170, 178),
            accent_fg: Color::Rgb(120, 200, 120),
            mode_on_bg: Color::Rgb(170, 60, 60),
            mode_off_bg: Color::Rgb(60, 140, 80),
        }
    }
}

impl Theme {
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path_ref = path.as_ref();
        match fs::read_to_string(path_ref) {
            Ok(contents) => match Self::from_toml_str(&contents) {
                Ok(theme) => theme,
                Err(err) => {
                    warn!(
                        path = %path_ref.display(),
                        error = %err,
                        "failed to parse theme; using defaults"
                    );
                    Self::default()
                }
            },
            Err(err) => {
                debug!(path = %path_ref.display(), error = %err, "no theme file; using defaults");
                Self::default()
            }
        }
    }

    /// Colors missing from the file keep their default values.
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        let cfg: ThemeToml = toml::from_str(s)?;
        let defaults = Self::default();
        let pick =
            |value: Option<RgbToml>, fallback: Color| value.map_or(fallback, RgbToml::to_color);
        let colors = cfg.colors;
        Ok(Self {
            panel_bg: pick(colors.panel_bg, defaults.panel_bg),
            table_bg: pick(colors.table_bg, defaults.table_bg),
            selected_bg: pick(colors.selected_bg, defaults.selected_bg),
            status_bg: pick(colors.status_bg, defaults.status_bg),
            text_fg: pick(colors.text_fg, defaults.text_fg),
            muted_fg: pick(colors.muted_fg, defaults.muted_fg),
            accent_fg: pick(colors.accent_fg, defaults.accent_fg),
            mode_on_bg: pick(colors.mode_on_bg, defaults.mode_on_bg),
            mode_off_bg: pick(colors.mode_off_bg, defaults.mode_off_bg),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ThemeToml {
    colors: ThemeColorsToml,
}

#[derive(Debug, Deserialize)]
struct ThemeColorsToml {
    panel_bg: Option<RgbToml>,
    table_bg: Option<RgbToml>,
    selected_bg: Option<RgbToml>,
    status_bg: Option<RgbToml>,
    text_fg: Option<RgbToml>,
    muted_fg: Option<RgbToml>,
    accent_fg: Option<RgbToml>,
    mode_on_bg: Option<RgbToml>,
    mode_off_bg: Option<RgbToml>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct RgbToml {
    r: u8,
    g: u8,
    b: u8,
}

impl RgbToml {
    fn to_color(self) -> Color {
        Color::Rgb(self.r, self.g, self.b)
    }
}
