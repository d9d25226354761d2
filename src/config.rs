use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::artifact_io::{
    config_file_path, ensure_default_config, merge_default_config_with_user_overrides,
    read_text_file,
};
use crate::contest::SiteId;
use crate::default_config::DEFAULT_CONFIG_TOML;
use crate::feed::FeedQuery;
use crate::launch::LaunchSettings;
use crate::mode::ModeSettings;
use crate::process::CommandTemplate;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CockpitConfig {
    pub feed: FeedConfig,
    pub credential: CredentialConfig,
    pub terminal: TerminalConfig,
    pub launch: LaunchConfig,
    pub mode: ModeConfig,
    pub status_bar: StatusBarConfig,
    pub rating: RatingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    pub endpoint: String,
    pub resource_ids: Vec<u32>,
    pub window_hours: i64,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CredentialConfig {
    pub env_var: String,
    pub env_file: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TerminalConfig {
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LaunchConfig {
    pub workspace_command: Vec<String>,
    pub browser_command: Vec<String>,
    pub scaffold_script: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModeConfig {
    pub on_script: String,
    pub off_script: String,
    pub acknowledge_script: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusBarConfig {
    pub window_hours: i64,
    pub max_event_chars: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RatingConfig {
    pub endpoint: String,
    pub codeforces_handle: String,
}

impl CockpitConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn builtin() -> Self {
        Self::from_toml_str(DEFAULT_CONFIG_TOML).expect("built-in config should be valid")
    }

    /// Reads `explicit` merged over the defaults, or the per-user config file
    /// (created or topped up with defaults on the way).
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let text = match explicit {
            Some(path) => {
                let user_text = read_text_file(path)?;
                merge_default_config_with_user_overrides(Some(&user_text))?
            }
            None => {
                let path = config_file_path()?;
                info!(path = %path.display(), "loading config");
                ensure_default_config(&path)?
            }
        };
        Self::from_toml_str(&text)
    }

    pub fn load_or_default(explicit: Option<&Path>) -> Self {
        match Self::load(explicit) {
            Ok(config) => config,
            Err(err) => {
                warn!(error = %err, "using built-in config");
                Self::builtin()
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        check_window_hours("feed.window_hours", self.feed.window_hours)?;
        if self.feed.timeout_secs == 0 {
            return Err(ConfigError::Invalid("feed.timeout_secs must be positive".into()));
        }
        if self.feed.resource_ids.is_empty() {
            return Err(ConfigError::Invalid("feed.resource_ids must not be empty".into()));
        }
        check_window_hours("status_bar.window_hours", self.status_bar.window_hours)?;
        if self.status_bar.max_event_chars < 4 {
            return Err(ConfigError::Invalid(
                "status_bar.max_event_chars must be at least 4".into(),
            ));
        }
        for (name, argv) in [
            ("terminal.command", &self.terminal.command),
            ("launch.workspace_command", &self.launch.workspace_command),
            ("launch.browser_command", &self.launch.browser_command),
        ] {
            if argv.first().is_none_or(|program| program.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!("{name} needs a program")));
            }
        }
        self.feed_endpoint()?;
        self.rating_endpoint()?;
        Ok(())
    }

    pub fn feed_endpoint(&self) -> Result<Url, ConfigError> {
        parse_endpoint("feed.endpoint", &self.feed.endpoint)
    }

    pub fn rating_endpoint(&self) -> Result<Url, ConfigError> {
        parse_endpoint("rating.endpoint", &self.rating.endpoint)
    }

    pub fn feed_timeout(&self) -> Duration {
        Duration::from_secs(self.feed.timeout_secs)
    }

    pub fn sites(&self) -> BTreeSet<SiteId> {
        self.feed.resource_ids.iter().copied().map(SiteId).collect()
    }

    pub fn feed_query(&self, now: DateTime<Utc>) -> FeedQuery {
        FeedQuery {
            window: TimeDelta::hours(self.feed.window_hours),
            sites: self.sites(),
            now,
        }
    }

    pub fn status_bar_window(&self) -> TimeDelta {
        TimeDelta::hours(self.status_bar.window_hours)
    }

    pub fn credential_file(&self, home: Option<&Path>) -> PathBuf {
        expand_home(&self.credential.env_file, home)
    }

    pub fn launch_settings(&self) -> LaunchSettings {
        LaunchSettings {
            workspace_command: CommandTemplate::new(self.launch.workspace_command.clone()),
            browser_command: CommandTemplate::new(self.launch.browser_command.clone()),
            terminal_command: CommandTemplate::new(self.terminal.command.clone()),
            scaffold_script: self.launch.scaffold_script.clone(),
        }
    }

    pub fn mode_settings(&self, home: Option<&Path>) -> ModeSettings {
        ModeSettings {
            on_script: expand_home(&self.mode.on_script, home),
            off_script: expand_home(&self.mode.off_script, home),
            acknowledge_script: self.mode.acknowledge_script.clone(),
            terminal_command: CommandTemplate::new(self.terminal.command.clone()),
        }
    }
}

/// Upper bound for look-ahead windows: one leap year.
pub const MAX_WINDOW_HOURS: i64 = 366 * 24;

fn check_window_hours(name: &str, hours: i64) -> Result<(), ConfigError> {
    if hours <= 0 {
        return Err(ConfigError::Invalid(format!("{name} must be positive")));
    }
    if hours > MAX_WINDOW_HOURS {
        return Err(ConfigError::Invalid(format!("{name} must be at most {MAX_WINDOW_HOURS}")));
    }
    Ok(())
}

fn parse_endpoint(name: &str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|err| ConfigError::Invalid(format!("{name}: {err}")))
}

/// Expands a leading `~/` against `home`; other paths are returned as-is.
pub fn expand_home(path: &str, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix("~/"), home) {
        (Some(rest), Some(home)) => home.join(rest),
        _ if path == "~" => home.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(path)),
        _ => PathBuf::from(path),
    }
}
