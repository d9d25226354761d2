use std::fmt;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::process::{
    CommandTemplate, DispatchKind, LaunchSpawnError, ProcessRequest, ProcessSpawner,
    SystemSpawner, Wait, fill_placeholders, shell_quote,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContestMode {
    On,
    Off,
}

impl fmt::Display for ContestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::On => f.write_str("ON"),
            Self::Off => f.write_str("OFF"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeSettings {
    pub on_script: PathBuf,
    pub off_script: PathBuf,
    /// `{script}` is the quoted script path.
    pub acknowledge_script: String,
    pub terminal_command: CommandTemplate,
}

pub struct ModeToggle<S = SystemSpawner> {
    settings: ModeSettings,
    spawner: S,
}

impl<S: ProcessSpawner> ModeToggle<S> {
    pub fn new(settings: ModeSettings, spawner: S) -> Self {
        Self { settings, spawner }
    }

    pub fn toggle(&self, mode: ContestMode) -> Result<(), LaunchSpawnError> {
        let request = self.request_for(mode)?;
        match self.spawner.spawn(&request) {
            Ok(()) => {
                info!(%mode, "contest mode script dispatched");
                Ok(())
            }
            Err(err) => {
                warn!(%mode, error = %err, "contest mode script failed to start");
                Err(err)
            }
        }
    }

    pub fn request_for(&self, mode: ContestMode) -> Result<ProcessRequest, LaunchSpawnError> {
        let script_path = match mode {
            ContestMode::On => &self.settings.on_script,
            ContestMode::Off => &self.settings.off_script,
        };
        let quoted = shell_quote(&script_path.to_string_lossy());
        let script = fill_placeholders(
            &self.settings.acknowledge_script,
            &[("{script}", quoted.as_str())],
        );
        self.settings.terminal_command.render(
            DispatchKind::ModeScript,
            Wait::Detached,
            &[("{script}", script.as_str())],
        )
    }
}

/// Status line text after a toggle attempt.
pub fn toggle_status(mode: ContestMode, result: &Result<(), LaunchSpawnError>) -> String {
    match result {
        Ok(()) => format!("Contest mode {mode} script started."),
        Err(err) => format!("Error: {err}"),
    }
}
