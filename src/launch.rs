use std::time::Duration;

use tracing::{debug, info, warn};

use crate::contest::{Contest, ContestId};
use crate::process::{
    CommandTemplate, DispatchKind, LaunchSpawnError, ProcessRequest, ProcessSpawner,
    SystemSpawner, Wait, fill_placeholders,
};
use crate::registry::{ContestRegistry, LookupError};
use crate::sanitize::{SafeName, sanitize};

/// Long enough to catch an immediate `i3-msg` failure without stalling the
/// browser and terminal steps behind a hung switcher.
pub const WORKSPACE_SWITCH_WAIT: Duration = Duration::from_millis(500);

pub const LAUNCH_SEQUENCE: [DispatchKind; 3] = [
    DispatchKind::WorkspaceSwitch,
    DispatchKind::Browser,
    DispatchKind::Terminal,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSettings {
    /// `{name}` is the safe name.
    pub workspace_command: CommandTemplate,
    /// `{url}` is the contest URL.
    pub browser_command: CommandTemplate,
    /// `{script}` is the rendered scaffold script.
    pub terminal_command: CommandTemplate,
    /// Shell script run in the terminal; `{name}` is the safe name.
    pub scaffold_script: String,
}

#[derive(Debug)]
pub enum AbortReason {
    NotFound(LookupError),
}

#[derive(Debug)]
pub struct StepReport {
    pub kind: DispatchKind,
    pub error: Option<LaunchSpawnError>,
}

#[derive(Debug)]
pub struct LaunchReport {
    pub contest_id: ContestId,
    pub safe_name: SafeName,
    pub used_fallback_name: bool,
    pub steps: Vec<StepReport>,
}

impl LaunchReport {
    pub fn failures(&self) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(|step| step.error.is_some())
    }

    pub fn summary(&self) -> String {
        let failed: Vec<String> = self.failures().map(|step| step.kind.to_string()).collect();
        if failed.is_empty() {
            format!("Launching: {}", self.safe_name)
        } else {
            format!(
                "Launching: {} ({} failed to start)",
                self.safe_name,
                failed.join(", ")
            )
        }
    }
}

/// Only says whether dispatch happened; launched processes are never observed.
#[derive(Debug)]
pub enum LaunchOutcome {
    Dispatched(LaunchReport),
    Aborted(AbortReason),
}

pub struct LaunchOrchestrator<S = SystemSpawner> {
    settings: LaunchSettings,
    spawner: S,
}

impl<S: ProcessSpawner> LaunchOrchestrator<S> {
    pub fn new(settings: LaunchSettings, spawner: S) -> Self {
        Self { settings, spawner }
    }

    pub fn launch(&self, registry: &ContestRegistry, id: &ContestId) -> LaunchOutcome {
        match registry.lookup(id) {
            Ok(contest) => LaunchOutcome::Dispatched(self.launch_contest(contest)),
            Err(err) => {
                debug!(error = %err, "ignoring selection");
                LaunchOutcome::Aborted(AbortReason::NotFound(err))
            }
        }
    }

    /// Attempts every step of [`LAUNCH_SEQUENCE`]; a failed step never stops
    /// the next one.
    pub fn launch_contest(&self, contest: &Contest) -> LaunchReport {
        let (safe_name, used_fallback_name) = launch_name(contest);
        if used_fallback_name {
            warn!(
                id = %contest.id,
                event = %contest.event_name,
                fallback = %safe_name,
                "event name has no safe characters; using fallback name"
            );
        }
        let steps = LAUNCH_SEQUENCE
            .iter()
            .map(|&kind| {
                let result = self
                    .request_for(kind, contest, &safe_name)
                    .and_then(|request| self.spawner.spawn(&request));
                match &result {
                    Ok(()) => info!(%kind, name = %safe_name, "dispatched"),
                    Err(err) => warn!(%kind, error = %err, "launch step failed"),
                }
                StepReport {
                    kind,
                    error: result.err(),
                }
            })
            .collect();
        LaunchReport {
            contest_id: contest.id.clone(),
            safe_name,
            used_fallback_name,
            steps,
        }
    }

    pub fn request_for(
        &self,
        kind: DispatchKind,
        contest: &Contest,
        safe_name: &SafeName,
    ) -> Result<ProcessRequest, LaunchSpawnError> {
        match kind {
            DispatchKind::WorkspaceSwitch => self.settings.workspace_command.render(
                kind,
                Wait::Bounded(WORKSPACE_SWITCH_WAIT),
                &[("{name}", safe_name.as_str())],
            ),
            DispatchKind::Browser => self.settings.browser_command.render(
                kind,
                Wait::Detached,
                &[("{url}", contest.url.as_str())],
            ),
            DispatchKind::Terminal => {
                let script = fill_placeholders(
                    &self.settings.scaffold_script,
                    &[("{name}", safe_name.as_str())],
                );
                self.settings
                    .terminal_command
                    .render(kind, Wait::Detached, &[("{script}", script.as_str())])
            }
            DispatchKind::ModeScript => Err(LaunchSpawnError::EmptyCommand { kind }),
        }
    }
}

/// Safe name for the launch, falling back to one built from the contest id
/// when the title has no usable characters.
pub fn launch_name(contest: &Contest) -> (SafeName, bool) {
    let safe_name = sanitize(&contest.event_name);
    if !safe_name.is_empty() {
        return (safe_name, false);
    }
    (sanitize(&format!("contest {}", contest.id)), true)
}

#[cfg(test)]
#[path = "../tests/unit/launch_tests.rs"]
mod tests;
