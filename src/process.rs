use std::fmt;
use std::io;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchKind {
    WorkspaceSwitch,
    Browser,
    Terminal,
    ModeScript,
}

impl fmt::Display for DispatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::WorkspaceSwitch => "workspace switch",
            Self::Browser => "browser",
            Self::Terminal => "terminal",
            Self::ModeScript => "mode script",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// Wait up to the limit and report a non-zero exit; a process still
    /// running after that is left alone.
    Bounded(Duration),
    /// Spawn and forget.
    Detached,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRequest {
    pub kind: DispatchKind,
    pub program: String,
    pub args: Vec<String>,
    pub wait: Wait,
}

#[derive(Debug, Error)]
pub enum LaunchSpawnError {
    #[error("{kind}: no command configured")]
    EmptyCommand { kind: DispatchKind },
    #[error("{kind}: failed to start {program}: {source}")]
    Spawn {
        kind: DispatchKind,
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{kind}: {program} exited with {status}")]
    Exit {
        kind: DispatchKind,
        program: String,
        status: String,
    },
}

pub trait ProcessSpawner {
    fn spawn(&self, request: &ProcessRequest) -> Result<(), LaunchSpawnError>;
}

/// Spawns real OS processes with stdio detached from the TUI.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSpawner;

impl ProcessSpawner for SystemSpawner {
    fn spawn(&self, request: &ProcessRequest) -> Result<(), LaunchSpawnError> {
        let mut command = Command::new(&request.program);
        command
            .args(&request.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        let spawn_error = |source| LaunchSpawnError::Spawn {
            kind: request.kind,
            program: request.program.clone(),
            source,
        };
        match request.wait {
            Wait::Bounded(limit) => {
                let child = command.spawn().map_err(spawn_error)?;
                wait_bounded(request, child, limit)?;
            }
            Wait::Detached => {
                detach(&mut command);
                let child = command.spawn().map_err(spawn_error)?;
                debug!(kind = %request.kind, pid = child.id(), "spawned detached process");
            }
        }
        Ok(())
    }
}

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

fn wait_bounded(
    request: &ProcessRequest,
    mut child: Child,
    limit: Duration,
) -> Result<(), LaunchSpawnError> {
    let deadline = Instant::now() + limit;
    loop {
        let status = child.try_wait().map_err(|source| LaunchSpawnError::Spawn {
            kind: request.kind,
            program: request.program.clone(),
            source,
        })?;
        match status {
            Some(status) if status.success() => return Ok(()),
            Some(status) => {
                return Err(LaunchSpawnError::Exit {
                    kind: request.kind,
                    program: request.program.clone(),
                    status: status.to_string(),
                });
            }
            None if Instant::now() >= deadline => {
                debug!(kind = %request.kind, pid = child.id(), "still running; no longer waiting");
                // Reaped off-thread so the process never lingers as a zombie.
                thread::spawn(move || child.wait());
                return Ok(());
            }
            None => thread::sleep(EXIT_POLL_INTERVAL),
        }
    }
}

#[cfg(unix)]
fn detach(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
fn detach(_command: &mut Command) {}

/// argv template with `{name}`-style placeholders substituted per argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    argv: Vec<String>,
}

impl CommandTemplate {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }

    pub fn render(
        &self,
        kind: DispatchKind,
        wait: Wait,
        substitutions: &[(&str, &str)],
    ) -> Result<ProcessRequest, LaunchSpawnError> {
        let mut rendered = self
            .argv
            .iter()
            .map(|arg| fill_placeholders(arg, substitutions));
        let Some(program) = rendered.next() else {
            return Err(LaunchSpawnError::EmptyCommand { kind });
        };
        Ok(ProcessRequest {
            kind,
            program,
            args: rendered.collect(),
            wait,
        })
    }
}

pub fn fill_placeholders(template: &str, substitutions: &[(&str, &str)]) -> String {
    substitutions
        .iter()
        .fold(template.to_string(), |acc, (placeholder, value)| {
            acc.replace(placeholder, value)
        })
}

/// Single-quotes a value for interpolation into a `bash -c` script.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
