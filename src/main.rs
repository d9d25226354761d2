use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::prelude::*;
use tracing::{debug, info, warn};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

mod app;
mod artifact_io;
mod config;
mod contest;
mod credential;
mod default_config;
mod events;
mod feed;
mod http;
mod launch;
mod mode;
mod process;
mod rating;
mod registry;
mod sanitize;
mod status_bar;
mod theme;
mod ui;

use app::{App, FETCH_BUSY_STATUS, Focus};
use config::CockpitConfig;
use credential::Credential;
use events::AppEvent;
use feed::{ContestFeedClient, FeedEvent, FeedWorker};
use http::{HttpFetch, HttpTransport};
use launch::{LaunchOrchestrator, LaunchOutcome};
use mode::{ContestMode, ModeToggle, toggle_status};
use process::{ProcessSpawner, SystemSpawner};
use rating::{RatingError, fetch_codeforces_rating, rating_line};
use status_bar::{NO_CONTESTS_LINE, next_contest_line};
use theme::Theme;

const LOG_FILTER_ENV: &str = "CP_COCKPIT_LOG";
const MAX_FEED_EVENTS_PER_LOOP: usize = 16;

#[derive(Debug, Parser)]
#[command(name = "cp-cockpit", version)]
#[command(about = "Competitive programming mission control")]
struct Cli {
    /// Config file merged over the built-in defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print a one-line summary of the next contest.
    Next,
    /// Print the Codeforces rating of a handle.
    Rating {
        #[arg(long)]
        handle: Option<String>,
    },
    /// Run the contest mode script in a terminal.
    Mode {
        #[arg(value_enum)]
        state: ModeArg,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    On,
    Off,
}

impl From<ModeArg> for ContestMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::On => ContestMode::On,
            ModeArg::Off => ContestMode::Off,
        }
    }
}

fn main() -> io::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing();

    let config = CockpitConfig::load_or_default(cli.config.as_deref());
    let home = artifact_io::home_dir().ok();
    match cli.command {
        Some(Command::Next) => {
            println!("{}", next_contest_summary(&config, home.as_deref(), Utc::now()));
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Rating { handle }) => {
            let handle = handle.unwrap_or_else(|| config.rating.codeforces_handle.clone());
            println!("{}", rating_line(&lookup_rating(&config, &handle)));
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Mode { state }) => {
            let mode = ContestMode::from(state);
            let toggle = ModeToggle::new(config.mode_settings(home.as_deref()), SystemSpawner);
            let result = toggle.toggle(mode);
            if result.is_ok() {
                println!("{}", toggle_status(mode, &result));
                Ok(ExitCode::SUCCESS)
            } else {
                eprintln!("{}", toggle_status(mode, &result));
                Ok(ExitCode::FAILURE)
            }
        }
        None => run_tui(&config, home.as_deref()).map(|()| ExitCode::SUCCESS),
    }
}

/// Logs go to a file because the TUI owns the terminal. Any setup failure
/// leaves logging disabled.
fn init_tracing() {
    let Ok(path) = artifact_io::log_file_path() else {
        return;
    };
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var(LOG_FILTER_ENV)
        .from_env_lossy();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(true)
        .with_writer(Mutex::new(file))
        .try_init();
}

fn feed_client(config: &CockpitConfig, home: Option<&Path>) -> io::Result<ContestFeedClient> {
    let credential = Credential::load(&config.credential.env_var, &config.credential_file(home));
    let endpoint = config.feed_endpoint().map_err(io::Error::other)?;
    let transport = HttpTransport::new(config.feed_timeout()).map_err(io::Error::other)?;
    Ok(ContestFeedClient::with_transport(endpoint, credential, transport))
}

fn next_contest_summary(
    config: &CockpitConfig,
    home: Option<&Path>,
    now: DateTime<Utc>,
) -> String {
    let client = match feed_client(config, home) {
        Ok(client) => client,
        Err(err) => {
            warn!(error = %err, "contest feed unavailable");
            return NO_CONTESTS_LINE.to_string();
        }
    };
    match client.fetch_upcoming(config.status_bar_window(), &config.sites(), now) {
        Ok(contests) => next_contest_line(&contests, now, config.status_bar.max_event_chars),
        Err(err) => {
            warn!(error = %err, "next contest lookup failed");
            NO_CONTESTS_LINE.to_string()
        }
    }
}

fn lookup_rating(
    config: &CockpitConfig,
    handle: &str,
) -> Result<rating::CodeforcesRating, RatingError> {
    let endpoint = config
        .rating_endpoint()
        .map_err(|err| RatingError::Unexpected(err.to_string()))?;
    let transport = HttpTransport::new(config.feed_timeout())?;
    fetch_codeforces_rating(&transport, &endpoint, handle)
}

fn run_tui(config: &CockpitConfig, home: Option<&Path>) -> io::Result<()> {
    let cockpit = Cockpit::new(
        config.clone(),
        Arc::new(feed_client(config, home)?),
        LaunchOrchestrator::new(config.launch_settings(), SystemSpawner),
        ModeToggle::new(config.mode_settings(home), SystemSpawner),
    );
    let theme = match artifact_io::theme_file_path() {
        Ok(path) => Theme::load_or_default(path),
        Err(_) => Theme::default(),
    };

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = run_app(&mut terminal, App::default(), &theme, &cockpit);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    let app = result?;
    if app.launched().is_some() {
        println!("{}", app.status());
    }
    Ok(())
}

fn run_app<B, T, S>(
    terminal: &mut Terminal<B>,
    mut app: App,
    theme: &Theme,
    cockpit: &Cockpit<T, S>,
) -> io::Result<App>
where
    B: Backend,
    T: HttpFetch + Send + Sync + 'static,
    S: ProcessSpawner,
{
    cockpit.refresh(&mut app, Utc::now());
    while app.running {
        cockpit.pump_feed(&mut app);
        let now = Utc::now();
        terminal.draw(|frame| ui::render(frame, &app, theme, now))?;
        let event = events::next_event()?;
        cockpit.handle_event(&mut app, event, Utc::now());
    }
    Ok(app)
}

/// Everything the event loop talks to besides the terminal.
struct Cockpit<T = HttpTransport, S = SystemSpawner> {
    config: CockpitConfig,
    client: Arc<ContestFeedClient<T>>,
    worker: FeedWorker,
    orchestrator: LaunchOrchestrator<S>,
    mode_toggle: ModeToggle<S>,
}

impl<T, S> Cockpit<T, S>
where
    T: HttpFetch + Send + Sync + 'static,
    S: ProcessSpawner,
{
    fn new(
        config: CockpitConfig,
        client: Arc<ContestFeedClient<T>>,
        orchestrator: LaunchOrchestrator<S>,
        mode_toggle: ModeToggle<S>,
    ) -> Self {
        Self {
            config,
            client,
            worker: FeedWorker::new(),
            orchestrator,
            mode_toggle,
        }
    }

    fn refresh(&self, app: &mut App, now: DateTime<Utc>) {
        if self.worker.request(self.client.clone(), self.config.feed_query(now)) {
            app.begin_fetch();
        } else {
            app.set_status(FETCH_BUSY_STATUS);
        }
    }

    /// Applies finished fetches; returns whether anything arrived.
    fn pump_feed(&self, app: &mut App) -> bool {
        let events = self.worker.drain_events_limited(MAX_FEED_EVENTS_PER_LOOP);
        let updated = !events.is_empty();
        for event in events {
            match event {
                FeedEvent::Loaded {
                    contests,
                    fetched_at,
                } => app.finish_fetch(contests, fetched_at),
            }
        }
        updated
    }

    fn handle_event(&self, app: &mut App, event: AppEvent, now: DateTime<Utc>) {
        match event {
            AppEvent::Tick => app.on_tick(),
            AppEvent::Quit => app.quit(),
            AppEvent::NextFocus => app.next_focus(),
            AppEvent::MoveUp => app.move_up(),
            AppEvent::MoveDown => app.move_down(),
            AppEvent::MoveLeft => app.move_left(),
            AppEvent::MoveRight => app.move_right(),
            AppEvent::Activate => match app.focus {
                Focus::ModeButtons => {
                    let mode = app.selected_mode();
                    self.toggle_mode(app, mode);
                }
                Focus::ContestTable => self.launch_selected(app),
            },
            AppEvent::ModeOn => self.toggle_mode(app, ContestMode::On),
            AppEvent::ModeOff => self.toggle_mode(app, ContestMode::Off),
            AppEvent::Refresh => self.refresh(app, now),
        }
    }

    fn launch_selected(&self, app: &mut App) {
        if !app.accepts_launch() {
            return;
        }
        let Some(id) = app.selected_contest_id().cloned() else {
            return;
        };
        match self.orchestrator.launch(app.registry(), &id) {
            LaunchOutcome::Dispatched(report) => {
                info!(
                    id = %report.contest_id,
                    name = %report.safe_name,
                    fallback_name = report.used_fallback_name,
                    "launch dispatched"
                );
                app.finish_launch(&report);
            }
            LaunchOutcome::Aborted(reason) => debug!(?reason, "launch aborted"),
        }
    }

    fn toggle_mode(&self, app: &mut App, mode: ContestMode) {
        let result = self.mode_toggle.toggle(mode);
        app.set_status(toggle_status(mode, &result));
    }
}

#[cfg(test)]
#[path = "../tests/unit/main_launch_tests.rs"]
mod launch_tests;
