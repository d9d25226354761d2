use chrono::{DateTime, Utc};

use crate::contest::{Contest, ContestId};
use crate::launch::LaunchReport;
use crate::mode::ContestMode;
use crate::registry::ContestRegistry;

pub const FETCHING_STATUS: &str = "Fetching contests...";
pub const READY_STATUS: &str = "Ready. Select a contest to launch.";
pub const FETCH_FAILED_STATUS: &str = "Could not fetch contests (check API key / internet)";
pub const FETCH_BUSY_STATUS: &str = "Already fetching contests...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    ModeButtons,
    ContestTable,
}

#[derive(Debug)]
pub struct App {
    pub running: bool,
    pub ticks: u64,
    pub focus: Focus,
    registry: ContestRegistry,
    selected_row: usize,
    selected_mode: ContestMode,
    status: String,
    fetching: bool,
    fetched_at: Option<DateTime<Utc>>,
    launched: Option<ContestId>,
}

impl Default for App {
    fn default() -> Self {
        Self {
            running: true,
            ticks: 0,
            focus: Focus::ContestTable,
            registry: ContestRegistry::default(),
            selected_row: 0,
            selected_mode: ContestMode::On,
            status: FETCHING_STATUS.to_string(),
            fetching: false,
            fetched_at: None,
            launched: None,
        }
    }
}

impl App {
    pub fn on_tick(&mut self) {
        self.ticks = self.ticks.saturating_add(1);
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    pub fn next_focus(&mut self) {
        self.focus = match self.focus {
            Focus::ModeButtons => Focus::ContestTable,
            Focus::ContestTable => Focus::ModeButtons,
        };
    }

    pub fn move_up(&mut self) {
        if self.focus == Focus::ContestTable {
            self.selected_row = self.selected_row.saturating_sub(1);
        }
    }

    pub fn move_down(&mut self) {
        if self.focus == Focus::ContestTable && !self.registry.is_empty() {
            self.selected_row = (self.selected_row + 1).min(self.registry.len() - 1);
        }
    }

    pub fn move_left(&mut self) {
        if self.focus == Focus::ModeButtons {
            self.selected_mode = ContestMode::On;
        }
    }

    pub fn move_right(&mut self) {
        if self.focus == Focus::ModeButtons {
            self.selected_mode = ContestMode::Off;
        }
    }

    pub fn begin_fetch(&mut self) {
        self.fetching = true;
        self.status = FETCHING_STATUS.to_string();
    }

    /// Replaces the listing with one fetch result. An empty result is shown
    /// as a failure because the feed folds errors into no contests.
    pub fn finish_fetch(&mut self, contests: Vec<Contest>, fetched_at: DateTime<Utc>) {
        self.fetching = false;
        self.fetched_at = Some(fetched_at);
        self.registry = ContestRegistry::build(contests);
        self.selected_row = self
            .selected_row
            .min(self.registry.len().saturating_sub(1));
        self.status = if self.registry.is_empty() {
            FETCH_FAILED_STATUS.to_string()
        } else {
            READY_STATUS.to_string()
        };
    }

    pub fn is_fetching(&self) -> bool {
        self.fetching
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }

    pub fn registry(&self) -> &ContestRegistry {
        &self.registry
    }

    pub fn selected_row(&self) -> usize {
        self.selected_row
    }

    pub fn selected_contest_id(&self) -> Option<&ContestId> {
        self.registry.row_key(self.selected_row)
    }

    pub fn selected_mode(&self) -> ContestMode {
        self.selected_mode
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    /// Selections after the first dispatched launch are ignored.
    pub fn accepts_launch(&self) -> bool {
        self.launched.is_none()
    }

    pub fn launched(&self) -> Option<&ContestId> {
        self.launched.as_ref()
    }

    /// Records a dispatched launch and ends the session.
    pub fn finish_launch(&mut self, report: &LaunchReport) {
        self.status = report.summary();
        self.launched = Some(report.contest_id.clone());
        self.quit();
    }
}

#[cfg(test)]
#[path = "../tests/unit/app_tests.rs"]
mod tests;
