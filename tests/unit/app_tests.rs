use super::*;

use chrono::TimeZone;

use crate::launch::StepReport;
use crate::process::DispatchKind;
use crate::sanitize::sanitize;

fn contest(id: &str, name: &str, hour: u32) -> Contest {
    Contest {
        id: ContestId::new(id),
        event_name: name.to_string(),
        site: "atcoder.jp".to_string(),
        start_time: Utc.with_ymd_and_hms(2024, 9, 21, hour, 0, 0).unwrap(),
        url: format!("https://atcoder.jp/contests/{id}"),
    }
}

fn fetched_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 20, 12, 0, 0).unwrap()
}

fn loaded_app() -> App {
    let mut app = App::default();
    app.begin_fetch();
    app.finish_fetch(
        vec![
            contest("abc372", "AtCoder Beginner Contest 372", 12),
            contest("arc184", "AtCoder Regular Contest 184", 13),
            contest("agc068", "AtCoder Grand Contest 068", 14),
        ],
        fetched_at(),
    );
    app
}

#[test]
fn starts_focused_on_table_with_fetching_status() {
    let app = App::default();
    assert!(app.running);
    assert_eq!(app.focus, Focus::ContestTable);
    assert_eq!(app.status(), FETCHING_STATUS);
    assert!(app.registry().is_empty());
    assert_eq!(app.selected_contest_id(), None);
    assert!(app.accepts_launch());
}

#[test]
fn finish_fetch_replaces_registry_and_reports_ready() {
    let mut app = App::default();
    app.begin_fetch();
    assert!(app.is_fetching());

    app.finish_fetch(vec![contest("abc372", "ABC 372", 12)], fetched_at());
    assert!(!app.is_fetching());
    assert_eq!(app.status(), READY_STATUS);
    assert_eq!(app.fetched_at(), Some(fetched_at()));
    assert_eq!(app.selected_contest_id(), Some(&ContestId::new("abc372")));
}

#[test]
fn empty_fetch_reports_failure_status() {
    let mut app = loaded_app();
    app.begin_fetch();
    app.finish_fetch(Vec::new(), fetched_at());
    assert_eq!(app.status(), FETCH_FAILED_STATUS);
    assert!(app.registry().is_empty());
    assert_eq!(app.selected_row(), 0);
    assert_eq!(app.selected_contest_id(), None);
}

#[test]
fn table_selection_is_clamped_to_rows() {
    let mut app = loaded_app();
    app.move_up();
    assert_eq!(app.selected_row(), 0);
    for _ in 0..5 {
        app.move_down();
    }
    assert_eq!(app.selected_row(), 2);
    assert_eq!(app.selected_contest_id(), Some(&ContestId::new("agc068")));

    app.finish_fetch(vec![contest("abc372", "ABC 372", 12)], fetched_at());
    assert_eq!(app.selected_row(), 0);
}

#[test]
fn movement_only_applies_to_focused_widget() {
    let mut app = loaded_app();
    app.move_right();
    assert_eq!(app.selected_mode(), ContestMode::On);

    app.next_focus();
    assert_eq!(app.focus, Focus::ModeButtons);
    app.move_down();
    assert_eq!(app.selected_row(), 0);
    app.move_right();
    assert_eq!(app.selected_mode(), ContestMode::Off);
    app.move_left();
    assert_eq!(app.selected_mode(), ContestMode::On);

    app.next_focus();
    assert_eq!(app.focus, Focus::ContestTable);
}

#[test]
fn finish_launch_ends_session_and_blocks_further_launches() {
    let mut app = loaded_app();
    let report = LaunchReport {
        contest_id: ContestId::new("arc184"),
        safe_name: sanitize("AtCoder Regular Contest 184"),
        used_fallback_name: false,
        steps: vec![StepReport {
            kind: DispatchKind::Browser,
            error: None,
        }],
    };
    app.finish_launch(&report);
    assert!(!app.running);
    assert!(!app.accepts_launch());
    assert_eq!(app.launched(), Some(&ContestId::new("arc184")));
    assert_eq!(app.status(), "Launching: AtCoder_Regular_Contest_184");
}

#[test]
fn ticks_saturate() {
    let mut app = App {
        ticks: u64::MAX,
        ..App::default()
    };
    app.on_tick();
    assert_eq!(app.ticks, u64::MAX);
}
