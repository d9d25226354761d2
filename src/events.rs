use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    Tick,
    Quit,
    NextFocus,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Activate,
    ModeOn,
    ModeOff,
    Refresh,
}

fn map_key_event(key_event: KeyEvent) -> AppEvent {
    if key_event.kind != KeyEventKind::Press {
        return AppEvent::Tick;
    }

    if key_event.code == KeyCode::Char('c') && key_event.modifiers.contains(KeyModifiers::CONTROL) {
        return AppEvent::Quit;
    }

    match key_event.code {
        KeyCode::Esc | KeyCode::Char('q') => AppEvent::Quit,
        KeyCode::Tab | KeyCode::BackTab => AppEvent::NextFocus,
        KeyCode::Up | KeyCode::Char('k') => AppEvent::MoveUp,
        KeyCode::Down | KeyCode::Char('j') => AppEvent::MoveDown,
        KeyCode::Left | KeyCode::Char('h') => AppEvent::MoveLeft,
        KeyCode::Right | KeyCode::Char('l') => AppEvent::MoveRight,
        KeyCode::Enter | KeyCode::Char(' ') => AppEvent::Activate,
        KeyCode::Char('o') => AppEvent::ModeOn,
        KeyCode::Char('f') => AppEvent::ModeOff,
        KeyCode::Char('r') => AppEvent::Refresh,
        _ => AppEvent::Tick,
    }
}

pub fn next_event() -> io::Result<AppEvent> {
    if event::poll(Duration::from_millis(50))? {
        if let Event::Key(key_event) = event::read()? {
            return Ok(map_key_event(key_event));
        }
    }

    Ok(AppEvent::Tick)
}
