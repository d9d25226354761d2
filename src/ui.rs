use chrono::{DateTime, Utc};
use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Cell, Padding, Paragraph, Row, Table, TableState};

use crate::app::{App, Focus};
use crate::mode::ContestMode;
use crate::status_bar::format_starts_in;
use crate::theme::Theme;

const TEXT_PADDING: u16 = 1;
const TITLE_BAR_HEIGHT: u16 = 3;
const MODE_ROW_HEIGHT: u16 = 3;
const STATUS_HEIGHT: u16 = 4;
const ACTIVE_TITLE_BG: Color = Color::Rgb(90, 145, 200);
const ACTIVE_TITLE_FG: Color = Color::Black;
const APP_TITLE: &str = "CP MISSION CONTROL";
const UPDATED_WIDTH: u16 = 22;
const STATUS_HELP_TEXT: &str =
    "Tab focus | Up/Down select | Left/Right mode | Enter activate | o/f mode on/off | r refresh | q quit";

pub fn render(frame: &mut Frame, app: &App, theme: &Theme, now: DateTime<Utc>) {
    let [title, mode_row, table, status] = Layout::vertical([
        Constraint::Length(TITLE_BAR_HEIGHT),
        Constraint::Length(MODE_ROW_HEIGHT),
        Constraint::Min(0),
        Constraint::Length(STATUS_HEIGHT),
    ])
    .areas(frame.area());

    render_title_bar(frame, title, app, theme);
    render_mode_row(frame, mode_row, app, theme);
    render_contest_table(frame, table, app, theme, now);
    render_status(frame, status, app, theme);
}

fn render_title_bar(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let [_, center, right] = Layout::horizontal([
        Constraint::Length(UPDATED_WIDTH),
        Constraint::Min(0),
        Constraint::Length(UPDATED_WIDTH),
    ])
    .areas(area);
    let padded = || {
        Block::default()
            .style(Style::default().bg(theme.panel_bg))
            .padding(Padding::uniform(TEXT_PADDING))
    };

    frame.render_widget(padded(), area);
    frame.render_widget(
        Paragraph::new(APP_TITLE)
            .alignment(Alignment::Center)
            .style(
                Style::default()
                    .bg(theme.panel_bg)
                    .fg(theme.accent_fg)
                    .add_modifier(Modifier::BOLD),
            )
            .block(padded()),
        center,
    );
    if let Some(fetched_at) = app.fetched_at() {
        frame.render_widget(
            Paragraph::new(format!("Updated {} UTC", fetched_at.format("%H:%M")))
                .alignment(Alignment::Right)
                .style(Style::default().bg(theme.panel_bg).fg(theme.muted_fg))
                .block(padded()),
            right,
        );
    }
}

fn render_mode_row(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let active = app.focus == Focus::ModeButtons;
    let row_bg = title_bar_bg(theme.panel_bg, active);
    let label_fg = if active { ACTIVE_TITLE_FG } else { theme.text_fg };
    let line = Line::from(vec![
        Span::styled("Contest Mode  ", Style::default().fg(label_fg)),
        mode_button(ContestMode::On, app, active, theme),
        Span::raw("  "),
        mode_button(ContestMode::Off, app, active, theme),
    ]);
    frame.render_widget(
        Paragraph::new(line).style(Style::default().bg(row_bg)).block(
            Block::default()
                .style(Style::default().bg(row_bg))
                .padding(Padding::uniform(TEXT_PADDING)),
        ),
        area,
    );
}

fn mode_button(mode: ContestMode, app: &App, active: bool, theme: &Theme) -> Span<'static> {
    let base_bg = match mode {
        ContestMode::On => theme.mode_on_bg,
        ContestMode::Off => theme.mode_off_bg,
    };
    let label = format!(" Mode {mode} ");
    let chosen = app.selected_mode() == mode;
    let style = if active && chosen {
        Style::default()
            .bg(ACTIVE_TITLE_BG)
            .fg(ACTIVE_TITLE_FG)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().bg(base_bg).fg(theme.text_fg)
    };
    Span::styled(label, style)
}

fn render_contest_table(
    frame: &mut Frame,
    area: Rect,
    app: &App,
    theme: &Theme,
    now: DateTime<Utc>,
) {
    let active = app.focus == Focus::ContestTable;
    let rows = app.registry().rows(now);
    let block = Block::default()
        .style(Style::default().bg(theme.table_bg))
        .padding(Padding::horizontal(TEXT_PADDING));

    if rows.is_empty() {
        let message = if app.is_fetching() {
            "Loading..."
        } else {
            "No upcoming contests."
        };
        frame.render_widget(
            Paragraph::new(message)
                .style(Style::default().bg(theme.table_bg).fg(theme.muted_fg))
                .block(block.padding(Padding::uniform(TEXT_PADDING))),
            area,
        );
        return;
    }

    let header_bg = title_bar_bg(theme.table_bg, false);
    let header = Row::new(["Event", "Site", "Starts In"])
        .style(
            Style::default()
                .bg(header_bg)
                .fg(theme.muted_fg)
                .add_modifier(Modifier::BOLD),
        )
        .height(1);
    let body = rows.into_iter().map(|row| {
        Row::new([
            Cell::from(row.event),
            Cell::from(row.site),
            Cell::from(format_starts_in(row.starts_in)),
        ])
    });
    let highlight = if active {
        Style::default().bg(theme.selected_bg).fg(ACTIVE_TITLE_FG)
    } else {
        Style::default().bg(title_bar_bg(theme.table_bg, false)).fg(theme.text_fg)
    };
    let table = Table::new(
        body,
        [
            Constraint::Min(20),
            Constraint::Length(18),
            Constraint::Length(10),
        ],
    )
    .header(header)
    .style(Style::default().bg(theme.table_bg).fg(theme.text_fg))
    .row_highlight_style(highlight)
    .block(block);

    let mut state = TableState::default().with_selected(Some(app.selected_row()));
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_status(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let text = vec![
        Line::from(Span::styled(
            app.status().to_string(),
            Style::default().fg(theme.text_fg),
        )),
        Line::from(Span::styled(
            STATUS_HELP_TEXT,
            Style::default().fg(theme.muted_fg),
        )),
    ];
    frame.render_widget(
        Paragraph::new(text)
            .style(Style::default().bg(theme.status_bg))
            .block(
                Block::default()
                    .style(Style::default().bg(theme.status_bg))
                    .padding(Padding::horizontal(TEXT_PADDING)),
            ),
        area,
    );
}

fn title_bar_bg(base: Color, active: bool) -> Color {
    if active {
        return ACTIVE_TITLE_BG;
    }
    match base {
        Color::Rgb(r, g, b) => {
            let delta = -12;
            Color::Rgb(
                adjust_channel(r, delta),
                adjust_channel(g, delta),
                adjust_channel(b, delta),
            )
        }
        _ => base,
    }
}

fn adjust_channel(channel: u8, delta: i16) -> u8 {
    let value = channel as i16 + delta;
    value.clamp(0, 255) as u8
}

#[cfg(test)]
#[path = "../tests/unit/ui_tests.rs"]
mod tests;
