//! HelpOverlay component — centered popup with keyboard shortcut reference.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::{action::Action, app_state::AppState, component::Component};

pub struct HelpOverlay {
    pub visible: bool,
}

impl HelpOverlay {
    pub fn new() -> Self {
        Self { visible: false }
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }
}

impl Component for HelpOverlay {
    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        if !self.visible {
            return vec![];
        }
        match key.code {
            KeyCode::Char('?') | KeyCode::Char('q') | KeyCode::Esc => {
                self.hide();
            }
            _ => {}
        }
        // Consume all keys while overlay is open
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, _focused: bool, state: &AppState) {
        if !self.visible {
            return;
        }
        let palette = state.palette();
        let popup = centered_rect(60, 20, area);

        let section = |title: &'static str| {
            Line::from(Span::styled(
                format!(" {}", title),
                Style::default()
                    .fg(palette.muted)
                    .add_modifier(Modifier::BOLD),
            ))
        };
        let row = |key: &'static str, desc: &'static str| {
            Line::from(vec![
                Span::raw(" "),
                Span::styled(
                    format!("{:<16}", key),
                    Style::default()
                        .fg(palette.primary)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(desc, Style::default().fg(palette.secondary)),
            ])
        };

        let help_lines: Vec<Line> = vec![
            Line::from(Span::styled(
                " keyboard shortcuts",
                Style::default()
                    .fg(palette.primary)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            section("panel"),
            row("m", "open panel / focus it when open"),
            row("↑ / ↓  or  j / k", "select row"),
            row("← / →  or  - / +", "adjust selected row"),
            row("shift + arrows", "move the panel"),
            row("d / a", "detach panel / put it back"),
            row("x / esc", "close panel"),
            Line::from(""),
            section("mix"),
            row("n", "toggle nightcore"),
            row("t", "toggle dark/light theme"),
            row("r", "reset volume, bass, speed"),
            row("enter / space", "pause (track & seek rows)"),
            Line::from(""),
            row("?", "toggle this help overlay"),
            row("q / Ctrl+C", "quit"),
        ];

        frame.render_widget(Clear, popup);
        frame.render_widget(
            Paragraph::new(help_lines)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(palette.border))
                        .style(Style::default().bg(palette.panel_bg)),
                )
                .wrap(Wrap { trim: false }),
            popup,
        );
    }
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vert[1])[1]
}
