//! ControlPanel component — the floating mixer panel.
//!
//! One value, two hosts: the panel is owned by whichever slot of `PanelHost`
//! currently shows it (docked overlay or detached window), and its selection
//! state travels with it. All mutations go out as `Action::Engine(..)`
//! commands computed from the parameter snapshot in `AppState`; the panel
//! never writes parameters itself.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use mixtool_core::params::{
    Parameters, BASS_MAX, BASS_MIN, SPEED_MAX, SPEED_MIN, VOLUME_MAX, VOLUME_MIN,
};

use crate::{
    action::Action,
    app_state::AppState,
    component::Component,
    engine::ParamCommand,
    widgets::slider::{draw_slider, fill_fraction},
    widgets::toast::Severity,
};

const VOLUME_STEP: f64 = 0.05;
const BASS_STEP: f64 = 1.0;
const SPEED_STEP: f64 = 0.05;
const SEEK_STEP_SECS: f64 = 10.0;

/// Selectable rows, top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Row {
    Volume,
    Bass,
    Speed,
    Nightcore,
    Transport,
    Seek,
}

const ROWS: [Row; 6] = [
    Row::Volume,
    Row::Bass,
    Row::Speed,
    Row::Nightcore,
    Row::Transport,
    Row::Seek,
];

pub struct ControlPanel {
    selected: usize,
}

impl ControlPanel {
    pub fn new() -> Self {
        Self { selected: 0 }
    }

    /// Total height including borders. `PanelHost` sizes the floating rect
    /// from this.
    pub fn frame_height() -> u16 {
        // rows + blank + hint line, inside a bordered block
        ROWS.len() as u16 + 2 + 2
    }

    pub fn frame_width() -> u16 {
        44
    }

    fn row(&self) -> Row {
        ROWS[self.selected.min(ROWS.len() - 1)]
    }

    fn adjust(&self, params: &Parameters, dir: f64) -> Vec<Action> {
        match self.row() {
            Row::Volume => vec![Action::Engine(ParamCommand::SetVolume(
                params.volume + dir * VOLUME_STEP,
            ))],
            Row::Bass => vec![Action::Engine(ParamCommand::SetBass(
                params.bass + dir * BASS_STEP,
            ))],
            Row::Speed => vec![Action::Engine(ParamCommand::SetSpeed(
                params.speed + dir * SPEED_STEP,
            ))],
            Row::Nightcore => vec![Action::Engine(ParamCommand::SetNightcore(dir > 0.0))],
            Row::Transport => {
                if dir > 0.0 {
                    vec![Action::Engine(ParamCommand::Next)]
                } else {
                    vec![Action::Engine(ParamCommand::Prev)]
                }
            }
            Row::Seek => vec![Action::Engine(ParamCommand::SeekRelative(
                dir * SEEK_STEP_SECS,
            ))],
        }
    }

    fn activate(&self, params: &Parameters) -> Vec<Action> {
        match self.row() {
            Row::Nightcore => vec![Action::Engine(ParamCommand::SetNightcore(!params.nightcore))],
            Row::Transport | Row::Seek => vec![Action::Engine(ParamCommand::TogglePause)],
            _ => Vec::new(),
        }
    }
}

impl Component for ControlPanel {
    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return Vec::new();
        }
        let params = &state.params;
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);

        // Shift + arrows repositions the docked panel; the App clamps the
        // result to the terminal and persists it.
        if shift {
            match key.code {
                KeyCode::Left => return vec![Action::MovePanel(-2, 0)],
                KeyCode::Right => return vec![Action::MovePanel(2, 0)],
                KeyCode::Up => return vec![Action::MovePanel(0, -1)],
                KeyCode::Down => return vec![Action::MovePanel(0, 1)],
                _ => {}
            }
        }

        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.checked_sub(1).unwrap_or(ROWS.len() - 1);
                Vec::new()
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected = (self.selected + 1) % ROWS.len();
                Vec::new()
            }
            KeyCode::Left | KeyCode::Char('-') => self.adjust(params, -1.0),
            KeyCode::Right | KeyCode::Char('+') | KeyCode::Char('=') => self.adjust(params, 1.0),
            KeyCode::Enter | KeyCode::Char(' ') => self.activate(params),
            KeyCode::Char('n') => vec![Action::Engine(ParamCommand::SetNightcore(
                !params.nightcore,
            ))],
            KeyCode::Char('t') => vec![Action::Engine(ParamCommand::SetDarkMode(
                !params.dark_mode,
            ))],
            KeyCode::Char('r') => vec![
                Action::Engine(ParamCommand::Reset),
                Action::Toast("mix reset".to_string(), Severity::Info),
            ],
            KeyCode::Char('d') => vec![Action::DetachPanel],
            KeyCode::Char('a') => vec![Action::ReattachPanel],
            KeyCode::Esc | KeyCode::Char('x') => vec![Action::ClosePanel],
            _ => Vec::new(),
        }
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let palette = state.palette();
        let params = &state.params;

        frame.render_widget(Clear, area);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(palette.style_border(focused))
            .title(Span::styled(
                " mix ",
                Style::default()
                    .fg(palette.accent)
                    .add_modifier(Modifier::BOLD),
            ))
            .style(Style::default().bg(palette.panel_bg));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let mut y = inner.y;
        let row_rect = |y: u16| Rect {
            x: inner.x + 1,
            y,
            width: inner.width.saturating_sub(2),
            height: 1,
        };

        draw_slider(
            frame,
            row_rect(y),
            "Volume",
            fill_fraction(params.volume, VOLUME_MIN, VOLUME_MAX),
            &params.volume_label(),
            self.row() == Row::Volume,
            palette,
        );
        y += 1;
        draw_slider(
            frame,
            row_rect(y),
            "Bass",
            fill_fraction(params.bass, BASS_MIN, BASS_MAX),
            &params.bass_label(),
            self.row() == Row::Bass,
            palette,
        );
        y += 1;
        draw_slider(
            frame,
            row_rect(y),
            "Speed",
            fill_fraction(params.speed, SPEED_MIN, SPEED_MAX),
            &params.speed_label(),
            self.row() == Row::Speed,
            palette,
        );
        y += 1;

        // Nightcore toggle
        let nc_selected = self.row() == Row::Nightcore;
        let nc_marker = if nc_selected { "▸" } else { " " };
        let nc_state = if params.nightcore { "ON " } else { "off" };
        let nc_style = if params.nightcore {
            Style::default()
                .fg(palette.toggle_on)
                .add_modifier(Modifier::BOLD)
        } else {
            palette.style_muted()
        };
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(format!("{} ", nc_marker), Style::default().fg(palette.accent)),
                Span::styled(
                    format!("{:<9}", "Nightcore"),
                    if nc_selected {
                        palette.style_label_selected()
                    } else {
                        palette.style_secondary()
                    },
                ),
                Span::styled(format!("[{}]", nc_state), nc_style),
            ])),
            row_rect(y),
        );
        y += 1;

        // Transport row
        let tr_selected = self.row() == Row::Transport;
        let tr_marker = if tr_selected { "▸" } else { " " };
        let pause_icon = if state.playback.paused { "▶" } else { "⏸" };
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(format!("{} ", tr_marker), Style::default().fg(palette.accent)),
                Span::styled(
                    format!("{:<9}", "Track"),
                    if tr_selected {
                        palette.style_label_selected()
                    } else {
                        palette.style_secondary()
                    },
                ),
                Span::styled(format!("⏮  {}  ⏭", pause_icon), palette.style_default()),
            ])),
            row_rect(y),
        );
        y += 1;

        // Seek row
        let sk_selected = self.row() == Row::Seek;
        let sk_marker = if sk_selected { "▸" } else { " " };
        let time = state.time_label().unwrap_or_else(|| "–:––".to_string());
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(format!("{} ", sk_marker), Style::default().fg(palette.accent)),
                Span::styled(
                    format!("{:<9}", "Seek"),
                    if sk_selected {
                        palette.style_label_selected()
                    } else {
                        palette.style_secondary()
                    },
                ),
                Span::styled(format!("‹ 10s ›  {}", time), palette.style_secondary()),
            ])),
            row_rect(y),
        );
        y += 2;

        // Footer hints
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(
                "n night  t theme  r reset  d detach  x close",
                palette.style_muted(),
            ))),
            row_rect(y),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyEventState;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn shift_key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::SHIFT,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn state() -> AppState {
        AppState::new(Parameters::default())
    }

    #[test]
    fn right_on_volume_row_steps_up() {
        let mut panel = ControlPanel::new();
        let actions = panel.handle_key(key(KeyCode::Right), &state());
        match &actions[..] {
            [Action::Engine(ParamCommand::SetVolume(v))] => {
                assert!((v - 1.05).abs() < 1e-9);
            }
            other => panic!("unexpected actions: {:?}", other),
        }
    }

    #[test]
    fn selection_wraps_both_ways() {
        let mut panel = ControlPanel::new();
        let s = state();
        panel.handle_key(key(KeyCode::Up), &s);
        assert_eq!(panel.row(), Row::Seek);
        panel.handle_key(key(KeyCode::Down), &s);
        assert_eq!(panel.row(), Row::Volume);
    }

    #[test]
    fn enter_on_nightcore_row_toggles() {
        let mut panel = ControlPanel::new();
        let s = state();
        for _ in 0..3 {
            panel.handle_key(key(KeyCode::Down), &s);
        }
        assert_eq!(panel.row(), Row::Nightcore);
        let actions = panel.handle_key(key(KeyCode::Enter), &s);
        assert!(matches!(
            actions[..],
            [Action::Engine(ParamCommand::SetNightcore(true))]
        ));
    }

    #[test]
    fn shift_arrows_emit_reposition() {
        let mut panel = ControlPanel::new();
        let actions = panel.handle_key(shift_key(KeyCode::Right), &state());
        assert!(matches!(actions[..], [Action::MovePanel(2, 0)]));
    }

    #[test]
    fn selection_survives_ownership_transfer() {
        let mut panel = ControlPanel::new();
        let s = state();
        panel.handle_key(key(KeyCode::Down), &s);
        panel.handle_key(key(KeyCode::Down), &s);
        // Moving the value between hosts keeps the selected row.
        let moved = panel;
        assert_eq!(moved.row(), Row::Speed);
    }
}
