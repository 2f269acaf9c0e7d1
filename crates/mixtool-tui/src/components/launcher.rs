//! Launcher component — the small floating badge that summons the panel.
//!
//! Always visible in the bottom-right corner. Shows the player health as a
//! colored dot, plus a short status word when the player is not running.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};

use crate::{
    action::Action, app_state::AppState, component::Component, engine::PlayerHealth,
};

pub struct Launcher;

impl Launcher {
    pub fn new() -> Self {
        Self
    }

    /// Rect for the badge, anchored bottom-right of `area`.
    pub fn badge_rect(state: &AppState, area: Rect) -> Rect {
        let label = Self::label(state);
        let w = (label.chars().count() as u16 + 2).min(area.width);
        Rect {
            x: area.x + area.width.saturating_sub(w + 1),
            y: area.y + area.height.saturating_sub(2),
            width: w,
            height: 1,
        }
    }

    fn label(state: &AppState) -> String {
        match state.playback.health.badge_label() {
            Some(word) => format!("● MIX {}", word),
            None => "● MIX".to_string(),
        }
    }
}

impl Component for Launcher {
    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return Vec::new();
        }
        match key.code {
            KeyCode::Enter | KeyCode::Char('m') => vec![Action::TogglePanel],
            _ => Vec::new(),
        }
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let palette = state.palette();
        let badge = Self::badge_rect(state, area);
        if badge.width == 0 || badge.height == 0 {
            return;
        }

        let dot_color = match state.playback.health {
            PlayerHealth::Running => palette.badge_ok,
            PlayerHealth::Starting => palette.badge_warn,
            PlayerHealth::Dead => palette.badge_err,
            PlayerHealth::Absent => palette.muted,
        };

        let mut style = Style::default().fg(dot_color).bg(palette.panel_bg);
        if focused {
            style = style.add_modifier(Modifier::BOLD);
        }

        frame.render_widget(Clear, badge);
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(
                format!(" {} ", Self::label(state)),
                style,
            ))),
            badge,
        );
    }
}
