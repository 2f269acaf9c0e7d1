//! Color palettes for the mixtool TUI.
//!
//! Unlike a fixed const palette, the theme flips at runtime between a dark
//! and a light variant, so colors live in a `Palette` value picked per frame
//! from the persisted `dark_mode` flag.

use ratatui::style::{Color, Modifier, Style};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub bg: Color,
    pub panel_bg: Color,
    pub primary: Color,
    pub secondary: Color,
    pub muted: Color,
    pub accent: Color,
    pub border: Color,
    pub border_focused: Color,
    pub slider_fill: Color,
    pub slider_track: Color,
    pub toggle_on: Color,
    pub badge_ok: Color,
    pub badge_warn: Color,
    pub badge_err: Color,
    pub toast_info: Color,
    pub toast_success: Color,
    pub toast_warning: Color,
    pub toast_error: Color,
}

pub const DARK: Palette = Palette {
    bg: Color::Rgb(18, 18, 18),
    panel_bg: Color::Rgb(24, 24, 32),
    primary: Color::Rgb(210, 210, 225),
    secondary: Color::Rgb(115, 115, 138),
    muted: Color::Rgb(72, 72, 88),
    accent: Color::Rgb(255, 95, 95),
    border: Color::Rgb(40, 40, 52),
    border_focused: Color::Rgb(120, 100, 200),
    slider_fill: Color::Rgb(80, 140, 200),
    slider_track: Color::Rgb(40, 40, 52),
    toggle_on: Color::Rgb(80, 200, 120),
    badge_ok: Color::Rgb(80, 200, 120),
    badge_warn: Color::Rgb(255, 184, 80),
    badge_err: Color::Rgb(255, 95, 95),
    toast_info: Color::Rgb(80, 160, 220),
    toast_success: Color::Rgb(80, 200, 120),
    toast_warning: Color::Rgb(255, 184, 80),
    toast_error: Color::Rgb(255, 95, 95),
};

pub const LIGHT: Palette = Palette {
    bg: Color::Rgb(240, 240, 236),
    panel_bg: Color::Rgb(226, 226, 222),
    primary: Color::Rgb(40, 40, 48),
    secondary: Color::Rgb(110, 110, 125),
    muted: Color::Rgb(170, 170, 180),
    accent: Color::Rgb(200, 50, 50),
    border: Color::Rgb(180, 180, 190),
    border_focused: Color::Rgb(100, 80, 180),
    slider_fill: Color::Rgb(50, 110, 180),
    slider_track: Color::Rgb(200, 200, 205),
    toggle_on: Color::Rgb(40, 160, 90),
    badge_ok: Color::Rgb(40, 160, 90),
    badge_warn: Color::Rgb(200, 140, 40),
    badge_err: Color::Rgb(200, 50, 50),
    toast_info: Color::Rgb(40, 120, 190),
    toast_success: Color::Rgb(40, 160, 90),
    toast_warning: Color::Rgb(200, 140, 40),
    toast_error: Color::Rgb(200, 50, 50),
};

/// Palette for the persisted theme flag.
pub fn palette(dark_mode: bool) -> &'static Palette {
    if dark_mode {
        &DARK
    } else {
        &LIGHT
    }
}

impl Palette {
    pub fn style_default(&self) -> Style {
        Style::default().fg(self.primary)
    }

    pub fn style_secondary(&self) -> Style {
        Style::default().fg(self.secondary)
    }

    pub fn style_muted(&self) -> Style {
        Style::default().fg(self.muted)
    }

    pub fn style_label_selected(&self) -> Style {
        Style::default()
            .fg(self.primary)
            .add_modifier(Modifier::BOLD)
    }

    pub fn style_border(&self, focused: bool) -> Style {
        if focused {
            Style::default().fg(self.border_focused)
        } else {
            Style::default().fg(self.border)
        }
    }
}
