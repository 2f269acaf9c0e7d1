//! Horizontal slider row — label, filled track, value readout.
//!
//! Rendered as a single line: `Volume  ▰▰▰▰▰▰▱▱▱▱  150%`.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::theme::Palette;

const FILL: &str = "▰";
const TRACK: &str = "▱";
const LABEL_WIDTH: usize = 9;
const VALUE_WIDTH: usize = 7;

/// Fraction of the track filled for a value within [min, max].
pub fn fill_fraction(value: f64, min: f64, max: f64) -> f64 {
    if max <= min {
        return 0.0;
    }
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

pub fn draw_slider(
    frame: &mut Frame,
    area: Rect,
    label: &str,
    fraction: f64,
    value_label: &str,
    selected: bool,
    palette: &Palette,
) {
    if area.height == 0 {
        return;
    }
    let chrome = LABEL_WIDTH + VALUE_WIDTH + 4;
    let track_cells = (area.width as usize).saturating_sub(chrome).min(30);
    let filled = ((track_cells as f64) * fraction).round() as usize;
    let filled = filled.min(track_cells);

    let label_style = if selected {
        palette.style_label_selected()
    } else {
        palette.style_secondary()
    };
    let marker = if selected { "▸" } else { " " };

    let mut spans = vec![
        Span::styled(format!("{} ", marker), Style::default().fg(palette.accent)),
        Span::styled(format!("{:<width$}", label, width = LABEL_WIDTH), label_style),
        Span::styled(FILL.repeat(filled), Style::default().fg(palette.slider_fill)),
        Span::styled(
            TRACK.repeat(track_cells - filled),
            Style::default().fg(palette.slider_track),
        ),
        Span::styled(
            format!(" {:>width$}", value_label, width = VALUE_WIDTH),
            if selected {
                Style::default()
                    .fg(palette.primary)
                    .add_modifier(Modifier::BOLD)
            } else {
                palette.style_secondary()
            },
        ),
    ];

    // Trim to area width so a narrow panel never wraps.
    let mut used = 0usize;
    spans.retain(|s| {
        used += s.content.width();
        used <= area.width as usize
    });

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_clamps_to_unit_range() {
        assert_eq!(fill_fraction(-1.0, 0.0, 3.0), 0.0);
        assert_eq!(fill_fraction(5.0, 0.0, 3.0), 1.0);
        assert!((fill_fraction(1.5, 0.0, 3.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn degenerate_range_is_empty() {
        assert_eq!(fill_fraction(1.0, 2.0, 2.0), 0.0);
    }
}
