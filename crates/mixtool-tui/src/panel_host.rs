//! PanelHost — owns the ControlPanel and decides where it lives.
//!
//! The panel is a single value held in exactly one of two slots: `docked`
//! (floating overlay anchored at the persisted position) or `detached` (its
//! own centered window above a dimmed backdrop). Relocation is an ownership
//! transfer between the slots, so the panel's internal state survives the
//! move. Detaching fails cleanly when the terminal cannot fit the window;
//! the panel then stays docked.

use ratatui::layout::Rect;
use thiserror::Error;

use mixtool_core::params::Parameters;

use crate::components::control_panel::ControlPanel;

/// Extra rows/cols around the panel frame when it gets its own window.
const DETACH_PAD: u16 = 2;

#[derive(Debug, Error, PartialEq)]
pub enum DetachError {
    #[error("panel is not open")]
    Closed,
    #[error("terminal too small for a detached panel ({have_w}x{have_h}, need {need_w}x{need_h})")]
    TooSmall {
        need_w: u16,
        need_h: u16,
        have_w: u16,
        have_h: u16,
    },
}

/// Outcome of the launcher toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Opened,
    /// Already open; the panel was focused instead of closed.
    Focused,
}

#[derive(Default)]
pub struct PanelHost {
    docked: Option<ControlPanel>,
    detached: Option<ControlPanel>,
}

impl PanelHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.docked.is_some() || self.detached.is_some()
    }

    pub fn is_detached(&self) -> bool {
        self.detached.is_some()
    }

    /// The panel wherever it currently lives.
    pub fn active_mut(&mut self) -> Option<&mut ControlPanel> {
        self.docked.as_mut().or(self.detached.as_mut())
    }

    /// Launcher semantics: open when closed, focus when already open.
    pub fn open_or_focus(&mut self) -> ToggleOutcome {
        if self.is_open() {
            ToggleOutcome::Focused
        } else {
            self.docked = Some(ControlPanel::new());
            ToggleOutcome::Opened
        }
    }

    pub fn close(&mut self) {
        self.docked = None;
        self.detached = None;
    }

    fn detached_size() -> (u16, u16) {
        (
            ControlPanel::frame_width() + DETACH_PAD,
            ControlPanel::frame_height() + DETACH_PAD,
        )
    }

    /// Whether `area` can host the detached window at full size.
    pub fn detached_fits(area: Rect) -> bool {
        let (w, h) = Self::detached_size();
        area.width >= w && area.height >= h
    }

    /// Move the panel into its own window. The value transfers between slots,
    /// so selection state carries over.
    pub fn detach(&mut self, terminal: Rect) -> Result<(), DetachError> {
        let Some(panel) = self.docked.take() else {
            return if self.detached.is_some() {
                Ok(()) // already detached
            } else {
                Err(DetachError::Closed)
            };
        };
        let (need_w, need_h) = Self::detached_size();
        if terminal.width < need_w || terminal.height < need_h {
            self.docked = Some(panel);
            return Err(DetachError::TooSmall {
                need_w,
                need_h,
                have_w: terminal.width,
                have_h: terminal.height,
            });
        }
        self.detached = Some(panel);
        Ok(())
    }

    /// Return the detached panel to its docked spot. No-op when not detached.
    pub fn reattach(&mut self) {
        if let Some(panel) = self.detached.take() {
            self.docked = Some(panel);
        }
    }

    /// Rect for the docked panel: anchored at the persisted position, pulled
    /// back inside the terminal when it would overflow.
    pub fn docked_rect(params: &Parameters, area: Rect) -> Rect {
        let w = ControlPanel::frame_width().min(area.width);
        let h = ControlPanel::frame_height().min(area.height);
        let max_x = area.x + area.width.saturating_sub(w);
        let max_y = area.y + area.height.saturating_sub(h);
        Rect {
            x: (area.x + params.pos_x).min(max_x),
            y: (area.y + params.pos_y).min(max_y),
            width: w,
            height: h,
        }
    }

    /// Rect for the detached window: centered, panel frame plus padding.
    pub fn detached_rect(area: Rect) -> Rect {
        let (w, h) = Self::detached_size();
        let w = w.min(area.width);
        let h = h.min(area.height);
        Rect {
            x: area.x + (area.width - w) / 2,
            y: area.y + (area.height - h) / 2,
            width: w,
            height: h,
        }
    }

    /// Inner rect the panel draws into inside the detached window.
    pub fn detached_panel_rect(window: Rect) -> Rect {
        Rect {
            x: window.x + DETACH_PAD / 2,
            y: window.y + DETACH_PAD / 2,
            width: window.width.saturating_sub(DETACH_PAD),
            height: window.height.saturating_sub(DETACH_PAD),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(w: u16, h: u16) -> Rect {
        Rect {
            x: 0,
            y: 0,
            width: w,
            height: h,
        }
    }

    #[test]
    fn toggle_focuses_instead_of_closing() {
        let mut host = PanelHost::new();
        assert_eq!(host.open_or_focus(), ToggleOutcome::Opened);
        assert!(host.is_open());
        assert_eq!(host.open_or_focus(), ToggleOutcome::Focused);
        assert!(host.is_open());
    }

    #[test]
    fn detach_moves_the_panel_between_slots() {
        let mut host = PanelHost::new();
        host.open_or_focus();
        host.detach(term(120, 40)).unwrap();
        assert!(host.is_detached());
        assert!(host.active_mut().is_some());
        host.reattach();
        assert!(host.is_open());
        assert!(!host.is_detached());
    }

    #[test]
    fn detach_when_closed_errors() {
        let mut host = PanelHost::new();
        assert_eq!(host.detach(term(120, 40)), Err(DetachError::Closed));
    }

    #[test]
    fn detach_in_tiny_terminal_errors_and_stays_docked() {
        let mut host = PanelHost::new();
        host.open_or_focus();
        let err = host.detach(term(20, 5)).unwrap_err();
        assert!(matches!(err, DetachError::TooSmall { .. }));
        assert!(host.is_open());
        assert!(!host.is_detached());
    }

    #[test]
    fn detached_window_pads_the_panel_frame() {
        let area = term(100, 40);
        let window = PanelHost::detached_rect(area);
        assert_eq!(window.width, ControlPanel::frame_width() + 2);
        assert_eq!(window.height, ControlPanel::frame_height() + 2);
        let inner = PanelHost::detached_panel_rect(window);
        assert_eq!(inner.width, ControlPanel::frame_width());
        assert_eq!(inner.height, ControlPanel::frame_height());
    }

    #[test]
    fn docked_rect_clamps_to_terminal() {
        let mut params = Parameters::default();
        params.pos_x = 500;
        params.pos_y = 500;
        let area = term(80, 24);
        let rect = PanelHost::docked_rect(&params, area);
        assert!(rect.x + rect.width <= area.width);
        assert!(rect.y + rect.height <= area.height);
    }
}
