//! AppState — shared read-only data passed to all components during render/event.
//!
//! Components read this for engine state, but never mutate it.
//! The App event-loop is the only thing that writes to AppState.

use mixtool_core::params::Parameters;

use crate::engine::PlaybackView;
use crate::theme::{self, Palette};

/// The full shared state of the application.
/// Components read this; only the App event-loop writes to it.
pub struct AppState {
    /// Snapshot of the canonical parameters held by the engine.
    /// Updated on every `ParamsUpdated` broadcast.
    pub params: Parameters,
    /// What the player last reported back (health, pause, position).
    pub playback: PlaybackView,
}

impl AppState {
    pub fn new(params: Parameters) -> Self {
        Self {
            params,
            playback: PlaybackView::default(),
        }
    }

    /// Palette for the current theme flag.
    pub fn palette(&self) -> &'static Palette {
        theme::palette(self.params.dark_mode)
    }

    /// Short display name of the current track (file stem, or full path for
    /// URLs).
    pub fn track_label(&self) -> Option<String> {
        let path = self.playback.path.as_deref()?;
        if path.contains("://") {
            return Some(path.to_string());
        }
        Some(
            std::path::Path::new(path)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string()),
        )
    }

    /// "mm:ss / mm:ss" position readout, when the player reports one.
    pub fn time_label(&self) -> Option<String> {
        let pos = self.playback.time_pos_secs?;
        let dur = self.playback.duration_secs;
        let fmt = |s: f64| {
            let s = s.max(0.0) as u64;
            format!("{}:{:02}", s / 60, s % 60)
        };
        Some(match dur {
            Some(d) => format!("{} / {}", fmt(pos), fmt(d)),
            None => fmt(pos),
        })
    }
}
