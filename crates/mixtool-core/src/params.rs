//! Canonical parameter record and its durable store.
//!
//! One `Parameters` instance is the source of truth for the whole process.
//! Every user-driven mutation goes through the engine, which clamps the
//! value, writes it back to disk immediately (write-through, no batching)
//! and re-projects it onto the player.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const VOLUME_MIN: f64 = 0.0;
pub const VOLUME_MAX: f64 = 3.0;
pub const BASS_MIN: f64 = 0.0;
pub const BASS_MAX: f64 = 20.0;
pub const SPEED_MIN: f64 = 0.5;
pub const SPEED_MAX: f64 = 2.5;

/// Speed the nightcore preset pins playback to.
pub const NIGHTCORE_SPEED: f64 = 1.25;
/// Bass boost the preset applies when no manual boost is set.
pub const NIGHTCORE_BASS: f64 = 3.0;

/// The full user-adjustable parameter set.
///
/// Every field carries a serde default so a persisted file from an older
/// version (or a partially corrupted one that still parses) merges over the
/// defaults field-by-field. Unknown keys in the file are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    /// Linear gain multiplier, 1.0 = unity.
    #[serde(default = "default_volume")]
    pub volume: f64,
    /// Low-shelf boost in dB.
    #[serde(default)]
    pub bass: f64,
    /// Playback rate multiplier.
    #[serde(default = "default_speed")]
    pub speed: f64,
    /// Coupled preset: raises speed and disables pitch correction.
    #[serde(default)]
    pub nightcore: bool,
    #[serde(default = "default_dark_mode", rename = "darkMode")]
    pub dark_mode: bool,
    /// Panel offset from the top-left corner, in terminal cells.
    #[serde(default = "default_pos_x", rename = "posX")]
    pub pos_x: u16,
    #[serde(default = "default_pos_y", rename = "posY")]
    pub pos_y: u16,
}

fn default_volume() -> f64 {
    1.0
}

fn default_speed() -> f64 {
    1.0
}

fn default_dark_mode() -> bool {
    true
}

fn default_pos_x() -> u16 {
    20
}

fn default_pos_y() -> u16 {
    4
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            volume: default_volume(),
            bass: 0.0,
            speed: default_speed(),
            nightcore: false,
            dark_mode: default_dark_mode(),
            pos_x: default_pos_x(),
            pos_y: default_pos_y(),
        }
    }
}

impl Parameters {
    pub fn set_volume(&mut self, value: f64) {
        self.volume = value.clamp(VOLUME_MIN, VOLUME_MAX);
    }

    pub fn set_bass(&mut self, value: f64) {
        self.bass = value.clamp(BASS_MIN, BASS_MAX);
    }

    pub fn set_speed(&mut self, value: f64) {
        self.speed = value.clamp(SPEED_MIN, SPEED_MAX);
    }

    /// Toggle the nightcore preset.
    ///
    /// ON pins speed to 1.25 and bumps bass to 3 dB — but only when bass is
    /// exactly 0, so a manual boost survives. OFF resets speed to 1.0 and
    /// bass to 0 unconditionally, discarding tweaks made while the preset
    /// was active.
    pub fn set_nightcore(&mut self, on: bool) {
        self.nightcore = on;
        if on {
            self.speed = NIGHTCORE_SPEED;
            if self.bass == 0.0 {
                self.bass = NIGHTCORE_BASS;
            }
        } else {
            self.speed = 1.0;
            self.bass = 0.0;
        }
    }

    /// Reset the audio parameters. Theme and panel position are kept.
    pub fn reset(&mut self) {
        self.volume = 1.0;
        self.bass = 0.0;
        self.speed = 1.0;
        self.nightcore = false;
    }

    // ── display formatting ────────────────────────────────────────────────────

    pub fn volume_label(&self) -> String {
        format!("{}%", (self.volume * 100.0).round() as i64)
    }

    pub fn bass_label(&self) -> String {
        format!("+{}dB", self.bass.round() as i64)
    }

    pub fn speed_label(&self) -> String {
        format!("{:.2}x", self.speed)
    }
}

/// Durable storage for `Parameters` — a single JSON file.
///
/// Load never fails: a missing or unparseable file yields the defaults.
/// Save overwrites the whole file and swallows errors (a failed write just
/// means the next mutation tries again).
pub struct ParamStore {
    path: PathBuf,
}

impl ParamStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Parameters {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str::<Parameters>(&content) {
                Ok(params) => params,
                Err(e) => {
                    warn!("params: unreadable {}: {}, using defaults", self.path.display(), e);
                    Parameters::default()
                }
            },
            Err(_) => Parameters::default(),
        }
    }

    pub fn save(&self, params: &Parameters) {
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let json = match serde_json::to_string_pretty(params) {
            Ok(j) => j,
            Err(e) => {
                warn!("params: serialize failed: {}", e);
                return;
            }
        };
        if let Err(e) = std::fs::write(&self.path, json) {
            warn!("params: write {} failed: {}", self.path.display(), e);
        } else {
            debug!("params: saved to {}", self.path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let p = Parameters::default();
        assert_eq!(p.volume, 1.0);
        assert_eq!(p.bass, 0.0);
        assert_eq!(p.speed, 1.0);
        assert!(!p.nightcore);
        assert!(p.dark_mode);
    }

    #[test]
    fn setters_clamp_to_domain() {
        let mut p = Parameters::default();
        p.set_volume(5.0);
        assert_eq!(p.volume, VOLUME_MAX);
        p.set_volume(-1.0);
        assert_eq!(p.volume, VOLUME_MIN);
        p.set_bass(25.0);
        assert_eq!(p.bass, BASS_MAX);
        p.set_speed(0.1);
        assert_eq!(p.speed, SPEED_MIN);
        p.set_speed(9.0);
        assert_eq!(p.speed, SPEED_MAX);
    }

    #[test]
    fn nightcore_on_with_zero_bass_applies_preset_boost() {
        let mut p = Parameters::default();
        p.set_nightcore(true);
        assert_eq!(p.speed, 1.25);
        assert_eq!(p.bass, 3.0);
        assert!(p.nightcore);
    }

    #[test]
    fn nightcore_on_preserves_manual_bass() {
        let mut p = Parameters {
            bass: 7.0,
            ..Parameters::default()
        };
        p.set_nightcore(true);
        assert_eq!(p.speed, 1.25);
        assert_eq!(p.bass, 7.0);
    }

    #[test]
    fn nightcore_off_is_destructive() {
        let mut p = Parameters {
            bass: 12.0,
            speed: 2.0,
            nightcore: true,
            ..Parameters::default()
        };
        p.set_nightcore(false);
        assert_eq!(p.speed, 1.0);
        assert_eq!(p.bass, 0.0);
        assert!(!p.nightcore);
    }

    #[test]
    fn reset_keeps_theme_and_position() {
        let mut p = Parameters {
            volume: 2.5,
            bass: 9.0,
            speed: 1.75,
            nightcore: true,
            dark_mode: false,
            pos_x: 3,
            pos_y: 9,
        };
        p.reset();
        assert_eq!(p.volume, 1.0);
        assert_eq!(p.bass, 0.0);
        assert_eq!(p.speed, 1.0);
        assert!(!p.nightcore);
        assert!(!p.dark_mode);
        assert_eq!((p.pos_x, p.pos_y), (3, 9));
    }

    #[test]
    fn labels() {
        let p = Parameters {
            volume: 1.5,
            bass: 3.0,
            speed: 1.25,
            ..Parameters::default()
        };
        assert_eq!(p.volume_label(), "150%");
        assert_eq!(p.bass_label(), "+3dB");
        assert_eq!(p.speed_label(), "1.25x");
    }

    #[test]
    fn persisted_keys_use_storage_names() {
        let json = serde_json::to_value(Parameters::default()).unwrap();
        let obj = json.as_object().unwrap();
        for key in ["volume", "bass", "speed", "nightcore", "darkMode", "posX", "posY"] {
            assert!(obj.contains_key(key), "missing key {key}");
        }
    }
}
