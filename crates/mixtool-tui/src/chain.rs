//! ChainManager — lifecycle of the audio filter chain bound to the current
//! track.
//!
//! The binding goes UNBOUND → BOUND on the first successful attach and then
//! straight BOUND → BOUND(new entry) when the reconcile tick sees a
//! different playlist entry; there is no explicit unbind. Attach failures
//! are expected while the host player is mid-transition, so they are logged
//! at debug and retried on the next tick instead of surfacing anywhere.

use mixtool_core::params::Parameters;
use tracing::{debug, info};

use crate::mpv::MpvHandle;

/// Filter labels mixtool owns inside the player's `af` list.
pub const BASS_LABEL: &str = "mixbass";
pub const GAIN_LABEL: &str = "mixgain";

/// Observed playback rates within this distance of the target are ours.
pub const RATE_TOLERANCE: f64 = 0.01;

/// Identity of the playlist entry the chain is bound to. Entry ids are
/// unique per load in mpv, so a reloaded file counts as a new element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackBinding {
    pub entry_id: i64,
    pub path: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("filter graph rejected: {0}")]
    GraphRejected(String),
}

pub struct ChainManager {
    bound: Option<TrackBinding>,
    shelf_hz: u32,
}

impl ChainManager {
    pub fn new(shelf_hz: u32) -> Self {
        Self {
            bound: None,
            shelf_hz,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.bound.is_some()
    }

    /// Whether the reconcile tick should trigger an attach. Identity
    /// comparison only: same entry id → no-op, nothing playing → leave the
    /// stale binding inert.
    pub fn needs_attach(&self, current: Option<&TrackBinding>) -> bool {
        match (current, &self.bound) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(cur), Some(bound)) => cur.entry_id != bound.entry_id,
        }
    }

    /// Construct the chain for `track` and project `params` onto it.
    /// No-op when already bound to this exact entry. On failure the manager
    /// stays unbound (or keeps its previous binding) and the caller's next
    /// tick retries.
    pub async fn attach(&mut self, mpv: &MpvHandle, track: TrackBinding, params: &Parameters) {
        if self.bound.as_ref().map(|b| b.entry_id) == Some(track.entry_id) {
            return;
        }

        match self.install(mpv, params).await {
            Ok(()) => {
                info!("chain: bound to '{}' (entry {})", track.path, track.entry_id);
                self.bound = Some(track);
                self.apply(mpv, params).await;
            }
            Err(e) => {
                debug!("chain: attach to '{}' failed: {}", track.path, e);
            }
        }
    }

    /// Idempotently project the parameter record onto the player: gain,
    /// shelf boost, playback rate, pitch-correction flag. No-op if unbound.
    /// Individual command failures are swallowed; the reconcile tick heals
    /// the chain if the player dropped it.
    pub async fn apply(&self, mpv: &MpvHandle, params: &Parameters) {
        if self.bound.is_none() {
            return;
        }

        if let Err(e) = mpv
            .filter_command(GAIN_LABEL, "volume", &format!("{:.4}", params.volume))
            .await
        {
            debug!("chain: gain update failed: {}", e);
        }
        if let Err(e) = mpv
            .filter_command(BASS_LABEL, "g", &format!("{:.2}", params.bass))
            .await
        {
            debug!("chain: shelf update failed: {}", e);
        }
        if let Err(e) = mpv.set_speed(params.speed).await {
            debug!("chain: speed update failed: {}", e);
        }
        if let Err(e) = mpv.set_pitch_correction(pitch_correction_for(params)).await {
            debug!("chain: pitch-correction update failed: {}", e);
        }
    }

    /// Reconcile-tick step: the host (or another frontend) may rewrite the
    /// `af` list and drop our labels. Reinstall and re-apply when that
    /// happened. Only meaningful while bound.
    pub async fn ensure_installed(&mut self, mpv: &MpvHandle, params: &Parameters) {
        if self.bound.is_none() {
            return;
        }
        let labels = mpv.filter_labels().await;
        if labels.iter().any(|l| l == BASS_LABEL) && labels.iter().any(|l| l == GAIN_LABEL) {
            return;
        }
        info!("chain: filter labels missing from af, reinstalling");
        if let Err(e) = self.install(mpv, params).await {
            debug!("chain: reinstall failed: {}", e);
            return;
        }
        self.apply(mpv, params).await;
    }

    /// Best-effort removal on shutdown. The binding is cleared so a later
    /// attach starts fresh.
    pub async fn teardown(&mut self, mpv: &MpvHandle) {
        if self.bound.take().is_some() {
            mpv.remove_filter_chain().await;
            let _ = mpv.set_speed(1.0).await;
            let _ = mpv.set_pitch_correction(true).await;
        }
    }

    /// Drop the binding without touching the player — used when the player
    /// process died and the handle is gone.
    pub fn forget(&mut self) {
        self.bound = None;
    }

    async fn install(&self, mpv: &MpvHandle, params: &Parameters) -> Result<(), ChainError> {
        let (bass_graph, gain_graph) = build_graphs(params, self.shelf_hz);
        mpv.install_filter_chain(&bass_graph, &gain_graph)
            .await
            .map_err(|e| ChainError::GraphRejected(e.to_string()))
    }
}

/// lavfi graph strings for the two chain stages: low-shelf first, gain after.
pub fn build_graphs(params: &Parameters, shelf_hz: u32) -> (String, String) {
    (
        format!("lowshelf=g={:.2}:f={}", params.bass, shelf_hz),
        format!("volume={:.4}", params.volume),
    )
}

/// Rate-drift rule for externally-driven `speed` changes: re-assert the
/// stored speed when the observed rate drifted beyond tolerance — except at
/// unity speed, where the host's own default-rate behavior is left alone.
pub fn rate_drift(target_speed: f64, observed: f64) -> Option<f64> {
    if (observed - target_speed).abs() > RATE_TOLERANCE && target_speed != 1.0 {
        Some(target_speed)
    } else {
        None
    }
}

/// Projection of the nightcore flag onto the player's pitch-correction flag.
pub fn pitch_correction_for(params: &Parameters) -> bool {
    !params.nightcore
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: i64) -> TrackBinding {
        TrackBinding {
            entry_id: id,
            path: format!("/music/{}.flac", id),
        }
    }

    #[test]
    fn unbound_attaches_only_when_a_track_exists() {
        let chain = ChainManager::new(200);
        assert!(!chain.needs_attach(None));
        assert!(chain.needs_attach(Some(&track(1))));
    }

    #[test]
    fn same_entry_is_a_noop_new_entry_rebinds() {
        let mut chain = ChainManager::new(200);
        chain.bound = Some(track(1));
        assert!(!chain.needs_attach(Some(&track(1))));
        assert!(chain.needs_attach(Some(&track(2))));
        // Track gone: binding stays inert, no attach.
        assert!(!chain.needs_attach(None));
    }

    #[test]
    fn graphs_project_parameters() {
        let mut params = mixtool_core::params::Parameters::default();
        params.set_bass(6.0);
        params.set_volume(1.5);
        let (bass, gain) = build_graphs(&params, 200);
        assert_eq!(bass, "lowshelf=g=6.00:f=200");
        assert_eq!(gain, "volume=1.5000");
    }

    #[test]
    fn rate_drift_corrects_only_away_from_unity() {
        // speed 1.5, host reset the rate to 1.0 → correct it
        assert_eq!(rate_drift(1.5, 1.0), Some(1.5));
        // speed 1.0, host nudged the rate to 1.2 → leave it alone (carve-out)
        assert_eq!(rate_drift(1.0, 1.2), None);
        // within tolerance → nothing to do
        assert_eq!(rate_drift(1.5, 1.505), None);
    }

    #[test]
    fn nightcore_disables_pitch_correction() {
        let mut params = mixtool_core::params::Parameters::default();
        assert!(pitch_correction_for(&params));
        params.set_nightcore(true);
        assert!(!pitch_correction_for(&params));
    }
}
