//! EngineCore — single-owner event loop for all mutable state.
//!
//! Runs embedded in the TUI process. All tasks that need to mutate the
//! parameter record send `EngineEvent` messages to this loop. EngineCore
//! owns the canonical `Parameters`, the `ParamStore`, the `MpvDriver` and
//! the `ChainManager` exclusively; no other task touches them.
//!
//! Every user mutation is write-through: clamp → save → re-project onto the
//! player → broadcast. The reconcile tick (1 s by default) re-establishes
//! whatever the host player tore down: a dead IPC connection, a rewritten
//! `af` list, a replaced playlist entry, a re-enabled pitch-correction flag.

use mixtool_core::config::Config;
use mixtool_core::params::{ParamStore, Parameters};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::chain::{rate_drift, ChainManager};
use crate::mpv::{MpvDriver, MpvEvent, MpvHandle, OBS_DURATION, OBS_PAUSE, OBS_SPEED, OBS_TIME_POS};
use crate::BroadcastMessage;

// ── commands & events ─────────────────────────────────────────────────────────

/// User-driven mutations and transport intents, produced by the UI.
#[derive(Debug, Clone)]
pub enum ParamCommand {
    SetVolume(f64),
    SetBass(f64),
    SetSpeed(f64),
    SetNightcore(bool),
    SetDarkMode(bool),
    SetPosition(u16, u16),
    Reset,
    TogglePause,
    Next,
    Prev,
    SeekRelative(f64),
}

/// All inputs into the EngineCore loop.
#[derive(Debug)]
pub enum EngineEvent {
    Command(ParamCommand),
    /// The periodic reconciliation tick.
    ReconcileTick,
    /// Raw mpv unsolicited event (forwarded from the reader task).
    Mpv(MpvEvent),
    Shutdown,
}

/// Health of the player connection as observed by the engine.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PlayerHealth {
    /// No connection attempted yet / socket absent.
    #[default]
    Absent,
    /// Spawning our own idle player.
    Starting,
    /// IPC responding normally.
    Running,
    /// Connection lost; the next tick retries.
    Dead,
}

impl PlayerHealth {
    pub fn badge_label(&self) -> Option<&str> {
        match self {
            PlayerHealth::Absent => Some("OFF"),
            PlayerHealth::Starting => Some("INIT"),
            PlayerHealth::Running => None,
            PlayerHealth::Dead => Some("DEAD"),
        }
    }
}

/// Player-side view broadcast to the UI. Parameters travel separately; this
/// is only what the player reports back.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaybackView {
    pub health: PlayerHealth,
    pub paused: bool,
    pub observed_speed: f64,
    pub time_pos_secs: Option<f64>,
    pub duration_secs: Option<f64>,
    pub path: Option<String>,
    pub bound: bool,
}

// ── EngineCore ────────────────────────────────────────────────────────────────

pub struct EngineCore {
    config: Config,
    store: ParamStore,
    params: Parameters,
    driver: MpvDriver,
    /// Live handle to the mpv IO tasks. `None` until connected.
    handle: Option<MpvHandle>,
    chain: ChainManager,
    /// Channel to forward mpv events back into our own event loop.
    event_tx: mpsc::Sender<EngineEvent>,
    broadcast_tx: broadcast::Sender<BroadcastMessage>,
    view: PlaybackView,
    /// Last broadcast view (to avoid redundant broadcasts).
    last_view: PlaybackView,
}

impl EngineCore {
    pub fn new(
        config: Config,
        broadcast_tx: broadcast::Sender<BroadcastMessage>,
        event_tx: mpsc::Sender<EngineEvent>,
    ) -> Self {
        let store = ParamStore::new(config.storage.params_file.clone());
        let params = store.load();
        info!(
            "engine: loaded params from {}: vol={} bass={} speed={} nightcore={}",
            store.path().display(),
            params.volume,
            params.bass,
            params.speed,
            params.nightcore
        );

        let driver = MpvDriver::new(config.mpv.socket.clone(), config.mpv.spawn);
        let chain = ChainManager::new(config.engine.shelf_hz);

        Self {
            config,
            store,
            params,
            driver,
            handle: None,
            chain,
            event_tx,
            broadcast_tx,
            view: PlaybackView::default(),
            last_view: PlaybackView::default(),
        }
    }

    pub fn initial_params(&self) -> Parameters {
        self.params.clone()
    }

    /// Run the engine event loop. Returns when a `Shutdown` event arrives or
    /// the event channel closes (UI exited).
    pub async fn run(mut self, mut event_rx: mpsc::Receiver<EngineEvent>) -> anyhow::Result<()> {
        info!("engine: starting event loop");

        let tick_tx = self.event_tx.clone();
        let period = tokio::time::Duration::from_secs(self.config.engine.reconcile_secs.max(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if tick_tx.send(EngineEvent::ReconcileTick).await.is_err() {
                    break;
                }
            }
        });

        loop {
            match event_rx.recv().await {
                None => {
                    info!("engine: event channel closed, shutting down");
                    break;
                }
                Some(EngineEvent::Shutdown) => {
                    info!("engine: shutdown requested");
                    break;
                }
                Some(EngineEvent::Command(cmd)) => {
                    debug!("engine: command {:?}", cmd);
                    if let Err(e) = self.handle_command(cmd).await {
                        error!("engine: command error: {}", e);
                    }
                }
                Some(EngineEvent::ReconcileTick) => {
                    self.reconcile().await;
                }
                Some(EngineEvent::Mpv(evt)) => {
                    self.handle_mpv_event(evt).await;
                }
            }
        }

        self.cleanup().await;
        Ok(())
    }

    // ── reconciliation tick ───────────────────────────────────────────────────

    /// One reconcile pass. Steps run in order and are each idempotent:
    /// connection, chain presence, track identity, pitch flag.
    async fn reconcile(&mut self) {
        // Liveness first: a stale handle must not mask a dead player.
        if let Some(handle) = self.handle.clone() {
            let process_died = self.driver.owns_process() && !self.driver.process_alive();
            if process_died || handle.ping().await.is_err() {
                warn!("engine: player connection lost");
                self.handle = None;
                self.chain.forget();
                self.view = PlaybackView {
                    health: PlayerHealth::Dead,
                    ..PlaybackView::default()
                };
                self.publish_view();
                return;
            }
        }

        let Some(handle) = self.ensure_handle().await else {
            self.publish_view();
            return;
        };

        // The host may have rewritten the af list under us.
        self.chain.ensure_installed(&handle, &self.params).await;

        // Track replacement: identity comparison against the binding.
        let current = handle.current_track().await;
        if self.chain.needs_attach(current.as_ref()) {
            if let Some(track) = current.clone() {
                self.chain.attach(&handle, track, &self.params).await;
            }
        }

        // Nightcore keeps pitch correction off even when the host resets the
        // flag on its own element replacement.
        if self.params.nightcore && self.chain.is_bound() {
            if handle.get_pitch_correction().await != Some(false) {
                debug!("engine: re-disabling pitch correction");
                let _ = handle.set_pitch_correction(false).await;
            }
        }

        self.view.path = current.map(|t| t.path);
        self.view.bound = self.chain.is_bound();
        self.publish_view();
    }

    async fn ensure_handle(&mut self) -> Option<MpvHandle> {
        if self.handle.is_none() {
            // Single channel + single forwarder task per connection.
            let (event_tx, mut event_rx) = mpsc::channel::<MpvEvent>(64);
            let core_tx = self.event_tx.clone();
            tokio::spawn(async move {
                while let Some(evt) = event_rx.recv().await {
                    if core_tx.send(EngineEvent::Mpv(evt)).await.is_err() {
                        break;
                    }
                }
            });

            // Ride along an existing player first; spawn our own only when
            // allowed and nothing answers.
            let handle = match self.driver.try_reconnect(event_tx.clone()).await {
                Some(h) => h,
                None => {
                    self.view.health = PlayerHealth::Starting;
                    self.publish_view();
                    match self.driver.spawn_and_connect(event_tx).await {
                        Ok(h) => h,
                        Err(e) => {
                            debug!("engine: no player available: {}", e);
                            self.view.health = PlayerHealth::Absent;
                            return None;
                        }
                    }
                }
            };

            self.view.health = PlayerHealth::Running;
            handle.observe_all_properties().await;
            self.handle = Some(handle);
        }

        self.handle.clone()
    }

    // ── command handling ──────────────────────────────────────────────────────

    async fn handle_command(&mut self, cmd: ParamCommand) -> anyhow::Result<()> {
        match cmd {
            ParamCommand::SetVolume(v) => {
                self.params.set_volume(v);
                self.persist_and_apply(true).await;
            }
            ParamCommand::SetBass(v) => {
                self.params.set_bass(v);
                self.persist_and_apply(true).await;
            }
            ParamCommand::SetSpeed(v) => {
                self.params.set_speed(v);
                self.persist_and_apply(true).await;
            }
            ParamCommand::SetNightcore(on) => {
                self.params.set_nightcore(on);
                self.persist_and_apply(true).await;
            }
            ParamCommand::SetDarkMode(on) => {
                self.params.dark_mode = on;
                self.persist_and_apply(false).await;
            }
            ParamCommand::SetPosition(x, y) => {
                self.params.pos_x = x;
                self.params.pos_y = y;
                self.persist_and_apply(false).await;
            }
            ParamCommand::Reset => {
                self.params.reset();
                self.persist_and_apply(true).await;
            }
            ParamCommand::TogglePause => {
                if let Some(handle) = self.handle.as_ref() {
                    handle.cycle_pause().await?;
                }
            }
            ParamCommand::Next => {
                if let Some(handle) = self.handle.as_ref() {
                    handle.playlist_next().await;
                }
            }
            ParamCommand::Prev => {
                if let Some(handle) = self.handle.as_ref() {
                    handle.playlist_prev().await;
                }
            }
            ParamCommand::SeekRelative(secs) => {
                if let Some(handle) = self.handle.as_ref() {
                    handle.seek_relative(secs).await?;
                }
            }
        }
        Ok(())
    }

    /// Write-through persistence, then projection, then broadcast.
    /// Every mutation lands on disk before anything else observes it.
    async fn persist_and_apply(&mut self, audio: bool) {
        self.store.save(&self.params);
        if audio {
            if let Some(handle) = self.handle.clone() {
                self.chain.apply(&handle, &self.params).await;
            }
        }
        let _ = self
            .broadcast_tx
            .send(BroadcastMessage::ParamsUpdated(self.params.clone()));
    }

    // ── mpv event handling ────────────────────────────────────────────────────

    async fn handle_mpv_event(&mut self, evt: MpvEvent) {
        if let Some((obs_id, data)) = evt.as_property_change() {
            match obs_id {
                OBS_SPEED => {
                    let observed = data.as_f64().unwrap_or(1.0);
                    self.view.observed_speed = observed;
                    // Externally-driven rate change — re-assert our speed if
                    // it drifted (unity-speed carve-out applies).
                    if self.chain.is_bound() {
                        if let Some(target) = rate_drift(self.params.speed, observed) {
                            debug!("engine: rate drift {} → re-asserting {}", observed, target);
                            if let Some(handle) = self.handle.as_ref() {
                                let _ = handle.set_speed(target).await;
                            }
                        }
                    }
                    self.publish_view();
                }
                OBS_PAUSE => {
                    self.view.paused = data.as_bool().unwrap_or(false);
                    self.publish_view();
                }
                OBS_TIME_POS => {
                    // Floor to whole seconds so the dedup in publish_view
                    // holds redraws to ~1 Hz while playing.
                    self.view.time_pos_secs = data.as_f64().map(f64::floor);
                    self.publish_view();
                }
                OBS_DURATION => {
                    self.view.duration_secs = if data.is_null() { None } else { data.as_f64() };
                    self.publish_view();
                }
                _ => {}
            }
            return;
        }

        match evt.event_name() {
            Some("file-loaded") => {
                // New media data: re-register observations so mpv pushes
                // current values, and re-project the parameters (the fresh
                // file starts with the player's own defaults).
                info!("engine: file-loaded — re-observing and re-applying");
                if let Some(handle) = self.handle.clone() {
                    handle.observe_all_properties().await;
                    self.chain.apply(&handle, &self.params).await;
                }
            }
            Some("end-file") => {
                self.view.time_pos_secs = None;
                self.view.duration_secs = None;
                self.publish_view();
            }
            _ => {}
        }
    }

    // ── helpers ───────────────────────────────────────────────────────────────

    fn publish_view(&mut self) {
        if self.view != self.last_view {
            self.last_view = self.view.clone();
            let _ = self
                .broadcast_tx
                .send(BroadcastMessage::PlaybackUpdated(self.view.clone()));
        }
    }

    async fn cleanup(&mut self) {
        info!("engine: cleanup");
        if let Some(handle) = self.handle.take() {
            self.chain.teardown(&handle).await;
        }
        self.driver.kill().await;
    }
}
