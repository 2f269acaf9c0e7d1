//! mpv IPC driver with separated reader/writer tasks.
//!
//! ```text
//!   MpvDriver::spawn_and_connect() / try_reconnect()
//!         │
//!         ├── writer_task   ← receives MpvRequest via mpsc, serialises → socket
//!         └── reader_task   ← reads JSON lines from socket
//!                                ├── response (has request_id) → matched oneshot::Sender
//!                                └── event / property-change   → event_tx channel
//! ```
//!
//! `MpvHandle` is cheaply cloneable; `send(cmd)` returns a future resolving
//! to the response payload. The domain wrappers at the bottom cover exactly
//! the player surface mixtool touches: playback rate, pitch correction,
//! transport, and the labeled `af` filter chain.

use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info, warn};

#[cfg(unix)]
use tokio::net::UnixStream;

#[cfg(windows)]
use tokio::net::windows::named_pipe::ClientOptions;

use crate::chain::{TrackBinding, BASS_LABEL, GAIN_LABEL};

// ── global request-id counter ─────────────────────────────────────────────────

static NEXT_REQ_ID: AtomicU64 = AtomicU64::new(1);

// ── observation property IDs ──────────────────────────────────────────────────

/// Fixed observe_property IDs, matched in property-change events.
pub const OBS_SPEED: u64 = 1;
pub const OBS_PAUSE: u64 = 2;
pub const OBS_TIME_POS: u64 = 3;
pub const OBS_DURATION: u64 = 4;

// ── internal channel types ────────────────────────────────────────────────────

struct PendingRequest {
    req_id: u64,
    payload: String, // serialised JSON line (already has '\n')
    reply: oneshot::Sender<anyhow::Result<Value>>,
}

/// An mpv event / property-change that arrived unsolicited (no request_id).
#[derive(Debug, Clone)]
pub struct MpvEvent {
    pub raw: Value,
}

impl MpvEvent {
    /// Returns `Some((obs_id, data))` if this is a property-change event.
    pub fn as_property_change(&self) -> Option<(u64, &Value)> {
        if self.raw.get("event")?.as_str()? == "property-change" {
            let id = self.raw.get("id")?.as_u64()?;
            let data = self.raw.get("data").unwrap_or(&Value::Null);
            Some((id, data))
        } else {
            None
        }
    }

    /// Returns the event name, e.g. "end-file", "start-file", "file-loaded".
    pub fn event_name(&self) -> Option<&str> {
        self.raw.get("event")?.as_str()
    }
}

// ── public handle ─────────────────────────────────────────────────────────────

/// Cloneable handle to the mpv writer task.  Use `send()` to fire a command
/// and await the response.
#[derive(Clone)]
pub struct MpvHandle {
    tx: mpsc::Sender<PendingRequest>,
}

impl MpvHandle {
    pub async fn send(&self, command: Value) -> anyhow::Result<Value> {
        let req_id = NEXT_REQ_ID.fetch_add(1, Ordering::Relaxed);
        let msg = json!({ "command": command, "request_id": req_id });
        let mut raw = serde_json::to_string(&msg)?;
        raw.push('\n');

        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(PendingRequest {
                req_id,
                payload: raw,
                reply: reply_tx,
            })
            .await
            .map_err(|_| anyhow::anyhow!("mpv writer task gone"))?;

        tokio::time::timeout(tokio::time::Duration::from_secs(5), reply_rx)
            .await
            .map_err(|_| anyhow::anyhow!("mpv IPC timeout for req={}", req_id))?
            .map_err(|_| anyhow::anyhow!("mpv reply channel dropped req={}", req_id))?
    }
}

// ── driver ────────────────────────────────────────────────────────────────────

/// Owns the optional mpv child process and manages (re)connection.
pub struct MpvDriver {
    socket_name: String,
    spawn_allowed: bool,
    process: Option<tokio::process::Child>,
}

impl MpvDriver {
    pub fn new(socket_name: String, spawn_allowed: bool) -> Self {
        Self {
            socket_name,
            spawn_allowed,
            process: None,
        }
    }

    /// True when we spawned a child and it is still running. Always false
    /// when riding along a host-owned player.
    pub fn process_alive(&mut self) -> bool {
        if let Some(ref mut child) = self.process {
            child.try_wait().ok().flatten().is_none()
        } else {
            false
        }
    }

    pub fn owns_process(&self) -> bool {
        self.process.is_some()
    }

    pub async fn kill(&mut self) {
        if let Some(mut p) = self.process.take() {
            let _ = p.kill().await;
        }
    }

    // ── spawn / reconnect ─────────────────────────────────────────────────────

    #[cfg(unix)]
    pub async fn spawn_and_connect(
        &mut self,
        event_tx: mpsc::Sender<MpvEvent>,
    ) -> anyhow::Result<MpvHandle> {
        if !self.spawn_allowed {
            anyhow::bail!("no player socket and spawning is disabled");
        }
        if let Some(mut p) = self.process.take() {
            let _ = p.kill().await;
        }

        let socket_path = std::path::PathBuf::from(&self.socket_name);
        let _ = tokio::fs::remove_file(&socket_path).await;

        info!("mpv: spawning new idle process");
        let mpv_binary = mixtool_core::platform::find_mpv_binary()
            .ok_or_else(|| anyhow::anyhow!("mpv binary not found"))?;
        let ipc_arg = mixtool_core::platform::mpv_socket_arg(&self.socket_name);

        let child = tokio::process::Command::new(mpv_binary)
            .arg("--no-video")
            .arg("--idle=yes")
            .arg(&ipc_arg)
            .arg("--quiet")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()?;
        self.process = Some(child);

        // Wait for socket to appear
        for _ in 0..50 {
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
            if socket_path.exists() {
                break;
            }
        }
        if !socket_path.exists() {
            anyhow::bail!("mpv IPC socket did not appear");
        }
        tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

        let stream = UnixStream::connect(&socket_path).await?;
        info!("mpv: connected to IPC socket");
        Ok(Self::start_io_tasks(stream, event_tx))
    }

    /// Try to connect to an already-running mpv socket without spawning.
    /// This is the normal path when another frontend owns the player.
    #[cfg(unix)]
    pub async fn try_reconnect(&mut self, event_tx: mpsc::Sender<MpvEvent>) -> Option<MpvHandle> {
        let socket_path = std::path::PathBuf::from(&self.socket_name);
        if !socket_path.exists() {
            return None;
        }
        match UnixStream::connect(&socket_path).await {
            Ok(stream) => {
                info!("mpv: connected to existing IPC socket");
                Some(Self::start_io_tasks(stream, event_tx))
            }
            Err(e) => {
                debug!("mpv: failed to reconnect: {}", e);
                None
            }
        }
    }

    #[cfg(unix)]
    fn start_io_tasks(stream: UnixStream, event_tx: mpsc::Sender<MpvEvent>) -> MpvHandle {
        let (read_half, write_half) = stream.into_split();
        let reader = BufReader::new(read_half);

        // pending map: req_id → reply channel.  Shared between writer (inserts)
        // and reader (resolves).
        let pending: Arc<Mutex<HashMap<u64, oneshot::Sender<anyhow::Result<Value>>>>> =
            Arc::new(Mutex::new(HashMap::new()));

        let (cmd_tx, cmd_rx) = mpsc::channel::<PendingRequest>(64);

        let pending_w = pending.clone();
        tokio::spawn(writer_task(write_half, cmd_rx, pending_w));
        tokio::spawn(reader_task(reader, pending, event_tx));

        MpvHandle { tx: cmd_tx }
    }

    // ── Windows ───────────────────────────────────────────────────────────────

    #[cfg(windows)]
    pub async fn spawn_and_connect(
        &mut self,
        event_tx: mpsc::Sender<MpvEvent>,
    ) -> anyhow::Result<MpvHandle> {
        if !self.spawn_allowed {
            anyhow::bail!("no player pipe and spawning is disabled");
        }
        if let Some(mut p) = self.process.take() {
            let _ = p.kill().await;
        }

        info!("mpv: spawning new idle process");
        let mpv_binary = mixtool_core::platform::find_mpv_binary()
            .ok_or_else(|| anyhow::anyhow!("mpv binary not found"))?;
        let ipc_arg = mixtool_core::platform::mpv_socket_arg(&self.socket_name);

        let child = tokio::process::Command::new(mpv_binary)
            .arg("--no-video")
            .arg("--idle=yes")
            .arg(&ipc_arg)
            .arg("--quiet")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()?;
        self.process = Some(child);

        let pipe_path = format!(r"\\.\pipe\{}", self.socket_name);
        for _ in 0..50 {
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
            match ClientOptions::new().open(&pipe_path) {
                Ok(client) => {
                    info!("mpv: connected to named pipe");
                    return Ok(Self::start_io_tasks_windows(client, event_tx));
                }
                Err(_) => continue,
            }
        }
        anyhow::bail!("mpv named pipe did not appear")
    }

    #[cfg(windows)]
    pub async fn try_reconnect(&mut self, event_tx: mpsc::Sender<MpvEvent>) -> Option<MpvHandle> {
        let pipe_path = format!(r"\\.\pipe\{}", self.socket_name);
        match ClientOptions::new().open(&pipe_path) {
            Ok(client) => {
                info!("mpv: connected to existing named pipe");
                Some(Self::start_io_tasks_windows(client, event_tx))
            }
            Err(e) => {
                debug!("mpv: failed to reconnect to named pipe: {}", e);
                None
            }
        }
    }

    #[cfg(windows)]
    fn start_io_tasks_windows(
        pipe: tokio::net::windows::named_pipe::NamedPipeClient,
        event_tx: mpsc::Sender<MpvEvent>,
    ) -> MpvHandle {
        use tokio::io::split;
        let (read_half, write_half) = split(pipe);
        let reader = BufReader::new(read_half);

        let pending: Arc<Mutex<HashMap<u64, oneshot::Sender<anyhow::Result<Value>>>>> =
            Arc::new(Mutex::new(HashMap::new()));
        let (cmd_tx, cmd_rx) = mpsc::channel::<PendingRequest>(64);

        let pending_w = pending.clone();
        tokio::spawn(writer_task(write_half, cmd_rx, pending_w));
        tokio::spawn(reader_task(reader, pending, event_tx));

        MpvHandle { tx: cmd_tx }
    }
}

// ── reader task ───────────────────────────────────────────────────────────────

async fn reader_task<R>(
    mut reader: BufReader<R>,
    pending: Arc<Mutex<HashMap<u64, oneshot::Sender<anyhow::Result<Value>>>>>,
    event_tx: mpsc::Sender<MpvEvent>,
) where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                debug!("mpv reader: connection closed");
                let mut map = pending.lock().await;
                for (_, tx) in map.drain() {
                    let _ = tx.send(Err(anyhow::anyhow!("mpv IPC connection closed")));
                }
                break;
            }
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let val: Value = match serde_json::from_str(trimmed) {
                    Ok(v) => v,
                    Err(e) => {
                        debug!("mpv reader: invalid json '{}': {}", trimmed, e);
                        continue;
                    }
                };

                if let Some(req_id) = val.get("request_id").and_then(|v| v.as_u64()) {
                    let mut map = pending.lock().await;
                    if let Some(tx) = map.remove(&req_id) {
                        let result = if val["error"].as_str() == Some("success") {
                            Ok(val)
                        } else {
                            let err = val["error"]
                                .as_str()
                                .unwrap_or("unknown error")
                                .to_string();
                            debug!("mpv reader: response req={} err={}", req_id, err);
                            Err(anyhow::anyhow!("mpv error: {}", err))
                        };
                        let _ = tx.send(result);
                    } else {
                        debug!("mpv reader: response for unknown req={}", req_id);
                    }
                } else {
                    let _ = event_tx.send(MpvEvent { raw: val }).await;
                }
            }
            Err(e) => {
                warn!("mpv reader: read error: {}", e);
                let mut map = pending.lock().await;
                for (_, tx) in map.drain() {
                    let _ = tx.send(Err(anyhow::anyhow!("mpv IPC read error: {}", e)));
                }
                break;
            }
        }
    }
}

// ── writer task ───────────────────────────────────────────────────────────────

async fn writer_task<W>(
    mut writer: W,
    mut rx: mpsc::Receiver<PendingRequest>,
    pending: Arc<Mutex<HashMap<u64, oneshot::Sender<anyhow::Result<Value>>>>>,
) where
    W: tokio::io::AsyncWrite + Unpin,
{
    while let Some(req) = rx.recv().await {
        // Register reply channel before writing so reader can match it
        {
            let mut map = pending.lock().await;
            map.insert(req.req_id, req.reply);
        }
        if let Err(e) = writer.write_all(req.payload.as_bytes()).await {
            warn!("mpv writer: write error: {}", e);
            let mut map = pending.lock().await;
            if let Some(tx) = map.remove(&req.req_id) {
                let _ = tx.send(Err(anyhow::anyhow!("mpv write error: {}", e)));
            }
            break;
        }
    }
    debug!("mpv writer: task exiting");
}

// ── domain wrappers (used by EngineCore / ChainManager) ───────────────────────

impl MpvHandle {
    pub async fn get_property(&self, name: &str) -> anyhow::Result<Value> {
        let resp = self.send(json!(["get_property", name])).await?;
        Ok(resp["data"].clone())
    }

    pub async fn set_property(&self, name: &str, value: Value) -> anyhow::Result<()> {
        self.send(json!(["set_property", name, value])).await?;
        Ok(())
    }

    /// Identity of the playlist entry currently loaded, or None when idle.
    pub async fn current_track(&self) -> Option<TrackBinding> {
        let pos = self.get_property("playlist-pos").await.ok()?.as_i64()?;
        if pos < 0 {
            return None;
        }
        let entry_id = self
            .get_property(&format!("playlist/{}/id", pos))
            .await
            .ok()?
            .as_i64()?;
        let path = self
            .get_property("path")
            .await
            .ok()?
            .as_str()?
            .to_string();
        Some(TrackBinding { entry_id, path })
    }

    pub async fn set_speed(&self, speed: f64) -> anyhow::Result<()> {
        self.set_property("speed", json!(speed)).await
    }

    /// Pitch-preservation flag. mpv keeps a single property; there are no
    /// vendor-prefixed aliases to mirror here.
    pub async fn set_pitch_correction(&self, on: bool) -> anyhow::Result<()> {
        self.set_property("audio-pitch-correction", json!(on)).await
    }

    pub async fn get_pitch_correction(&self) -> Option<bool> {
        self.get_property("audio-pitch-correction").await.ok()?.as_bool()
    }

    pub async fn cycle_pause(&self) -> anyhow::Result<()> {
        self.send(json!(["cycle", "pause"])).await?;
        Ok(())
    }

    pub async fn seek_relative(&self, secs: f64) -> anyhow::Result<()> {
        self.send(json!(["seek", secs, "relative"])).await?;
        Ok(())
    }

    /// Best-effort transport jumps — the playlist may have no neighbour.
    pub async fn playlist_next(&self) {
        if let Err(e) = self.send(json!(["playlist-next", "weak"])).await {
            debug!("mpv: playlist-next: {}", e);
        }
    }

    pub async fn playlist_prev(&self) {
        if let Err(e) = self.send(json!(["playlist-prev", "weak"])).await {
            debug!("mpv: playlist-prev: {}", e);
        }
    }

    /// Insert our labeled two-stage chain into the `af` property. Filters
    /// another frontend put there stay; only stale copies of our own labels
    /// are replaced.
    pub async fn install_filter_chain(
        &self,
        bass_graph: &str,
        gain_graph: &str,
    ) -> anyhow::Result<()> {
        let existing = self.get_property("af").await.unwrap_or(Value::Null);
        self.set_property("af", merged_filter_list(&existing, bass_graph, gain_graph))
            .await
    }

    /// Labels currently present in the player's `af` list.
    pub async fn filter_labels(&self) -> Vec<String> {
        let Ok(af) = self.get_property("af").await else {
            return Vec::new();
        };
        af.as_array()
            .map(|filters| {
                filters
                    .iter()
                    .filter_map(|f| f.get("label").and_then(|l| l.as_str()))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Send a runtime command to one of our labeled filters
    /// (e.g. `af-command mixgain volume 1.5`).
    pub async fn filter_command(&self, label: &str, cmd: &str, value: &str) -> anyhow::Result<()> {
        self.send(json!(["af-command", label, cmd, value])).await?;
        Ok(())
    }

    /// Strip our labels from `af`, leaving foreign filters in place.
    /// Skipped entirely when the current list cannot be read; writing a
    /// guessed list could drop filters that are not ours.
    pub async fn remove_filter_chain(&self) {
        let existing = match self.get_property("af").await {
            Ok(v) => v,
            Err(e) => {
                debug!("mpv: reading af for removal failed: {}", e);
                return;
            }
        };
        if let Err(e) = self
            .set_property("af", without_chain_labels(&existing))
            .await
        {
            debug!("mpv: removing chain filters failed: {}", e);
        }
    }

    /// Register observe_property for everything mixtool reacts to.
    /// Must be called after every fresh connection and after file-loaded
    /// (mpv then pushes current values immediately).
    pub async fn observe_all_properties(&self) {
        let props = [
            (OBS_SPEED, "speed"),
            (OBS_PAUSE, "pause"),
            (OBS_TIME_POS, "time-pos"),
            (OBS_DURATION, "duration"),
        ];
        for (id, name) in &props {
            match self.send(json!(["observe_property", id, name])).await {
                Ok(_) => debug!("mpv: observe_property id={} name={}", id, name),
                Err(e) => warn!("mpv: observe_property {} failed: {}", name, e),
            }
        }
    }

    /// Health-check: returns Ok(()) if mpv is responsive.
    pub async fn ping(&self) -> anyhow::Result<()> {
        self.send(json!(["get_property", "mpv-version"])).await?;
        Ok(())
    }
}

// ── af list editing ───────────────────────────────────────────────────────────

fn has_chain_label(filter: &Value) -> bool {
    matches!(
        filter.get("label").and_then(Value::as_str),
        Some(l) if l == BASS_LABEL || l == GAIN_LABEL
    )
}

/// New `af` list with our two filters appended. Foreign filters are kept in
/// order; stale copies of our own labels are dropped first.
fn merged_filter_list(existing: &Value, bass_graph: &str, gain_graph: &str) -> Value {
    let mut filters: Vec<Value> = existing
        .as_array()
        .map(|a| a.iter().filter(|f| !has_chain_label(f)).cloned().collect())
        .unwrap_or_default();
    filters.push(json!({
        "name": "lavfi",
        "label": BASS_LABEL,
        "params": { "graph": bass_graph }
    }));
    filters.push(json!({
        "name": "lavfi",
        "label": GAIN_LABEL,
        "params": { "graph": gain_graph }
    }));
    Value::Array(filters)
}

/// New `af` list with our labels removed and everything else untouched.
fn without_chain_labels(existing: &Value) -> Value {
    Value::Array(
        existing
            .as_array()
            .map(|a| a.iter().filter(|f| !has_chain_label(f)).cloned().collect())
            .unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels_of(list: &Value) -> Vec<String> {
        list.as_array()
            .unwrap()
            .iter()
            .filter_map(|f| f.get("label").and_then(Value::as_str))
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn install_keeps_foreign_filters() {
        let existing = json!([
            { "name": "lavfi", "label": "theirviz", "params": { "graph": "astats" } }
        ]);
        let merged = merged_filter_list(&existing, "lowshelf=g=3.00:f=200", "volume=1.0000");
        assert_eq!(labels_of(&merged), vec!["theirviz", BASS_LABEL, GAIN_LABEL]);
    }

    #[test]
    fn install_replaces_stale_copies_of_our_labels() {
        let existing = json!([
            { "name": "lavfi", "label": GAIN_LABEL, "params": { "graph": "volume=0.5000" } },
            { "name": "lavfi", "label": "theirviz", "params": { "graph": "astats" } },
            { "name": "lavfi", "label": BASS_LABEL, "params": { "graph": "lowshelf=g=9.00:f=200" } }
        ]);
        let merged = merged_filter_list(&existing, "lowshelf=g=3.00:f=200", "volume=1.0000");
        assert_eq!(labels_of(&merged), vec!["theirviz", BASS_LABEL, GAIN_LABEL]);
        let graphs: Vec<&str> = merged
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|f| f["params"]["graph"].as_str())
            .collect();
        assert!(graphs.contains(&"lowshelf=g=3.00:f=200"));
        assert!(!graphs.contains(&"volume=0.5000"));
    }

    #[test]
    fn install_into_empty_or_unset_af() {
        let merged = merged_filter_list(&Value::Null, "lowshelf=g=0.00:f=200", "volume=1.0000");
        assert_eq!(labels_of(&merged), vec![BASS_LABEL, GAIN_LABEL]);
    }

    #[test]
    fn removal_strips_only_our_labels() {
        let existing = json!([
            { "name": "lavfi", "label": "theirviz", "params": { "graph": "astats" } },
            { "name": "lavfi", "label": BASS_LABEL, "params": { "graph": "lowshelf=g=3.00:f=200" } },
            { "name": "lavfi", "label": GAIN_LABEL, "params": { "graph": "volume=1.0000" } }
        ]);
        let kept = without_chain_labels(&existing);
        assert_eq!(labels_of(&kept), vec!["theirviz"]);
    }
}
