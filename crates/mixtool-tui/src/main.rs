mod action;
mod app;
mod app_state;
mod chain;
mod component;
mod components;
mod engine;
mod mpv;
mod panel_host;
mod theme;
mod widgets;

use tokio::sync::{broadcast, mpsc};

use mixtool_core::params::Parameters;

/// What the EngineCore broadcasts to the UI.
#[derive(Debug, Clone)]
pub enum BroadcastMessage {
    /// The canonical parameters changed (after clamp + save).
    ParamsUpdated(Parameters),
    /// The player-side view changed (health, pause, position, track).
    PlaybackUpdated(engine::PlaybackView),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = mixtool_core::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let log_path = data_dir.join("mixtool.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override; default to debug for app code.
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "debug".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    // Print log path to stderr so the operator can tail it immediately.
    eprintln!("mixtool log: {}", log_path.display());

    tracing::info!("mixtool starting…");

    // ── Load config ──────────────────────────────────────────────────────────
    let config = mixtool_core::config::Config::load().unwrap_or_default();

    // ── Broadcast channel (EngineCore → TUI) ─────────────────────────────────
    let (broadcast_tx, broadcast_rx) = broadcast::channel::<BroadcastMessage>(1024);

    // ── EngineEvent channel (TUI → EngineCore) ───────────────────────────────
    let (event_tx, event_rx) = mpsc::channel::<engine::EngineEvent>(1024);

    // ── Build EngineCore ─────────────────────────────────────────────────────
    let engine_core = engine::EngineCore::new(config, broadcast_tx.clone(), event_tx.clone());
    let initial_params = engine_core.initial_params();

    // ── Spawn EngineCore event loop ──────────────────────────────────────────
    tokio::spawn(async move {
        if let Err(e) = engine_core.run(event_rx).await {
            tracing::error!("EngineCore exited with error: {}", e);
        }
    });

    // ── Run TUI ──────────────────────────────────────────────────────────────
    let app = app::App::new(initial_params, event_tx);
    app.run(broadcast_rx).await?;

    Ok(())
}
