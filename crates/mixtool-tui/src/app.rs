//! App — component-based event loop.
//!
//! Architecture:
//! - `App` owns all components and `AppState` (shared read-only data for components).
//! - A `tokio::mpsc` channel carries `AppMessage` events in from background tasks.
//! - The event loop draws each frame, then awaits the next message.
//! - Components return `Vec<Action>`; App dispatches each Action.
//! - Commands to the engine flow out through a separate `cmd_tx` channel.

use std::io;
use std::time::Duration;

use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use mixtool_core::params::Parameters;

use crate::{
    action::Action,
    app_state::AppState,
    component::Component,
    components::{control_panel::ControlPanel, help_overlay::HelpOverlay, launcher::Launcher},
    engine::{EngineEvent, ParamCommand, PlaybackView, PlayerHealth},
    panel_host::{DetachError, PanelHost},
    widgets::toast::ToastManager,
    BroadcastMessage,
};

// ── Internal event bus ────────────────────────────────────────────────────────

enum AppMessage {
    Event(Event),
    ParamsUpdated(Parameters),
    PlaybackUpdated(PlaybackView),
}

// ── App ───────────────────────────────────────────────────────────────────────

pub struct App {
    /// Shared state (passed read-only to components).
    state: AppState,

    panel_host: PanelHost,
    launcher: Launcher,
    help_overlay: HelpOverlay,
    toast: ToastManager,

    cmd_tx: mpsc::Sender<EngineEvent>,
    should_quit: bool,

    /// Last-drawn terminal rect — used for panel placement and detach checks.
    last_area: Rect,

    /// Previous player health — used to detect transitions for toasts.
    prev_health: PlayerHealth,
}

impl App {
    pub fn new(initial_params: Parameters, cmd_tx: mpsc::Sender<EngineEvent>) -> Self {
        Self {
            state: AppState::new(initial_params),
            panel_host: PanelHost::new(),
            launcher: Launcher::new(),
            help_overlay: HelpOverlay::new(),
            toast: ToastManager::new(),
            cmd_tx,
            should_quit: false,
            last_area: Rect::default(),
            prev_health: PlayerHealth::Absent,
        }
    }

    // ── Main run loop ─────────────────────────────────────────────────────────

    pub async fn run(
        mut self,
        mut broadcast_rx: broadcast::Receiver<BroadcastMessage>,
    ) -> anyhow::Result<()> {
        debug!("run(): enabling raw mode");
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("run(): terminal created, size={:?}", terminal.size());

        let (tx, mut rx) = mpsc::channel::<AppMessage>(1024);

        // ── Background task: keyboard events ──────────────────────────────────
        let event_tx = tx.clone();
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if event_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        // ── Background task: broadcast receiver (EngineCore → AppMessage) ──────
        let bc_tx = tx.clone();
        tokio::spawn(async move {
            loop {
                match broadcast_rx.recv().await {
                    Ok(msg) => {
                        let app_msg = match msg {
                            BroadcastMessage::ParamsUpdated(p) => AppMessage::ParamsUpdated(p),
                            BroadcastMessage::PlaybackUpdated(v) => AppMessage::PlaybackUpdated(v),
                        };
                        if bc_tx.send(app_msg).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("broadcast receiver lagged by {} messages", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        // Toast expiry check
        let mut toast_tick = tokio::time::interval(Duration::from_millis(100));
        toast_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // ── Main loop ─────────────────────────────────────────────────────────
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
            }
            needs_redraw = false;

            if self.should_quit {
                break;
            }

            tokio::select! {
                Some(msg) = rx.recv() => {
                    needs_redraw = self.handle_message(msg).await;
                }

                _ = toast_tick.tick() => {
                    if !self.toast.is_empty() {
                        self.toast.tick();
                        needs_redraw = true;
                    }
                }
            }
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        let _ = self.cmd_tx.send(EngineEvent::Shutdown).await;
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        info!("ui: exited cleanly");
        Ok(())
    }

    // ── Message handling ──────────────────────────────────────────────────────

    /// Returns true when a redraw is needed.
    async fn handle_message(&mut self, msg: AppMessage) -> bool {
        match msg {
            AppMessage::Event(Event::Key(key)) => {
                let actions = self.route_key(key);
                for action in actions {
                    self.dispatch(action).await;
                }
                true
            }
            AppMessage::Event(Event::Resize(w, h)) => {
                self.last_area = Rect {
                    x: 0,
                    y: 0,
                    width: w,
                    height: h,
                };
                // A detached window that no longer fits closes like the
                // explicit close path: panel back to the main surface, hidden.
                if self.panel_host.is_detached() && !PanelHost::detached_fits(self.last_area) {
                    self.panel_host.close();
                    self.toast.warning("terminal too small, panel closed");
                }
                true
            }
            AppMessage::Event(_) => false,
            AppMessage::ParamsUpdated(params) => {
                self.state.params = params;
                true
            }
            AppMessage::PlaybackUpdated(view) => {
                self.health_transition_toast(&view.health);
                self.state.playback = view;
                true
            }
        }
    }

    fn route_key(&mut self, key: KeyEvent) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return Vec::new();
        }

        // Help overlay consumes everything while open.
        if self.help_overlay.visible {
            return self.help_overlay.handle_key(key, &self.state);
        }

        // Global keys.
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return vec![Action::Quit];
            }
            KeyCode::Char('q') => return vec![Action::Quit],
            KeyCode::Char('?') => return vec![Action::ToggleHelp],
            KeyCode::Char('m') => return vec![Action::TogglePanel],
            _ => {}
        }

        // The panel gets the key when open; the launcher otherwise.
        if let Some(panel) = self.panel_host.active_mut() {
            panel.handle_key(key, &self.state)
        } else {
            self.launcher.handle_key(key, &self.state)
        }
    }

    async fn dispatch(&mut self, action: Action) {
        match action {
            Action::Engine(cmd) => self.dispatch_engine(cmd).await,
            Action::TogglePanel => {
                self.panel_host.open_or_focus();
            }
            Action::ClosePanel => {
                self.panel_host.close();
            }
            Action::DetachPanel => match self.panel_host.detach(self.last_area) {
                Ok(()) => self.toast.info("panel detached (a to re-dock)"),
                Err(DetachError::Closed) => {}
                Err(e @ DetachError::TooSmall { .. }) => self.toast.error(e.to_string()),
            },
            Action::ReattachPanel => {
                self.panel_host.reattach();
            }
            Action::MovePanel(dx, dy) => {
                let area = self.last_area;
                let max_x = area.width.saturating_sub(ControlPanel::frame_width());
                let max_y = area.height.saturating_sub(ControlPanel::frame_height());
                let x = self
                    .state
                    .params
                    .pos_x
                    .saturating_add_signed(dx)
                    .min(max_x);
                let y = self
                    .state
                    .params
                    .pos_y
                    .saturating_add_signed(dy)
                    .min(max_y);
                self.dispatch_engine(ParamCommand::SetPosition(x, y)).await;
            }
            Action::ToggleHelp => {
                self.help_overlay.toggle();
            }
            Action::Toast(msg, severity) => {
                self.toast.show(msg, severity);
            }
            Action::Quit => {
                self.should_quit = true;
            }
        }
    }

    async fn dispatch_engine(&mut self, cmd: ParamCommand) {
        if self
            .cmd_tx
            .send(EngineEvent::Command(cmd))
            .await
            .is_err()
        {
            warn!("ui: engine channel closed");
        }
    }

    fn health_transition_toast(&mut self, health: &PlayerHealth) {
        if *health == self.prev_health {
            return;
        }
        match health {
            PlayerHealth::Running => self.toast.success("player connected"),
            PlayerHealth::Dead => self.toast.error("player connection lost"),
            PlayerHealth::Starting => self.toast.info("starting player…"),
            PlayerHealth::Absent => {}
        }
        self.prev_health = health.clone();
    }

    // ── Drawing ───────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut Frame) {
        let Self {
            state,
            panel_host,
            launcher,
            help_overlay,
            toast,
            last_area,
            ..
        } = self;

        let area = frame.area();
        *last_area = area;
        let palette = state.palette();

        // Backdrop + status line
        frame.render_widget(
            Block::default().style(Style::default().bg(palette.bg)),
            area,
        );
        draw_status_line(frame, area, state);

        // Bottom hint line
        if area.height >= 2 {
            let hints = Rect {
                x: area.x + 1,
                y: area.y + area.height - 1,
                width: area.width.saturating_sub(2),
                height: 1,
            };
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(
                    "m panel  ? help  q quit",
                    palette.style_muted(),
                ))),
                hints,
            );
        }

        launcher.draw(frame, area, !panel_host.is_open(), state);

        // The panel renders in whichever host owns it.
        if panel_host.is_detached() {
            let window = PanelHost::detached_rect(area);
            frame.render_widget(ratatui::widgets::Clear, window);
            frame.render_widget(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(palette.style_border(true))
                    .title(Span::styled(" mix — window ", palette.style_secondary()))
                    .style(Style::default().bg(palette.bg)),
                window,
            );
            let inner = PanelHost::detached_panel_rect(window);
            if let Some(panel) = panel_host.active_mut() {
                panel.draw(frame, inner, true, state);
            }
        } else {
            let rect = PanelHost::docked_rect(&state.params, area);
            if let Some(panel) = panel_host.active_mut() {
                panel.draw(frame, rect, true, state);
            }
        }

        help_overlay.draw(frame, area, false, state);
        toast.draw(frame, area, palette);
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

    #[tokio::test]
    async fn shrinking_terminal_closes_the_detached_panel() {
        let (tx, _rx) = mpsc::channel(8);
        let mut app = App::new(Parameters::default(), tx);
        app.last_area = term(120, 40);
        app.panel_host.open_or_focus();
        app.panel_host.detach(app.last_area).unwrap();

        let redraw = app
            .handle_message(AppMessage::Event(Event::Resize(30, 8)))
            .await;

        assert!(redraw);
        assert!(!app.panel_host.is_open());
        assert!(!app.panel_host.is_detached());
    }

    #[tokio::test]
    async fn shrinking_terminal_leaves_a_fitting_window_alone() {
        let (tx, _rx) = mpsc::channel(8);
        let mut app = App::new(Parameters::default(), tx);
        app.last_area = term(120, 40);
        app.panel_host.open_or_focus();
        app.panel_host.detach(app.last_area).unwrap();

        app.handle_message(AppMessage::Event(Event::Resize(100, 30)))
            .await;

        assert!(app.panel_host.is_detached());
    }
}

fn draw_status_line(frame: &mut Frame, area: Rect, state: &AppState) {
    if area.height == 0 {
        return;
    }
    let palette = state.palette();
    let line_rect = Rect {
        x: area.x + 1,
        y: area.y,
        width: area.width.saturating_sub(2),
        height: 1,
    };

    let mut spans = vec![Span::styled(
        "mixtool ",
        Style::default()
            .fg(palette.accent)
            .add_modifier(Modifier::BOLD),
    )];

    match state.track_label() {
        Some(track) => {
            let icon = if state.playback.paused { "⏸" } else { "▶" };
            spans.push(Span::styled(format!("{} ", icon), palette.style_default()));
            spans.push(Span::styled(track, palette.style_default()));
            if let Some(time) = state.time_label() {
                spans.push(Span::styled(format!("  {}", time), palette.style_secondary()));
            }
        }
        None => {
            let word = match state.playback.health {
                PlayerHealth::Running => "idle",
                PlayerHealth::Starting => "starting player…",
                PlayerHealth::Dead => "player lost, retrying…",
                PlayerHealth::Absent => "no player",
            };
            spans.push(Span::styled(word, palette.style_muted()));
        }
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), line_rect);
}
