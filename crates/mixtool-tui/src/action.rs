//! Action enum — all user-initiated intents and internal events.

use crate::engine::ParamCommand;

/// All actions that can flow through the system.
/// Components produce Actions; the App dispatches them.
#[derive(Debug, Clone)]
pub enum Action {
    // ── Engine ───────────────────────────────────────────────────────────────
    /// Forward a command to the engine loop.
    Engine(ParamCommand),

    // ── Panel ────────────────────────────────────────────────────────────────
    /// Open the panel if hidden, focus it if already open.
    TogglePanel,
    ClosePanel,
    /// Move the panel into its own floating window.
    DetachPanel,
    /// Return the detached panel to its docked spot.
    ReattachPanel,
    /// Nudge the docked panel by (dx, dy) cells.
    MovePanel(i16, i16),

    // ── UI toggles ───────────────────────────────────────────────────────────
    ToggleHelp,
    Toast(String, crate::widgets::toast::Severity),

    // ── System ───────────────────────────────────────────────────────────────
    Quit,
}
