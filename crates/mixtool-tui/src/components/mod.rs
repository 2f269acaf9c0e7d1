pub mod control_panel;
pub mod help_overlay;
pub mod launcher;
