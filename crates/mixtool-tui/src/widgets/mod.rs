pub mod slider;
pub mod toast;
