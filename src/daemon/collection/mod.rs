//! Producers of the command queue besides the input listener and the hotkeys.

pub mod console;
pub mod settings_watch;
pub mod ticker;
