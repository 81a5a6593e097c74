//! Counts keyboard and mouse actions per minute. Sessions are tracked by a small tracker that
//! runs either in the terminal or in the background, and every finished session is archived as
//! a json file that the cli can list, show and delete.
//!

pub mod cli;
pub mod daemon;
pub mod hotkeys;
pub mod input_api;
pub mod settings;
pub mod utils;
