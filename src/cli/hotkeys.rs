use std::path::Path;

use anyhow::Result;
use clap::Parser;

use crate::{
    hotkeys::{combination::KeyCombination, HotkeyAction},
    settings::{Settings, MAX_INACTIVITY_THRESHOLD_SECS},
    utils::dir::SETTINGS_FILE,
};

#[derive(Debug, Parser)]
pub struct HotkeysCommand {
    #[arg(
        long,
        help = "Combination that starts, pauses and resumes a session, e.g. \"⌘⇧O\" or \"cmd+shift+o\""
    )]
    start_pause: Option<KeyCombination>,
    #[arg(long, help = "Combination that stops and saves a session")]
    stop: Option<KeyCombination>,
    #[arg(long, help = "Unbind both actions before applying the other options")]
    clear: bool,
    #[arg(
        long,
        value_parser = clap::value_parser!(u64).range(1..=MAX_INACTIVITY_THRESHOLD_SECS),
        help = "Seconds without actions after which time counts as inactive, at most a day"
    )]
    inactivity: Option<u64>,
}

/// Shows the settings, updating them first when any option is given. A running tracker picks the
/// changes up by itself.
pub async fn process_hotkeys_command(command: HotkeysCommand, app_dir: &Path) -> Result<()> {
    let path = app_dir.join(SETTINGS_FILE);
    let mut settings = Settings::load(&path).await?;

    if apply(&mut settings, &command) {
        settings.save(&path).await?;
        println!("Saved {}", path.display());
    }

    for action in HotkeyAction::ALL {
        let combination = settings.hotkey(action);
        println!(
            "{:<12}{}",
            action.name(),
            if combination.is_empty() {
                "unbound"
            } else {
                combination
            }
        );
    }
    println!("{:<12}{}s", "inactivity", settings.inactivity_threshold_secs);
    Ok(())
}

/// Returns true when something changed.
fn apply(settings: &mut Settings, command: &HotkeysCommand) -> bool {
    let before = settings.clone();
    if command.clear {
        for action in HotkeyAction::ALL {
            settings.set_hotkey(action, String::new());
        }
    }
    for (action, combination) in [
        (HotkeyAction::StartPause, command.start_pause),
        (HotkeyAction::Stop, command.stop),
    ] {
        if let Some(combination) = combination {
            settings.set_hotkey(action, combination.to_string());
        }
    }
    if let Some(inactivity) = command.inactivity {
        settings.inactivity_threshold_secs = inactivity;
    }
    *settings != before
}
