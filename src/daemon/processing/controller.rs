use std::path::PathBuf;

use anyhow::Result;
use tracing::info;

use crate::{
    daemon::{
        command::TrackerCommand, session::tracker::SessionTracker,
        storage::session_archive::SessionArchive,
    },
    hotkeys::{HotkeyBindings, HotkeyRegistrar},
    settings::Settings,
};

use super::module::CommandProcessor;

/// Applies commands to the tracker and keeps hotkeys in line with the settings file.
pub struct Controller<A: SessionArchive, R: HotkeyRegistrar> {
    tracker: SessionTracker<A>,
    hotkeys: HotkeyBindings<R>,
    settings_path: PathBuf,
}

impl<A: SessionArchive, R: HotkeyRegistrar> Controller<A, R> {
    pub fn new(tracker: SessionTracker<A>, hotkeys: HotkeyBindings<R>, settings_path: PathBuf) -> Self {
        Self {
            tracker,
            hotkeys,
            settings_path,
        }
    }

    pub fn tracker(&self) -> &SessionTracker<A> {
        &self.tracker
    }

    pub fn hotkeys(&self) -> &HotkeyBindings<R> {
        &self.hotkeys
    }

    pub async fn reload_settings(&mut self) -> Result<()> {
        let settings = Settings::load(&self.settings_path).await?;
        info!("Reloading settings from {:?}", self.settings_path);
        self.tracker
            .set_inactivity_threshold(settings.inactivity_threshold());
        self.hotkeys.reload(&settings);
        Ok(())
    }
}

impl<A: SessionArchive, R: HotkeyRegistrar> CommandProcessor for Controller<A, R> {
    async fn process_next(&mut self, command: TrackerCommand) -> Result<()> {
        match command {
            TrackerCommand::Action => self.tracker.record_action(),
            TrackerCommand::MinuteTick { epoch } => self.tracker.on_minute_tick(epoch),
            TrackerCommand::SecondTick { epoch } => self.tracker.on_second_tick(epoch),
            TrackerCommand::ToggleStartPause => self.tracker.toggle_start_pause(),
            TrackerCommand::Stop => {
                self.tracker.stop().await;
            }
            TrackerCommand::ReloadHotkeys => self.reload_settings().await?,
        }
        Ok(())
    }

    /// A session still running at shutdown is stopped and archived.
    async fn finalize(&mut self) -> Result<()> {
        if self.tracker.stop().await.is_some() {
            info!("Saved the active session before shutting down");
        }
        self.hotkeys.clear();
        Ok(())
    }
}
