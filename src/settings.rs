//! User settings, kept in a small json file next to the history.

use std::{io::ErrorKind, path::Path};

use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{daemon::session::DEFAULT_INACTIVITY_THRESHOLD, hotkeys::HotkeyAction};

/// Longest inactivity threshold accepted, one day.
pub const MAX_INACTIVITY_THRESHOLD_SECS: u64 = 86_400;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Empty means unbound.
    #[serde(default)]
    pub start_pause_hotkey: String,
    /// Empty means unbound.
    #[serde(default)]
    pub stop_hotkey: String,
    #[serde(
        default = "default_inactivity_threshold",
        rename = "inactivityThreshold"
    )]
    pub inactivity_threshold_secs: u64,
}

fn default_inactivity_threshold() -> u64 {
    DEFAULT_INACTIVITY_THRESHOLD.num_seconds() as u64
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            start_pause_hotkey: String::new(),
            stop_hotkey: String::new(),
            inactivity_threshold_secs: default_inactivity_threshold(),
        }
    }
}

impl Settings {
    /// A missing file means default settings.
    pub async fn load(path: &Path) -> Result<Self> {
        match tokio::fs::read(path).await {
            Ok(data) => serde_json::from_slice(&data)
                .with_context(|| format!("Failed to parse settings {path:?}")),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("Failed to read settings {path:?}")),
        }
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let data = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(path, data)
            .await
            .with_context(|| format!("Failed to write settings {path:?}"))
    }

    pub fn hotkey(&self, action: HotkeyAction) -> &str {
        match action {
            HotkeyAction::StartPause => &self.start_pause_hotkey,
            HotkeyAction::Stop => &self.stop_hotkey,
        }
    }

    pub fn set_hotkey(&mut self, action: HotkeyAction, combination: String) {
        match action {
            HotkeyAction::StartPause => self.start_pause_hotkey = combination,
            HotkeyAction::Stop => self.stop_hotkey = combination,
        }
    }

    /// Values outside `1..=MAX_INACTIVITY_THRESHOLD_SECS` come from a hand edited file and fall
    /// back to the default.
    pub fn inactivity_threshold(&self) -> Duration {
        let threshold = Some(self.inactivity_threshold_secs)
            .filter(|v| (1..=MAX_INACTIVITY_THRESHOLD_SECS).contains(v))
            .and_then(|v| i64::try_from(v).ok())
            .and_then(Duration::try_seconds);
        match threshold {
            Some(v) => v,
            None => {
                warn!(
                    "Inactivity threshold of {}s is out of range, using {}s",
                    self.inactivity_threshold_secs,
                    DEFAULT_INACTIVITY_THRESHOLD.num_seconds()
                );
                DEFAULT_INACTIVITY_THRESHOLD
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::Duration;
    use tempfile::tempdir;

    use crate::{daemon::session::DEFAULT_INACTIVITY_THRESHOLD, hotkeys::HotkeyAction};

    use super::{Settings, MAX_INACTIVITY_THRESHOLD_SECS};

    #[tokio::test]
    async fn test_missing_file_is_default() -> Result<()> {
        let dir = tempdir()?;
        let settings = Settings::load(&dir.path().join("settings.json")).await?;
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.inactivity_threshold().num_seconds(), 30);
        Ok(())
    }

    #[tokio::test]
    async fn test_save_and_load() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("settings.json");
        let mut settings = Settings::default();
        settings.set_hotkey(HotkeyAction::StartPause, "⌘⇧O".into());
        settings.inactivity_threshold_secs = 45;

        settings.save(&path).await?;

        let loaded = Settings::load(&path).await?;
        assert_eq!(loaded, settings);
        assert_eq!(loaded.hotkey(HotkeyAction::StartPause), "⌘⇧O");
        assert_eq!(loaded.hotkey(HotkeyAction::Stop), "");
        Ok(())
    }

    #[tokio::test]
    async fn test_keys_and_partial_files() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "stopHotkey": "⌃X" }"#)?;

        let settings = Settings::load(&path).await?;

        assert_eq!(settings.stop_hotkey, "⌃X");
        assert_eq!(settings.start_pause_hotkey, "");
        assert_eq!(settings.inactivity_threshold_secs, 30);

        let value = serde_json::to_value(&settings)?;
        assert!(value.get("startPauseHotkey").is_some());
        assert!(value.get("inactivityThreshold").is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_file_is_an_error() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "[1, 2")?;
        assert!(Settings::load(&path).await.is_err());
        Ok(())
    }

    #[test]
    fn test_threshold_bounds() {
        let with = |secs| Settings {
            inactivity_threshold_secs: secs,
            ..Default::default()
        };

        assert_eq!(with(1).inactivity_threshold(), Duration::seconds(1));
        assert_eq!(
            with(MAX_INACTIVITY_THRESHOLD_SECS).inactivity_threshold(),
            Duration::seconds(86_400)
        );
        assert_eq!(with(0).inactivity_threshold(), DEFAULT_INACTIVITY_THRESHOLD);
        assert_eq!(
            with(MAX_INACTIVITY_THRESHOLD_SECS + 1).inactivity_threshold(),
            DEFAULT_INACTIVITY_THRESHOLD
        );
        assert_eq!(
            with(10_000_000_000_000_000).inactivity_threshold(),
            DEFAULT_INACTIVITY_THRESHOLD
        );
        assert_eq!(
            with(u64::MAX).inactivity_threshold(),
            DEFAULT_INACTIVITY_THRESHOLD
        );
    }

    #[tokio::test]
    async fn test_out_of_range_file_falls_back() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "inactivityThreshold": 18446744073709551615 }"#)?;

        let settings = Settings::load(&path).await?;

        assert_eq!(settings.inactivity_threshold(), DEFAULT_INACTIVITY_THRESHOLD);
        Ok(())
    }
}
