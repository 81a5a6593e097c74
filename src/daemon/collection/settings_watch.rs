use std::{path::PathBuf, sync::Arc, time::Duration, time::SystemTime};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{daemon::command::TrackerCommand, utils::clock::Clock};

pub const SETTINGS_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// What is compared between polls. A missing file is [None].
type Stamp = Option<(SystemTime, u64)>;

/// Posts [TrackerCommand::ReloadHotkeys] whenever the settings file changes on disk.
pub struct SettingsWatcher {
    path: PathBuf,
    next: mpsc::Sender<TrackerCommand>,
    clock: Arc<dyn Clock>,
    shutdown: CancellationToken,
    interval: Duration,
    last_seen: Stamp,
}

impl SettingsWatcher {
    pub fn new(
        path: PathBuf,
        next: mpsc::Sender<TrackerCommand>,
        clock: Arc<dyn Clock>,
        shutdown: CancellationToken,
        interval: Duration,
    ) -> Self {
        Self {
            path,
            next,
            clock,
            shutdown,
            interval,
            last_seen: None,
        }
    }

    async fn stamp(&self) -> Stamp {
        match tokio::fs::metadata(&self.path).await {
            Ok(metadata) => Some((metadata.modified().ok()?, metadata.len())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!("Failed to inspect settings {:?}: {e}", self.path);
                self.last_seen
            }
        }
    }

    /// Returns true when the file differs from the previous poll.
    async fn poll_changed(&mut self) -> bool {
        let stamp = self.stamp().await;
        let changed = stamp != self.last_seen;
        self.last_seen = stamp;
        changed
    }

    pub async fn run(mut self) {
        // The daemon loads settings on start, only later changes matter.
        self.last_seen = self.stamp().await;
        info!("Watching settings at {:?}", self.path);

        let mut poll_point = self.clock.instant();
        loop {
            poll_point += self.interval;
            tokio::select! {
                _ = self.shutdown.cancelled() => return,
                _ = self.clock.sleep_until(poll_point) => ()
            }

            if self.poll_changed().await {
                debug!("Settings changed");
                if self.next.send(TrackerCommand::ReloadHotkeys).await.is_err() {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use anyhow::Result;
    use tempfile::tempdir;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use crate::{daemon::command::TrackerCommand, utils::clock::DefaultClock};

    use super::SettingsWatcher;

    #[tokio::test]
    async fn test_poll_detects_changes() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("settings.json");
        let (sender, _receiver) = mpsc::channel(4);
        let mut watcher = SettingsWatcher::new(
            path.clone(),
            sender,
            Arc::new(DefaultClock),
            CancellationToken::new(),
            Duration::from_millis(10),
        );

        assert!(!watcher.poll_changed().await);

        std::fs::write(&path, "{}")?;
        assert!(watcher.poll_changed().await);
        assert!(!watcher.poll_changed().await);

        std::fs::write(&path, "{ \"stopHotkey\": \"⌘X\" }")?;
        assert!(watcher.poll_changed().await);

        std::fs::remove_file(&path)?;
        assert!(watcher.poll_changed().await);
        Ok(())
    }

    #[tokio::test]
    async fn test_run_posts_reload() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{}")?;
        let (sender, mut receiver) = mpsc::channel(4);
        let shutdown = CancellationToken::new();
        let watcher = SettingsWatcher::new(
            path.clone(),
            sender,
            Arc::new(DefaultClock),
            shutdown.clone(),
            Duration::from_millis(10),
        );
        let handle = tokio::spawn(watcher.run());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(receiver.try_recv().is_err());

        std::fs::write(&path, "{ \"startPauseHotkey\": \"⌘⇧O\" }")?;
        let command = tokio::time::timeout(Duration::from_secs(5), receiver.recv()).await?;
        assert_eq!(command, Some(TrackerCommand::ReloadHotkeys));

        shutdown.cancel();
        handle.await?;
        Ok(())
    }
}
