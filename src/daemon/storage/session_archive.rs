use std::{
    future::{self, Future},
    io::ErrorKind,
    ops::Deref,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use tokio_stream::wrappers::ReadDirStream;
use tracing::{debug, info, warn};

use crate::utils::time::session_file_name;

use super::entities::SessionRecord;

/// Amount of session files decoded at the same time while listing.
const CONCURRENT_READS: usize = 8;

/// Interface for abstracting storage of finished sessions.
pub trait SessionArchive {
    /// Writes a record into its own file. Returns the path of the written file.
    fn persist(&self, record: &SessionRecord) -> impl Future<Output = Result<PathBuf>>;

    /// Reads every stored session, most recent first. Files that can't be decoded are reported in
    /// [ArchiveListing::skipped] instead of failing the whole listing.
    fn list_all(&self) -> impl Future<Output = Result<ArchiveListing>>;

    /// Removes the file of a record, if there is one, and returns the fresh listing.
    fn delete(&self, record: &SessionRecord) -> impl Future<Output = Result<ArchiveListing>>;
}

impl<T: Deref> SessionArchive for T
where
    T::Target: SessionArchive,
{
    fn persist(&self, record: &SessionRecord) -> impl Future<Output = Result<PathBuf>> {
        self.deref().persist(record)
    }

    fn list_all(&self) -> impl Future<Output = Result<ArchiveListing>> {
        self.deref().list_all()
    }

    fn delete(&self, record: &SessionRecord) -> impl Future<Output = Result<ArchiveListing>> {
        self.deref().delete(record)
    }
}

#[derive(Debug, Default)]
pub struct ArchiveListing {
    pub sessions: Vec<SessionRecord>,
    pub skipped: Vec<SkippedFile>,
}

/// A file in the history directory that looked like a session but couldn't be read.
#[derive(Debug)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// The main realization of [SessionArchive].
pub struct SessionArchiveImpl {
    history_dir: PathBuf,
}

impl SessionArchiveImpl {
    /// The directory is created lazily on the first write.
    pub fn new(history_dir: PathBuf) -> Self {
        Self { history_dir }
    }

    pub fn session_path(&self, session_start: DateTime<Utc>) -> PathBuf {
        self.history_dir.join(session_file_name(session_start))
    }
}

async fn read_record(path: &Path) -> Result<SessionRecord> {
    let data = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&data)?)
}

impl SessionArchive for SessionArchiveImpl {
    async fn persist(&self, record: &SessionRecord) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.history_dir)
            .await
            .with_context(|| format!("Failed to create history directory {:?}", self.history_dir))?;

        let path = self.session_path(record.session_start);
        let data = serde_json::to_vec_pretty(record)?;
        tokio::fs::write(&path, data)
            .await
            .with_context(|| format!("Failed to write session {path:?}"))?;

        info!("Session logged at {path:?}");
        Ok(path)
    }

    async fn list_all(&self) -> Result<ArchiveListing> {
        let entries = match tokio::fs::read_dir(&self.history_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("History directory {:?} doesn't exist yet", self.history_dir);
                return Ok(ArchiveListing::default());
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read history directory {:?}", self.history_dir)
                })
            }
        };

        let results = ReadDirStream::new(entries)
            .filter_map(|entry| {
                future::ready(match entry {
                    Ok(entry) => Some(entry.path()),
                    Err(e) => {
                        warn!("Failed to read a history entry {e}");
                        None
                    }
                })
            })
            .filter(|path| future::ready(path.extension().is_some_and(|ext| ext == "json")))
            .map(|path| async move {
                let record = read_record(&path).await;
                (path, record)
            })
            .buffered(CONCURRENT_READS)
            .collect::<Vec<_>>()
            .await;

        let mut listing = ArchiveListing::default();
        for (path, record) in results {
            match record {
                Ok(record) => listing.sessions.push(record),
                Err(e) => {
                    warn!("Skipping session file {path:?}: {e:#}");
                    listing.skipped.push(SkippedFile {
                        path,
                        reason: format!("{e:#}"),
                    });
                }
            }
        }

        listing
            .sessions
            .sort_by(|a, b| b.session_start.cmp(&a.session_start));
        Ok(listing)
    }

    async fn delete(&self, record: &SessionRecord) -> Result<ArchiveListing> {
        let path = self.session_path(record.session_start);
        match tokio::fs::remove_file(&path).await {
            Ok(_) => info!("Deleted session {path:?}"),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Session {path:?} is already gone")
            }
            Err(e) => return Err(e).with_context(|| format!("Failed to delete session {path:?}")),
        }
        self.list_all().await
    }
}
