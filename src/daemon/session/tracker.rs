use std::{path::PathBuf, sync::Arc};

use chrono::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::{
    daemon::{
        collection::ticker::TickScheduler,
        storage::{entities::SessionRecord, session_archive::SessionArchive},
    },
    input_api::InputSource,
    utils::clock::Clock,
};

use super::{Lifecycle, Session};

/// Outcome of archiving the last stopped session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveNotice {
    Saved(PathBuf),
    SaveFailed(String),
}

/// What subscribers of the tracker see.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub session: Session,
    pub notice: Option<ArchiveNotice>,
}

/// Drives a [Session] through `Idle -> Running <-> Paused -> Idle`. Owns the timers and the
/// input listener of the session and hands finished sessions to the archive.
pub struct SessionTracker<A: SessionArchive> {
    session: Session,
    epoch: u64,
    notice: Option<ArchiveNotice>,
    input: Box<dyn InputSource>,
    timers: Box<dyn TickScheduler>,
    archive: A,
    clock: Arc<dyn Clock>,
    inactivity_threshold: Duration,
    publisher: watch::Sender<SessionSnapshot>,
}

impl<A: SessionArchive> SessionTracker<A> {
    pub fn new(
        input: Box<dyn InputSource>,
        timers: Box<dyn TickScheduler>,
        archive: A,
        clock: Arc<dyn Clock>,
        inactivity_threshold: Duration,
    ) -> Self {
        let (publisher, _) = watch::channel(SessionSnapshot::default());
        Self {
            session: Session::default(),
            epoch: 0,
            notice: None,
            input,
            timers,
            archive,
            clock,
            inactivity_threshold,
            publisher,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.publisher.subscribe()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Identifies the timers of the current session.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn set_inactivity_threshold(&mut self, threshold: Duration) {
        self.inactivity_threshold = threshold;
    }

    pub fn toggle_start_pause(&mut self) {
        match self.session.lifecycle() {
            Lifecycle::Idle => self.start(),
            Lifecycle::Running => self.pause(),
            Lifecycle::Paused => self.resume(),
        }
    }

    pub fn start(&mut self) {
        if self.session.is_running {
            debug!("Session is already running");
            return;
        }

        let now = self.clock.time();
        self.session = Session::started(now);
        self.notice = None;
        self.epoch += 1;
        self.timers.start(self.epoch);
        self.start_listening();
        info!("Started session at {now}");
        self.publish();
    }

    pub fn pause(&mut self) {
        if self.session.lifecycle() != Lifecycle::Running {
            return;
        }
        self.session.is_paused = true;
        self.input.stop();
        info!("Paused session");
        self.publish();
    }

    /// The pause itself is never counted as inactivity.
    pub fn resume(&mut self) {
        if self.session.lifecycle() != Lifecycle::Paused {
            return;
        }
        self.session.is_paused = false;
        self.session.last_action_time = Some(self.clock.time());
        self.start_listening();
        info!("Resumed session");
        self.publish();
    }

    /// Stops a running or paused session and archives it. Does nothing when idle. A failed write
    /// is logged and reported to subscribers, the record is returned either way.
    pub async fn stop(&mut self) -> Option<SessionRecord> {
        if !self.session.is_running {
            debug!("No session to stop");
            return None;
        }

        self.session.is_running = false;
        self.session.is_paused = false;
        self.timers.stop();
        self.input.stop();

        let now = self.clock.time();
        self.session.session_end = Some(now);
        self.session.flush_partial_minute(now);

        let record = self.session.to_record()?;
        info!(
            "Stopped session with {} actions over {}s",
            record.total_actions, record.total_time
        );

        self.notice = Some(match self.archive.persist(&record).await {
            Ok(path) => ArchiveNotice::Saved(path),
            Err(e) => {
                error!("Error logging session {e:?}");
                ArchiveNotice::SaveFailed(format!("{e:#}"))
            }
        });
        self.publish();
        Some(record)
    }

    pub fn record_action(&mut self) {
        if !self.session.is_counting() {
            return;
        }
        self.session.record_action(self.clock.time());
        self.publish();
    }

    pub fn on_minute_tick(&mut self, epoch: u64) {
        if !self.is_current(epoch) {
            return;
        }
        self.session.close_minute(self.clock.time());
        debug!("Minute closed with {} actions", self.session.current_apm);
        self.publish();
    }

    pub fn on_second_tick(&mut self, epoch: u64) {
        if !self.is_current(epoch) {
            return;
        }
        self.session
            .tick_second(self.clock.time(), self.inactivity_threshold);
        self.publish();
    }

    fn is_current(&self, epoch: u64) -> bool {
        if !self.session.is_running || epoch != self.epoch {
            debug!("Ignoring tick of epoch {epoch}, current is {}", self.epoch);
            return false;
        }
        true
    }

    fn start_listening(&mut self) {
        if let Err(e) = self.input.start() {
            warn!("Input events are unavailable, session continues without counting: {e:?}");
        }
    }

    fn publish(&self) {
        self.publisher.send_replace(SessionSnapshot {
            session: self.session.clone(),
            notice: self.notice.clone(),
        });
    }
}
