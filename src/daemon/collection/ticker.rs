use std::{sync::Arc, time::Duration};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, Instrument};

use crate::{daemon::command::TrackerCommand, utils::clock::Clock};

pub const MINUTE_INTERVAL: Duration = Duration::from_secs(60);
pub const SECOND_INTERVAL: Duration = Duration::from_secs(1);

/// Drives the periodic aggregation of a session. Started when a session starts and stopped when
/// it stops; pausing a session leaves the timers running.
#[cfg_attr(test, mockall::automock)]
pub trait TickScheduler {
    /// Starts both timers, tagging their ticks with `epoch`. Timers of a previous start are
    /// cancelled.
    fn start(&mut self, epoch: u64);

    fn stop(&mut self);
}

/// Two independent timers posting [TrackerCommand::MinuteTick] and
/// [TrackerCommand::SecondTick] into the command queue.
pub struct SessionTimers {
    next: mpsc::Sender<TrackerCommand>,
    clock: Arc<dyn Clock>,
    shutdown: CancellationToken,
    running: Option<CancellationToken>,
}

impl SessionTimers {
    pub fn new(
        next: mpsc::Sender<TrackerCommand>,
        clock: Arc<dyn Clock>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            next,
            clock,
            shutdown,
            running: None,
        }
    }
}

impl TickScheduler for SessionTimers {
    fn start(&mut self, epoch: u64) {
        self.stop();
        let cancel = self.shutdown.child_token();

        tokio::spawn(
            run_timer(
                MINUTE_INTERVAL,
                TrackerCommand::MinuteTick { epoch },
                self.next.clone(),
                self.clock.clone(),
                cancel.clone(),
            )
            .instrument(info_span!("Minute timer", epoch)),
        );
        tokio::spawn(
            run_timer(
                SECOND_INTERVAL,
                TrackerCommand::SecondTick { epoch },
                self.next.clone(),
                self.clock.clone(),
                cancel.clone(),
            )
            .instrument(info_span!("Second timer", epoch)),
        );

        self.running = Some(cancel);
    }

    fn stop(&mut self) {
        if let Some(cancel) = self.running.take() {
            cancel.cancel();
        }
    }
}

impl Drop for SessionTimers {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Sleeps on a fixed grid from the moment it was started, so ticks don't drift with processing
/// time.
async fn run_timer(
    period: Duration,
    command: TrackerCommand,
    next: mpsc::Sender<TrackerCommand>,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
) {
    let mut tick_point = clock.instant();
    loop {
        tick_point += period;

        tokio::select! {
            _ = cancel.cancelled() => {
                return
            }
            _ = clock.sleep_until(tick_point) => ()
        }

        if next.send(command).await.is_err() {
            debug!("Command queue is closed, stopping timer");
            return;
        }
    }
}
