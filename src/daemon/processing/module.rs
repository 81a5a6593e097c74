use anyhow::Result;

use crate::daemon::command::TrackerCommand;

/// Consumer of the command queue. Implementations are the single writer of whatever state the
/// commands change.
pub trait CommandProcessor {
    fn process_next(
        &mut self,
        command: TrackerCommand,
    ) -> impl std::future::Future<Output = Result<()>>;

    /// Called once after the queue stops being drained.
    fn finalize(&mut self) -> impl std::future::Future<Output = Result<()>>;
}
