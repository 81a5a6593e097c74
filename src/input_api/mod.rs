//! Contains logic for observing global input. [GenericInputSource] is the main artifact of this
//! module that abstracts the operations.

#[cfg(feature = "input")]
pub mod rdev;

use anyhow::{anyhow, Result};
use tokio::sync::mpsc;

use crate::daemon::command::TrackerCommand;

/// Intended to serve as a contract platform listeners must implement. While started, every
/// key-down, left-mouse-down and right-mouse-down is posted as [TrackerCommand::Action].
#[cfg_attr(test, mockall::automock)]
pub trait InputSource {
    fn start(&mut self) -> Result<()>;

    fn stop(&mut self);
}

/// Serves as a cross-compatible InputSource implementation.
pub struct GenericInputSource {
    inner: Box<dyn InputSource>,
}

impl GenericInputSource {
    pub fn new(next: mpsc::Sender<TrackerCommand>) -> Self {
        cfg_if::cfg_if! {
            if #[cfg(feature = "input")] {
                Self {
                    inner: Box::new(rdev::RdevInputSource::new(next)),
                }
            } else {
                drop(next);
                Self {
                    inner: Box::new(DisabledInputSource),
                }
            }
        }
    }
}

impl InputSource for GenericInputSource {
    fn start(&mut self) -> Result<()> {
        self.inner.start()
    }

    fn stop(&mut self) {
        self.inner.stop()
    }
}

/// Used when the application is built without input monitoring. Sessions still run, they just
/// never count an action.
pub struct DisabledInputSource;

impl InputSource for DisabledInputSource {
    fn start(&mut self) -> Result<()> {
        Err(anyhow!(
            "built without the `input` feature, actions won't be counted"
        ))
    }

    fn stop(&mut self) {}
}
