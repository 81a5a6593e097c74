use anyhow::Result;
use module::CommandProcessor;
use tokio::sync::mpsc::Receiver;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::command::TrackerCommand;

pub mod controller;
pub mod module;

/// Drains the command queue into a [CommandProcessor] until shutdown is requested or every
/// sender is gone.
pub struct ProcessingModule<Processor> {
    receiver: Receiver<TrackerCommand>,
    processor: Processor,
    shutdown: CancellationToken,
}

impl<P: CommandProcessor> ProcessingModule<P> {
    pub fn new(receiver: Receiver<TrackerCommand>, processor: P, shutdown: CancellationToken) -> Self {
        Self {
            receiver,
            processor,
            shutdown,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        loop {
            let command = tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown requested");
                    break;
                }
                command = self.receiver.recv() => command,
            };
            let Some(command) = command else {
                break;
            };

            debug!("Processing command {:?}", command);
            if let Err(e) = self.processor.process_next(command).await {
                error!("Error processing command {:?}: {e:?}", command)
            }
        }

        self.receiver.close();
        self.processor.finalize().await
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{anyhow, Result};
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use crate::daemon::command::TrackerCommand;

    use super::{module::CommandProcessor, ProcessingModule};

    #[derive(Default)]
    struct Recorder {
        seen: Vec<TrackerCommand>,
        finalized: bool,
    }

    impl CommandProcessor for &mut Recorder {
        async fn process_next(&mut self, command: TrackerCommand) -> Result<()> {
            self.seen.push(command);
            if command == TrackerCommand::Stop {
                return Err(anyhow!("stop failed"));
            }
            Ok(())
        }

        async fn finalize(&mut self) -> Result<()> {
            self.finalized = true;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_drains_until_senders_are_gone() -> Result<()> {
        let (sender, receiver) = mpsc::channel(8);
        let mut recorder = Recorder::default();
        sender.send(TrackerCommand::ToggleStartPause).await?;
        sender.send(TrackerCommand::Stop).await?;
        sender.send(TrackerCommand::Action).await?;
        drop(sender);

        ProcessingModule::new(receiver, &mut recorder, CancellationToken::new())
            .run()
            .await?;

        assert_eq!(
            recorder.seen,
            vec![
                TrackerCommand::ToggleStartPause,
                TrackerCommand::Stop,
                TrackerCommand::Action
            ]
        );
        assert!(recorder.finalized);
        Ok(())
    }

    #[tokio::test]
    async fn test_shutdown_finalizes() -> Result<()> {
        let (_sender, receiver) = mpsc::channel(8);
        let mut recorder = Recorder::default();
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        ProcessingModule::new(receiver, &mut recorder, shutdown)
            .run()
            .await?;

        assert!(recorder.seen.is_empty());
        assert!(recorder.finalized);
        Ok(())
    }
}
