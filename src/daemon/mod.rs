//! The tracker. Every producer (input listener, hotkeys, timers, console, settings watcher) posts
//! [TrackerCommand]s into one queue, drained by a [ProcessingModule] that owns the session.

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use chrono::Duration;
use collection::{
    console::{ConsoleControls, StatusReporter},
    settings_watch::{SettingsWatcher, SETTINGS_POLL_INTERVAL},
    ticker::SessionTimers,
};
use command::TrackerCommand;
use processing::{controller::Controller, ProcessingModule};
use session::tracker::SessionTracker;
use storage::session_archive::{SessionArchive, SessionArchiveImpl};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::{
    hotkeys::{host::HotkeyHost, GenericHotkeyRegistrar, HotkeyBindings, HotkeyRegistrar},
    input_api::{GenericInputSource, InputSource},
    settings::Settings,
    utils::{
        clock::{Clock, DefaultClock},
        dir::{HISTORY_DIR, SETTINGS_FILE},
    },
};

pub mod args;
pub mod collection;
pub mod command;
pub mod processing;
pub mod session;
pub mod shutdown;
pub mod storage;

const COMMAND_QUEUE_SIZE: usize = 256;

#[derive(Debug, Clone, Copy, Default)]
pub struct DaemonOptions {
    /// Read controls from stdin and print status changes.
    pub console: bool,
    /// Start a session right away.
    pub autostart: bool,
}

/// Represents the starting point for the tracker. Returns once shutdown was requested and the
/// active session, if any, was saved. Hotkeys are registered through `hotkeys`, see
/// [run_hosted](crate::hotkeys::host::run_hosted).
pub async fn start_daemon(
    dir: PathBuf,
    options: DaemonOptions,
    hotkeys: HotkeyHost,
) -> Result<()> {
    let (sender, receiver) = mpsc::channel::<TrackerCommand>(COMMAND_QUEUE_SIZE);
    let shutdown_token = CancellationToken::new();
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);

    let settings_path = dir.join(SETTINGS_FILE);
    let settings = Settings::load(&settings_path).await.unwrap_or_else(|e| {
        warn!("Using default settings: {e:?}");
        Settings::default()
    });

    let tracker = create_tracker(
        GenericInputSource::new(sender.clone()),
        &sender,
        SessionArchiveImpl::new(dir.join(HISTORY_DIR)),
        clock.clone(),
        &shutdown_token,
        settings.inactivity_threshold(),
    );
    let status = tracker.subscribe();

    let mut bindings = HotkeyBindings::new(GenericHotkeyRegistrar::new(sender.clone(), &hotkeys));
    bindings.reload(&settings);

    let processor = create_processor(
        receiver,
        Controller::new(tracker, bindings, settings_path.clone()),
        &shutdown_token,
    );

    let watcher = SettingsWatcher::new(
        settings_path,
        sender.clone(),
        clock,
        shutdown_token.clone(),
        SETTINGS_POLL_INTERVAL,
    );

    let reporter = if options.console {
        ConsoleControls::new(sender.clone(), shutdown_token.clone(), status.clone()).spawn()?;
        Some(StatusReporter::new(status, shutdown_token.clone()))
    } else {
        None
    };

    if options.autostart {
        sender.send(TrackerCommand::ToggleStartPause).await?;
    }
    drop(sender);

    let (_, processing_result, _, _) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        async {
            let result = processor.run().await;
            // The other tasks only end on cancellation.
            shutdown_token.cancel();
            result
        },
        watcher.run(),
        async {
            if let Some(reporter) = reporter {
                reporter.run().await
            }
        },
    );

    if let Err(processing_result) = processing_result {
        error!("Processing module got an error {:?}", processing_result);
    }

    Ok(())
}

fn create_tracker<A: SessionArchive>(
    input: impl InputSource + 'static,
    sender: &mpsc::Sender<TrackerCommand>,
    archive: A,
    clock: Arc<dyn Clock>,
    shutdown_token: &CancellationToken,
    inactivity_threshold: Duration,
) -> SessionTracker<A> {
    SessionTracker::new(
        Box::new(input),
        Box::new(SessionTimers::new(
            sender.clone(),
            clock.clone(),
            shutdown_token.clone(),
        )),
        archive,
        clock,
        inactivity_threshold,
    )
}

fn create_processor<A: SessionArchive, R: HotkeyRegistrar>(
    receiver: mpsc::Receiver<TrackerCommand>,
    controller: Controller<A, R>,
    shutdown_token: &CancellationToken,
) -> ProcessingModule<Controller<A, R>> {
    ProcessingModule::new(receiver, controller, shutdown_token.clone())
}
