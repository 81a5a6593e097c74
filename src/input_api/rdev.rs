use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::JoinHandle,
};

use anyhow::Result;
use rdev::{Button, Event, EventType};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::daemon::command::TrackerCommand;

use super::InputSource;

/// Global listener based on rdev. `rdev::listen` can't be cancelled, so the listener thread is
/// spawned on the first start and afterwards only gated by `listening`.
pub struct RdevInputSource {
    next: mpsc::Sender<TrackerCommand>,
    listening: Arc<AtomicBool>,
    listener: Option<JoinHandle<()>>,
}

impl RdevInputSource {
    pub fn new(next: mpsc::Sender<TrackerCommand>) -> Self {
        Self {
            next,
            listening: Arc::new(AtomicBool::new(false)),
            listener: None,
        }
    }
}

impl InputSource for RdevInputSource {
    fn start(&mut self) -> Result<()> {
        self.listening.store(true, Ordering::SeqCst);
        if self.listener.is_none() {
            let next = self.next.clone();
            let listening = self.listening.clone();
            let handle = std::thread::Builder::new()
                .name("input-listener".into())
                .spawn(move || listen(next, listening))?;
            self.listener = Some(handle);
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.listening.store(false, Ordering::SeqCst);
    }
}

fn listen(next: mpsc::Sender<TrackerCommand>, listening: Arc<AtomicBool>) {
    info!("Starting global input listener");
    let result = rdev::listen(move |event: Event| {
        if !listening.load(Ordering::Relaxed) || !is_action(&event.event_type) {
            return;
        }
        if let Err(e) = next.try_send(TrackerCommand::Action) {
            warn!("Dropped an action {e}");
        }
    });

    // On macOS this is what happens without the accessibility permission. The tracker keeps
    // running, it just doesn't count anything.
    if let Err(e) = result {
        error!("Input monitoring is unavailable, check the accessibility permission: {e:?}");
    }
}

fn is_action(event_type: &EventType) -> bool {
    matches!(
        event_type,
        EventType::KeyPress(_) | EventType::ButtonPress(Button::Left | Button::Right)
    )
}

#[cfg(test)]
mod tests {
    use rdev::{Button, EventType, Key};

    use super::is_action;

    #[test]
    fn only_presses_are_actions() {
        assert!(is_action(&EventType::KeyPress(Key::KeyA)));
        assert!(is_action(&EventType::ButtonPress(Button::Left)));
        assert!(is_action(&EventType::ButtonPress(Button::Right)));

        assert!(!is_action(&EventType::KeyRelease(Key::KeyA)));
        assert!(!is_action(&EventType::ButtonPress(Button::Middle)));
        assert!(!is_action(&EventType::ButtonRelease(Button::Left)));
        assert!(!is_action(&EventType::MouseMove { x: 1.0, y: 2.0 }));
    }
}
