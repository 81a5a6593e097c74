use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use anyhow::{anyhow, Result};
use global_hotkey::{hotkey::HotKey, GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::daemon::command::TrackerCommand;

use super::{combination::KeyCombination, HotkeyAction, HotkeyRegistrar};

type Routes = Arc<Mutex<HashMap<u32, HotkeyAction>>>;

/// Whatever owns the OS registrations. On macOS and Windows that has to be the main thread, see
/// [super::host].
#[cfg_attr(test, mockall::automock)]
pub trait HotkeyBackend {
    fn register(&self, hotkey: HotKey) -> Result<()>;

    fn unregister(&self, hotkey: HotKey) -> Result<()>;
}

impl HotkeyBackend for GlobalHotKeyManager {
    fn register(&self, hotkey: HotKey) -> Result<()> {
        GlobalHotKeyManager::register(self, hotkey).map_err(|e| anyhow!("{e}"))
    }

    fn unregister(&self, hotkey: HotKey) -> Result<()> {
        GlobalHotKeyManager::unregister(self, hotkey).map_err(|e| anyhow!("{e}"))
    }
}

/// Registers shortcuts through global-hotkey. Presses arrive on a global channel that a
/// forwarding thread turns into tracker commands.
pub struct GlobalHotkeyRegistrar<B: HotkeyBackend> {
    backend: B,
    registered: HashMap<HotkeyAction, HotKey>,
    routes: Routes,
}

impl<B: HotkeyBackend> GlobalHotkeyRegistrar<B> {
    pub fn new(next: mpsc::Sender<TrackerCommand>, backend: B) -> Result<Self> {
        let registrar = Self::from_backend(backend);

        let forward_routes = registrar.routes.clone();
        std::thread::Builder::new()
            .name("hotkey-forwarder".into())
            .spawn(move || forward_presses(next, forward_routes))?;

        Ok(registrar)
    }

    /// Without the forwarding thread.
    fn from_backend(backend: B) -> Self {
        Self {
            backend,
            registered: HashMap::new(),
            routes: Routes::default(),
        }
    }

    fn routes(&self) -> Result<MutexGuard<'_, HashMap<u32, HotkeyAction>>> {
        self.routes
            .lock()
            .map_err(|_| anyhow!("hotkey routes are poisoned"))
    }
}

/// Accelerator understood by global-hotkey, e.g. `super+shift+O`.
fn accelerator(combination: KeyCombination) -> String {
    let modifiers = combination.modifiers;
    let mut parts = vec![];
    if modifiers.command {
        parts.push("super".to_string());
    }
    if modifiers.shift {
        parts.push("shift".to_string());
    }
    if modifiers.option {
        parts.push("alt".to_string());
    }
    if modifiers.control {
        parts.push("control".to_string());
    }
    parts.push(combination.key.to_string());
    parts.join("+")
}

impl<B: HotkeyBackend> HotkeyRegistrar for GlobalHotkeyRegistrar<B> {
    fn register(&mut self, action: HotkeyAction, combination: KeyCombination) -> Result<()> {
        let hotkey: HotKey = accelerator(combination).parse()?;
        let id = hotkey.id();

        // Both actions may share a combination. The OS only knows it once and the action
        // registered last receives the presses.
        let shared = self.registered.values().any(|v| v.id() == id);
        if !shared {
            self.backend.register(hotkey)?;
        }
        self.registered.insert(action, hotkey);
        self.routes()?.insert(id, action);
        Ok(())
    }

    fn unregister(&mut self, action: HotkeyAction) -> Result<()> {
        let Some(hotkey) = self.registered.remove(&action) else {
            return Ok(());
        };
        let id = hotkey.id();

        let remaining = self
            .registered
            .iter()
            .find(|(_, v)| v.id() == id)
            .map(|(other, _)| *other);
        match remaining {
            Some(other) => {
                self.routes()?.insert(id, other);
            }
            None => {
                self.routes()?.remove(&id);
                self.backend.unregister(hotkey)?;
            }
        }
        Ok(())
    }
}

fn forward_presses(next: mpsc::Sender<TrackerCommand>, routes: Routes) {
    info!("Listening for global hotkeys");
    let receiver = GlobalHotKeyEvent::receiver();
    while let Ok(event) = receiver.recv() {
        if event.state != HotKeyState::Pressed {
            continue;
        }
        let action = match routes.lock() {
            Ok(routes) => routes.get(&event.id).copied(),
            Err(_) => return,
        };
        let Some(action) = action else {
            continue;
        };
        debug!("Hotkey pressed for {}", action.name());
        if next.blocking_send(action.command()).is_err() {
            debug!("Command queue is closed, stopping hotkey forwarding");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use global_hotkey::hotkey::HotKey;
    use mockall::predicate::eq;

    use crate::hotkeys::{HotkeyAction, HotkeyRegistrar};

    use super::{accelerator, GlobalHotkeyRegistrar, MockHotkeyBackend};

    #[test]
    fn test_accelerator() {
        assert_eq!(accelerator("⌘⇧O".parse().unwrap()), "super+shift+O");
        assert_eq!(accelerator("⌥⌃5".parse().unwrap()), "alt+control+5");
        assert_eq!(accelerator("Q".parse().unwrap()), "Q");
    }

    #[test]
    fn test_shared_combination_is_registered_once() -> Result<()> {
        let hotkey: HotKey = "super+K".parse()?;
        let mut backend = MockHotkeyBackend::new();
        backend
            .expect_register()
            .with(eq(hotkey))
            .times(1)
            .returning(|_| Ok(()));
        backend
            .expect_unregister()
            .with(eq(hotkey))
            .times(1)
            .returning(|_| Ok(()));
        let mut registrar = GlobalHotkeyRegistrar::from_backend(backend);

        registrar.register(HotkeyAction::StartPause, "⌘K".parse()?)?;
        registrar.register(HotkeyAction::Stop, "⌘K".parse()?)?;
        assert_eq!(
            registrar.routes()?.get(&hotkey.id()),
            Some(&HotkeyAction::Stop)
        );

        registrar.unregister(HotkeyAction::Stop)?;
        assert_eq!(
            registrar.routes()?.get(&hotkey.id()),
            Some(&HotkeyAction::StartPause)
        );

        registrar.unregister(HotkeyAction::StartPause)?;
        assert!(registrar.routes()?.is_empty());
        Ok(())
    }
}
