//! Global shortcuts for controlling the tracker without a window. [HotkeyBindings] keeps at most
//! one combination per [HotkeyAction] and registers them through a [HotkeyRegistrar].

pub mod combination;
#[cfg(feature = "hotkeys")]
pub mod global;
pub mod host;
#[cfg(all(feature = "hotkeys", any(target_os = "macos", windows)))]
mod main_loop;

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use combination::KeyCombination;
use host::HotkeyHost;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{daemon::command::TrackerCommand, settings::Settings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HotkeyAction {
    StartPause,
    Stop,
}

impl HotkeyAction {
    pub const ALL: [HotkeyAction; 2] = [HotkeyAction::StartPause, HotkeyAction::Stop];

    /// Command posted when the hotkey is pressed.
    pub fn command(self) -> TrackerCommand {
        match self {
            HotkeyAction::StartPause => TrackerCommand::ToggleStartPause,
            HotkeyAction::Stop => TrackerCommand::Stop,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            HotkeyAction::StartPause => "start/pause",
            HotkeyAction::Stop => "stop",
        }
    }
}

/// OS level registration of global shortcuts. When a registered combination is pressed the
/// registrar posts [HotkeyAction::command] into the command queue.
#[cfg_attr(test, mockall::automock)]
pub trait HotkeyRegistrar {
    fn register(&mut self, action: HotkeyAction, combination: KeyCombination) -> Result<()>;

    fn unregister(&mut self, action: HotkeyAction) -> Result<()>;
}

pub struct HotkeyBindings<R: HotkeyRegistrar> {
    registrar: R,
    bound: HashMap<HotkeyAction, KeyCombination>,
}

impl<R: HotkeyRegistrar> HotkeyBindings<R> {
    pub fn new(registrar: R) -> Self {
        Self {
            registrar,
            bound: HashMap::new(),
        }
    }

    pub fn binding(&self, action: HotkeyAction) -> Option<KeyCombination> {
        self.bound.get(&action).copied()
    }

    /// Replaces the binding of `action`. An empty combination leaves the action unbound, as does
    /// a combination that can't be parsed or registered.
    pub fn bind(&mut self, action: HotkeyAction, combination: &str) -> Option<KeyCombination> {
        self.unbind(action);

        if combination.trim().is_empty() {
            debug!("No hotkey for {}", action.name());
            return None;
        }

        let combination = match combination.parse::<KeyCombination>() {
            Ok(v) => v,
            Err(e) => {
                warn!("Ignoring hotkey for {}: {e}", action.name());
                return None;
            }
        };

        match self.registrar.register(action, combination) {
            Ok(()) => {
                info!("Bound {combination} to {}", action.name());
                self.bound.insert(action, combination);
                Some(combination)
            }
            Err(e) => {
                warn!("Failed to register {combination} for {}: {e:?}", action.name());
                None
            }
        }
    }

    pub fn unbind(&mut self, action: HotkeyAction) {
        if self.bound.remove(&action).is_some() {
            if let Err(e) = self.registrar.unregister(action) {
                warn!("Failed to unregister hotkey for {}: {e:?}", action.name());
            }
        }
    }

    pub fn reload(&mut self, settings: &Settings) {
        for action in HotkeyAction::ALL {
            self.bind(action, settings.hotkey(action));
        }
    }

    pub fn clear(&mut self) {
        for action in HotkeyAction::ALL {
            self.unbind(action);
        }
    }
}

/// Serves as a cross-compatible HotkeyRegistrar implementation.
pub struct GenericHotkeyRegistrar {
    inner: Box<dyn HotkeyRegistrar>,
}

impl GenericHotkeyRegistrar {
    pub fn new(next: mpsc::Sender<TrackerCommand>, host: &HotkeyHost) -> Self {
        cfg_if::cfg_if! {
            if #[cfg(feature = "hotkeys")] {
                match global_registrar(next, host) {
                    Ok(inner) => Self { inner },
                    Err(e) => {
                        warn!("Global hotkeys are unavailable: {e:?}");
                        Self {
                            inner: Box::new(DisabledHotkeyRegistrar),
                        }
                    }
                }
            } else {
                let _ = (next, host);
                Self {
                    inner: Box::new(DisabledHotkeyRegistrar),
                }
            }
        }
    }
}

#[cfg(feature = "hotkeys")]
fn global_registrar(
    next: mpsc::Sender<TrackerCommand>,
    host: &HotkeyHost,
) -> Result<Box<dyn HotkeyRegistrar>> {
    cfg_if::cfg_if! {
        if #[cfg(any(target_os = "macos", windows))] {
            Ok(Box::new(global::GlobalHotkeyRegistrar::new(next, host.clone())?))
        } else {
            let _ = host;
            let manager =
                global_hotkey::GlobalHotKeyManager::new().map_err(|e| anyhow!("{e}"))?;
            Ok(Box::new(global::GlobalHotkeyRegistrar::new(next, manager)?))
        }
    }
}

impl HotkeyRegistrar for GenericHotkeyRegistrar {
    fn register(&mut self, action: HotkeyAction, combination: KeyCombination) -> Result<()> {
        self.inner.register(action, combination)
    }

    fn unregister(&mut self, action: HotkeyAction) -> Result<()> {
        self.inner.unregister(action)
    }
}

/// Rejects every registration, leaving all actions unbound.
pub struct DisabledHotkeyRegistrar;

impl HotkeyRegistrar for DisabledHotkeyRegistrar {
    fn register(&mut self, _action: HotkeyAction, _combination: KeyCombination) -> Result<()> {
        Err(anyhow!("global hotkeys are not supported by this build"))
    }

    fn unregister(&mut self, _action: HotkeyAction) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use mockall::{predicate::eq, Sequence};

    use crate::settings::Settings;

    use super::{combination::KeyCombination, HotkeyAction, HotkeyBindings, MockHotkeyRegistrar};

    fn combination(s: &str) -> KeyCombination {
        s.parse().unwrap()
    }

    #[test]
    fn test_reload_registers_configured_actions() {
        let mut registrar = MockHotkeyRegistrar::new();
        registrar
            .expect_register()
            .with(eq(HotkeyAction::StartPause), eq(combination("⌘⇧O")))
            .times(1)
            .returning(|_, _| Ok(()));
        registrar
            .expect_register()
            .with(eq(HotkeyAction::Stop), eq(combination("⌘⇧P")))
            .times(1)
            .returning(|_, _| Ok(()));

        let mut bindings = HotkeyBindings::new(registrar);
        bindings.reload(&Settings {
            start_pause_hotkey: "⌘⇧O".into(),
            stop_hotkey: "⌘⇧P".into(),
            ..Default::default()
        });

        assert_eq!(
            bindings.binding(HotkeyAction::StartPause),
            Some(combination("⌘⇧O"))
        );
        assert_eq!(bindings.binding(HotkeyAction::Stop), Some(combination("⌘⇧P")));
    }

    #[test]
    fn test_empty_and_invalid_are_unbound() {
        let mut registrar = MockHotkeyRegistrar::new();
        registrar.expect_register().never();
        registrar.expect_unregister().never();

        let mut bindings = HotkeyBindings::new(registrar);
        bindings.reload(&Settings {
            start_pause_hotkey: "".into(),
            stop_hotkey: "⌘⇧?".into(),
            ..Default::default()
        });

        assert_eq!(bindings.binding(HotkeyAction::StartPause), None);
        assert_eq!(bindings.binding(HotkeyAction::Stop), None);
    }

    #[test]
    fn test_rebinding_replaces_previous() {
        let mut sequence = Sequence::new();
        let mut registrar = MockHotkeyRegistrar::new();
        registrar
            .expect_register()
            .with(eq(HotkeyAction::Stop), eq(combination("⌃X")))
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, _| Ok(()));
        registrar
            .expect_unregister()
            .with(eq(HotkeyAction::Stop))
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(()));
        registrar
            .expect_register()
            .with(eq(HotkeyAction::Stop), eq(combination("⌃Y")))
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, _| Ok(()));

        let mut bindings = HotkeyBindings::new(registrar);
        bindings.bind(HotkeyAction::Stop, "⌃X");
        bindings.bind(HotkeyAction::Stop, "⌃Y");

        assert_eq!(bindings.binding(HotkeyAction::Stop), Some(combination("⌃Y")));
    }

    #[test]
    fn test_failed_registration_stays_unbound() {
        let mut registrar = MockHotkeyRegistrar::new();
        registrar
            .expect_register()
            .returning(|_, _| Err(anyhow!("taken")));
        registrar.expect_unregister().never();

        let mut bindings = HotkeyBindings::new(registrar);

        assert_eq!(bindings.bind(HotkeyAction::StartPause, "⌘1"), None);
        assert_eq!(bindings.binding(HotkeyAction::StartPause), None);
        bindings.clear();
    }

    #[test]
    fn test_same_combination_for_both_actions_is_allowed() {
        let mut registrar = MockHotkeyRegistrar::new();
        registrar.expect_register().times(2).returning(|_, _| Ok(()));

        let mut bindings = HotkeyBindings::new(registrar);
        bindings.bind(HotkeyAction::StartPause, "⌘K");
        bindings.bind(HotkeyAction::Stop, "⌘K");

        assert_eq!(
            bindings.binding(HotkeyAction::StartPause),
            bindings.binding(HotkeyAction::Stop)
        );
    }

    #[test]
    fn test_actions_map_to_commands() {
        use crate::daemon::command::TrackerCommand;
        assert_eq!(
            HotkeyAction::StartPause.command(),
            TrackerCommand::ToggleStartPause
        );
        assert_eq!(HotkeyAction::Stop.command(), TrackerCommand::Stop);
    }
}
