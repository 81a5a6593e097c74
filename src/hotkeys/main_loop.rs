use std::{sync::mpsc as std_mpsc, thread, time::Duration};

use anyhow::{anyhow, Result};
use global_hotkey::{hotkey::HotKey, GlobalHotKeyManager};
use tao::{
    event::Event,
    event_loop::{ControlFlow, EventLoopBuilder, EventLoopProxy},
    platform::run_return::EventLoopExtRunReturn,
};
use tracing::{debug, warn};

use super::global::HotkeyBackend;

const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

enum HostRequest {
    Register(HotKey, std_mpsc::Sender<Result<()>>),
    Unregister(HotKey, std_mpsc::Sender<Result<()>>),
    Exit,
}

/// Handle to the main thread event loop that owns the [GlobalHotKeyManager].
#[derive(Clone)]
pub struct HotkeyHost {
    proxy: EventLoopProxy<HostRequest>,
}

impl HotkeyHost {
    fn request(
        &self,
        request: impl FnOnce(std_mpsc::Sender<Result<()>>) -> HostRequest,
    ) -> Result<()> {
        let (reply, response) = std_mpsc::channel();
        self.proxy
            .send_event(request(reply))
            .map_err(|_| anyhow!("the hotkey event loop has exited"))?;
        response
            .recv_timeout(REPLY_TIMEOUT)
            .map_err(|e| anyhow!("no answer from the hotkey event loop: {e}"))?
    }
}

impl HotkeyBackend for HotkeyHost {
    fn register(&self, hotkey: HotKey) -> Result<()> {
        self.request(|reply| HostRequest::Register(hotkey, reply))
    }

    fn unregister(&self, hotkey: HotKey) -> Result<()> {
        self.request(|reply| HostRequest::Unregister(hotkey, reply))
    }
}

/// Stops the event loop once the tracker thread is done, panics included.
struct ExitOnDrop(EventLoopProxy<HostRequest>);

impl Drop for ExitOnDrop {
    fn drop(&mut self) {
        let _ = self.0.send_event(HostRequest::Exit);
    }
}

/// Runs `tracker` on a worker thread and the hotkey event loop on the calling thread, which must
/// be the main thread. Returns the tracker's result once it finished.
pub fn run_hosted<F>(tracker: F) -> Result<()>
where
    F: FnOnce(HotkeyHost) -> Result<()> + Send + 'static,
{
    #[allow(unused_mut)]
    let mut event_loop = EventLoopBuilder::<HostRequest>::with_user_event().build();
    #[cfg(target_os = "macos")]
    {
        use tao::platform::macos::{ActivationPolicy, EventLoopExtMacOS};
        // No dock icon.
        event_loop.set_activation_policy(ActivationPolicy::Accessory);
    }

    let manager = GlobalHotKeyManager::new()
        .inspect_err(|e| warn!("Global hotkeys are unavailable: {e}"))
        .ok();

    let proxy = event_loop.create_proxy();
    let worker = thread::Builder::new()
        .name("tracker".into())
        .spawn(move || {
            let _exit = ExitOnDrop(proxy.clone());
            tracker(HotkeyHost { proxy })
        })?;

    event_loop.run_return(|event, _, control_flow| {
        *control_flow = ControlFlow::Wait;
        let Event::UserEvent(request) = event else {
            return;
        };
        match request {
            HostRequest::Register(hotkey, reply) => {
                let _ = reply.send(with_manager(&manager, |v| v.register(hotkey)));
            }
            HostRequest::Unregister(hotkey, reply) => {
                let _ = reply.send(with_manager(&manager, |v| v.unregister(hotkey)));
            }
            HostRequest::Exit => {
                debug!("Tracker finished, leaving the hotkey event loop");
                *control_flow = ControlFlow::Exit;
            }
        }
    });

    worker
        .join()
        .map_err(|_| anyhow!("the tracker thread panicked"))?
}

fn with_manager(
    manager: &Option<GlobalHotKeyManager>,
    action: impl FnOnce(&GlobalHotKeyManager) -> Result<()>,
) -> Result<()> {
    let manager = manager
        .as_ref()
        .ok_or_else(|| anyhow!("global hotkeys are unavailable"))?;
    action(manager)
}
