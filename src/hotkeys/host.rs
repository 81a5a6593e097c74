//! Where OS hotkey registrations live. On macOS and Windows they only work from the main thread
//! while it runs an event loop, so there [run_hosted] keeps the main thread for that loop and
//! runs the tracker on a worker thread. Elsewhere it simply runs the tracker.

cfg_if::cfg_if! {
    if #[cfg(all(feature = "hotkeys", any(target_os = "macos", windows)))] {
        pub use super::main_loop::{run_hosted, HotkeyHost};
    } else {
        use anyhow::Result;

        /// Nothing to host on this platform.
        #[derive(Debug, Clone, Default)]
        pub struct HotkeyHost;

        pub fn run_hosted<F>(tracker: F) -> Result<()>
        where
            F: FnOnce(HotkeyHost) -> Result<()> + Send + 'static,
        {
            tracker(HotkeyHost)
        }
    }
}

#[cfg(all(
    test,
    not(all(feature = "hotkeys", any(target_os = "macos", windows)))
))]
mod tests {
    use anyhow::{anyhow, Result};

    use super::run_hosted;

    #[test]
    fn test_tracker_result_is_returned() -> Result<()> {
        run_hosted(|_| Ok(()))?;

        let failed = run_hosted(|_| Err(anyhow!("tracker failed")));
        assert_eq!(failed.unwrap_err().to_string(), "tracker failed");
        Ok(())
    }
}
