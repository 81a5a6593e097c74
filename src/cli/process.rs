use std::{path::Path, process::Stdio};

use anyhow::{anyhow, bail, Result};
use sysinfo::{get_current_pid, Signal, System};
use tracing::info;

/// Terminates every other process running the executable at `name`. Returns how many were found.
pub fn kill_previous_trackers(name: &Path) -> Result<usize> {
    let system = System::new_all();
    let current_id = get_current_pid().map_err(|e| anyhow!("Can't find own pid {e}"))?;
    let mut found = 0;
    for (pid, process) in system.processes().iter() {
        if *pid == current_id {
            continue;
        }

        if process
            .exe()
            .filter(|v| v.exists())
            .filter(|v| name == *v)
            .is_some()
        {
            info!("Terminating tracker {pid}");
            found += 1;
            // SIGTERM lets the tracker save its session. On Windows this falls back to a forced
            // termination.
            if process.kill_with(Signal::Term).is_none() {
                process.kill();
            }
            process.wait();
        }
    }
    Ok(found)
}

/// Shuts down a previous tracker and starts a new one. The tracker detaches itself, so this only
/// waits for the detaching side to report back.
pub fn restart_tracker(daemon_path: &Path, dir: Option<&Path>, autostart: bool) -> Result<()> {
    kill_previous_trackers(daemon_path)?;

    let mut command = std::process::Command::new(daemon_path);
    if let Some(dir) = dir {
        command.arg("--dir").arg(dir);
    }
    if autostart {
        command.arg("--autostart");
    }
    command.stdin(Stdio::null());

    info!("Spawning {daemon_path:?}");
    let status = command
        .status()
        .map_err(|e| anyhow!("Failed to run {daemon_path:?}: {e}"))?;
    if !status.success() {
        bail!("Tracker exited with {status}");
    }
    Ok(())
}
