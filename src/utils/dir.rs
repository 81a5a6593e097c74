use std::{env, io, path::PathBuf};

use anyhow::{anyhow, Result};

/// Name of the directory inside the application directory that keeps archived sessions.
pub const HISTORY_DIR: &str = "History";
pub const LOGS_DIR: &str = "logs";
pub const SETTINGS_FILE: &str = "settings.json";

pub fn create_application_default_path() -> Result<PathBuf> {
    let path = application_default_path()?;

    match std::fs::create_dir_all(&path) {
        Ok(_) => Ok(path),
        Err(v) if v.kind() == io::ErrorKind::AlreadyExists => Ok(path),
        Err(v) => Err(v.into()),
    }
}

fn application_default_path() -> Result<PathBuf> {
    cfg_if::cfg_if! {
        if #[cfg(windows)] {
            let mut path = env::var("APPDATA")
                .map(PathBuf::from)
                .map_err(|_| anyhow!("APPDATA should be present on Windows"))?;
            path.push("apm-counter");
            Ok(path)
        } else if #[cfg(target_os = "macos")] {
            let mut path = env::var("HOME")
                .map(PathBuf::from)
                .map_err(|_| anyhow!("Couldn't find HOME"))?;
            path.push("Library/Application Support/ApmCounter");
            Ok(path)
        } else {
            let mut path = env::var("XDG_STATE_HOME")
                .map(PathBuf::from)
                .or_else(|_| {
                    env::var("HOME").map(|home| {
                        let mut path = PathBuf::from(home);
                        path.push(".local/state");
                        path
                    })
                })
                .map_err(|_| anyhow!("Couldn't find neither XDG_STATE_HOME nor HOME"))?;
            path.push("apm-counter");
            Ok(path)
        }
    }
}
