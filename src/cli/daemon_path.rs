use std::path::PathBuf;

/// Path of the background tracker binary, expected next to the cli executable.
pub fn to_daemon_path(mut path: PathBuf) -> PathBuf {
    path.set_file_name("apm-counter-daemon");
    #[cfg(windows)]
    {
        path.set_extension("exe");
    }
    path
}
