use anyhow::Result;

/// The tracker is a single writer. Everything that mutates a session runs on this runtime.
pub fn single_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
