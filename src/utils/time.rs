use chrono::{DateTime, Utc};

/// Identifier of a session derived from its start. Millisecond precision keeps two sessions
/// started within the same second apart.
pub fn session_id(session_start: DateTime<Utc>) -> String {
    session_start.format("%Y%m%d_%H%M%S_%3f").to_string()
}

/// This is the standard way of naming an archived session file.
pub fn session_file_name(session_start: DateTime<Utc>) -> String {
    format!("Session_{}.json", session_id(session_start))
}
