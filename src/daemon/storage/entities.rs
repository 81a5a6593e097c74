use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::utils::time::session_id;

/// The struct used for storing a finished session on the disk. One record per file, identified
/// by [SessionRecord::session_start].
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub session_start: DateTime<Utc>,
    pub session_end: DateTime<Utc>,
    pub total_actions: u64,
    pub apm_data: Vec<u64>,
    #[serde(rename = "averageAPM")]
    pub average_apm: u64,
    #[serde(rename = "highestAPM")]
    pub highest_apm: u64,
    /// Seconds
    pub active_time: u64,
    /// Seconds
    pub inactive_time: u64,
    /// Seconds
    pub total_time: u64,
}

impl SessionRecord {
    pub fn id(&self) -> String {
        session_id(self.session_start)
    }
}
