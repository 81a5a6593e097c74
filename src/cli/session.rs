use std::{path::Path, str::FromStr};

use ansi_term::Style;
use anyhow::{anyhow, bail, Result};
use chrono::Local;

use crate::{
    daemon::storage::{
        entities::SessionRecord,
        session_archive::{SessionArchive, SessionArchiveImpl},
    },
    utils::{
        dir::HISTORY_DIR,
        format::{format_clock, format_number, sparkline},
    },
};

/// Picks a session either by its position in `history` or by its id (`YYYYMMDD_HHmmss_mmm`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSelector {
    Index(usize),
    Id(String),
}

impl FromStr for SessionSelector {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let id = s.strip_prefix("Session_").unwrap_or(s);
        let id = id.strip_suffix(".json").unwrap_or(id);

        if !id.is_empty() && id.len() <= 6 && id.chars().all(|v| v.is_ascii_digit()) {
            let index: usize = id.parse()?;
            if index == 0 {
                bail!("Session indices start at 1");
            }
            return Ok(Self::Index(index));
        }

        let is_id = id.len() == 19
            && id.char_indices().all(|(i, v)| match i {
                8 | 15 => v == '_',
                _ => v.is_ascii_digit(),
            });
        if !is_id {
            bail!("Expected a session number or an id like 20250315_120000_000, got {s:?}");
        }
        Ok(Self::Id(id.to_string()))
    }
}

impl SessionSelector {
    /// `sessions` is the listing in the order `history` prints it.
    pub fn resolve<'a>(&self, sessions: &'a [SessionRecord]) -> Result<&'a SessionRecord> {
        match self {
            SessionSelector::Index(index) => index
                .checked_sub(1)
                .and_then(|v| sessions.get(v))
                .ok_or_else(|| {
                    anyhow!(
                        "There is no session #{index}, the history has {}",
                        sessions.len()
                    )
                }),
            SessionSelector::Id(id) => sessions
                .iter()
                .find(|v| v.id() == *id)
                .ok_or_else(|| anyhow!("There is no session {id}")),
        }
    }
}

pub async fn show_session(selector: SessionSelector, app_dir: &Path) -> Result<()> {
    let archive = SessionArchiveImpl::new(app_dir.join(HISTORY_DIR));
    let listing = archive.list_all().await?;
    let record = selector.resolve(&listing.sessions)?;
    for line in session_details(record) {
        println!("{line}");
    }
    Ok(())
}

pub async fn delete_session(selector: SessionSelector, app_dir: &Path) -> Result<()> {
    let archive = SessionArchiveImpl::new(app_dir.join(HISTORY_DIR));
    let listing = archive.list_all().await?;
    let record = selector.resolve(&listing.sessions)?;
    let remaining = archive.delete(record).await?;
    println!(
        "Deleted session {}, {} left",
        record.id(),
        remaining.sessions.len()
    );
    Ok(())
}

fn session_details(record: &SessionRecord) -> Vec<String> {
    let time_format = "%Y-%m-%d %H:%M:%S";
    let mut lines = vec![
        Style::new()
            .bold()
            .paint(format!("Session {}", record.id()))
            .to_string(),
        format!(
            "Started     {}",
            record.session_start.with_timezone(&Local).format(time_format)
        ),
        format!(
            "Ended       {}",
            record.session_end.with_timezone(&Local).format(time_format)
        ),
        format!("Duration    {}", format_clock(record.total_time)),
        format!("Active      {}", format_clock(record.active_time)),
        format!("Inactive    {}", format_clock(record.inactive_time)),
        format!("Actions     {}", format_number(record.total_actions)),
        format!("Average APM {}", record.average_apm),
        format!("Peak APM    {}", record.highest_apm),
    ];
    if !record.apm_data.is_empty() {
        lines.push(format!(
            "Per minute  {} ({} minutes)",
            sparkline(&record.apm_data),
            record.apm_data.len()
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use crate::daemon::storage::entities::SessionRecord;

    use super::{session_details, SessionSelector};

    fn record(minutes_after: i64) -> SessionRecord {
        let session_start =
            Utc.with_ymd_and_hms(2025, 3, 15, 12, 0, 0).unwrap() + Duration::minutes(minutes_after);
        SessionRecord {
            session_start,
            session_end: session_start + Duration::seconds(185),
            total_actions: 120,
            apm_data: vec![40, 60, 20],
            average_apm: 38,
            highest_apm: 60,
            active_time: 150,
            inactive_time: 35,
            total_time: 185,
        }
    }

    #[test]
    fn test_parse_selector() {
        assert_eq!("3".parse::<SessionSelector>().unwrap(), SessionSelector::Index(3));
        assert_eq!(
            "20250315_120000_000".parse::<SessionSelector>().unwrap(),
            SessionSelector::Id("20250315_120000_000".into())
        );
        assert_eq!(
            "Session_20250315_120000_000.json"
                .parse::<SessionSelector>()
                .unwrap(),
            SessionSelector::Id("20250315_120000_000".into())
        );
        assert!("0".parse::<SessionSelector>().is_err());
        assert!("2025-03-15".parse::<SessionSelector>().is_err());
        assert!("".parse::<SessionSelector>().is_err());
    }

    #[test]
    fn test_resolve() {
        let sessions = vec![record(10), record(0)];

        assert_eq!(
            SessionSelector::Index(2).resolve(&sessions).unwrap(),
            &sessions[1]
        );
        assert_eq!(
            SessionSelector::Id("20250315_121000_000".into())
                .resolve(&sessions)
                .unwrap(),
            &sessions[0]
        );
        assert!(SessionSelector::Index(3).resolve(&sessions).is_err());
        assert!(SessionSelector::Id("20250315_130000_000".into())
            .resolve(&sessions)
            .is_err());
    }

    #[test]
    fn test_details() {
        let lines = session_details(&record(0));

        assert!(lines[0].contains("20250315_120000_000"));
        assert!(lines.contains(&"Duration    0:03:05".to_string()));
        assert!(lines.contains(&"Actions     120".to_string()));
        assert!(lines.last().unwrap().contains("(3 minutes)"));
    }

    #[test]
    fn test_details_without_minutes() {
        let mut empty = record(0);
        empty.apm_data.clear();

        assert!(!session_details(&empty)
            .iter()
            .any(|v| v.starts_with("Per minute")));
    }
}
