use std::{fmt::Display, path::Path};

use ansi_term::{Colour::Yellow, Style};
use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser, ValueEnum};
use now::DateTimeNow;

use crate::{
    daemon::storage::{
        entities::SessionRecord,
        session_archive::{SessionArchive, SessionArchiveImpl},
    },
    utils::{
        dir::HISTORY_DIR,
        format::{format_duration, format_number},
    },
};

use super::Args;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

#[derive(Debug, Parser)]
pub struct HistoryCommand {
    #[arg(
        long = "start",
        short,
        help = "Only sessions started after this. Examples are \"yesterday\", \"1 hour ago\", \"15/03/2025\", \"12:00 16/03/2025\""
    )]
    start_date: Option<String>,
    #[arg(
        long = "end",
        short,
        help = "Only sessions started before this. Examples are \"yesterday\", \"1 hour ago\", \"15/03/2025\", \"12:00 16/03/2025\""
    )]
    end_date: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
    #[arg(
        long = "days",
        default_value_t = false,
        help = "Take inputs as whole days. For example if start and end are both 15/03/2025 this option lists the whole day"
    )]
    treat_as_days: bool,
    #[arg(short = 'n', long, help = "Show at most this many sessions")]
    limit: Option<usize>,
}

/// Lists archived sessions, newest first. Indices printed here are accepted by `show` and
/// `delete`.
pub async fn process_history_command(command: HistoryCommand, app_dir: &Path) -> Result<()> {
    let (start, end) = parse_range(&command)?;
    let archive = SessionArchiveImpl::new(app_dir.join(HISTORY_DIR));
    let listing = archive.list_all().await?;

    let mut selected = select_sessions(&listing.sessions, start, end);
    if let Some(limit) = command.limit {
        selected.truncate(limit);
    }

    if selected.is_empty() {
        println!("No sessions found");
    } else {
        println!(
            "{}",
            Style::new().bold().paint(format!(
                "{:>4}  {:<16}  {:>8}  {:>9}  {:>7}  {:>7}",
                "#", "Started", "Duration", "Actions", "Avg APM", "Peak"
            ))
        );
        for (index, record) in selected {
            println!("{}", history_row(index, record));
        }
    }

    for skipped in listing.skipped {
        println!(
            "{}",
            Yellow.paint(format!(
                "Skipped {}: {}",
                skipped.path.display(),
                skipped.reason
            ))
        );
    }
    Ok(())
}

fn parse_range(
    command: &HistoryCommand,
) -> Result<(Option<DateTime<Local>>, Option<DateTime<Local>>)> {
    let now = Local::now();
    let dialect: chrono_english::Dialect = command.date_style.into();
    let parse = |value: &Option<String>, name: &str| -> Result<Option<DateTime<Local>>> {
        match value.as_ref().map(|s| parse_date_string(s, now, dialect)) {
            Some(Ok(v)) => Ok(Some(v)),
            Some(Err(e)) => Err(Args::command()
                .error(
                    clap::error::ErrorKind::ValueValidation,
                    format!("Failed to validate {name} date {e}"),
                )
                .into()),
            None => Ok(None),
        }
    };

    let mut start = parse(&command.start_date, "start")?;
    let mut end = parse(&command.end_date, "end")?;
    if command.treat_as_days {
        start = start.map(|v| v.beginning_of_day());
        end = end.map(|v| v.end_of_day());
    }
    Ok((start, end))
}

/// Keeps sessions started within `[start, end]`, paired with their 1-based position in the full
/// listing.
pub fn select_sessions(
    sessions: &[SessionRecord],
    start: Option<DateTime<Local>>,
    end: Option<DateTime<Local>>,
) -> Vec<(usize, &SessionRecord)> {
    sessions
        .iter()
        .enumerate()
        .map(|(index, record)| (index + 1, record))
        .filter(|(_, record)| start.map_or(true, |v| record.session_start >= v.with_timezone(&Utc)))
        .filter(|(_, record)| end.map_or(true, |v| record.session_start <= v.with_timezone(&Utc)))
        .collect()
}

fn history_row(index: usize, record: &SessionRecord) -> String {
    format!(
        "{:>4}  {:<16}  {:>8}  {:>9}  {:>7}  {:>7}",
        index,
        record
            .session_start
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
            .to_string(),
        format_duration(record.total_time),
        format_number(record.total_actions),
        record.average_apm,
        record.highest_apm,
    )
}
