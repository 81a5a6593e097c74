//! Foreground controls. [ConsoleControls] turns lines typed into the terminal into commands and
//! [StatusReporter] prints what changed in the session.

use std::io::BufRead;

use ansi_term::Colour::{Green, Red, Yellow};
use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    daemon::{
        command::TrackerCommand,
        session::{
            tracker::{ArchiveNotice, SessionSnapshot},
            Lifecycle, Session,
        },
    },
    utils::format::{format_clock, format_number, sparkline},
};

const HELP: &str = "\
Commands:
  p, space  start, pause or resume the session
  x         stop and save the session
  r         reload settings and hotkeys
  s         print the current status
  g         chart APM per minute and hourly averages
  q         quit
  h         show this help";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleInput {
    Command(TrackerCommand),
    Status,
    Graph,
    Help,
    Quit,
}

/// Lines are matched case-insensitively after trimming. Unknown lines are [None].
pub fn parse_line(line: &str) -> Option<ConsoleInput> {
    if !line.is_empty() && line.trim().is_empty() {
        return Some(ConsoleInput::Command(TrackerCommand::ToggleStartPause));
    }
    match line.trim().to_ascii_lowercase().as_str() {
        "p" | "pause" | "start" | "resume" => {
            Some(ConsoleInput::Command(TrackerCommand::ToggleStartPause))
        }
        "x" | "stop" => Some(ConsoleInput::Command(TrackerCommand::Stop)),
        "r" | "reload" => Some(ConsoleInput::Command(TrackerCommand::ReloadHotkeys)),
        "s" | "status" => Some(ConsoleInput::Status),
        "g" | "graph" => Some(ConsoleInput::Graph),
        "h" | "help" | "?" => Some(ConsoleInput::Help),
        "q" | "quit" | "exit" => Some(ConsoleInput::Quit),
        _ => None,
    }
}

pub struct ConsoleControls {
    next: mpsc::Sender<TrackerCommand>,
    shutdown: CancellationToken,
    status: watch::Receiver<SessionSnapshot>,
}

impl ConsoleControls {
    pub fn new(
        next: mpsc::Sender<TrackerCommand>,
        shutdown: CancellationToken,
        status: watch::Receiver<SessionSnapshot>,
    ) -> Self {
        Self {
            next,
            shutdown,
            status,
        }
    }

    /// Reads stdin on its own thread. Tokio's stdin would keep the runtime from shutting down
    /// while a read is pending.
    pub fn spawn(self) -> Result<()> {
        println!("{HELP}");
        std::thread::Builder::new()
            .name("console".into())
            .spawn(move || self.read_lines())?;
        Ok(())
    }

    fn read_lines(self) {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            match parse_line(&line) {
                Some(ConsoleInput::Command(command)) => {
                    if self.next.blocking_send(command).is_err() {
                        break;
                    }
                }
                Some(ConsoleInput::Status) => {
                    println!("{}", status_line(&self.status.borrow().session));
                }
                Some(ConsoleInput::Graph) => {
                    for line in graph_lines(&self.status.borrow().session) {
                        println!("{line}");
                    }
                }
                Some(ConsoleInput::Help) => println!("{HELP}"),
                Some(ConsoleInput::Quit) => {
                    info!("Quit requested from the console");
                    self.shutdown.cancel();
                    break;
                }
                None => println!("Unknown command {:?}, type h for help", line.trim()),
            }
        }
        debug!("Console input closed");
    }
}

/// Prints session changes as they are published.
pub struct StatusReporter {
    status: watch::Receiver<SessionSnapshot>,
    shutdown: CancellationToken,
}

impl StatusReporter {
    pub fn new(status: watch::Receiver<SessionSnapshot>, shutdown: CancellationToken) -> Self {
        Self { status, shutdown }
    }

    pub async fn run(mut self) {
        let mut previous = self.status.borrow_and_update().clone();
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => return,
                changed = self.status.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }

            let current = self.status.borrow_and_update().clone();
            for line in describe(&previous, &current) {
                println!("{line}");
            }
            previous = current;
        }
    }
}

pub fn status_line(session: &Session) -> String {
    let state = match session.lifecycle() {
        Lifecycle::Idle => "idle",
        Lifecycle::Running => "running",
        Lifecycle::Paused => "paused",
    };
    format!(
        "[{state}] {} | APM {} | avg {} | peak {} | actions {}",
        format_clock(session.total_time),
        session.current_apm,
        session.average_apm,
        session.highest_apm,
        format_number(session.total_actions),
    )
}

/// Sparklines of the closed minutes and the hourly averages, each with the local time of its
/// first and last entry.
pub fn graph_lines(session: &Session) -> Vec<String> {
    if session.apm_data.is_empty() {
        return vec!["No full minute yet".to_string()];
    }
    let mut lines = vec![series_line(
        "Minutes",
        &session.apm_data,
        &session.apm_timestamps,
    )];
    if session.hourly_average_data.is_empty() {
        lines.push(format!("{:<8} no full hour yet", "Hours"));
    } else {
        lines.push(series_line(
            "Hours",
            &session.hourly_average_data,
            &session.hourly_average_timestamps,
        ));
    }
    lines
}

fn series_line(label: &str, values: &[u64], timestamps: &[DateTime<Utc>]) -> String {
    let span = match (timestamps.first(), timestamps.last()) {
        (Some(first), Some(last)) => format!(" {} - {}", local_time(first), local_time(last)),
        _ => String::new(),
    };
    format!(
        "{label:<8} {}{span} | peak {}",
        sparkline(values),
        values.iter().copied().max().unwrap_or(0)
    )
}

pub(crate) fn local_time(time: &DateTime<Utc>) -> String {
    time.with_timezone(&Local).format("%H:%M").to_string()
}

/// Lines worth printing for the change from `previous` to `current`. Seconds and single actions
/// are too frequent, so only lifecycle changes, closed minutes and archive notices are reported.
pub fn describe(previous: &SessionSnapshot, current: &SessionSnapshot) -> Vec<String> {
    let mut lines = vec![];
    let (before, after) = (&previous.session, &current.session);

    match (before.lifecycle(), after.lifecycle()) {
        (Lifecycle::Idle, Lifecycle::Running) => {
            lines.push(Green.paint("Session started").to_string())
        }
        (Lifecycle::Running, Lifecycle::Paused) => {
            lines.push(Yellow.paint("Session paused").to_string())
        }
        (Lifecycle::Paused, Lifecycle::Running) => {
            lines.push(Green.paint("Session resumed").to_string())
        }
        (Lifecycle::Running | Lifecycle::Paused, Lifecycle::Idle) => {
            lines.push(Yellow.paint("Session stopped").to_string())
        }
        _ => {}
    }

    if after.is_running && after.apm_data.len() > before.apm_data.len() {
        lines.push(status_line(after));
    }
    if after.is_running && after.hourly_average_data.len() > before.hourly_average_data.len() {
        if let Some(average) = after.hourly_average_data.last() {
            lines.push(format!("Hour average {average} APM"));
        }
    }

    if current.notice != previous.notice {
        match &current.notice {
            Some(ArchiveNotice::Saved(path)) => {
                lines.push(status_line(after));
                lines.push(format!("Session saved to {}", path.display()));
            }
            Some(ArchiveNotice::SaveFailed(reason)) => {
                lines.push(Red.paint(format!("Failed to save session: {reason}")).to_string())
            }
            None => {}
        }
    }
    lines
}
