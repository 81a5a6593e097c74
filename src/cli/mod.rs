pub mod daemon_path;
pub mod history;
pub mod hotkeys;
pub mod process;
pub mod session;

use std::{env, future::Future, path::PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use daemon_path::to_daemon_path;
use history::{process_history_command, HistoryCommand};
use hotkeys::{process_hotkeys_command, HotkeysCommand};
use process::{kill_previous_trackers, restart_tracker};
use session::{delete_session, show_session, SessionSelector};
use tracing::level_filters::LevelFilter;

use crate::{
    daemon::{start_daemon, DaemonOptions},
    hotkeys::host::run_hosted,
    utils::{
        dir::create_application_default_path,
        logging::{enable_logging, CLI_PREFIX},
        runtime::single_thread_runtime,
    },
};

#[derive(Parser, Debug)]
#[command(name = "apm-counter", version, long_about = None)]
#[command(about = "Counts keyboard and mouse actions per minute", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default ~/Library/Application Support/ApmCounter on macOS, $XDG_STATE_HOME/apm-counter or ~/.local/state/apm-counter elsewhere"
    )]
    dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Track sessions in this terminal with keyboard controls")]
    Track {
        #[arg(long, help = "Don't start a session right away")]
        paused: bool,
    },
    #[command(about = "Start the tracker in the background, replacing a running one")]
    Start {
        #[arg(long, help = "Start a session right away")]
        autostart: bool,
    },
    #[command(about = "Stop the background tracker. An active session is saved")]
    Quit {},
    #[command(about = "List saved sessions")]
    History {
        #[command(flatten)]
        command: HistoryCommand,
    },
    #[command(about = "Show one session in detail")]
    Show {
        #[arg(help = "Number from `history` or a session id")]
        session: SessionSelector,
    },
    #[command(about = "Delete a saved session")]
    Delete {
        #[arg(help = "Number from `history` or a session id")]
        session: SessionSelector,
    },
    #[command(about = "Show or change hotkeys and the inactivity threshold")]
    Hotkeys {
        #[command(flatten)]
        command: HotkeysCommand,
    },
}

pub fn run_cli() -> Result<()> {
    let args = Args::parse();

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    let app_dir = args
        .dir
        .clone()
        .map_or_else(create_application_default_path, Ok)?;
    enable_logging(CLI_PREFIX, &app_dir, logging_level, args.log)?;

    match args.commands {
        Commands::Track { paused } => {
            let options = DaemonOptions {
                console: true,
                autostart: !paused,
            };
            run_hosted(move |hotkeys| {
                single_thread_runtime()?.block_on(start_daemon(app_dir, options, hotkeys))
            })
        }
        Commands::Start { autostart } => {
            restart_tracker(&daemon_path()?, args.dir.as_deref(), autostart)?;
            Ok(())
        }
        Commands::Quit {} => {
            let found = kill_previous_trackers(&daemon_path()?)?;
            if found == 0 {
                println!("No tracker is running");
            }
            Ok(())
        }
        Commands::History { command } => block_on(process_history_command(command, &app_dir)),
        Commands::Show { session } => block_on(show_session(session, &app_dir)),
        Commands::Delete { session } => block_on(delete_session(session, &app_dir)),
        Commands::Hotkeys { command } => block_on(process_hotkeys_command(command, &app_dir)),
    }
}

fn block_on(command: impl Future<Output = Result<()>>) -> Result<()> {
    single_thread_runtime()?.block_on(command)
}

fn daemon_path() -> Result<PathBuf> {
    Ok(to_daemon_path(env::current_exe()?))
}
