use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use log::warn;
use timetrial::{
    AppConfig, FileBasedStorage, LeaderboardStore, LevelId, SessionEvent, TimeTrialError,
    TimeTrialSession, writer,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    /// Config file to use instead of the one in the user config directory
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Snapshot file to use instead of the configured one
    #[arg(short, long, global = true)]
    snapshot: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the ranked leaderboard and latest run for a level
    Show {
        #[arg(short, long)]
        level: u32,

        #[arg(short, long)]
        top: Option<usize>,
    },
    /// Record a run
    Submit {
        #[arg(short, long)]
        level: u32,

        #[arg(short, long)]
        time: f64,

        #[arg(short, long, default_value = "")]
        name: String,
    },
    /// Feed a JSON Lines file of session events through a lap timer and store
    Replay {
        #[arg(short, long)]
        input: PathBuf,
    },
    /// List configured levels
    Levels,
    /// Write records as JSON Lines
    Export {
        #[arg(short, long)]
        output: PathBuf,

        #[arg(short, long)]
        level: Option<u32>,
    },
    /// Write the default config file
    InitConfig,
}

fn open_store(
    config: &AppConfig,
    snapshot: Option<PathBuf>,
) -> Result<LeaderboardStore<FileBasedStorage>, TimeTrialError> {
    let snapshot_path = match snapshot {
        Some(path) => path,
        None => config.snapshot_path()?,
    };
    LeaderboardStore::open(
        FileBasedStorage::new(snapshot_path)?,
        config.level_registry()?,
        config.store_options(),
    )
}

fn show(
    store: &LeaderboardStore<FileBasedStorage>,
    level: u32,
    top: Option<usize>,
) -> Result<(), TimeTrialError> {
    let level = store.registry().validate(LevelId(level))?;
    let view = match top {
        Some(n) => store.view_top(level, n),
        None => store.view(level),
    };
    println!("{}", view);
    Ok(())
}

fn replay(
    store: LeaderboardStore<FileBasedStorage>,
    input: &Path,
) -> Result<(), TimeTrialError> {
    let events = serde_jsonlines::json_lines(input)
        .map_err(|e| TimeTrialError::EventLog { source: e })?
        .collect::<Result<Vec<SessionEvent>, std::io::Error>>()
        .map_err(|e| TimeTrialError::EventLog { source: e })?;

    let mut session = TimeTrialSession::new(store);
    for event in events {
        match session.handle(event) {
            Ok(Some(output)) => {
                let line = serde_json::to_string(&output)
                    .map_err(|e| TimeTrialError::OutputEncode { source: e })?;
                println!("{}", line);
            }
            Ok(None) => {}
            // a rejected submission does not stop the run, the game would re-prompt
            Err(e) if e.is_validation() => warn!("Event rejected: {}", e),
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

fn run(cli: &Args) -> Result<(), TimeTrialError> {
    let config = AppConfig::load_or_default(cli.config.as_deref())?;

    match &cli.command {
        Commands::Show { level, top } => {
            let store = open_store(&config, cli.snapshot.clone())?;
            show(&store, *level, *top)
        }
        Commands::Submit { level, time, name } => {
            let mut store = open_store(&config, cli.snapshot.clone())?;
            let id = store.submit(LevelId(*level), *time, name)?;
            if let Some(record) = store.get(id) {
                println!(
                    "Recorded {}, Level: {}, Time: {:.2}s",
                    record.player_name, record.level.0, record.elapsed_seconds
                );
            }
            Ok(())
        }
        Commands::Replay { input } => {
            let store = open_store(&config, cli.snapshot.clone())?;
            replay(store, input)
        }
        Commands::Levels => {
            for level in config.level_registry()?.levels() {
                println!("{}", level);
            }
            Ok(())
        }
        Commands::Export { output, level } => {
            let store = open_store(&config, cli.snapshot.clone())?;
            let written = writer::export_records(
                output,
                store
                    .records()
                    .iter()
                    .filter(|r| level.is_none_or(|l| r.level == LevelId(l))),
            )?;
            println!("Exported {} records to {}", written, output.display());
            Ok(())
        }
        Commands::InitConfig => {
            let path = match &cli.config {
                Some(path) => path.clone(),
                None => AppConfig::default_config_path()?,
            };
            AppConfig::default().save_to(&path)?;
            println!("Wrote default config to {}", path.display());
            Ok(())
        }
    }
}

fn main() {
    colog::init();

    let cli = Args::parse();
    ctrlc::set_handler(move || {
        println!("Exiting...");
        std::process::exit(0);
    })
    .expect("Could not set Ctrl-C handler");

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
