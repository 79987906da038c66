use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pipe-server")]
#[command(about = "Pipe-server Starter - Start, stop and inspect tracker listeners")]
#[command(version)]
pub struct Cli {
    /// Run tag; listeners started under different flags coexist
    #[arg(short, long, global = true, default_value = pipe_supervisor::DEFAULT_FLAG)]
    pub flag: String,

    /// Port override, honored only when exactly one tracker is named
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Bulk stop scope for stop/restart (`all`: every masked listener on the host)
    #[arg(short, long, global = true, value_enum, value_name = "SCOPE")]
    pub stop: Option<StopScope>,

    /// Never ask: restart running listeners and free busy ports automatically
    #[arg(short = 'y', long, global = true)]
    pub force: bool,

    /// Tracker installation root (contains conf/)
    #[arg(short = 'd', long, global = true, env = "PIPE_BASE_DIR")]
    pub base_dir: Option<PathBuf>,

    /// Settings file (defaults to <base-dir>/conf/pipe-server.yaml)
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Also kill listeners started by the pre-mask starter on a bulk stop
    #[arg(long, global = true)]
    pub legacy_sweep: bool,

    /// Don't report started/stopped listeners to the status endpoints
    #[arg(long, global = true)]
    pub no_notify: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StopScope {
    All,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start listeners (defaults to every configured tracker)
    Start {
        /// Tracker keys, e.g. tr203 tr206
        trackers: Vec<String>,
    },
    /// Stop listeners started under the current flag
    Stop {
        /// Tracker keys (defaults to all configured)
        trackers: Vec<String>,
    },
    /// Stop, then start the same trackers
    #[command(alias = "reload", alias = "force-reload")]
    Restart {
        /// Tracker keys (defaults to all configured)
        trackers: Vec<String>,
    },
    /// Show whether each listener is running
    Status {
        /// Tracker keys (defaults to all configured)
        trackers: Vec<String>,
    },
    /// Register pipe-server as an init script
    Install,
}

impl Commands {
    pub fn trackers(&self) -> Vec<String> {
        match self {
            Commands::Start { trackers }
            | Commands::Stop { trackers }
            | Commands::Restart { trackers }
            | Commands::Status { trackers } => trackers.clone(),
            Commands::Install => Vec::new(),
        }
    }
}
