use clap::Parser;
use pipe_supervisor::ban::{BanCommand, BanTool, Iptables, USAGE};
use pipe_supervisor::output::{CliOutput, UserOutput};
use pipe_supervisor::{ConfigResolver, Error as PipeError, Settings};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pipe-ban")]
#[command(about = "Pipe-server Ban tool - Block sources from tracker ports")]
#[command(version, override_usage = USAGE)]
struct Cli {
    /// Tracker installation root (contains conf/)
    #[arg(short = 'd', long, env = "PIPE_BASE_DIR")]
    base_dir: Option<PathBuf>,

    /// Settings file (defaults to <base-dir>/conf/pipe-server.yaml)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Packet filter binary
    #[arg(long, default_value = "iptables")]
    iptables: PathBuf,

    /// [block|unblock|list] <address> <tracker|all>
    #[arg(required = true, num_args = 1..=3)]
    args: Vec<String>,
}

fn main() {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let command = match BanCommand::from_args(&cli.args) {
        Ok(command) => command,
        Err(PipeError::Config(message)) => {
            eprintln!("{}", message);
            std::process::exit(2);
        }
        Err(e) => {
            eprintln!("Error: {}", e.with_suggestion());
            std::process::exit(2);
        }
    };

    let out = CliOutput;
    out.status(&format!("Pipe-server Ban tool v{}", env!("CARGO_PKG_VERSION")));

    let settings = match Settings::load(cli.settings.as_deref(), cli.base_dir) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e.with_suggestion());
            std::process::exit(1);
        }
    };

    let resolver = ConfigResolver::new(settings.base_dir);
    let firewall = Iptables::with_program(cli.iptables);
    let report = BanTool::new(&resolver, &firewall, &out).run(&command);

    if !report.is_success() {
        if let Some((_, error)) = report.failures.first() {
            if let Some(suggestion) = error.suggestion() {
                eprintln!("\nHint: {}", suggestion);
            }
        }
        std::process::exit(1);
    }
}
