mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands, StopScope};
use pipe_supervisor::notify::HttpNotifier;
use pipe_supervisor::output::{CliOutput, UserOutput};
use pipe_supervisor::{prompt, Error as PipeError, Selection, Settings, Supervisor};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    match run().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            if let Some(pipe_error) = e.downcast_ref::<PipeError>() {
                eprintln!("Error: {}", pipe_error);
                if let Some(suggestion) = pipe_error.suggestion() {
                    eprintln!("\nHint: {}", suggestion);
                }
            } else {
                eprintln!("Error: {:#}", e);
            }
            std::process::exit(1);
        }
    }
}

/// Returns whether every targeted tracker succeeded.
async fn run() -> anyhow::Result<bool> {
    let cli = Cli::parse();
    init_tracing()?;

    let out = CliOutput;
    out.status(&format!("Pipe-server Starter v{}", env!("CARGO_PKG_VERSION")));

    let mut settings = Settings::load(cli.settings.as_deref(), cli.base_dir.clone())?;
    if cli.legacy_sweep {
        settings.legacy_sweep = true;
    }
    tracing::debug!("Settings: {:?}", settings);

    let stop_everything = cli.stop == Some(StopScope::All);
    let selection = Selection::from_args(cli.command.trackers(), cli.port);

    match cli.command {
        Commands::Install => commands::run_install(&settings, &out),
        Commands::Status { .. } => {
            let supervisor = build_supervisor(&cli, settings)?;
            commands::run_status(&supervisor, &selection, &cli.flag, &out)
        }
        Commands::Start { .. } => {
            let supervisor = build_supervisor(&cli, settings)?;
            commands::run_start(&supervisor, &selection, &cli.flag, &out).await
        }
        Commands::Stop { .. } => {
            let supervisor = build_supervisor(&cli, settings)?;
            commands::run_stop(&supervisor, &selection, &cli.flag, stop_everything, &out).await
        }
        Commands::Restart { .. } => {
            let supervisor = build_supervisor(&cli, settings)?;
            commands::run_restart(&supervisor, &selection, &cli.flag, stop_everything, &out).await
        }
    }
}

/// Forced mode is implied when nobody can answer a prompt.
fn build_supervisor(cli: &Cli, settings: Settings) -> anyhow::Result<Supervisor> {
    let notify_timeout = settings.notify_timeout;
    let forced = cli.force || !prompt::is_interactive();

    let mut supervisor = Supervisor::new(settings)
        .with_output(Arc::new(CliOutput))
        .forced(forced);
    if !cli.no_notify {
        supervisor = supervisor.with_notifier(Arc::new(HttpNotifier::new(notify_timeout)?));
    }
    Ok(supervisor)
}

fn init_tracing() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}
