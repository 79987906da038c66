// Allow unused_assignments at module level because thiserror's generated code
// for struct variants triggers false positive warnings - the fields ARE used
// in the Display impl but rustc's lint pass doesn't see this.
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load settings from '{}': {reason}", .path.display())]
    #[diagnostic(
        code(pipe::settings::invalid),
        help("Check the YAML syntax of the settings file, or remove it to use defaults")
    )]
    Settings { path: PathBuf, reason: String },

    #[error("Port {port} for tracker '{key}' is unavailable: {reason}")]
    #[diagnostic(
        code(pipe::port::unavailable),
        help("Find what's using the port with: ss -tlnp 'sport = :{port}'\nRe-run with --force to free it without asking")
    )]
    PortUnavailable { key: String, port: u16, reason: String },

    #[error("Process control failed: {0}")]
    #[diagnostic(
        code(pipe::process::error),
        help("Check that the listener binary exists and that you have permission to signal the process")
    )]
    ProcessControl(String),

    #[error("Failed to start listener for tracker '{0}': {1}")]
    #[diagnostic(
        code(pipe::process::start_failed),
        help("Verify the listener binary configured in pipe-server.yaml exists and is executable")
    )]
    LaunchFailed(String, String),

    #[error("Notification to '{url}' failed: {reason}")]
    Notifier { url: String, reason: String },

    #[error("Firewall error: {0}")]
    #[diagnostic(
        code(pipe::firewall::error),
        help("The ban tool drives iptables; it usually needs to run as root")
    )]
    Firewall(String),

    #[error("Invalid address '{0}'")]
    #[diagnostic(
        code(pipe::ban::invalid_address),
        help("Use a dotted IPv4 address, a CIDR block (10.0.0.0/8) or a trailing wildcard (10.1.*)")
    )]
    InvalidAddress(String),

    #[error("Install failed: {0}")]
    #[diagnostic(code(pipe::install::error))]
    Install(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns a helpful suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Error::PortUnavailable { port, .. } => Some(format!(
                "Port {} is held by another process. Stop it, or re-run with --force to reclaim the port.",
                port
            )),
            Error::LaunchFailed(key, _) => Some(format!(
                "Check the listener binary and the settings file used by tracker '{}'.",
                key
            )),
            Error::Settings { .. } => Some(
                "Fix the settings file or pass --settings with a valid path.".to_string(),
            ),
            Error::Firewall(_) => Some("Run the ban tool as root (sudo pipe-ban ...).".to_string()),
            Error::InvalidAddress(_) => Some(
                "Examples: 192.168.1.10, 10.0.0.0/8, 10.1.*".to_string(),
            ),
            Error::Install(_) => Some(
                "Installing an init script requires root and a SysV-style /etc/init.d.".to_string(),
            ),
            _ => None,
        }
    }

    /// Formats the error with its suggestion (if any) for user-friendly display.
    pub fn with_suggestion(&self) -> String {
        match self.suggestion() {
            Some(suggestion) => format!("{}\n\nHint: {}", self, suggestion),
            None => self.to_string(),
        }
    }
}
