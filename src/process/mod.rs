//! Process-table access: discovery by command line, termination, detached launch.
//!
//! The supervisor never keeps pids around. Everything it started is found again
//! by looking for the instance mask in `/proc/<pid>/cmdline`.

mod system;

pub use system::SystemProcesses;

use crate::error::Result;
use regex::Regex;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: u32,
    /// Full command line, arguments joined by single spaces.
    pub command: String,
}

/// Result of signalling one matched process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KillOutcome {
    pub pid: u32,
    pub command: String,
    pub result: std::result::Result<(), String>,
}

impl KillOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Everything needed to start one listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub work_dir: PathBuf,
}

impl LaunchSpec {
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.display().to_string())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Typed access to the OS process table.
///
/// Implementations must exclude the calling process from every match.
pub trait ProcessControl: Send + Sync {
    fn list_by_command_substring(&self, pattern: &str) -> Result<Vec<ProcessInfo>>;

    /// SIGTERM every process whose command line contains `pattern`.
    fn kill_by_command_substring(&self, pattern: &str) -> Result<Vec<KillOutcome>>;

    /// SIGTERM every process whose command line matches `pattern`.
    fn kill_by_command_regex(&self, pattern: &Regex) -> Result<Vec<KillOutcome>>;

    /// Start `spec` in its own session with stdio detached; returns the pid.
    fn spawn_detached(&self, spec: &LaunchSpec) -> Result<u32>;

    fn is_running(&self, pattern: &str) -> Result<bool> {
        Ok(!self.list_by_command_substring(pattern)?.is_empty())
    }
}
