use super::{KillOutcome, LaunchSpec, ProcessControl, ProcessInfo};
use crate::error::{Error, Result};
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// [`ProcessControl`] backed by procfs and direct syscalls.
#[derive(Debug, Clone)]
pub struct SystemProcesses {
    proc_root: PathBuf,
}

impl Default for SystemProcesses {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemProcesses {
    pub fn new() -> Self {
        Self {
            proc_root: PathBuf::from("/proc"),
        }
    }

    fn scan<F>(&self, matches: F) -> Result<Vec<ProcessInfo>>
    where
        F: Fn(&str) -> bool,
    {
        let current_pid = std::process::id();
        let entries = fs::read_dir(&self.proc_root).map_err(|e| {
            Error::ProcessControl(format!(
                "cannot read process table at {}: {}",
                self.proc_root.display(),
                e
            ))
        })?;

        let mut processes: Vec<ProcessInfo> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().to_str()?.parse::<u32>().ok())
            .filter(|pid| *pid != current_pid)
            .filter_map(|pid| {
                // Processes can vanish between read_dir and here; that's not an error.
                let command = read_cmdline(&self.proc_root, pid)?;
                matches(&command).then_some(ProcessInfo { pid, command })
            })
            .collect();

        processes.sort_by_key(|p| p.pid);
        Ok(processes)
    }

    fn terminate(processes: Vec<ProcessInfo>) -> Vec<KillOutcome> {
        processes
            .into_iter()
            .map(|process| {
                let result = send_term(process.pid);
                match &result {
                    Ok(()) => tracing::info!("Sent SIGTERM to {} ({})", process.pid, process.command),
                    Err(e) => tracing::warn!("Failed to signal {}: {}", process.pid, e),
                }
                KillOutcome {
                    pid: process.pid,
                    command: process.command,
                    result,
                }
            })
            .collect()
    }
}

fn read_cmdline(proc_root: &Path, pid: u32) -> Option<String> {
    let raw = fs::read(proc_root.join(pid.to_string()).join("cmdline")).ok()?;
    let command = String::from_utf8_lossy(&raw).replace('\0', " ").trim().to_string();
    // Kernel threads have an empty cmdline.
    (!command.is_empty()).then_some(command)
}

fn send_term(pid: u32) -> std::result::Result<(), String> {
    let raw = i32::try_from(pid).map_err(|_| format!("pid {} out of range", pid))?;
    match signal::kill(Pid::from_raw(raw), Signal::SIGTERM) {
        Ok(()) => Ok(()),
        // Exited on its own in the meantime.
        Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(format!("kill {}: {}", pid, e)),
    }
}

impl ProcessControl for SystemProcesses {
    fn list_by_command_substring(&self, pattern: &str) -> Result<Vec<ProcessInfo>> {
        self.scan(|command| command.contains(pattern))
    }

    fn kill_by_command_substring(&self, pattern: &str) -> Result<Vec<KillOutcome>> {
        let matched = self.list_by_command_substring(pattern)?;
        Ok(Self::terminate(matched))
    }

    fn kill_by_command_regex(&self, pattern: &Regex) -> Result<Vec<KillOutcome>> {
        let matched = self.scan(|command| pattern.is_match(command))?;
        Ok(Self::terminate(matched))
    }

    fn spawn_detached(&self, spec: &LaunchSpec) -> Result<u32> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .current_dir(&spec.work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        // SAFETY: the closure runs between fork() and exec() and only calls
        // setsid(), which is async-signal-safe. It allocates nothing.
        unsafe {
            use std::os::unix::process::CommandExt;
            cmd.pre_exec(|| {
                nix::unistd::setsid()
                    .map(|_| ())
                    .map_err(std::io::Error::from)
            });
        }

        let child = cmd.spawn().map_err(|e| {
            Error::ProcessControl(format!("failed to spawn '{}': {}", spec.command_line(), e))
        })?;
        let pid = child.id();
        // Dropping the handle neither waits for nor kills the child.
        drop(child);

        tracing::info!("Spawned pid {}: {}", pid, spec.command_line());
        Ok(pid)
    }
}
