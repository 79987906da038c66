//! Tracker supervision: reconcile what the operator asked for with what the
//! process table and port space look like right now.
//!
//! Trackers are handled strictly one after another. Probes are snapshots taken
//! immediately before they are acted on; nothing is cached between calls and
//! nothing is locked.

mod conflict;
mod launcher;

#[cfg(test)]
mod fakes;

pub use conflict::Resolution;
pub use launcher::LEGACY_PATTERN;

use crate::config::{ConfigResolver, Settings, TrackerConfig};
use crate::error::{Error, Result};
use crate::mask::InstanceMask;
use crate::notify::{self, NoopNotifier, Notifier};
use crate::output::{CliOutput, UserOutput};
use crate::port::{PortControl, SystemPorts};
use crate::process::{ProcessControl, SystemProcesses};
use crate::prompt::{Confirm, TerminalConfirm};
use std::sync::Arc;

pub const DEFAULT_FLAG: &str = "default";

/// Which trackers a command targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Every tracker with a definition on disk.
    All,
    /// Only these keys. `port` overrides the on-disk port when exactly one key is named.
    Named { keys: Vec<String>, port: Option<u16> },
}

impl Selection {
    pub fn from_args(keys: Vec<String>, port: Option<u16>) -> Self {
        if keys.is_empty() {
            if port.is_some() {
                tracing::debug!("--port ignored without an explicit tracker");
            }
            Selection::All
        } else {
            Selection::Named { keys, port }
        }
    }
}

/// Live state of one tracker instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunState {
    pub key: String,
    pub port: u16,
    pub mask: InstanceMask,
    pub running: bool,
    /// Always false for portless trackers.
    pub port_busy: bool,
}

/// What happened to each tracker during one command.
#[derive(Debug, Default)]
pub struct Report {
    pub launched: Vec<String>,
    pub stopped: Vec<String>,
    pub skipped: Vec<String>,
    pub failures: Vec<(String, Error)>,
}

impl Report {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn merge(&mut self, other: Report) {
        self.launched.extend(other.launched);
        self.stopped.extend(other.stopped);
        self.skipped.extend(other.skipped);
        self.failures.extend(other.failures);
    }

    fn fail(&mut self, key: &str, error: Error) {
        tracing::warn!("Tracker '{}': {}", key, error);
        self.failures.push((key.to_string(), error));
    }
}

pub struct Supervisor {
    resolver: ConfigResolver,
    settings: Settings,
    processes: Arc<dyn ProcessControl>,
    ports: Arc<dyn PortControl>,
    confirm: Arc<dyn Confirm>,
    notifier: Arc<dyn Notifier>,
    out: Arc<dyn UserOutput>,
    forced: bool,
}

impl Supervisor {
    /// Supervisor wired to the real process table, port space and terminal.
    /// Notifications are off until [`with_notifier`](Self::with_notifier).
    pub fn new(settings: Settings) -> Self {
        Self {
            resolver: ConfigResolver::new(settings.base_dir.clone()),
            settings,
            processes: Arc::new(SystemProcesses::new()),
            ports: Arc::new(SystemPorts),
            confirm: Arc::new(TerminalConfirm),
            notifier: Arc::new(NoopNotifier),
            out: Arc::new(CliOutput),
            forced: false,
        }
    }

    pub fn with_processes(mut self, processes: Arc<dyn ProcessControl>) -> Self {
        self.processes = processes;
        self
    }

    pub fn with_ports(mut self, ports: Arc<dyn PortControl>) -> Self {
        self.ports = ports;
        self
    }

    pub fn with_confirm(mut self, confirm: Arc<dyn Confirm>) -> Self {
        self.confirm = confirm;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_output(mut self, out: Arc<dyn UserOutput>) -> Self {
        self.out = out;
        self
    }

    /// Forced mode: kill and reclaim without asking.
    pub fn forced(mut self, forced: bool) -> Self {
        self.forced = forced;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn resolver(&self) -> &ConfigResolver {
        &self.resolver
    }

    /// The DesiredSet for `selection`. May be empty.
    pub fn desired(&self, selection: &Selection) -> Vec<TrackerConfig> {
        match selection {
            Selection::All => self.resolver.resolve_all(),
            Selection::Named { keys, port } => {
                let resolved = self.resolver.resolve(keys.as_slice(), *port);
                for key in keys {
                    if !resolved.iter().any(|t| &t.key == key) {
                        self.out
                            .warning(&format!("Tracker {} is not configured, skipping", key));
                    }
                }
                resolved
            }
        }
    }

    pub fn status(&self, selection: &Selection, flag: &str) -> Result<Vec<RunState>> {
        self.desired(selection)
            .into_iter()
            .map(|tracker| {
                let mask = InstanceMask::new(&tracker.key, flag);
                let running = self.processes.is_running(mask.as_str())?;
                let port_busy = tracker.has_port() && !self.ports.is_port_free(tracker.port);
                Ok(RunState {
                    key: tracker.key,
                    port: tracker.port,
                    mask,
                    running,
                    port_busy,
                })
            })
            .collect()
    }

    pub async fn start(&self, selection: &Selection, flag: &str) -> Report {
        let trackers = self.desired(selection);
        let mut report = Report::default();
        if trackers.is_empty() {
            self.out.warning("No trackers to start");
            return report;
        }

        self.out.status("Ports check");
        let mut launch_set = Vec::with_capacity(trackers.len());
        for tracker in trackers {
            let mask = InstanceMask::new(&tracker.key, flag);
            match self.resolve_conflicts(&tracker, &mask).await {
                Resolution::Launch => launch_set.push((tracker, mask)),
                Resolution::Skipped => report.skipped.push(tracker.key),
                Resolution::Failed(e) => {
                    self.out.error(&format!("Not starting tracker {}: {}", tracker.key, e));
                    report.fail(&tracker.key, e);
                }
            }
        }

        let mut launched = Vec::with_capacity(launch_set.len());
        for (tracker, mask) in launch_set {
            self.out
                .progress(&format!("Starting process for tracker {}... ", tracker.key));
            match self.launch(&tracker, &mask) {
                Ok(_) => {
                    self.out.finish_progress("[OK]");
                    report.launched.push(tracker.key.clone());
                    launched.push((tracker, mask));
                }
                Err(e) => {
                    self.out.finish_progress("[FAIL]");
                    report.fail(&tracker.key, e);
                }
            }
        }

        self.notifier.notify(&notify::plan(&launched, false)).await;
        report
    }

    pub async fn stop(&self, selection: &Selection, flag: &str) -> Report {
        let trackers = self.desired(selection);
        let mut report = Report::default();
        let mut notified = Vec::with_capacity(trackers.len());

        for tracker in trackers {
            let mask = InstanceMask::new(&tracker.key, flag);
            self.out
                .progress(&format!("Stopping listener for tracker {}... ", tracker.key));
            match self.terminate(&mask) {
                Ok(0) => {
                    self.out.finish_progress("not running");
                    report.skipped.push(tracker.key.clone());
                    notified.push((tracker, mask));
                }
                Ok(_) => {
                    self.out.finish_progress("[OK]");
                    report.stopped.push(tracker.key.clone());
                    notified.push((tracker, mask));
                }
                Err(e) => {
                    self.out.finish_progress("[FAIL]");
                    report.fail(&tracker.key, e);
                }
            }
        }

        self.notifier.notify(&notify::plan(&notified, true)).await;
        report
    }

    /// `stop` followed by `start` with the same selection and flag.
    ///
    /// With `stop_everything` the stop phase is a bulk teardown instead.
    /// Between the two phases the stopped listeners get a bounded grace to
    /// exit, so the start phase does not find them still running.
    pub async fn restart(&self, selection: &Selection, flag: &str, stop_everything: bool) -> Report {
        let mut report = if stop_everything {
            let report = self.stop_all(self.settings.legacy_sweep);
            self.wait_for_exit(InstanceMask::SCHEME_PREFIX, launcher::EXIT_GRACE_ATTEMPTS)
                .await;
            report
        } else {
            let report = self.stop(selection, flag).await;
            for key in &report.stopped {
                let mask = InstanceMask::new(key, flag);
                self.wait_for_exit(mask.as_str(), launcher::EXIT_GRACE_ATTEMPTS)
                    .await;
            }
            report
        };
        report.merge(self.start(selection, flag).await);
        report
    }
}
