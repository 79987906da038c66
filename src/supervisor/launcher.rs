use super::{Report, Supervisor};
use crate::config::TrackerConfig;
use crate::error::{Error, Result};
use crate::mask::InstanceMask;
use crate::process::{KillOutcome, LaunchSpec};
use regex::Regex;

/// Command-line shape of listeners started before instance masks existed
/// (`python3 ... serv-<key>.conf`).
pub const LEGACY_PATTERN: &str = r"python.*serv-";

/// Listings to wait for signalled listeners to leave the process table.
pub(super) const EXIT_GRACE_ATTEMPTS: u32 = 5;

impl Supervisor {
    fn launch_spec(&self, tracker: &TrackerConfig, mask: &InstanceMask) -> LaunchSpec {
        let base_dir = self.resolver.base_dir();
        LaunchSpec {
            program: self.settings.listener_path(),
            args: vec![
                tracker.key.clone(),
                mask.to_string(),
                tracker.port.to_string(),
                tracker.listener_config.display().to_string(),
                base_dir.display().to_string(),
            ],
            work_dir: base_dir.to_path_buf(),
        }
    }

    /// Start the listener for `tracker`, detached. Does not wait for readiness.
    pub(super) fn launch(&self, tracker: &TrackerConfig, mask: &InstanceMask) -> Result<u32> {
        let spec = self.launch_spec(tracker, mask);
        self.processes
            .spawn_detached(&spec)
            .map_err(|e| Error::LaunchFailed(tracker.key.clone(), e.to_string()))
    }

    /// Signal every process carrying `mask`. Returns how many were signalled.
    pub(super) fn terminate(&self, mask: &InstanceMask) -> Result<usize> {
        let outcomes = self.processes.kill_by_command_substring(mask.as_str())?;
        check_outcomes(&outcomes)?;
        Ok(outcomes.len())
    }

    /// Poll until nothing carrying `pattern` is listed, at most `attempts` times.
    pub(super) async fn wait_for_exit(&self, pattern: &str, attempts: u32) {
        for _ in 0..attempts {
            match self.processes.is_running(pattern) {
                Ok(false) => return,
                Ok(true) => {}
                Err(e) => {
                    tracing::warn!("Cannot list processes for {}: {}", pattern, e);
                    return;
                }
            }
            tokio::time::sleep(self.settings.port_retry_interval).await;
        }
        tracing::debug!("{} still listed after {} attempts", pattern, attempts);
    }

    /// Bulk teardown of every masked listener, whatever its tracker or flag.
    ///
    /// `legacy` adds a second, separate pass over listeners started under the
    /// old naming scheme.
    pub fn stop_all(&self, legacy: bool) -> Report {
        let mut report = Report::default();

        self.out.progress("Stopping all tracker listeners... ");
        match self
            .processes
            .kill_by_command_substring(InstanceMask::SCHEME_PREFIX)
        {
            Ok(outcomes) => {
                self.out
                    .finish_progress(&format!("{} signalled", signalled(&outcomes)));
                record(&mut report, outcomes);
            }
            Err(e) => {
                self.out.finish_progress("[FAIL]");
                report.fail("all", e);
            }
        }

        if legacy {
            self.legacy_sweep(&mut report);
        }

        report
    }

    /// Kill listeners matching [`LEGACY_PATTERN`].
    // TODO: drop once no host runs listeners started by the pre-mask starter.
    fn legacy_sweep(&self, report: &mut Report) {
        self.out.progress("Legacy sweep (pre-mask listeners)... ");
        let result = Regex::new(LEGACY_PATTERN)
            .map_err(|e| Error::ProcessControl(e.to_string()))
            .and_then(|pattern| self.processes.kill_by_command_regex(&pattern));

        match result {
            Ok(outcomes) => {
                self.out
                    .finish_progress(&format!("{} signalled", signalled(&outcomes)));
                record(report, outcomes);
            }
            Err(e) => {
                self.out.finish_progress("[FAIL]");
                report.fail("legacy", e);
            }
        }
    }
}

fn signalled(outcomes: &[KillOutcome]) -> usize {
    outcomes.iter().filter(|o| o.is_ok()).count()
}

fn check_outcomes(outcomes: &[KillOutcome]) -> Result<()> {
    let failed: Vec<String> = outcomes
        .iter()
        .filter_map(|o| o.result.as_ref().err().cloned())
        .collect();
    if failed.is_empty() {
        Ok(())
    } else {
        Err(Error::ProcessControl(failed.join("; ")))
    }
}

fn record(report: &mut Report, outcomes: Vec<KillOutcome>) {
    for outcome in outcomes {
        let label = format!("{} ({})", outcome.pid, outcome.command);
        match outcome.result {
            Ok(()) => report.stopped.push(label),
            Err(e) => report.fail(&label, Error::ProcessControl(e)),
        }
    }
}
