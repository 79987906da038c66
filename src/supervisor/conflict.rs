use super::Supervisor;
use crate::config::TrackerConfig;
use crate::error::Error;
use crate::mask::InstanceMask;

/// Attempts to wait for a just-stopped listener to let go of its port before
/// the port is treated as held by someone else.
const RELEASE_GRACE_ATTEMPTS: u32 = 5;

/// Outcome of conflict resolution for one tracker in the start flow.
#[derive(Debug)]
pub enum Resolution {
    Launch,
    /// Operator chose to leave a running instance alone.
    Skipped,
    Failed(Error),
}

impl Supervisor {
    /// Decide whether `tracker` can be launched, killing the previous instance
    /// and reclaiming its port as needed.
    pub(super) async fn resolve_conflicts(&self, tracker: &TrackerConfig, mask: &InstanceMask) -> Resolution {
        match self.processes.is_running(mask.as_str()) {
            Ok(true) => {
                let question = format!(
                    "Listener for tracker {} is already running. Restart?",
                    tracker.key
                );
                if !self.forced && !self.confirm.confirm(&question, true) {
                    self.out
                        .status(&format!("Leaving tracker {} running", tracker.key));
                    return Resolution::Skipped;
                }

                self.out.progress("Stopping... ");
                if let Err(e) = self.terminate(mask) {
                    self.out.finish_progress("[FAIL]");
                    return Resolution::Failed(e);
                }
                self.out.finish_progress("[OK]");

                if tracker.has_port() {
                    self.wait_for_release(tracker.port, RELEASE_GRACE_ATTEMPTS).await;
                }
            }
            Ok(false) => {}
            Err(e) => return Resolution::Failed(e),
        }

        if !tracker.has_port() || self.ports.is_port_free(tracker.port) {
            return Resolution::Launch;
        }

        self.out
            .warning(&format!("Port {} is busy by someone else.", tracker.port));
        let question = format!("Free port {} forcefully?", tracker.port);
        if !self.forced && !self.confirm.confirm(&question, true) {
            return Resolution::Failed(Error::PortUnavailable {
                key: tracker.key.clone(),
                port: tracker.port,
                reason: "operator declined to free it".to_string(),
            });
        }

        if self.force_free(tracker.port).await {
            Resolution::Launch
        } else {
            Resolution::Failed(Error::PortUnavailable {
                key: tracker.key.clone(),
                port: tracker.port,
                reason: format!(
                    "still busy after {} attempts to free it",
                    self.settings.port_retry_attempts
                ),
            })
        }
    }

    async fn wait_for_release(&self, port: u16, attempts: u32) {
        for _ in 0..attempts {
            if self.ports.is_port_free(port) {
                return;
            }
            tokio::time::sleep(self.settings.port_retry_interval).await;
        }
    }

    /// Reclaim `port`, re-checking between bounded attempts.
    async fn force_free(&self, port: u16) -> bool {
        self.out.progress(&format!("Closing port {}", port));

        for attempt in 1..=self.settings.port_retry_attempts {
            if self.ports.is_port_free(port) {
                self.out.finish_progress("[OK]");
                return true;
            }

            for outcome in self.ports.reclaim(port) {
                if let Err(e) = outcome.result {
                    tracing::warn!("Attempt {} to free port {}: {}", attempt, port, e);
                }
            }
            self.out.progress(".");
            tokio::time::sleep(self.settings.port_retry_interval).await;
        }

        let freed = self.ports.is_port_free(port);
        self.out.finish_progress(if freed { "[OK]" } else { "[FAIL]" });
        freed
    }
}
