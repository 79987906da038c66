//! In-memory process table, port space and notifier for supervisor tests.

use crate::error::Result;
use crate::notify::{Notifier, NotifyRequest};
use crate::port::PortControl;
use crate::process::{KillOutcome, LaunchSpec, ProcessControl, ProcessInfo};
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct FakeProcesses {
    table: Mutex<Vec<ProcessInfo>>,
    spawned: Mutex<Vec<LaunchSpec>>,
    events: Mutex<Vec<String>>,
    next_pid: Mutex<u32>,
    /// Killed processes that stay visible for this many more listings.
    dying: Mutex<Vec<(ProcessInfo, u32)>>,
    exit_delay: Mutex<u32>,
    refuse_signals: Mutex<bool>,
}

impl FakeProcesses {
    fn add(&self, command: String) -> u32 {
        let mut next = self.next_pid.lock().unwrap();
        *next += 1;
        let pid = 1000 + *next;
        self.table.lock().unwrap().push(ProcessInfo { pid, command });
        pid
    }

    /// A process the supervisor did not start.
    pub fn insert_foreign(&self, command: &str) -> u32 {
        self.add(command.to_string())
    }

    pub fn spawned(&self) -> Vec<LaunchSpec> {
        self.spawned.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear_events(&self) {
        self.events.lock().unwrap().clear();
    }

    pub fn running_count(&self) -> usize {
        self.table.lock().unwrap().len()
    }

    /// Signalled processes linger in listings for `listings` more calls.
    pub fn set_exit_delay(&self, listings: u32) {
        *self.exit_delay.lock().unwrap() = listings;
    }

    /// Every signal fails as if sent to another user's process.
    pub fn refuse_signals(&self) {
        *self.refuse_signals.lock().unwrap() = true;
    }

    fn kill_where<F: Fn(&str) -> bool>(&self, matches: F) -> Vec<KillOutcome> {
        if *self.refuse_signals.lock().unwrap() {
            return self
                .table
                .lock()
                .unwrap()
                .iter()
                .filter(|p| matches(&p.command))
                .map(|p| KillOutcome {
                    pid: p.pid,
                    command: p.command.clone(),
                    result: Err(format!("{}: EPERM: Operation not permitted", p.pid)),
                })
                .collect();
        }

        let mut table = self.table.lock().unwrap();
        let (killed, kept): (Vec<_>, Vec<_>) = table.drain(..).partition(|p| matches(&p.command));
        *table = kept;

        let delay = *self.exit_delay.lock().unwrap();
        if delay > 0 {
            self.dying
                .lock()
                .unwrap()
                .extend(killed.iter().cloned().map(|p| (p, delay)));
        }

        killed
            .into_iter()
            .map(|p| KillOutcome {
                pid: p.pid,
                command: p.command,
                result: Ok(()),
            })
            .collect()
    }
}

impl ProcessControl for FakeProcesses {
    fn list_by_command_substring(&self, pattern: &str) -> Result<Vec<ProcessInfo>> {
        let mut listed: Vec<ProcessInfo> = self
            .table
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.command.contains(pattern))
            .cloned()
            .collect();

        let mut dying = self.dying.lock().unwrap();
        for (process, remaining) in dying.iter_mut() {
            if process.command.contains(pattern) {
                listed.push(process.clone());
            }
            *remaining -= 1;
        }
        dying.retain(|(_, remaining)| *remaining > 0);

        Ok(listed)
    }

    fn kill_by_command_substring(&self, pattern: &str) -> Result<Vec<KillOutcome>> {
        self.events.lock().unwrap().push(format!("kill {}", pattern));
        Ok(self.kill_where(|command| command.contains(pattern)))
    }

    fn kill_by_command_regex(&self, pattern: &Regex) -> Result<Vec<KillOutcome>> {
        self.events
            .lock()
            .unwrap()
            .push(format!("kill /{}/", pattern.as_str()));
        Ok(self.kill_where(|command| pattern.is_match(command)))
    }

    fn spawn_detached(&self, spec: &LaunchSpec) -> Result<u32> {
        self.events
            .lock()
            .unwrap()
            .push(format!("spawn {}", spec.command_line()));
        self.spawned.lock().unwrap().push(spec.clone());
        Ok(self.add(spec.command_line()))
    }
}

/// Busy ports, each freed after a number of reclaims (`None`: never).
#[derive(Default)]
pub struct FakePorts {
    busy: Mutex<HashMap<u16, Option<u32>>>,
    reclaims: Mutex<HashMap<u16, u32>>,
}

impl FakePorts {
    pub fn occupy(&self, port: u16, frees_after: Option<u32>) {
        self.busy.lock().unwrap().insert(port, frees_after);
    }

    pub fn reclaims(&self, port: u16) -> u32 {
        self.reclaims.lock().unwrap().get(&port).copied().unwrap_or(0)
    }
}

impl PortControl for FakePorts {
    fn is_port_free(&self, port: u16) -> bool {
        !self.busy.lock().unwrap().contains_key(&port)
    }

    fn reclaim(&self, port: u16) -> Vec<KillOutcome> {
        *self.reclaims.lock().unwrap().entry(port).or_insert(0) += 1;

        let mut busy = self.busy.lock().unwrap();
        let freed = match busy.get_mut(&port) {
            Some(Some(remaining)) => {
                *remaining = remaining.saturating_sub(1);
                *remaining == 0
            }
            _ => false,
        };
        if freed {
            busy.remove(&port);
        }
        Vec::new()
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<NotifyRequest>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<NotifyRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, requests: &[NotifyRequest]) {
        self.sent.lock().unwrap().extend_from_slice(requests);
    }
}
