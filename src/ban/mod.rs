//! Per-tracker source bans.
//!
//! A ban is a TCP REJECT rule for one source on one tracker's port. The
//! packet filter sits behind [`Firewall`]; [`Iptables`] is the real one.

mod iptables;
mod target;

pub use iptables::{blocked_sources, Iptables};
pub use target::BanTarget;

use crate::config::{ConfigResolver, TrackerConfig};
use crate::error::{Error, Result};
use crate::output::UserOutput;

/// Tracker argument meaning "every configured tracker".
pub const ALL_TRACKERS: &str = "all";

pub const USAGE: &str =
    "pipe-ban [{block|unblock|list}] <ip|CIDR|wildcard> {<tracker>|all}";

pub trait Firewall: Send + Sync {
    fn block(&self, target: &BanTarget, port: u16) -> Result<()>;

    fn unblock(&self, target: &BanTarget, port: u16) -> Result<()>;

    /// Raw rule listing, as printed by `iptables --list -n`.
    fn listing(&self) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BanCommand {
    Block { target: BanTarget, tracker: String },
    Unblock { target: BanTarget, tracker: String },
    List { tracker: String },
}

impl BanCommand {
    /// Parse positional arguments. An address in first position means `block`.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
        let usage = || Error::Config(format!("usage: {}", USAGE));

        match args.as_slice() {
            ["block", target, tracker] => Ok(BanCommand::Block {
                target: target.parse()?,
                tracker: tracker.to_string(),
            }),
            ["unblock", target, tracker] => Ok(BanCommand::Unblock {
                target: target.parse()?,
                tracker: tracker.to_string(),
            }),
            ["list", tracker] => Ok(BanCommand::List {
                tracker: tracker.to_string(),
            }),
            [target, tracker] => match target.parse::<BanTarget>() {
                Ok(target) => Ok(BanCommand::Block {
                    target,
                    tracker: tracker.to_string(),
                }),
                Err(_) => Err(usage()),
            },
            _ => Err(usage()),
        }
    }

    pub fn tracker(&self) -> &str {
        match self {
            BanCommand::Block { tracker, .. }
            | BanCommand::Unblock { tracker, .. }
            | BanCommand::List { tracker } => tracker,
        }
    }
}

/// Result of one ban command across its trackers.
#[derive(Debug, Default)]
pub struct BanReport {
    pub applied: Vec<String>,
    /// For `list`: tracker key and its blocked sources, in tracker order.
    pub listed: Vec<(String, Vec<BanTarget>)>,
    pub failures: Vec<(String, Error)>,
}

impl BanReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct BanTool<'a> {
    resolver: &'a ConfigResolver,
    firewall: &'a dyn Firewall,
    out: &'a dyn UserOutput,
}

impl<'a> BanTool<'a> {
    pub fn new(resolver: &'a ConfigResolver, firewall: &'a dyn Firewall, out: &'a dyn UserOutput) -> Self {
        Self {
            resolver,
            firewall,
            out,
        }
    }

    fn trackers(&self, name: &str) -> Vec<TrackerConfig> {
        let trackers = if name == ALL_TRACKERS {
            self.resolver.resolve_all()
        } else {
            self.resolver.resolve(&[name], None)
        };

        trackers
            .into_iter()
            .filter(|tracker| {
                if !tracker.has_port() {
                    tracing::debug!("Tracker '{}' has no port, nothing to ban", tracker.key);
                }
                tracker.has_port()
            })
            .collect()
    }

    pub fn run(&self, command: &BanCommand) -> BanReport {
        let mut report = BanReport::default();
        let trackers = self.trackers(command.tracker());
        if trackers.is_empty() {
            self.out
                .warning(&format!("No configured tracker matches '{}'", command.tracker()));
            return report;
        }

        match command {
            BanCommand::Block { target, .. } => {
                for tracker in &trackers {
                    self.out
                        .progress(&format!("Blocking {} from {} tracker... ", target, tracker.key));
                    self.apply(&mut report, tracker, self.firewall.block(target, tracker.port));
                }
            }
            BanCommand::Unblock { target, .. } => {
                for tracker in &trackers {
                    self.out
                        .progress(&format!("Allowing {} to {} tracker... ", target, tracker.key));
                    self.apply(&mut report, tracker, self.firewall.unblock(target, tracker.port));
                }
            }
            BanCommand::List { .. } => match self.firewall.listing() {
                Ok(listing) => {
                    for tracker in &trackers {
                        let sources = blocked_sources(&listing, tracker.port);
                        self.out
                            .status(&format!("Blocked IPs for tracker {}:", tracker.key));
                        for source in &sources {
                            self.out.status(&source.to_string());
                        }
                        report.listed.push((tracker.key.clone(), sources));
                    }
                }
                Err(e) => {
                    self.out.error(&e.to_string());
                    report.failures.push((command.tracker().to_string(), e));
                }
            },
        }

        report
    }

    fn apply(&self, report: &mut BanReport, tracker: &TrackerConfig, result: Result<()>) {
        match result {
            Ok(()) => {
                self.out.finish_progress("[OK]");
                report.applied.push(tracker.key.clone());
            }
            Err(e) => {
                self.out.finish_progress("[FAIL]");
                tracing::warn!("Tracker '{}': {}", tracker.key, e);
                report.failures.push((tracker.key.clone(), e));
            }
        }
    }
}
