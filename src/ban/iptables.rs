//! iptables-backed firewall.
//!
//! Every `iptables` invocation goes through [`Iptables::run`], so the binary
//! name and error mapping live in one place.

use super::{BanTarget, Firewall};
use crate::error::{Error, Result};
use regex::Regex;
use std::path::PathBuf;
use std::process::{Command, Output};

const TABLE: &str = "filter";
const CHAIN: &str = "INPUT";

#[derive(Debug, Clone)]
pub struct Iptables {
    program: PathBuf,
}

impl Default for Iptables {
    fn default() -> Self {
        Self::new()
    }
}

impl Iptables {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("iptables"),
        }
    }

    /// Use a different binary (e.g. `iptables-legacy`).
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, args: &[String]) -> Result<Output> {
        let cmd_str = format!("{} {}", self.program.display(), args.join(" "));
        tracing::debug!("Running {}", cmd_str);

        let output = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|e| Error::Firewall(format!("{}: {}", cmd_str, e)))?;

        if output.status.success() {
            Ok(output)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(Error::Firewall(format!("{}: {}", cmd_str, stderr.trim())))
        }
    }

    fn rule(&self, op: &str, target: &BanTarget, port: u16) -> Vec<String> {
        vec![
            "-t".to_string(),
            TABLE.to_string(),
            op.to_string(),
            CHAIN.to_string(),
            "-p".to_string(),
            "tcp".to_string(),
            "-s".to_string(),
            target.to_string(),
            "--dport".to_string(),
            port.to_string(),
            "-j".to_string(),
            "REJECT".to_string(),
        ]
    }
}

impl Firewall for Iptables {
    fn block(&self, target: &BanTarget, port: u16) -> Result<()> {
        self.run(&self.rule("--append", target, port)).map(|_| ())
    }

    fn unblock(&self, target: &BanTarget, port: u16) -> Result<()> {
        self.run(&self.rule("--delete", target, port)).map(|_| ())
    }

    fn listing(&self) -> Result<String> {
        let args = ["-t", TABLE, "--list", "-n"].map(String::from);
        let output = self.run(&args)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Sources rejected on `port` in an `iptables --list -n` dump.
///
/// Deduplicated, sorted by address then prefix length. Lines that don't look
/// like a TCP REJECT rule for `port` are ignored. The protocol column is
/// either `tcp` or, on newer iptables builds, its number `6`.
pub fn blocked_sources(listing: &str, port: u16) -> Vec<BanTarget> {
    let pattern = format!(r"REJECT\s+(?:tcp|6)[\s\-]+([\d\./]+).*\bdpt:{}\b", port);
    let Ok(rule) = Regex::new(&pattern) else {
        return Vec::new();
    };

    let mut sources: Vec<BanTarget> = listing
        .lines()
        .filter_map(|line| rule.captures(line))
        .filter_map(|caps| caps[1].parse().ok())
        .collect();
    sources.sort();
    sources.dedup();
    sources
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
Chain INPUT (policy ACCEPT)
target     prot opt source               destination
REJECT     tcp  --  10.0.0.10            0.0.0.0/0            tcp dpt:20103 reject-with icmp-port-unreachable
REJECT     tcp  --  10.0.0.9             0.0.0.0/0            tcp dpt:20103 reject-with icmp-port-unreachable
REJECT     tcp  --  192.168.0.0/16       0.0.0.0/0            tcp dpt:20103 reject-with icmp-port-unreachable
REJECT     tcp  --  10.0.0.9             0.0.0.0/0            tcp dpt:20103 reject-with icmp-port-unreachable
REJECT     tcp  --  172.16.5.5           0.0.0.0/0            tcp dpt:20106 reject-with icmp-port-unreachable
REJECT     tcp  --  172.16.5.6           0.0.0.0/0            tcp dpt:201030 reject-with icmp-port-unreachable
ACCEPT     tcp  --  10.0.0.1             0.0.0.0/0            tcp dpt:20103

Chain FORWARD (policy ACCEPT)
target     prot opt source               destination
";

    #[test]
    fn test_blocked_sources_dedup_and_numeric_sort() {
        let sources: Vec<String> = blocked_sources(LISTING, 20103)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(sources, vec!["10.0.0.9", "10.0.0.10", "192.168.0.0/16"]);
    }

    #[test]
    fn test_blocked_sources_filters_by_port() {
        let sources = blocked_sources(LISTING, 20106);
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].to_string(), "172.16.5.5");
        assert!(blocked_sources(LISTING, 20600).is_empty());
    }

    #[test]
    fn test_blocked_sources_numeric_protocol_column() {
        let listing = "\
Chain INPUT (policy ACCEPT)
target     prot opt source               destination
REJECT     6    --  10.0.0.11            0.0.0.0/0            tcp dpt:20103 reject-with icmp-port-unreachable
REJECT     tcp  --  10.0.0.9             0.0.0.0/0            tcp dpt:20103 reject-with icmp-port-unreachable
REJECT     17   --  10.0.0.12            0.0.0.0/0            udp dpt:20103 reject-with icmp-port-unreachable
";
        let sources: Vec<String> = blocked_sources(listing, 20103)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(sources, vec!["10.0.0.9", "10.0.0.11"]);
    }

    #[test]
    fn test_blocked_sources_empty_listing() {
        assert!(blocked_sources("", 20103).is_empty());
    }

    #[test]
    fn test_rule_arguments() {
        let target: BanTarget = "10.1.*".parse().unwrap();
        let args = Iptables::new().rule("--append", &target, 20103);
        assert_eq!(
            args.join(" "),
            "-t filter --append INPUT -p tcp -s 10.1.0.0/16 --dport 20103 -j REJECT"
        );
    }

    #[test]
    fn test_missing_binary_is_firewall_error() {
        let iptables = Iptables::with_program("/nonexistent/iptables");
        assert!(matches!(iptables.listing(), Err(Error::Firewall(_))));
    }
}
