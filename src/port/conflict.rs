use crate::process::KillOutcome;
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener};
use std::process::Command;

const BIND_ADDRS: [IpAddr; 4] = [
    IpAddr::V4(Ipv4Addr::LOCALHOST),
    IpAddr::V4(Ipv4Addr::UNSPECIFIED),
    IpAddr::V6(Ipv6Addr::LOCALHOST),
    IpAddr::V6(Ipv6Addr::UNSPECIFIED),
];

/// A busy TCP port and whatever we could find holding it.
#[derive(Debug, Clone)]
pub struct PortConflict {
    pub port: u16,
    pub holders: Vec<PortHolder>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortHolder {
    pub pid: u32,
    pub name: String,
}

impl PortConflict {
    /// Check if a port is in use and return conflict info
    pub fn check(port: u16) -> Option<Self> {
        if Self::is_port_available(port) {
            return None;
        }

        Some(PortConflict {
            port,
            holders: Self::find_holders(port),
        })
    }

    /// True unless binding fails with `AddrInUse` on any of the loopback or
    /// wildcard addresses of either family.
    ///
    /// Other bind failures (`EACCES` on a privileged port for a non-root
    /// operator, `EADDRNOTAVAIL` or `EAFNOSUPPORT` on a host without IPv6) say
    /// nothing about occupancy and are treated as free.
    pub fn is_port_available(port: u16) -> bool {
        // A listener may hold only one family, or only loopback, so every
        // combination has to be tried.
        BIND_ADDRS.iter().all(|ip| {
            match TcpListener::bind(SocketAddr::new(*ip, port)) {
                Ok(_) => true,
                Err(e) => e.kind() != ErrorKind::AddrInUse,
            }
        })
    }

    /// Combine `ss` and `lsof` output; either tool may be missing.
    fn find_holders(port: u16) -> Vec<PortHolder> {
        let mut holders = Self::find_holders_ss(port);
        let seen: HashSet<u32> = holders.iter().map(|h| h.pid).collect();
        for holder in Self::find_holders_lsof(port) {
            if !seen.contains(&holder.pid) {
                holders.push(holder);
            }
        }
        holders
    }

    fn find_holders_ss(port: u16) -> Vec<PortHolder> {
        let output = match Command::new("ss")
            .args(["-tlnp", &format!("sport = :{}", port)])
            .output()
        {
            Ok(o) if o.status.success() => o,
            _ => return Vec::new(),
        };

        parse_ss_pids(&String::from_utf8_lossy(&output.stdout))
            .into_iter()
            .map(|pid| PortHolder {
                pid,
                name: process_name(pid),
            })
            .collect()
    }

    fn find_holders_lsof(port: u16) -> Vec<PortHolder> {
        let output = match Command::new("lsof")
            .args(["-i", &format!("tcp:{}", port), "-P", "-n", "-F", "pc"])
            .output()
        {
            Ok(o) if o.status.success() => o,
            _ => return Vec::new(),
        };

        parse_lsof_fields(&String::from_utf8_lossy(&output.stdout))
    }

    /// SIGKILL every holder except the current process.
    pub fn kill_holders(&self) -> Vec<KillOutcome> {
        let current_pid = std::process::id();

        self.holders
            .iter()
            .filter(|holder| {
                if holder.pid == current_pid {
                    tracing::debug!(
                        "Skipping self (PID {}) when freeing port {}",
                        holder.pid,
                        self.port
                    );
                    return false;
                }
                true
            })
            .map(|holder| {
                let result = i32::try_from(holder.pid)
                    .map_err(|_| format!("pid {} out of range", holder.pid))
                    .and_then(|raw| match signal::kill(Pid::from_raw(raw), Signal::SIGKILL) {
                        Ok(()) | Err(Errno::ESRCH) => Ok(()),
                        Err(e) => Err(format!("kill -9 {}: {}", holder.pid, e)),
                    });
                tracing::info!(
                    "Killed {} ({}) holding port {}: {:?}",
                    holder.pid,
                    holder.name,
                    self.port,
                    result
                );
                KillOutcome {
                    pid: holder.pid,
                    command: holder.name.clone(),
                    result,
                }
            })
            .collect()
    }
}

fn process_name(pid: u32) -> String {
    std::fs::read_to_string(format!("/proc/{}/comm", pid))
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Pull `pid=N` entries out of `ss -tlnp` output.
fn parse_ss_pids(stdout: &str) -> Vec<u32> {
    let mut seen = HashSet::new();
    let mut pids = Vec::new();

    // First line is the header.
    for line in stdout.lines().skip(1) {
        for part in line.split(|c| c == ',' || c == '(' || c == ')') {
            if let Some(pid) = part.strip_prefix("pid=").and_then(|p| p.parse::<u32>().ok()) {
                if seen.insert(pid) {
                    pids.push(pid);
                }
            }
        }
    }

    pids
}

/// Parse `lsof -F pc` field output: `p<pid>` starts a process, `c<cmd>` names it.
fn parse_lsof_fields(stdout: &str) -> Vec<PortHolder> {
    let mut holders: Vec<PortHolder> = Vec::new();
    let mut current: Option<usize> = None;

    for line in stdout.lines() {
        if let Some(pid) = line.strip_prefix('p') {
            current = pid.parse::<u32>().ok().map(|pid| {
                holders.iter().position(|h| h.pid == pid).unwrap_or_else(|| {
                    holders.push(PortHolder {
                        pid,
                        name: "unknown".to_string(),
                    });
                    holders.len() - 1
                })
            });
        } else if let Some(name) = line.strip_prefix('c') {
            if let Some(holder) = current.and_then(|i| holders.get_mut(i)) {
                holder.name = name.to_string();
            }
        }
    }

    holders
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bound_port_is_unavailable() {
        let listener = TcpListener::bind(("0.0.0.0", 0)).unwrap();
        let port = listener.local_addr().unwrap().port();

        assert!(!PortConflict::is_port_available(port));
        let conflict = PortConflict::check(port).expect("port should be busy");
        assert_eq!(conflict.port, port);

        drop(listener);
        assert!(PortConflict::is_port_available(port));
    }

    #[test]
    fn test_port_held_over_ipv6_is_unavailable() {
        // Hosts without IPv6 loopback can't hold a port this way.
        let Ok(listener) = TcpListener::bind(("::1", 0)) else {
            return;
        };
        let port = listener.local_addr().unwrap().port();

        assert!(!PortConflict::is_port_available(port));

        drop(listener);
        assert!(PortConflict::is_port_available(port));
    }

    #[test]
    fn test_parse_ss_output() {
        let stdout = "State  Recv-Q Send-Q Local Address:Port Peer Address:Port Process\n\
LISTEN 0      128    0.0.0.0:20103      0.0.0.0:*     users:((\"python3\",pid=4242,fd=3),(\"python3\",pid=4243,fd=3))\n\
LISTEN 0      128    [::]:20103         [::]:*        users:((\"python3\",pid=4242,fd=4))\n";
        assert_eq!(parse_ss_pids(stdout), vec![4242, 4243]);
    }

    #[test]
    fn test_parse_lsof_fields() {
        let stdout = "p100\ncpython3\nf3\np200\ncnginx\np100\n";
        assert_eq!(
            parse_lsof_fields(stdout),
            vec![
                PortHolder {
                    pid: 100,
                    name: "python3".to_string()
                },
                PortHolder {
                    pid: 200,
                    name: "nginx".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_kill_holders_skips_self() {
        let conflict = PortConflict {
            port: 1,
            holders: vec![PortHolder {
                pid: std::process::id(),
                name: "me".to_string(),
            }],
        };
        assert!(conflict.kill_holders().is_empty());
    }
}
