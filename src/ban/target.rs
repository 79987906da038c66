use crate::error::{Error, Result};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// A source address or network to block.
///
/// Ordering is numeric: by address, then by prefix length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BanTarget {
    addr: Ipv4Addr,
    prefix: u8,
}

impl BanTarget {
    pub fn new(addr: Ipv4Addr, prefix: u8) -> Result<Self> {
        if prefix > 32 {
            return Err(Error::InvalidAddress(format!("{}/{}", addr, prefix)));
        }
        let mask = u32::MAX.checked_shl(32 - prefix as u32).unwrap_or(0);
        Ok(Self {
            addr: Ipv4Addr::from(u32::from(addr) & mask),
            prefix,
        })
    }

    pub fn addr(&self) -> Ipv4Addr {
        self.addr
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    pub fn is_host(&self) -> bool {
        self.prefix == 32
    }

    /// `10.1.*` → `10.1.0.0/16`. Between one and three leading octets.
    fn from_wildcard(s: &str) -> Option<Self> {
        let head = s.strip_suffix(".*")?;
        let octets: Vec<u8> = head
            .split('.')
            .map(|part| part.parse::<u8>().ok())
            .collect::<Option<_>>()?;
        if octets.is_empty() || octets.len() > 3 {
            return None;
        }

        let mut bytes = [0u8; 4];
        bytes[..octets.len()].copy_from_slice(&octets);
        Self::new(Ipv4Addr::from(bytes), (octets.len() * 8) as u8).ok()
    }

    fn from_cidr(s: &str) -> Option<Self> {
        let (addr, prefix) = match s.split_once('/') {
            Some((addr, prefix)) => (addr, prefix.parse::<u8>().ok()?),
            None => (s, 32),
        };
        Self::new(addr.parse().ok()?, prefix).ok()
    }
}

impl FromStr for BanTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Self::from_wildcard(s)
            .or_else(|| Self::from_cidr(s))
            .ok_or_else(|| Error::InvalidAddress(s.to_string()))
    }
}

/// Hosts print bare, networks in CIDR notation (the same way `iptables -n` lists them).
impl fmt::Display for BanTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_host() {
            write!(f, "{}", self.addr)
        } else {
            write!(f, "{}/{}", self.addr, self.prefix)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_address_is_host() {
        let target: BanTarget = "192.168.1.10".parse().unwrap();
        assert!(target.is_host());
        assert_eq!(target.to_string(), "192.168.1.10");
    }

    #[test]
    fn test_wildcards_become_cidr() {
        assert_eq!("10.*".parse::<BanTarget>().unwrap().to_string(), "10.0.0.0/8");
        assert_eq!("10.1.*".parse::<BanTarget>().unwrap().to_string(), "10.1.0.0/16");
        assert_eq!(
            "10.1.2.*".parse::<BanTarget>().unwrap().to_string(),
            "10.1.2.0/24"
        );
    }

    #[test]
    fn test_cidr_is_normalized_to_network() {
        let target: BanTarget = "10.1.2.3/16".parse().unwrap();
        assert_eq!(target.to_string(), "10.1.0.0/16");
        assert_eq!("0.0.0.0/0".parse::<BanTarget>().unwrap().prefix(), 0);
    }

    #[test]
    fn test_rejects_garbage() {
        for input in ["", "*", "tr203", "10.1.2.3.*", "256.1.1.1", "10.0.0.0/33", "10.1.*.*", "::1"] {
            assert!(
                matches!(input.parse::<BanTarget>(), Err(Error::InvalidAddress(_))),
                "{:?} should be rejected",
                input
            );
        }
    }

    #[test]
    fn test_ordering_is_numeric() {
        let mut targets: Vec<BanTarget> = ["10.0.0.10", "10.0.0.9", "9.255.255.255", "10.0.0.0/8"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        targets.sort();
        let printed: Vec<String> = targets.iter().map(ToString::to_string).collect();
        assert_eq!(printed, vec!["9.255.255.255", "10.0.0.0/8", "10.0.0.9", "10.0.0.10"]);
    }
}
