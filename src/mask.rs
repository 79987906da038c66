use std::fmt;

/// Deterministic identifier for one (tracker, flag) instance.
///
/// Embedded in the listener's command line at launch and later used as the
/// only link between a logical tracker and the OS process running it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceMask(String);

impl InstanceMask {
    /// Shared by every mask; bulk teardown matches on it.
    pub const SCHEME_PREFIX: &'static str = "pipe-mask-";

    pub fn new(key: &str, flag: &str) -> Self {
        let mut bytes = Vec::with_capacity(key.len() + flag.len() + 1);
        bytes.extend_from_slice(key.as_bytes());
        // Unit separator keeps ("ab", "c") and ("a", "bc") apart.
        bytes.push(0x1f);
        bytes.extend_from_slice(flag.as_bytes());

        Self(format!("{}{:016x}", Self::SCHEME_PREFIX, fnv1a_64(&bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for InstanceMask {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// FNV-1a 64-bit hash, deterministic across Rust versions and platforms.
pub(crate) fn fnv1a_64(data: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = FNV_OFFSET;
    for &byte in data {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_fnv1a_known_vectors() {
        assert_eq!(fnv1a_64(b""), 0xcbf29ce484222325);
        assert_eq!(fnv1a_64(b"a"), 0xaf63dc4c8601ec8c);
    }

    #[test]
    fn test_mask_is_stable() {
        let first = InstanceMask::new("tr203", "default");
        for _ in 0..10 {
            assert_eq!(InstanceMask::new("tr203", "default"), first);
        }
        assert!(first.as_str().starts_with(InstanceMask::SCHEME_PREFIX));
        assert_eq!(first.as_str().len(), InstanceMask::SCHEME_PREFIX.len() + 16);
    }

    #[test]
    fn test_masks_differ_across_corpus() {
        let keys = ["tr203", "tr206", "tr600", "galileo", "atrack", "balancer", "a", "ab"];
        let flags = ["default", "debug", "prod", "", "b", "c"];

        let mut seen = HashSet::new();
        for key in keys {
            for flag in flags {
                assert!(
                    seen.insert(InstanceMask::new(key, flag)),
                    "collision for ({}, {})",
                    key,
                    flag
                );
            }
        }
    }

    #[test]
    fn test_concatenation_is_order_sensitive() {
        assert_ne!(InstanceMask::new("ab", "c"), InstanceMask::new("a", "bc"));
        assert_ne!(InstanceMask::new("x", "y"), InstanceMask::new("y", "x"));
    }
}
