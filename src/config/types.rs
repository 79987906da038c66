use std::fmt;
use std::path::PathBuf;

/// Port value used by roles that don't listen on the network (e.g. the balancer).
pub const NO_PORT: u16 = 0;

/// A resolved tracker definition.
///
/// Built once per invocation by [`ConfigResolver`](super::ConfigResolver) and
/// never mutated afterwards. Trackers without a discoverable port never make it
/// this far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    pub key: String,
    pub port: u16,
    /// Settings file handed to the listener on its command line.
    pub listener_config: PathBuf,
    /// Upstream status endpoint, may contain a `{host}` placeholder.
    pub notify_url: Option<String>,
    pub notify_host: Option<String>,
}

impl TrackerConfig {
    pub fn has_port(&self) -> bool {
        self.port != NO_PORT
    }
}

impl fmt::Display for TrackerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_port() {
            write!(f, "{} (port {})", self.key, self.port)
        } else {
            write!(f, "{} (no port)", self.key)
        }
    }
}
