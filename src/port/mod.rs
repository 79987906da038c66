pub mod conflict;

pub use conflict::{PortConflict, PortHolder};

use crate::process::KillOutcome;

/// TCP port occupancy checks and forced reclaim.
pub trait PortControl: Send + Sync {
    fn is_port_free(&self, port: u16) -> bool;

    /// Kill whoever holds `port`. Returns one outcome per signalled process;
    /// empty when the port turned out to be free or no holder could be identified.
    fn reclaim(&self, port: u16) -> Vec<KillOutcome>;
}

/// [`PortControl`] for the local host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPorts;

impl PortControl for SystemPorts {
    fn is_port_free(&self, port: u16) -> bool {
        PortConflict::is_port_available(port)
    }

    fn reclaim(&self, port: u16) -> Vec<KillOutcome> {
        match PortConflict::check(port) {
            Some(conflict) => {
                if conflict.holders.is_empty() {
                    tracing::warn!("Port {} is busy but no holder could be identified", port);
                }
                conflict.kill_holders()
            }
            None => Vec::new(),
        }
    }
}
