#![allow(unused_assignments)]

//! # Pipe Supervisor
//!
//! Lifecycle management for tracker listener processes on a single host.
//!
//! ## Features
//!
//! - **Tracker resolution**: tracker definitions are read from `conf/serv-<key>.conf`
//!   under a base directory, with listener settings resolved per tracker
//! - **Instance masks**: every launched listener carries a deterministic token
//!   derived from its tracker key and run flag, so instances can be found and
//!   stopped without pid files
//! - **Port reclamation**: a busy port can be freed interactively or in forced mode,
//!   with a bounded number of retries
//! - **Status notification**: status endpoints learn which masks answer on which ports
//! - **Firewall bans**: the `pipe-ban` tool blocks sources per tracker port via iptables
//!
//! ## Quick Start
//!
//! ```no_run
//! use pipe_supervisor::{Selection, Settings, Supervisor};
//!
//! # async fn example() -> Result<(), pipe_supervisor::Error> {
//! let settings = Settings::load(None, Some("/srv/trackers".into()))?;
//! let supervisor = Supervisor::new(settings).forced(true);
//!
//! let selection = Selection::from_args(vec!["tr203".to_string()], None);
//! let report = supervisor.start(&selection, "default").await;
//! assert!(report.is_success());
//! # Ok(())
//! # }
//! ```

pub mod ban;
pub mod config;
pub mod error;
pub mod install;
pub mod mask;
pub mod notify;
pub mod output;
pub mod port;
pub mod process;
pub mod prompt;
pub mod supervisor;

// Re-export commonly used types
pub use config::{ConfigResolver, Settings, TrackerConfig};
pub use error::{Error, Result};
pub use mask::InstanceMask;
pub use supervisor::{Report, RunState, Selection, Supervisor, DEFAULT_FLAG};
