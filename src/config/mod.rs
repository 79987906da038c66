//! Configuration: tracker definitions and the supervisor's own settings.
//!
//! - `kv` - `key=value` extraction shared by all `.conf` files
//! - `resolver` - tracker key → [`TrackerConfig`] resolution
//! - `settings` - supervisor tunables loaded from `pipe-server.yaml`
//! - `duration` - human-readable durations used by the settings file

pub mod kv;

mod duration;
mod resolver;
mod settings;
mod types;

pub use duration::parse_duration_string;
pub use resolver::ConfigResolver;
pub use settings::{Settings, DEFAULT_BASE_DIR, SETTINGS_FILE_NAME};
pub use types::{TrackerConfig, NO_PORT};
