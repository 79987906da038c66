use super::duration::deserialize_duration;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name looked up under `<base_dir>/conf/` when no `--settings` is given.
pub const SETTINGS_FILE_NAME: &str = "pipe-server.yaml";

pub const DEFAULT_BASE_DIR: &str = "/var/observer/Server/trunk";

/// Tunables of the supervisor itself, as opposed to the per-tracker files it
/// manages.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Root of the tracker installation; `conf/` lives underneath.
    pub base_dir: PathBuf,

    /// Listener program; relative paths are resolved against `base_dir`.
    pub listener: PathBuf,

    /// How many reclaim attempts before a busy port is given up on.
    pub port_retry_attempts: u32,

    #[serde(deserialize_with = "deserialize_duration")]
    pub port_retry_interval: Duration,

    /// Also sweep processes started by the pre-mask naming scheme on `stop --stop=all`.
    pub legacy_sweep: bool,

    #[serde(deserialize_with = "deserialize_duration")]
    pub notify_timeout: Duration,

    pub init_dir: PathBuf,

    pub service_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from(DEFAULT_BASE_DIR),
            listener: PathBuf::from("pipe-start"),
            port_retry_attempts: 50,
            port_retry_interval: Duration::from_secs(1),
            legacy_sweep: false,
            notify_timeout: Duration::from_secs(10),
            init_dir: PathBuf::from("/etc/init.d"),
            service_name: "pipe-server".to_string(),
        }
    }
}

impl Settings {
    /// Load settings.
    ///
    /// An explicit `path` must exist. Otherwise `<base_dir>/conf/pipe-server.yaml`
    /// is read when present, falling back to defaults. A `base_dir` override
    /// (CLI flag or `PIPE_BASE_DIR`) always wins over the file's value.
    pub fn load(path: Option<&Path>, base_dir: Option<PathBuf>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let root = base_dir
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_BASE_DIR));
                let candidate = root.join("conf").join(SETTINGS_FILE_NAME);
                if candidate.exists() {
                    Self::from_file(&candidate)?
                } else {
                    tracing::debug!(
                        "No settings file at {}, using defaults",
                        candidate.display()
                    );
                    Self::default()
                }
            }
        };

        if let Some(base_dir) = base_dir {
            settings.base_dir = base_dir;
        }

        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::Settings {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::parse(&content).map_err(|e| Error::Settings {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn listener_path(&self) -> PathBuf {
        if self.listener.is_absolute() {
            self.listener.clone()
        } else {
            self.base_dir.join(&self.listener)
        }
    }
}
