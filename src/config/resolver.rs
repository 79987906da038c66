use super::kv::KeyValues;
use super::TrackerConfig;
use std::fs;
use std::path::{Path, PathBuf};

const DEFINITION_PREFIX: &str = "serv-";
const LISTENER_PREFIX: &str = "pipe-";
const CONF_SUFFIX: &str = ".conf";
const DEFAULT_LISTENER_CONF: &str = "pipe-default.conf";
const FALLBACK_LISTENER_CONF: &str = "pipe.conf";

/// Turns tracker keys into [`TrackerConfig`]s by reading `<base_dir>/conf/`.
///
/// Missing or portless definitions are dropped rather than reported as errors,
/// so every caller must cope with an empty result.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    base_dir: PathBuf,
}

impl ConfigResolver {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn conf_dir(&self) -> PathBuf {
        self.base_dir.join("conf")
    }

    fn definition_path(&self, key: &str) -> PathBuf {
        self.conf_dir()
            .join(format!("{}{}{}", DEFINITION_PREFIX, key, CONF_SUFFIX))
    }

    /// Every tracker with a `serv-<key>.conf` and a readable port, sorted by key.
    pub fn resolve_all(&self) -> Vec<TrackerConfig> {
        let entries = match fs::read_dir(self.conf_dir()) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!("Cannot list {}: {}", self.conf_dir().display(), e);
                return Vec::new();
            }
        };

        let mut keys: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                let key = name
                    .strip_prefix(DEFINITION_PREFIX)?
                    .strip_suffix(CONF_SUFFIX)?;
                (!key.is_empty()).then(|| key.to_string())
            })
            .collect();
        keys.sort();

        keys.iter()
            .filter_map(|key| self.resolve_one(key, None))
            .collect()
    }

    /// Resolve the named trackers, in the order given.
    ///
    /// `explicit_port` replaces the on-disk port only when exactly one key is
    /// requested; with several keys it is ignored.
    pub fn resolve<S: AsRef<str>>(&self, keys: &[S], explicit_port: Option<u16>) -> Vec<TrackerConfig> {
        let mut unique: Vec<&str> = Vec::with_capacity(keys.len());
        for key in keys {
            if !unique.contains(&key.as_ref()) {
                unique.push(key.as_ref());
            }
        }

        let port_override = if unique.len() == 1 { explicit_port } else { None };
        if explicit_port.is_some() && port_override.is_none() {
            tracing::debug!("Ignoring explicit port: more than one tracker requested");
        }

        unique
            .into_iter()
            .filter_map(|key| self.resolve_one(key, port_override))
            .collect()
    }

    fn resolve_one(&self, key: &str, port_override: Option<u16>) -> Option<TrackerConfig> {
        let definition = self.definition_path(key);
        if !definition.is_file() {
            tracing::debug!("Tracker '{}' has no definition at {}", key, definition.display());
            return None;
        }

        let port = match port_override {
            Some(port) => port,
            None => {
                let port = KeyValues::load(&definition).and_then(|kv| kv.port());
                if port.is_none() {
                    tracing::debug!("Tracker '{}' has no usable port, skipping", key);
                }
                port?
            }
        };

        let listener_config = self.pipe_conf(key);
        let listener_settings = KeyValues::load(&listener_config).unwrap_or_default();

        Some(TrackerConfig {
            key: key.to_string(),
            port,
            notify_url: listener_settings.get("urlconfig").map(str::to_string),
            notify_host: listener_settings.get("host").map(str::to_string),
            listener_config,
        })
    }

    /// Listener settings file for `key`: `pipe-<key>.conf`, else
    /// `pipe-default.conf`, else `pipe.conf` whether or not it exists.
    pub fn pipe_conf(&self, key: &str) -> PathBuf {
        let conf_dir = self.conf_dir();

        let specific = conf_dir.join(format!("{}{}{}", LISTENER_PREFIX, key, CONF_SUFFIX));
        if specific.is_file() {
            return specific;
        }

        let shared = conf_dir.join(DEFAULT_LISTENER_CONF);
        if shared.is_file() {
            return shared;
        }

        conf_dir.join(FALLBACK_LISTENER_CONF)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture(files: &[(&str, &str)]) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("conf")).unwrap();
        for (name, content) in files {
            fs::write(dir.path().join("conf").join(name), content).unwrap();
        }
        dir
    }

    #[test]
    fn test_resolve_all_sorted_and_filtered() {
        let dir = fixture(&[
            ("serv-tr600.conf", "port=20600\n"),
            ("serv-tr203.conf", "[general]\nport = 20103\n"),
            ("serv-broken.conf", "host=localhost\n"),
            ("serv-balancer.conf", "port=0\n"),
            ("pipe-default.conf", "urlconfig=http://example.org/set\n"),
            ("notes.txt", "port=1\n"),
        ]);
        let resolver = ConfigResolver::new(dir.path());

        let all = resolver.resolve_all();
        let keys: Vec<_> = all.iter().map(|t| t.key.as_str()).collect();
        assert_eq!(keys, vec!["balancer", "tr203", "tr600"]);
        assert_eq!(all[1].port, 20103);
        assert!(!all[0].has_port());
        assert_eq!(
            all[2].notify_url.as_deref(),
            Some("http://example.org/set")
        );
    }

    #[test]
    fn test_resolve_all_without_conf_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ConfigResolver::new(dir.path()).resolve_all().is_empty());
    }

    #[test]
    fn test_resolve_named_skips_missing() {
        let dir = fixture(&[("serv-tr203.conf", "port=20103\n")]);
        let resolver = ConfigResolver::new(dir.path());

        let resolved = resolver.resolve(&["nope", "tr203"], None);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].key, "tr203");
        assert!(resolver.resolve(&["nope"], None).is_empty());
    }

    #[test]
    fn test_explicit_port_only_for_single_key() {
        let dir = fixture(&[
            ("serv-tr203.conf", "port=20103\n"),
            ("serv-tr206.conf", "port=20106\n"),
        ]);
        let resolver = ConfigResolver::new(dir.path());

        let single = resolver.resolve(&["tr203"], Some(9999));
        assert_eq!(single[0].port, 9999);

        let pair = resolver.resolve(&["tr203", "tr206"], Some(9999));
        assert_eq!(pair[0].port, 20103);
        assert_eq!(pair[1].port, 20106);
    }

    #[test]
    fn test_explicit_port_still_requires_definition() {
        let dir = fixture(&[]);
        let resolver = ConfigResolver::new(dir.path());
        assert!(resolver.resolve(&["ghost"], Some(9999)).is_empty());
    }

    #[test]
    fn test_explicit_port_bypasses_unreadable_port() {
        let dir = fixture(&[("serv-tr203.conf", "port=not-a-number\n")]);
        let resolver = ConfigResolver::new(dir.path());
        assert!(resolver.resolve(&["tr203"], None).is_empty());
        assert_eq!(resolver.resolve(&["tr203"], Some(9999))[0].port, 9999);
    }

    #[test]
    fn test_duplicate_keys_collapse() {
        let dir = fixture(&[("serv-tr203.conf", "port=20103\n")]);
        let resolver = ConfigResolver::new(dir.path());
        let resolved = resolver.resolve(&["tr203", "tr203"], Some(9999));
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].port, 9999);
    }

    #[test]
    fn test_pipe_conf_fallback_order() {
        let dir = fixture(&[
            ("pipe-default.conf", "host=shared\n"),
            ("pipe-tr203.conf", "host=specific\n"),
        ]);
        let resolver = ConfigResolver::new(dir.path());
        let conf = dir.path().join("conf");

        assert_eq!(resolver.pipe_conf("tr203"), conf.join("pipe-tr203.conf"));
        assert_eq!(resolver.pipe_conf("foo"), conf.join("pipe-default.conf"));

        fs::remove_file(conf.join("pipe-default.conf")).unwrap();
        assert_eq!(resolver.pipe_conf("foo"), conf.join("pipe.conf"));
    }

    #[test]
    fn test_listener_settings_feed_notify_fields() {
        let dir = fixture(&[
            ("serv-tr203.conf", "port=20103\n"),
            (
                "pipe-tr203.conf",
                "[pipe]\nurlconfig = http://{host}/pipe/config\nhost = status.local\n",
            ),
        ]);
        let tracker = &ConfigResolver::new(dir.path()).resolve(&["tr203"], None)[0];
        assert_eq!(
            tracker.notify_url.as_deref(),
            Some("http://{host}/pipe/config")
        );
        assert_eq!(tracker.notify_host.as_deref(), Some("status.local"));
    }
}
