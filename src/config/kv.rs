//! `key=value` extraction for tracker definition and listener settings files.
//!
//! Both file families are INI-ish: the supervisor only cares about flat keys,
//! so section headers are skipped and the first occurrence of a key wins.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyValues {
    values: HashMap<String, String>,
}

impl KeyValues {
    pub fn parse(content: &str) -> Self {
        let mut values = HashMap::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty()
                || line.starts_with('#')
                || line.starts_with(';')
                || line.starts_with('[')
            {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                continue;
            }

            values
                .entry(key.to_string())
                .or_insert_with(|| value.trim().to_string());
        }

        Self { values }
    }

    /// Read and parse a file. `None` when it does not exist or can't be read.
    pub fn load(path: &Path) -> Option<Self> {
        match fs::read_to_string(path) {
            Ok(content) => Some(Self::parse(&content)),
            Err(e) => {
                tracing::debug!("Cannot read {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn port(&self) -> Option<u16> {
        self.get("port").and_then(|p| p.parse::<u16>().ok())
    }
}
