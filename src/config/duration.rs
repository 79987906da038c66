//! Human-readable durations for the settings file ("1s", "250ms", "2m").

use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Parse a duration string like "1s", "250ms", "2m".
///
/// A bare number is read as seconds. Returns `None` if the string cannot be
/// parsed.
///
/// ```
/// use pipe_supervisor::config::parse_duration_string;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration_string("1s"), Some(Duration::from_secs(1)));
/// assert_eq!(parse_duration_string("250ms"), Some(Duration::from_millis(250)));
/// assert_eq!(parse_duration_string("2m"), Some(Duration::from_secs(120)));
/// assert_eq!(parse_duration_string("3"), Some(Duration::from_secs(3)));
/// ```
pub fn parse_duration_string(s: &str) -> Option<Duration> {
    let s = s.trim();

    if let Some(ms) = s.strip_suffix("ms") {
        ms.parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}

/// Serde adapter so settings can say `port_retry_interval: 500ms`.
pub(crate) fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_duration_string(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid duration '{}'", raw)))
}
