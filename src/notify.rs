//! Upstream status notification.
//!
//! After start/stop the supervisor tells the status endpoint(s) configured in
//! the listener settings which masks now answer on which ports. One GET per
//! distinct endpoint; failures are logged and otherwise ignored.

use crate::config::TrackerConfig;
use crate::error::{Error, Result};
use crate::mask::InstanceMask;
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;

const HOST_PLACEHOLDER: &str = "{host}";

/// One batched call to a status endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyRequest {
    pub url: String,
    pub trackers: Vec<String>,
}

/// Group `(tracker, mask)` pairs by endpoint and build one URL per endpoint.
///
/// Ports are reported as `0` when `stopping`. Trackers without an endpoint are
/// left out; so are endpoints that don't form a valid URL.
pub fn plan(entries: &[(TrackerConfig, InstanceMask)], stopping: bool) -> Vec<NotifyRequest> {
    let mut groups: Vec<(String, Vec<&(TrackerConfig, InstanceMask)>)> = Vec::new();

    for entry in entries {
        let Some(endpoint) = endpoint_for(&entry.0) else {
            continue;
        };
        match groups.iter_mut().find(|(url, _)| *url == endpoint) {
            Some((_, members)) => members.push(entry),
            None => groups.push((endpoint, vec![entry])),
        }
    }

    groups
        .into_iter()
        .filter_map(|(endpoint, members)| {
            let mut url = match Url::parse(&endpoint) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!("Skipping notification endpoint '{}': {}", endpoint, e);
                    return None;
                }
            };

            {
                let mut query = url.query_pairs_mut();
                for (tracker, mask) in &members {
                    let port = if stopping { 0 } else { tracker.port };
                    query.append_pair(&format!("trackers[{}][mask]", tracker.key), mask.as_str());
                    query.append_pair(&format!("trackers[{}][port]", tracker.key), &port.to_string());
                }
            }

            Some(NotifyRequest {
                url: url.to_string(),
                trackers: members.iter().map(|(t, _)| t.key.clone()).collect(),
            })
        })
        .collect()
}

fn endpoint_for(tracker: &TrackerConfig) -> Option<String> {
    let template = tracker.notify_url.as_deref()?;
    if !template.contains(HOST_PLACEHOLDER) {
        return Some(template.to_string());
    }
    match tracker.notify_host.as_deref() {
        Some(host) => Some(template.replace(HOST_PLACEHOLDER, host)),
        None => {
            tracing::debug!(
                "Tracker '{}' has a {} endpoint but no host setting",
                tracker.key,
                HOST_PLACEHOLDER
            );
            None
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver every request. Never fails the caller.
    async fn notify(&self, requests: &[NotifyRequest]);
}

/// Plain HTTP GET notifier.
pub struct HttpNotifier {
    client: Client,
}

impl HttpNotifier {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| Error::Notifier {
            url: String::new(),
            reason: format!("failed to create HTTP client: {}", e),
        })?;
        Ok(Self { client })
    }

    async fn send(&self, request: &NotifyRequest) -> Result<()> {
        let to_error = |e: reqwest::Error| Error::Notifier {
            url: request.url.clone(),
            reason: e.to_string(),
        };
        self.client
            .get(&request.url)
            .send()
            .await
            .map_err(to_error)?
            .error_for_status()
            .map_err(to_error)?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn notify(&self, requests: &[NotifyRequest]) {
        for request in requests {
            match self.send(request).await {
                Ok(()) => tracing::debug!(
                    "Notified {} about {}",
                    request.url,
                    request.trackers.join(", ")
                ),
                Err(e) => tracing::warn!("{}", e),
            }
        }
    }
}

/// Used with `--no-notify`.
#[derive(Debug, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _requests: &[NotifyRequest]) {}
}
