//! Connectivity monitor — online/offline detection for the offline banner.
//!
//! DESIGN
//! ======
//! A background task probes the document service at a fixed interval and
//! publishes the result on a `watch` channel. Readers see the latest state
//! without waiting; the state starts as online and changes only on a probe.
//!
//! Detection only: nothing is queued or retried while offline.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub const OFFLINE_BANNER: &str = "Estás sin conexión. Trabajando en modo offline.";

/// Banner to show for a connectivity state, if any.
#[must_use]
pub fn banner_for(online: bool) -> Option<&'static str> {
    (!online).then_some(OFFLINE_BANNER)
}

/// One reachability check.
#[async_trait::async_trait]
pub trait Probe: Send + Sync {
    async fn reachable(&self) -> bool;
}

/// `HEAD` request against a URL. Any HTTP response counts as reachable;
/// only transport failures (DNS, connect, timeout) count as offline.
pub struct HttpProbe {
    http: reqwest::Client,
    url: String,
}

impl HttpProbe {
    #[must_use]
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self { http, url: url.into() }
    }
}

#[async_trait::async_trait]
impl Probe for HttpProbe {
    async fn reachable(&self) -> bool {
        match self.http.head(&self.url).send().await {
            Ok(_) => true,
            Err(e) => {
                warn!(url = %self.url, error = %e, "connectivity: probe failed");
                false
            }
        }
    }
}

pub struct ConnectivityMonitor {
    online: watch::Receiver<bool>,
    task: JoinHandle<()>,
}

impl ConnectivityMonitor {
    /// Spawn the probe loop. The first probe runs immediately.
    #[must_use]
    pub fn spawn(probe: Arc<dyn Probe>, every: Duration) -> Self {
        let (tx, online) = watch::channel(true);
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                let now = probe.reachable().await;
                let changed = tx.send_if_modified(|online| {
                    let changed = *online != now;
                    *online = now;
                    changed
                });
                if changed {
                    info!(online = now, "connectivity: state changed");
                }
                if tx.is_closed() {
                    break;
                }
            }
        });
        Self { online, task }
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        *self.online.borrow()
    }

    #[must_use]
    pub fn banner(&self) -> Option<&'static str> {
        banner_for(self.is_online())
    }

    /// Receiver that wakes on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.online.clone()
    }
}

impl Drop for ConnectivityMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
#[path = "connectivity_test.rs"]
mod tests;
