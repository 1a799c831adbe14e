//! Network connectivity monitoring.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::util::is_http_url;
use crate::{Error, Result};

const PROBE_HTTP_TIMEOUT_SECS: u64 = 4;

/// Reports the current online state and notifies on transitions
pub trait ConnectivityMonitor: Send + Sync {
    /// Whether the device is currently online
    fn is_online(&self) -> bool;

    /// A receiver that observes every online/offline transition
    fn watch(&self) -> watch::Receiver<bool>;
}

/// Connectivity state driven by whoever owns the handle.
///
/// Platform shells feed OS network events into [`ConnectivityHandle::set_online`];
/// [`spawn_http_probe`] drives it from periodic reachability checks.
#[derive(Clone)]
pub struct ConnectivityHandle {
    sender: watch::Sender<bool>,
}

impl ConnectivityHandle {
    pub fn new(online: bool) -> Self {
        let (sender, _) = watch::channel(online);
        Self { sender }
    }

    pub fn online() -> Self {
        Self::new(true)
    }

    pub fn offline() -> Self {
        Self::new(false)
    }

    /// Record the current state; observers are only woken on actual transitions
    pub fn set_online(&self, online: bool) {
        let changed = self.sender.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            tracing::info!(
                "Connectivity changed: {}",
                if online { "online" } else { "offline" }
            );
        }
    }
}

impl ConnectivityMonitor for ConnectivityHandle {
    fn is_online(&self) -> bool {
        *self.sender.borrow()
    }

    fn watch(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }
}

/// Reachability checks against an HTTP endpoint
#[derive(Clone)]
pub struct HttpProbe {
    url: String,
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url = url.into().trim().trim_end_matches('/').to_string();
        if !is_http_url(&url) {
            return Err(Error::Config(
                "probe URL must include http:// or https://".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(PROBE_HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|error| Error::Config(format!("failed to build probe HTTP client: {error}")))?;

        Ok(Self { url, client })
    }

    /// Any HTTP response counts as online; transport failures count as offline
    pub async fn check(&self) -> bool {
        match self.client.head(&self.url).send().await {
            Ok(_) => true,
            Err(error) => {
                tracing::debug!("Connectivity probe to {} failed: {error}", self.url);
                false
            }
        }
    }
}

/// Periodically probe `probe` and feed the result into `handle`.
///
/// The first probe runs immediately. Abort the returned task to stop probing.
pub fn spawn_http_probe(
    handle: ConnectivityHandle,
    probe: HttpProbe,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            handle.set_online(probe.check().await);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_reports_initial_state() {
        assert!(ConnectivityHandle::online().is_online());
        assert!(!ConnectivityHandle::offline().is_online());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn watchers_see_transitions_only() {
        let handle = ConnectivityHandle::offline();
        let mut receiver = handle.watch();

        handle.set_online(false);
        assert!(!receiver.has_changed().unwrap());

        handle.set_online(true);
        receiver.changed().await.unwrap();
        assert!(*receiver.borrow_and_update());
        assert!(handle.is_online());
    }

    #[test]
    fn probe_requires_http_scheme() {
        assert!(HttpProbe::new("https://example.com/health").is_ok());
        assert!(HttpProbe::new("example.com").is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unreachable_probe_reports_offline() {
        let probe = HttpProbe::new("http://127.0.0.1:9").unwrap();
        assert!(!probe.check().await);
    }
}
