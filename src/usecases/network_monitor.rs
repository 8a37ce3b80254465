//! Network condition monitor: holds the latest connectivity classification and
//! turns it into strategy and timeout decisions.
//!
//! Updates go through a `watch` channel, so a reader always sees one whole
//! classification, never a mix of two.

use crate::domain::{NetworkClassification, NetworkQuality};
use crate::ports::ConnectivitySource;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub const GOOD_NETWORK_TIMEOUT: Duration = Duration::from_secs(25);
pub const POOR_NETWORK_TIMEOUT: Duration = Duration::from_secs(45);

pub struct NetworkConditionMonitor {
    state: watch::Sender<NetworkClassification>,
    subscribed: AtomicBool,
}

impl NetworkConditionMonitor {
    pub fn new(initial: NetworkClassification) -> Self {
        let (state, _) = watch::channel(initial);
        Self {
            state,
            subscribed: AtomicBool::new(false),
        }
    }

    /// Consistent snapshot of the current classification.
    pub fn classification(&self) -> NetworkClassification {
        *self.state.borrow()
    }

    /// Fan out to all providers only on an unmetered, unconstrained, high-quality link.
    pub fn should_race_providers(&self) -> bool {
        self.classification().quality() == NetworkQuality::Good
    }

    pub fn should_use_conservative_timeout(&self) -> bool {
        !self.should_race_providers()
    }

    pub fn recommended_timeout(&self) -> Duration {
        if self.should_use_conservative_timeout() {
            POOR_NETWORK_TIMEOUT
        } else {
            GOOD_NETWORK_TIMEOUT
        }
    }

    /// Replace the classification. Observers are only woken on an actual change.
    pub fn apply(&self, classification: NetworkClassification) {
        let changed = self.state.send_if_modified(|current| {
            if *current == classification {
                false
            } else {
                *current = classification;
                true
            }
        });
        if changed {
            info!(
                connected = classification.connected,
                expensive = classification.expensive,
                constrained = classification.constrained,
                transport = ?classification.transport,
                quality = ?classification.quality(),
                "network classification changed"
            );
        }
    }

    /// Receiver that observes every change.
    pub fn watch(&self) -> watch::Receiver<NetworkClassification> {
        self.state.subscribe()
    }

    /// Follow `source` for the life of the returned task. Only the first call
    /// subscribes; later calls return `None`.
    pub fn subscribe(self: &Arc<Self>, source: &dyn ConnectivitySource) -> Option<JoinHandle<()>> {
        if self.subscribed.swap(true, Ordering::SeqCst) {
            debug!("network monitor already subscribed; ignoring");
            return None;
        }

        let mut updates = source.subscribe();
        let monitor = Arc::clone(self);
        Some(tokio::spawn(async move {
            while let Some(classification) = updates.recv().await {
                monitor.apply(classification);
            }
            debug!("connectivity source closed");
        }))
    }
}

impl Default for NetworkConditionMonitor {
    fn default() -> Self {
        Self::new(NetworkClassification::unknown())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TransportKind;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    fn wifi() -> NetworkClassification {
        NetworkClassification {
            connected: true,
            expensive: false,
            constrained: false,
            transport: TransportKind::Wifi,
        }
    }

    /// Source that hands out one pre-built receiver.
    struct ChannelSource(Mutex<Option<mpsc::Receiver<NetworkClassification>>>);

    impl ConnectivitySource for ChannelSource {
        fn subscribe(&self) -> mpsc::Receiver<NetworkClassification> {
            self.0
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| mpsc::channel(1).1)
        }
    }

    #[test]
    fn test_unknown_state_is_conservative() {
        let monitor = NetworkConditionMonitor::default();
        assert!(!monitor.should_race_providers());
        assert!(monitor.should_use_conservative_timeout());
        assert_eq!(monitor.recommended_timeout(), Duration::from_secs(45));
    }

    #[test]
    fn test_good_network() {
        let monitor = NetworkConditionMonitor::new(wifi());
        assert!(monitor.should_race_providers());
        assert_eq!(monitor.recommended_timeout(), Duration::from_secs(25));
    }

    #[test]
    fn test_metered_or_constrained_is_poor() {
        let monitor = NetworkConditionMonitor::new(wifi());
        monitor.apply(NetworkClassification {
            expensive: true,
            ..wifi()
        });
        assert!(!monitor.should_race_providers());

        monitor.apply(NetworkClassification {
            constrained: true,
            ..wifi()
        });
        assert!(monitor.should_use_conservative_timeout());

        monitor.apply(NetworkClassification {
            transport: TransportKind::Cellular,
            ..wifi()
        });
        assert!(!monitor.should_race_providers());
    }

    #[tokio::test]
    async fn test_subscribe_applies_updates_and_only_once() {
        let monitor = Arc::new(NetworkConditionMonitor::default());
        let (tx, rx) = mpsc::channel(4);
        let source = ChannelSource(Mutex::new(Some(rx)));

        let handle = monitor.subscribe(&source).unwrap();
        assert!(monitor.subscribe(&source).is_none());

        let mut observer = monitor.watch();
        tx.send(wifi()).await.unwrap();
        observer.changed().await.unwrap();
        assert!(monitor.should_race_providers());

        drop(tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_update_does_not_notify() {
        let monitor = NetworkConditionMonitor::new(wifi());
        let observer = monitor.watch();
        monitor.apply(wifi());
        assert!(!observer.has_changed().unwrap());
    }
}
