//! Connectivity source backed by a periodic HTTP HEAD probe.
//!
//! Reachability decides `connected`, probe latency decides `constrained`.
//! Whether the link is metered and which transport it uses cannot be observed
//! from userspace portably, so those come from configuration.

use crate::domain::{NetworkClassification, TransportKind};
use crate::ports::ConnectivitySource;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub url: String,
    pub interval: Duration,
    /// Round-trips slower than this mark the link as constrained.
    pub slow_threshold: Duration,
    pub metered: bool,
    pub transport: TransportKind,
}

pub struct HttpProbeSource {
    client: reqwest::Client,
    settings: ProbeSettings,
}

impl HttpProbeSource {
    pub fn new(client: reqwest::Client, settings: ProbeSettings) -> Self {
        Self { client, settings }
    }
}

async fn probe_once(client: &reqwest::Client, settings: &ProbeSettings) -> NetworkClassification {
    let started = Instant::now();
    // Any HTTP answer means the network is up; only transport errors count as offline.
    let outcome = client
        .head(&settings.url)
        .timeout(settings.slow_threshold * 4)
        .send()
        .await;
    let elapsed = started.elapsed();

    match outcome {
        Ok(response) => {
            debug!(
                url = %settings.url,
                status = response.status().as_u16(),
                latency_ms = elapsed.as_millis() as u64,
                "connectivity probe ok"
            );
            classify(true, elapsed, settings)
        }
        Err(e) => {
            warn!(url = %settings.url, error = %e, "connectivity probe failed");
            classify(false, elapsed, settings)
        }
    }
}

fn classify(reachable: bool, latency: Duration, settings: &ProbeSettings) -> NetworkClassification {
    NetworkClassification {
        connected: reachable,
        expensive: settings.metered,
        constrained: reachable && latency > settings.slow_threshold,
        transport: if reachable {
            settings.transport
        } else {
            TransportKind::Unknown
        },
    }
}

impl ConnectivitySource for HttpProbeSource {
    fn subscribe(&self) -> mpsc::Receiver<NetworkClassification> {
        let (tx, rx) = mpsc::channel(8);
        let client = self.client.clone();
        let settings = self.settings.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(settings.interval);
            let mut last: Option<NetworkClassification> = None;
            loop {
                interval.tick().await;
                let current = probe_once(&client, &settings).await;
                if last == Some(current) {
                    continue;
                }
                last = Some(current);
                if tx.send(current).await.is_err() {
                    debug!("connectivity subscriber dropped; stopping probe");
                    break;
                }
            }
        });

        rx
    }
}
