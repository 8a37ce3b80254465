//! Network condition snapshot. Produced by the connectivity source, read by the orchestrator.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Transport the device is currently using.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Wired,
    Wifi,
    Cellular,
    Other,
    #[default]
    Unknown,
}

impl TransportKind {
    /// Wired and Wi-Fi count as the highest-quality transports.
    pub fn is_high_quality(&self) -> bool {
        matches!(self, TransportKind::Wired | TransportKind::Wifi)
    }
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wired" | "ethernet" => Ok(TransportKind::Wired),
            "wifi" | "wi-fi" | "wlan" => Ok(TransportKind::Wifi),
            "cellular" | "mobile" => Ok(TransportKind::Cellular),
            "other" => Ok(TransportKind::Other),
            "unknown" | "" => Ok(TransportKind::Unknown),
            other => Err(format!("unknown transport '{}'", other)),
        }
    }
}

/// How the orchestrator fans out to providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// All credentialed providers at once, first success wins.
    Racing,
    /// One provider at a time in priority order.
    Sequential,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Strategy::Racing => "racing",
            Strategy::Sequential => "sequential",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkQuality {
    Good,
    Poor,
}

/// Point-in-time connectivity snapshot. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NetworkClassification {
    pub connected: bool,
    /// Metered connection (e.g. cellular data plan, hotspot).
    pub expensive: bool,
    /// Bandwidth-constrained (low data mode, slow probe).
    pub constrained: bool,
    pub transport: TransportKind,
}

impl NetworkClassification {
    /// State before the first sample arrives. Treated as poor.
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn quality(&self) -> NetworkQuality {
        if self.connected
            && !self.expensive
            && !self.constrained
            && self.transport.is_high_quality()
        {
            NetworkQuality::Good
        } else {
            NetworkQuality::Poor
        }
    }
}
