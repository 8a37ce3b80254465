//! Application configuration. API credentials, cache limits, network probe.

use crate::domain::{AnalysisMode, ProviderId, TransportKind};
use crate::ports::CredentialProvider;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 100;
pub const DEFAULT_CACHE_MAX_BYTES: usize = 5 * 1024 * 1024;
pub const DEFAULT_NETWORK_RETRIES: u32 = 1;
pub const DEFAULT_PROBE_URL: &str = "https://www.gstatic.com/generate_204";
pub const DEFAULT_PROBE_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_PROBE_SLOW_MS: u64 = 1500;

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    // ─────────────────────────────────────────────────────────────────────────
    // Provider credentials
    // ─────────────────────────────────────────────────────────────────────────
    /// OpenAI key. Read from MEAL_ANALYZER_OPENAI_API_KEY or OPENAI_API_KEY.
    #[serde(default)]
    pub openai_api_key: Option<String>,

    /// Anthropic key. Read from MEAL_ANALYZER_ANTHROPIC_API_KEY or ANTHROPIC_API_KEY.
    #[serde(default)]
    pub anthropic_api_key: Option<String>,

    /// Gemini key. Read from MEAL_ANALYZER_GEMINI_API_KEY or GEMINI_API_KEY.
    #[serde(default)]
    pub gemini_api_key: Option<String>,

    /// Preferred provider, tried first when eligible.
    #[serde(default)]
    pub provider: Option<String>,

    /// `standard` or `fast`.
    #[serde(default)]
    pub mode: Option<String>,

    // ─────────────────────────────────────────────────────────────────────────
    // Cache
    // ─────────────────────────────────────────────────────────────────────────
    #[serde(default)]
    pub cache_ttl_secs: Option<u64>,

    #[serde(default)]
    pub cache_max_entries: Option<usize>,

    #[serde(default)]
    pub cache_max_bytes: Option<usize>,

    /// Extra attempts on the same provider after a transport failure (sequential mode).
    #[serde(default)]
    pub network_retries: Option<u32>,

    // ─────────────────────────────────────────────────────────────────────────
    // Connectivity probe
    // ─────────────────────────────────────────────────────────────────────────
    #[serde(default)]
    pub probe_url: Option<String>,

    #[serde(default)]
    pub probe_interval_secs: Option<u64>,

    /// Probe round-trips above this many milliseconds mark the link constrained.
    #[serde(default)]
    pub probe_slow_ms: Option<u64>,

    /// Treat the connection as metered.
    #[serde(default)]
    pub metered: Option<bool>,

    /// `wired`, `wifi`, `cellular`, `other` or `unknown`.
    #[serde(default)]
    pub transport: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        c = c.add_source(config::Environment::with_prefix("MEAL_ANALYZER"));
        if let Ok(path) = std::env::var("MEAL_ANALYZER_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        let mut cfg: Self = c.build()?.try_deserialize()?;
        // Conventional vendor variables so existing shells work without renaming.
        if cfg.openai_api_key.is_none() {
            cfg.openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        }
        if cfg.anthropic_api_key.is_none() {
            cfg.anthropic_api_key = std::env::var("ANTHROPIC_API_KEY").ok();
        }
        if cfg.gemini_api_key.is_none() {
            cfg.gemini_api_key = std::env::var("GEMINI_API_KEY").ok();
        }
        Ok(cfg)
    }

    /// Non-blank key for `provider`. The built-in estimator never has one.
    pub fn api_key_for(&self, provider: ProviderId) -> Option<String> {
        let key = match provider {
            ProviderId::OpenAi => self.openai_api_key.as_ref(),
            ProviderId::Claude => self.anthropic_api_key.as_ref(),
            ProviderId::Gemini => self.gemini_api_key.as_ref(),
            ProviderId::Basic => None,
        };
        key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty())
    }

    /// Preferred provider, if set and recognised.
    pub fn provider_hint(&self) -> Option<ProviderId> {
        self.provider.as_deref().and_then(|p| p.parse().ok())
    }

    pub fn mode_or_default(&self) -> AnalysisMode {
        self.mode
            .as_deref()
            .and_then(|m| m.parse().ok())
            .unwrap_or_default()
    }

    pub fn cache_ttl_or_default(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs.unwrap_or(DEFAULT_CACHE_TTL_SECS))
    }

    pub fn cache_max_entries_or_default(&self) -> usize {
        self.cache_max_entries.unwrap_or(DEFAULT_CACHE_MAX_ENTRIES)
    }

    pub fn cache_max_bytes_or_default(&self) -> usize {
        self.cache_max_bytes.unwrap_or(DEFAULT_CACHE_MAX_BYTES)
    }

    pub fn network_retries_or_default(&self) -> u32 {
        self.network_retries.unwrap_or(DEFAULT_NETWORK_RETRIES)
    }

    pub fn probe_url_or_default(&self) -> String {
        self.probe_url
            .clone()
            .unwrap_or_else(|| DEFAULT_PROBE_URL.to_string())
    }

    pub fn probe_interval_or_default(&self) -> Duration {
        Duration::from_secs(
            self.probe_interval_secs
                .unwrap_or(DEFAULT_PROBE_INTERVAL_SECS)
                .max(1),
        )
    }

    pub fn probe_slow_threshold_or_default(&self) -> Duration {
        Duration::from_millis(self.probe_slow_ms.unwrap_or(DEFAULT_PROBE_SLOW_MS))
    }

    pub fn metered_or_default(&self) -> bool {
        self.metered.unwrap_or(false)
    }

    pub fn transport_or_default(&self) -> TransportKind {
        self.transport
            .as_deref()
            .and_then(|t| t.parse().ok())
            .unwrap_or_default()
    }

    /// Providers that have a usable key.
    pub fn configured_providers(&self) -> Vec<ProviderId> {
        ProviderId::ALL
            .into_iter()
            .filter(|p| self.api_key_for(*p).is_some())
            .collect()
    }
}

impl CredentialProvider for AppConfig {
    fn api_key(&self, provider: ProviderId) -> Option<String> {
        self.api_key_for(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.cache_ttl_or_default(), Duration::from_secs(300));
        assert_eq!(cfg.cache_max_entries_or_default(), 100);
        assert_eq!(cfg.cache_max_bytes_or_default(), 5 * 1024 * 1024);
        assert_eq!(cfg.network_retries_or_default(), 1);
        assert_eq!(cfg.probe_slow_threshold_or_default(), Duration::from_millis(1500));
        assert_eq!(cfg.transport_or_default(), TransportKind::Unknown);
        assert_eq!(cfg.mode_or_default(), AnalysisMode::Standard);
        assert!(!cfg.metered_or_default());
        assert!(cfg.configured_providers().is_empty());
    }

    #[test]
    fn test_blank_keys_are_ignored() {
        let cfg = AppConfig {
            openai_api_key: Some("  ".to_string()),
            gemini_api_key: Some(" g-key ".to_string()),
            ..AppConfig::default()
        };
        assert_eq!(cfg.api_key(ProviderId::OpenAi), None);
        assert_eq!(cfg.api_key(ProviderId::Gemini), Some("g-key".to_string()));
        assert_eq!(cfg.configured_providers(), vec![ProviderId::Gemini]);
    }

    #[test]
    fn test_hint_and_transport_parsing() {
        let cfg = AppConfig {
            provider: Some("anthropic".to_string()),
            transport: Some("ethernet".to_string()),
            mode: Some("fast".to_string()),
            ..AppConfig::default()
        };
        assert_eq!(cfg.provider_hint(), Some(ProviderId::Claude));
        assert_eq!(cfg.transport_or_default(), TransportKind::Wired);
        assert_eq!(cfg.mode_or_default(), AnalysisMode::Fast);
    }
}
