//! Static provider table. Which providers exist, what they accept, which model to use.
//!
//! Read-only for the lifetime of the process.

use super::entities::{AnalysisMode, RequestKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Identifier of an analysis provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    OpenAi,
    Claude,
    Gemini,
    /// Built-in deterministic estimator. No network call.
    Basic,
}

impl ProviderId {
    /// Default priority order used when no explicit order is configured.
    pub const ALL: [ProviderId; 4] = [
        ProviderId::OpenAi,
        ProviderId::Claude,
        ProviderId::Gemini,
        ProviderId::Basic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenAi => "openai",
            ProviderId::Claude => "claude",
            ProviderId::Gemini => "gemini",
            ProviderId::Basic => "basic",
        }
    }

    pub fn descriptor(&self) -> &'static ProviderDescriptor {
        descriptor(*self)
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.descriptor().display_name)
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" | "gpt" | "chatgpt" => Ok(ProviderId::OpenAi),
            "claude" | "anthropic" => Ok(ProviderId::Claude),
            "gemini" | "google" => Ok(ProviderId::Gemini),
            "basic" | "builtin" | "local" => Ok(ProviderId::Basic),
            other => Err(format!("unknown provider '{}'", other)),
        }
    }
}

/// Static description of a provider's capabilities.
#[derive(Debug)]
pub struct ProviderDescriptor {
    pub id: ProviderId,
    pub display_name: &'static str,
    pub requires_credential: bool,
    pub supported_kinds: &'static [RequestKind],
    standard_model: &'static str,
    fast_model: &'static str,
    /// Per-call timeout override. `None` means "use the network-recommended timeout".
    pub recommended_timeout: Option<Duration>,
}

impl ProviderDescriptor {
    pub fn model_for(&self, mode: AnalysisMode) -> &'static str {
        match mode {
            AnalysisMode::Standard => self.standard_model,
            AnalysisMode::Fast => self.fast_model,
        }
    }

    pub fn supports(&self, kind: RequestKind) -> bool {
        self.supported_kinds.contains(&kind)
    }
}

static PROVIDERS: [ProviderDescriptor; 4] = [
    ProviderDescriptor {
        id: ProviderId::OpenAi,
        display_name: "OpenAI",
        requires_credential: true,
        supported_kinds: &[RequestKind::Text, RequestKind::Image],
        standard_model: "gpt-4o",
        fast_model: "gpt-4o-mini",
        recommended_timeout: None,
    },
    ProviderDescriptor {
        id: ProviderId::Claude,
        display_name: "Claude",
        requires_credential: true,
        supported_kinds: &[RequestKind::Text, RequestKind::Image],
        standard_model: "claude-3-5-sonnet-latest",
        fast_model: "claude-3-5-haiku-latest",
        recommended_timeout: None,
    },
    ProviderDescriptor {
        id: ProviderId::Gemini,
        display_name: "Gemini",
        requires_credential: true,
        supported_kinds: &[RequestKind::Text, RequestKind::Image],
        standard_model: "gemini-1.5-pro",
        fast_model: "gemini-1.5-flash",
        recommended_timeout: None,
    },
    ProviderDescriptor {
        id: ProviderId::Basic,
        display_name: "Basic Analysis",
        requires_credential: false,
        supported_kinds: &[RequestKind::Text, RequestKind::Image, RequestKind::Barcode],
        standard_model: "basic-estimator",
        fast_model: "basic-estimator",
        recommended_timeout: Some(Duration::from_secs(5)),
    },
];

/// Look up the descriptor for a provider.
pub fn descriptor(id: ProviderId) -> &'static ProviderDescriptor {
    match id {
        ProviderId::OpenAi => &PROVIDERS[0],
        ProviderId::Claude => &PROVIDERS[1],
        ProviderId::Gemini => &PROVIDERS[2],
        ProviderId::Basic => &PROVIDERS[3],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_table_is_keyed_by_id() {
        for id in ProviderId::ALL {
            assert_eq!(descriptor(id).id, id);
        }
    }

    #[test]
    fn test_model_per_mode() {
        let d = descriptor(ProviderId::OpenAi);
        assert_eq!(d.model_for(AnalysisMode::Standard), "gpt-4o");
        assert_eq!(d.model_for(AnalysisMode::Fast), "gpt-4o-mini");
    }

    #[test]
    fn test_only_basic_works_without_credential() {
        let free: Vec<ProviderId> = ProviderId::ALL
            .into_iter()
            .filter(|id| !descriptor(*id).requires_credential)
            .collect();
        assert_eq!(free, vec![ProviderId::Basic]);
    }

    #[test]
    fn test_parse_provider_aliases() {
        assert_eq!("Anthropic".parse::<ProviderId>(), Ok(ProviderId::Claude));
        assert_eq!(" gpt ".parse::<ProviderId>(), Ok(ProviderId::OpenAi));
        assert!("mistral".parse::<ProviderId>().is_err());
    }
}
