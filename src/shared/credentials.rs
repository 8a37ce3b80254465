//! Fixed in-memory credential set.

use crate::domain::ProviderId;
use crate::ports::CredentialProvider;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct StaticCredentials(HashMap<ProviderId, String>);

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, provider: ProviderId, key: impl Into<String>) -> Self {
        self.0.insert(provider, key.into());
        self
    }
}

impl CredentialProvider for StaticCredentials {
    fn api_key(&self, provider: ProviderId) -> Option<String> {
        self.0
            .get(&provider)
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(str::to_string)
    }
}

impl FromIterator<(ProviderId, String)> for StaticCredentials {
    fn from_iter<I: IntoIterator<Item = (ProviderId, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
