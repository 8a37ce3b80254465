//! Content fingerprint of an analysis request. Cache key.

use super::entities::{AnalysisMode, AnalysisRequest};
use sha2::{Digest, Sha256};
use std::fmt;

/// Payloads above this size are hashed on the blocking pool.
const BLOCKING_HASH_THRESHOLD: usize = 64 * 1024;

/// SHA-256 over the normalized request input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Hash synchronously. Prefer [`Fingerprint::compute`] in async code.
    pub fn of(request: &AnalysisRequest) -> Self {
        digest(request.mode(), request.image_bytes(), request.text_query())
    }

    /// Hash without stalling the runtime on large images.
    pub async fn compute(request: &AnalysisRequest) -> Self {
        match request.image_arc() {
            Some(image) if image.len() > BLOCKING_HASH_THRESHOLD => {
                let mode = request.mode();
                let text = request.text_query().map(str::to_string);
                tokio::task::spawn_blocking(move || {
                    digest(mode, Some(image.as_slice()), text.as_deref())
                })
                .await
                .unwrap_or_else(|_| Self::of(request))
            }
            _ => Self::of(request),
        }
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form is enough for logs.
        f.write_str(&self.to_hex()[..12])
    }
}

fn digest(mode: AnalysisMode, image: Option<&[u8]>, text: Option<&str>) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(b"meal-analyzer/v1\0");
    let mode_tag: &[u8] = match mode {
        AnalysisMode::Standard => b"standard\0",
        AnalysisMode::Fast => b"fast\0",
    };
    hasher.update(mode_tag);
    if let Some(bytes) = image {
        hasher.update(b"image\0");
        hasher.update((bytes.len() as u64).to_le_bytes());
        hasher.update(bytes);
    }
    if let Some(query) = text {
        hasher.update(b"text\0");
        hasher.update(query.trim().to_lowercase().as_bytes());
    }
    Fingerprint(hasher.finalize().into())
}
