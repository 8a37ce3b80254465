//! Request payload pieces shared by the HTTP providers: prompt text and image encoding.

use crate::domain::{AnalysisError, AnalysisMode, AnalysisRequest};
use base64::{Engine, engine::general_purpose};

/// Providers reject inline images above roughly this size.
pub const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

/// Base64 image ready to embed in a provider request.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub mime_type: &'static str,
    pub data: String,
}

impl EncodedImage {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// Encode the request image, if any.
pub fn encode_image(request: &AnalysisRequest) -> Result<Option<EncodedImage>, AnalysisError> {
    let Some(bytes) = request.image_bytes() else {
        return Ok(None);
    };
    if bytes.is_empty() {
        return Err(AnalysisError::ImageProcessingFailed(
            "image payload is empty".to_string(),
        ));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(AnalysisError::ImageProcessingFailed(format!(
            "image is {} bytes, limit is {}",
            bytes.len(),
            MAX_IMAGE_BYTES
        )));
    }
    Ok(Some(EncodedImage {
        mime_type: sniff_mime(bytes),
        data: general_purpose::STANDARD.encode(bytes),
    }))
}

/// MIME type from magic bytes. Unknown formats are sent as JPEG.
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        "image/png"
    } else if bytes.starts_with(b"GIF8") {
        "image/gif"
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else {
        "image/jpeg"
    }
}

/// Prompt template plus the user's description, if any.
pub fn compose_prompt(request: &AnalysisRequest) -> String {
    match request.text_query() {
        Some(query) => format!("{}\n\nMeal description: {}", request.prompt().trim(), query),
        None => request.prompt().trim().to_string(),
    }
}

/// Output token budget per mode.
pub fn max_output_tokens(mode: AnalysisMode) -> u32 {
    match mode {
        AnalysisMode::Standard => 2500,
        AnalysisMode::Fast => 1200,
    }
}

/// Low temperature keeps the JSON shape stable.
pub const TEMPERATURE: f32 = 0.1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_mime() {
        assert_eq!(sniff_mime(&[0x89, b'P', b'N', b'G', 0x0d]), "image/png");
        assert_eq!(sniff_mime(b"RIFF\0\0\0\0WEBPVP8 "), "image/webp");
        assert_eq!(sniff_mime(&[0xFF, 0xD8, 0xFF]), "image/jpeg");
        assert_eq!(sniff_mime(b"????"), "image/jpeg");
    }

    #[test]
    fn test_encode_image() {
        let req = AnalysisRequest::image(vec![0xFF, 0xD8, 0xFF, 0xE0], "p");
        let img = encode_image(&req).unwrap().unwrap();
        assert_eq!(img.mime_type, "image/jpeg");
        assert_eq!(img.data, "/9j/4A==");
        assert!(img.data_url().starts_with("data:image/jpeg;base64,"));

        let text_only = AnalysisRequest::text("soup", "p");
        assert!(encode_image(&text_only).unwrap().is_none());
    }

    #[test]
    fn test_oversized_image_is_rejected() {
        let req = AnalysisRequest::image(vec![0u8; MAX_IMAGE_BYTES + 1], "p");
        assert!(matches!(
            encode_image(&req),
            Err(AnalysisError::ImageProcessingFailed(_))
        ));
    }

    #[test]
    fn test_compose_prompt() {
        let req = AnalysisRequest::text("  two eggs and toast ", "Analyse this meal. ");
        assert_eq!(
            compose_prompt(&req),
            "Analyse this meal.\n\nMeal description: two eggs and toast"
        );
    }
}
