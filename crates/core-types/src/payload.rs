//! Base64 image payload decoding shared by the HTTP dispatcher and the quest
//! creator upload path.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use thiserror::Error;

/// Standard alphabet; padding optional because some browsers trim it.
const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("image payload is empty")]
    Empty,
    #[error("invalid base64 image data: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}

/// Drop a `data:<mime>;base64,` header when present.
pub fn strip_data_uri(payload: &str) -> &str {
    let trimmed = payload.trim();
    match trimmed.strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map_or(trimmed, |(_, body)| body),
        None => trimmed,
    }
}

/// Decode a raw or data-URI-prefixed base64 payload into image bytes.
pub fn decode_image_payload(payload: &str) -> Result<Vec<u8>, PayloadError> {
    let body = strip_data_uri(payload);
    if body.is_empty() {
        return Err(PayloadError::Empty);
    }
    if body.bytes().any(|b| b.is_ascii_whitespace()) {
        let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        return Ok(LENIENT_STANDARD.decode(compact)?);
    }
    Ok(LENIENT_STANDARD.decode(body)?)
}
