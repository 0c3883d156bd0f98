use thiserror::Error;

/// Failures while turning image bytes into an embedding.
#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("inference failed: {0}")]
    Inference(String),
}

impl EmbedError {
    /// True when the caller sent bytes that are not an image.
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}
