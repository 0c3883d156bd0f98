use core_types::Embedding;
use core_types::config::{EncoderBackend, ModelConfig};
use image::RgbImage;
use tracing::{debug, info};

use crate::EmbedError;
use crate::encoder::{ClipVisionEncoder, ColorHistogramEncoder, ImageEncoder};

/// Decodes image bytes and turns them into unit-length embeddings.
///
/// Built once at startup; every method takes `&self`.
pub struct EmbeddingProvider {
    encoder: Box<dyn ImageEncoder>,
}

impl std::fmt::Debug for EmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingProvider")
            .field("backend", &self.encoder.name())
            .field("dims", &self.encoder.dims())
            .finish()
    }
}

impl EmbeddingProvider {
    pub fn from_config(cfg: &ModelConfig) -> Result<Self, EmbedError> {
        let encoder: Box<dyn ImageEncoder> = match cfg.backend {
            EncoderBackend::Clip => Box::new(ClipVisionEncoder::from_config(cfg)?),
            EncoderBackend::Histogram => Box::new(ColorHistogramEncoder::default()),
        };
        info!(backend = encoder.name(), dims = encoder.dims(), "embedding provider ready");
        Ok(Self { encoder })
    }

    pub fn with_encoder(encoder: impl ImageEncoder + 'static) -> Self {
        Self {
            encoder: Box::new(encoder),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.encoder.name()
    }

    pub fn dims(&self) -> usize {
        self.encoder.dims()
    }

    /// Decode `bytes` (any supported format), force RGB, encode and normalise.
    pub fn embed(&self, bytes: &[u8]) -> Result<Embedding, EmbedError> {
        let decoded = image::load_from_memory(bytes)?;
        debug!(
            width = decoded.width(),
            height = decoded.height(),
            "decoded image"
        );
        self.embed_image(&decoded.to_rgb8())
    }

    pub fn embed_image(&self, image: &RgbImage) -> Result<Embedding, EmbedError> {
        let raw = self.encoder.encode(image)?;
        if raw.len() != self.encoder.dims() {
            return Err(EmbedError::Inference(format!(
                "encoder returned {} values, expected {}",
                raw.len(),
                self.encoder.dims()
            )));
        }
        Embedding::normalized(raw)
            .ok_or_else(|| EmbedError::Inference("embedding has zero or non-finite norm".into()))
    }
}
