//! Encoder backends.

mod clip;
mod histogram;

pub use clip::{ClipVisionEncoder, vit_base_patch16};
pub use histogram::ColorHistogramEncoder;

use image::RgbImage;

use crate::EmbedError;

/// A deterministic, inference-only image feature extractor.
///
/// Implementations return the raw (unnormalised) feature vector; the provider
/// owns L2 normalisation. `encode` takes `&self` so one encoder can serve many
/// threads without locking.
pub trait ImageEncoder: Send + Sync {
    fn name(&self) -> &'static str;

    /// Length of the vectors returned by [`ImageEncoder::encode`].
    fn dims(&self) -> usize;

    fn encode(&self, image: &RgbImage) -> Result<Vec<f32>, EmbedError>;
}
