use std::fs;
use std::path::{Path, PathBuf};

use candle_core::{DType, Device, Module, Tensor};
use candle_nn::{Linear, VarBuilder};
use candle_transformers::models::clip::vision_model::{ClipVisionConfig, ClipVisionTransformer};
use core_types::config::ModelConfig;
use hf_hub::api::sync::Api;
use image::RgbImage;
use tracing::info;

use super::ImageEncoder;
use crate::EmbedError;
use crate::preprocess::ClipPreprocessor;

const WEIGHTS_FILE: &str = "model.safetensors";

/// ViT-B/16 vision tower plus the projection into the joint CLIP space.
pub struct ClipVisionEncoder {
    vision: ClipVisionTransformer,
    projection: Linear,
    preprocessor: ClipPreprocessor,
    projection_dim: usize,
    device: Device,
}

impl std::fmt::Debug for ClipVisionEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipVisionEncoder")
            .field("projection_dim", &self.projection_dim)
            .field("input_size", &self.preprocessor.size())
            .finish_non_exhaustive()
    }
}

/// `openai/clip-vit-base-patch16` vision settings.
pub fn vit_base_patch16() -> ClipVisionConfig {
    ClipVisionConfig {
        patch_size: 16,
        ..ClipVisionConfig::vit_base_patch32()
    }
}

impl ClipVisionEncoder {
    /// Load weights named by `cfg`, downloading them from the hub when the
    /// local file is missing and downloads are enabled.
    pub fn from_config(cfg: &ModelConfig) -> Result<Self, EmbedError> {
        let path = locate_weights(cfg)?;
        Self::load(&path)
    }

    pub fn load(weights: &Path) -> Result<Self, EmbedError> {
        let bytes = fs::read(weights).map_err(|e| {
            EmbedError::ModelUnavailable(format!("reading {}: {e}", weights.display()))
        })?;
        let device = Device::Cpu;
        let vb = VarBuilder::from_buffered_safetensors(bytes, DType::F32, &device)
            .map_err(|e| EmbedError::ModelUnavailable(format!("parsing weights: {e}")))?;
        let config = vit_base_patch16();
        Self::from_var_builder(&vb, &config, device)
    }

    fn from_var_builder(
        vb: &VarBuilder<'_>,
        config: &ClipVisionConfig,
        device: Device,
    ) -> Result<Self, EmbedError> {
        let unavailable = |e: candle_core::Error| EmbedError::ModelUnavailable(e.to_string());
        let vision = ClipVisionTransformer::new(vb.pp("vision_model"), config).map_err(unavailable)?;
        let projection = candle_nn::linear_no_bias(
            config.embed_dim,
            config.projection_dim,
            vb.pp("visual_projection"),
        )
        .map_err(unavailable)?;
        info!(
            embed_dim = config.embed_dim,
            projection_dim = config.projection_dim,
            "clip vision encoder loaded"
        );
        Ok(Self {
            vision,
            projection,
            preprocessor: ClipPreprocessor::new(config.image_size as u32),
            projection_dim: config.projection_dim,
            device,
        })
    }

    fn forward(&self, image: &RgbImage) -> candle_core::Result<Vec<f32>> {
        let size = self.preprocessor.size() as usize;
        let pixels = self.preprocessor.pixel_values(image);
        let input = Tensor::from_vec(pixels, (1, 3, size, size), &self.device)?;
        self.vision
            .forward(&input)?
            .apply(&self.projection)?
            .squeeze(0)?
            .to_vec1::<f32>()
    }
}

impl ImageEncoder for ClipVisionEncoder {
    fn name(&self) -> &'static str {
        "clip"
    }

    fn dims(&self) -> usize {
        self.projection_dim
    }

    fn encode(&self, image: &RgbImage) -> Result<Vec<f32>, EmbedError> {
        self.forward(image)
            .map_err(|e| EmbedError::Inference(e.to_string()))
    }
}

fn locate_weights(cfg: &ModelConfig) -> Result<PathBuf, EmbedError> {
    if cfg.weights.is_file() {
        return Ok(cfg.weights.clone());
    }
    if !cfg.download {
        return Err(EmbedError::ModelUnavailable(format!(
            "weights not found at {} and downloads are disabled",
            cfg.weights.display()
        )));
    }
    info!(repo = %cfg.repo, "fetching clip weights from the hub");
    Api::new()
        .and_then(|api| api.model(cfg.repo.clone()).get(WEIGHTS_FILE))
        .map_err(|e| EmbedError::ModelUnavailable(format!("downloading {}: {e}", cfg.repo)))
}
