//! CLIP image preprocessing.
//!
//! Mirrors the reference CLIP image processor: shortest edge resized to the
//! model resolution with bicubic filtering, centre crop, `[0, 1]` rescale,
//! per-channel mean/std normalisation, NCHW layout.

use image::RgbImage;
use image::imageops::{self, FilterType};

pub const CLIP_INPUT_SIZE: u32 = 224;
pub const CLIP_MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];
pub const CLIP_STD: [f32; 3] = [0.268_629_54, 0.261_302_58, 0.275_777_11];

#[derive(Debug, Clone)]
pub struct ClipPreprocessor {
    size: u32,
    mean: [f32; 3],
    std: [f32; 3],
}

impl Default for ClipPreprocessor {
    fn default() -> Self {
        Self {
            size: CLIP_INPUT_SIZE,
            mean: CLIP_MEAN,
            std: CLIP_STD,
        }
    }
}

impl ClipPreprocessor {
    pub fn new(size: u32) -> Self {
        Self {
            size: size.max(1),
            ..Self::default()
        }
    }

    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Centre-crop the largest square, then resize it to `size x size`.
    ///
    /// Equivalent to shortest-edge resize followed by a centre crop, but the
    /// intermediate never exceeds the source, whatever the aspect ratio.
    pub fn resize_and_crop(&self, image: &RgbImage) -> RgbImage {
        let (w, h) = image.dimensions();
        let (left, top, side) = centre_square(w, h);
        let square = imageops::crop_imm(image, left, top, side, side).to_image();
        imageops::resize(&square, self.size, self.size, FilterType::CatmullRom)
    }

    /// Pixel values as a flat CHW buffer of `3 * size * size` floats.
    pub fn pixel_values(&self, image: &RgbImage) -> Vec<f32> {
        let cropped = self.resize_and_crop(image);
        let plane = (self.size * self.size) as usize;
        let mut out = vec![0.0f32; 3 * plane];
        for (idx, pixel) in cropped.pixels().enumerate() {
            for c in 0..3 {
                let scaled = f32::from(pixel[c]) / 255.0;
                out[c * plane + idx] = (scaled - self.mean[c]) / self.std[c];
            }
        }
        out
    }
}

/// `(left, top, side)` of the centred square spanning the shorter edge.
fn centre_square(w: u32, h: u32) -> (u32, u32, u32) {
    let side = w.min(h).max(1);
    (w.saturating_sub(side) / 2, h.saturating_sub(side) / 2, side)
}
