use image::RgbImage;

use super::ImageEncoder;
use crate::EmbedError;

const BINS_PER_CHANNEL: usize = 4;
const COLOR_BINS: usize = BINS_PER_CHANNEL * BINS_PER_CHANNEL * BINS_PER_CHANNEL;

/// Spatially-pooled joint RGB histogram.
///
/// The image is split into a `grid x grid` layout and each cell contributes a
/// 64-bin colour histogram normalised by its pixel count. Crude, but stable
/// and weight-free.
#[derive(Debug, Clone)]
pub struct ColorHistogramEncoder {
    grid: u32,
}

impl Default for ColorHistogramEncoder {
    fn default() -> Self {
        Self { grid: 2 }
    }
}

impl ColorHistogramEncoder {
    pub fn new(grid: u32) -> Self {
        Self { grid: grid.max(1) }
    }

    fn bin(pixel: [u8; 3]) -> usize {
        let q = |v: u8| usize::from(v) * BINS_PER_CHANNEL / 256;
        q(pixel[0]) * BINS_PER_CHANNEL * BINS_PER_CHANNEL + q(pixel[1]) * BINS_PER_CHANNEL + q(pixel[2])
    }
}

impl ImageEncoder for ColorHistogramEncoder {
    fn name(&self) -> &'static str {
        "histogram"
    }

    fn dims(&self) -> usize {
        (self.grid * self.grid) as usize * COLOR_BINS
    }

    fn encode(&self, image: &RgbImage) -> Result<Vec<f32>, EmbedError> {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return Err(EmbedError::Inference("image has no pixels".into()));
        }

        let grid = self.grid as usize;
        let mut counts = vec![0u32; self.dims()];
        let mut cell_pixels = vec![0u32; grid * grid];
        for (x, y, pixel) in image.enumerate_pixels() {
            let cx = (u64::from(x) * grid as u64 / u64::from(w)) as usize;
            let cy = (u64::from(y) * grid as u64 / u64::from(h)) as usize;
            let cell = cy * grid + cx;
            counts[cell * COLOR_BINS + Self::bin(pixel.0)] += 1;
            cell_pixels[cell] += 1;
        }

        Ok(counts
            .iter()
            .enumerate()
            .map(|(i, &n)| match cell_pixels[i / COLOR_BINS] {
                0 => 0.0,
                total => n as f32 / total as f32,
            })
            .collect())
    }
}
