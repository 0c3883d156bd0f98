//! Image embedding: decode, preprocess and encode photos into unit vectors.
//!
//! The [`EmbeddingProvider`] is built once at startup and shared read-only
//! across requests. Encoders sit behind [`ImageEncoder`] so the CLIP model can
//! be swapped for the weight-free histogram encoder in tests and offline runs.

pub mod encoder;
mod error;
pub mod preprocess;
mod provider;

pub use encoder::{ClipVisionEncoder, ColorHistogramEncoder, ImageEncoder};
pub use error::EmbedError;
pub use provider::EmbeddingProvider;

#[cfg(test)]
pub(crate) mod test_images {
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    pub fn solid(w: u32, h: u32, rgb: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(w, h, Rgb(rgb))
    }

    pub fn encode(img: RgbImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, format)
            .expect("encode fixture");
        buf.into_inner()
    }

    pub fn png(img: RgbImage) -> Vec<u8> {
        encode(img, ImageFormat::Png)
    }
}
