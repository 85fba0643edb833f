//! Black-and-white normalization for canvas drawings.
//!
//! Canvas exports are transparent where nothing was drawn, which most OCR
//! engines read as black. Flattening onto white and hard-thresholding gives
//! them dark strokes on a clean background.

use image::{ImageFormat, Luma, GrayImage};
use std::io::Cursor;
use thiserror::Error;

/// Channel average below which a pixel becomes black.
pub const THRESHOLD: u8 = 200;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Image could not be decoded: {0}")]
    Decode(#[source] image::ImageError),

    #[error("Image could not be encoded: {0}")]
    Encode(#[source] image::ImageError),
}

/// Decode `bytes`, composite over white, threshold, and re-encode as PNG.
pub fn binarize(bytes: &[u8]) -> Result<Vec<u8>, PreprocessError> {
    let rgba = image::load_from_memory(bytes)
        .map_err(PreprocessError::Decode)?
        .to_rgba8();

    let (width, height) = rgba.dimensions();
    let mut out = GrayImage::new(width, height);

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as u32;
        // Alpha-blend each channel over a white background.
        let blend = |c: u8| (c as u32 * alpha + 255 * (255 - alpha)) / 255;
        let avg = (blend(r) + blend(g) + blend(b)) / 3;
        let value = if avg < THRESHOLD as u32 { 0 } else { 255 };
        out.put_pixel(x, y, Luma([value]));
    }

    let mut encoded = Cursor::new(Vec::new());
    out.write_to(&mut encoded, ImageFormat::Png)
        .map_err(PreprocessError::Encode)?;

    Ok(encoded.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn encode(img: &RgbaImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn transparent_becomes_white_and_strokes_black() {
        let mut img = RgbaImage::from_pixel(3, 1, Rgba([0, 0, 0, 0]));
        img.put_pixel(1, 0, Rgba([40, 40, 40, 255]));
        img.put_pixel(2, 0, Rgba([210, 210, 210, 255]));

        let out = image::load_from_memory(&binarize(&encode(&img)).unwrap())
            .unwrap()
            .to_luma8();

        assert_eq!(out.get_pixel(0, 0).0, [255]);
        assert_eq!(out.get_pixel(1, 0).0, [0]);
        assert_eq!(out.get_pixel(2, 0).0, [255]);
    }

    #[test]
    fn rejects_undecodable_bytes() {
        assert!(matches!(
            binarize(b"definitely not a png"),
            Err(PreprocessError::Decode(_))
        ));
    }
}
