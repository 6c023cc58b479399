//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG) | `image::load_from_memory` |
//! | Identify | `image::ImageReader::into_dimensions` (header only) |
//! | Resize | `image::DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Tint | luma + darken blend, integer arithmetic |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e, fixed speed) |
//!
//! The encoder speed is a constant: changing it changes every output byte and
//! therefore every variant URL.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{ResizeParams, Tint};
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader, RgbImage};
use std::io::Cursor;

/// rav1e speed preset (0 = slowest/smallest, 10 = fastest).
const ENCODER_SPEED: u8 = 6;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn decode(source: &[u8]) -> Result<DynamicImage, BackendError> {
    image::load_from_memory(source).map_err(|e| BackendError::Decode(e.to_string()))
}

/// Reduce to luma and darken-blend over the tint colour.
///
/// Transparent pixels show the background; opaque pixels take
/// `min(luma, background)` per channel.
fn apply_tint(img: &DynamicImage, tint: Tint) -> DynamicImage {
    let luma = img.to_luma_alpha8();
    let bg = tint.channels();
    let out = RgbImage::from_fn(luma.width(), luma.height(), |x, y| {
        let [l, a] = luma.get_pixel(x, y).0;
        let a = u32::from(a);
        let mut px = [0u8; 3];
        for (dst, &b) in px.iter_mut().zip(bg.iter()) {
            let darkened = u32::from(l.min(b));
            *dst = ((u32::from(b) * (255 - a) + darkened * a + 127) / 255) as u8;
        }
        image::Rgb(px)
    });
    DynamicImage::ImageRgb8(out)
}

/// Encode as AVIF into memory.
fn encode_avif(img: &DynamicImage, quality: u32) -> Result<Vec<u8>, BackendError> {
    let mut out = Vec::new();
    let encoder =
        image::codecs::avif::AvifEncoder::new_with_speed_quality(&mut out, ENCODER_SPEED, quality as u8);
    img.write_with_encoder(encoder)
        .map_err(|e| BackendError::Encode(format!("AVIF encode failed: {}", e)))?;
    Ok(out)
}

impl ImageBackend for RustBackend {
    fn identify(&self, source: &[u8]) -> Result<Dimensions, BackendError> {
        let (width, height) = ImageReader::new(Cursor::new(source))
            .with_guessed_format()?
            .into_dimensions()
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(Dimensions { width, height })
    }

    fn resize(&self, params: &ResizeParams) -> Result<Vec<u8>, BackendError> {
        let img = decode(params.source)?;
        let resized = if (img.width(), img.height()) == (params.width, params.height) {
            img
        } else {
            img.resize_exact(params.width, params.height, FilterType::Lanczos3)
        };
        let processed = match params.tint {
            Some(tint) => apply_tint(&resized, tint),
            None => resized,
        };
        encode_avif(&processed, params.quality.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::Quality;
    use crate::test_helpers::png_bytes;

    #[test]
    fn identify_reads_png_header() {
        let backend = RustBackend::new();
        let dims = backend.identify(&png_bytes(40, 30)).unwrap();
        assert_eq!(
            dims,
            Dimensions {
                width: 40,
                height: 30
            }
        );
    }

    #[test]
    fn identify_rejects_garbage() {
        let backend = RustBackend::new();
        let result = backend.identify(b"definitely not an image");
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn resize_rejects_truncated_png() {
        let backend = RustBackend::new();
        let png = png_bytes(40, 30);
        let result = backend.resize(&ResizeParams {
            source: &png[..png.len() / 2],
            width: 20,
            height: 15,
            quality: Quality::default(),
            tint: None,
        });
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn resize_produces_decodable_output() {
        let backend = RustBackend::new();
        let png = png_bytes(64, 48);
        let out = backend
            .resize(&ResizeParams {
                source: &png,
                width: 32,
                height: 24,
                quality: Quality::new(60),
                tint: None,
            })
            .unwrap();
        // ISO-BMFF `ftyp` box with the `avif` brand
        assert_eq!(&out[4..8], b"ftyp");
        assert_eq!(&out[8..12], b"avif");
    }

    #[test]
    fn resize_is_deterministic() {
        let backend = RustBackend::new();
        let png = png_bytes(48, 32);
        let params = ResizeParams {
            source: &png,
            width: 24,
            height: 16,
            quality: Quality::new(70),
            tint: Tint::from_hex("#f4efe6"),
        };
        let a = backend.resize(&params).unwrap();
        let b = backend.resize(&params).unwrap();
        assert_eq!(a, b);
    }

    // =========================================================================
    // Tint
    // =========================================================================

    #[test]
    fn tint_keeps_black_and_takes_background_on_white() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, image::Rgb([0, 0, 0]));
        img.put_pixel(1, 0, image::Rgb([255, 255, 255]));
        let tint = Tint {
            r: 200,
            g: 180,
            b: 100,
        };

        let out = apply_tint(&DynamicImage::ImageRgb8(img), tint).to_rgb8();
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(out.get_pixel(1, 0).0, [200, 180, 100]);
    }

    #[test]
    fn tint_darkens_per_channel() {
        let mut img = image::GrayImage::new(1, 1);
        img.put_pixel(0, 0, image::Luma([150]));
        let tint = Tint {
            r: 200,
            g: 120,
            b: 150,
        };

        let out = apply_tint(&DynamicImage::ImageLuma8(img), tint).to_rgb8();
        assert_eq!(out.get_pixel(0, 0).0, [150, 120, 150]);
    }

    #[test]
    fn tint_shows_background_through_transparency() {
        let mut img = image::RgbaImage::new(1, 1);
        img.put_pixel(0, 0, image::Rgba([0, 0, 0, 0]));
        let tint = Tint {
            r: 10,
            g: 20,
            b: 30,
        };

        let out = apply_tint(&DynamicImage::ImageRgba8(img), tint).to_rgb8();
        assert_eq!(out.get_pixel(0, 0).0, [10, 20, 30]);
    }
}
