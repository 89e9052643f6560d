//! Rust codec backend built on the `image` ecosystem.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP) | `image::load_from_memory` (format sniffed from bytes) |
//! | Decode (HEIC) | `libheif-rs` behind the `heic` feature |
//! | Flatten | [`calculations::flatten`](super::calculations::flatten) |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |
//! | Encode → WebP | `webp` (libwebp, lossy with quality) |
//! | Encode → PNG | `image::codecs::png::PngEncoder` (lossless, alpha kept) |

use super::backend::{BackendError, ImageBackend};
use super::calculations::flatten;
use super::heic::decode_heic;
use crate::format::{Container, FormatSpec, InputType};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, RgbImage};

/// Backend using the `image` crate plus `webp` and (optionally) libheif.
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

/// Drop the alpha channel, compositing onto the spec's background if any.
fn opaque_rgb(image: &DynamicImage, spec: &FormatSpec) -> RgbImage {
    match spec.flatten {
        Some(background) => flatten(image, background),
        None => image.to_rgb8(),
    }
}

fn encode_jpeg(image: &DynamicImage, spec: &FormatSpec) -> Result<Vec<u8>, BackendError> {
    let rgb = opaque_rgb(image, spec);
    let quality = spec.quality.unwrap_or_default();
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality.as_u8());
    DynamicImage::ImageRgb8(rgb)
        .write_with_encoder(encoder)
        .map_err(|e| BackendError::EncodeFailed(format!("JPEG encode failed: {e}")))?;
    Ok(buf)
}

fn encode_webp(image: &DynamicImage, spec: &FormatSpec) -> Result<Vec<u8>, BackendError> {
    let quality = spec.quality.unwrap_or_default();
    let (width, height) = (image.width(), image.height());

    let encoded = match spec.flatten {
        Some(background) => {
            let rgb = flatten(image, background);
            webp::Encoder::from_rgb(rgb.as_raw(), width, height)
                .encode_simple(false, quality.as_f32())
        }
        None => {
            let rgba = image.to_rgba8();
            webp::Encoder::from_rgba(rgba.as_raw(), width, height)
                .encode_simple(false, quality.as_f32())
        }
    };

    encoded
        .map(|memory| memory.to_vec())
        .map_err(|e| BackendError::EncodeFailed(format!("WebP encode failed: {e:?}")))
}

fn encode_png(image: &DynamicImage, spec: &FormatSpec) -> Result<Vec<u8>, BackendError> {
    let mut buf = Vec::new();
    let encoder = PngEncoder::new(&mut buf);
    let result = match spec.flatten {
        Some(background) => {
            DynamicImage::ImageRgb8(flatten(image, background)).write_with_encoder(encoder)
        }
        None => image.write_with_encoder(encoder),
    };
    result.map_err(|e| BackendError::EncodeFailed(format!("PNG encode failed: {e}")))?;
    Ok(buf)
}

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: &[u8], input: InputType) -> Result<DynamicImage, BackendError> {
        if input == InputType::Heic {
            return decode_heic(bytes);
        }
        image::load_from_memory(bytes)
            .map_err(|e| BackendError::DecodeFailed(format!("Failed to decode {input} input: {e}")))
    }

    fn encode(&self, image: &DynamicImage, spec: &FormatSpec) -> Result<Vec<u8>, BackendError> {
        match spec.container {
            Container::Jpeg => encode_jpeg(image, spec),
            Container::WebP => encode_webp(image, spec),
            Container::Png => encode_png(image, spec),
        }
    }
}
