//! HEIC → RGBA bitmap decoding via libheif.
//!
//! HEIC containers cannot be read by the `image` crate, so they are decoded
//! here first and handed to the general encoder as an RGBA8 bitmap.

use super::backend::BackendError;
use image::{DynamicImage, RgbaImage};

#[cfg(feature = "heic")]
pub fn decode_heic(bytes: &[u8]) -> Result<DynamicImage, BackendError> {
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    let lib_heif = LibHeif::new();
    let ctx = HeifContext::read_from_bytes(bytes)
        .map_err(|e| BackendError::DecodeFailed(format!("Failed to parse HEIC: {e}")))?;
    let handle = ctx
        .primary_image_handle()
        .map_err(|e| BackendError::DecodeFailed(format!("HEIC has no primary image: {e}")))?;
    let decoded = lib_heif
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgba), None)
        .map_err(|e| BackendError::DecodeFailed(format!("Failed to decode HEIC: {e}")))?;

    let planes = decoded.planes();
    let plane = planes
        .interleaved
        .ok_or_else(|| BackendError::DecodeFailed("HEIC decode produced no pixel plane".into()))?;

    let packed = pack_rows(plane.data, plane.stride, plane.width, plane.height)?;
    into_image(plane.width, plane.height, packed)
}

#[cfg(not(feature = "heic"))]
pub fn decode_heic(_bytes: &[u8]) -> Result<DynamicImage, BackendError> {
    Err(BackendError::Unavailable(crate::format::InputType::Heic))
}

/// Copy a strided RGBA plane into a tightly packed buffer.
#[cfg_attr(not(feature = "heic"), allow(dead_code))]
fn pack_rows(data: &[u8], stride: usize, width: u32, height: u32) -> Result<Vec<u8>, BackendError> {
    let row_len = width as usize * 4;
    if stride < row_len || data.len() < stride * (height as usize).saturating_sub(1) + row_len {
        return Err(BackendError::DecodeFailed(format!(
            "HEIC plane too small: {} bytes for {width}x{height} (stride {stride})",
            data.len()
        )));
    }

    let mut packed = Vec::with_capacity(row_len * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        packed.extend_from_slice(&data[start..start + row_len]);
    }
    Ok(packed)
}

#[cfg_attr(not(feature = "heic"), allow(dead_code))]
fn into_image(width: u32, height: u32, packed: Vec<u8>) -> Result<DynamicImage, BackendError> {
    RgbaImage::from_raw(width, height, packed)
        .map(DynamicImage::ImageRgba8)
        .ok_or_else(|| BackendError::DecodeFailed("Failed to build image from HEIC data".into()))
}
