//! Shared test utilities: synthetic images and encoded fixtures.
//!
//! Nothing here touches the filesystem. Every fixture is generated in
//! memory so tests stay hermetic.

use crate::format::{FormatKey, InputType};
use crate::imaging::{ImageBackend, RustBackend};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

/// Opaque red image whose top-left quadrant is fully transparent.
///
/// `(0, 0)` is always a known-transparent coordinate, and the transparent
/// region is large enough to cover a whole JPEG block.
pub fn transparent_corner_rgba(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        if x < width.div_ceil(2) && y < height.div_ceil(2) {
            Rgba([0, 0, 0, 0])
        } else {
            Rgba([200, 30, 30, 255])
        }
    })
}

/// Encode an RGBA image as PNG bytes.
pub fn png_bytes(image: &RgbaImage) -> Vec<u8> {
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

/// Encoded sample upload for a non-HEIC input type.
///
/// HEIC has no encoder here, so asking for it panics.
pub fn sample_bytes(input: InputType) -> Vec<u8> {
    let image = DynamicImage::ImageRgba8(transparent_corner_rgba(32, 32));
    let key = match input {
        InputType::Jpg => FormatKey::JpgHigh,
        InputType::Png => FormatKey::Png,
        InputType::Webp => FormatKey::WebpHigh,
        InputType::Heic => panic!("no HEIC encoder available for fixtures"),
    };
    RustBackend::new().encode(&image, &key.spec()).unwrap()
}

/// Decode bytes and assert the sniffed container.
pub fn assert_container(bytes: &[u8], expected: ImageFormat) -> DynamicImage {
    let found = image::guess_format(bytes).expect("output is not a known image container");
    assert_eq!(found, expected, "wrong output container");
    image::load_from_memory(bytes).expect("output does not decode")
}

/// Encode an RGB image as a HEIF stream with libheif's own encoder.
///
/// HEVC gives a real HEIC file. Builds of libheif without an HEVC encoder
/// plugin fall back to AV1, which is the same HEIF container and decode
/// path with a different codec inside.
#[cfg(feature = "heic")]
pub fn heic_bytes(width: u32, height: u32) -> Vec<u8> {
    use libheif_rs::{
        Channel, ColorSpace, CompressionFormat, EncoderQuality, HeifContext, Image, LibHeif,
        RgbChroma,
    };

    let lib_heif = LibHeif::new();
    let mut image = Image::new(width, height, ColorSpace::Rgb(RgbChroma::Rgb)).unwrap();
    image
        .create_plane(Channel::Interleaved, width, height, 8)
        .unwrap();
    {
        let mut plane = image.planes_mut().interleaved.unwrap();
        let stride = plane.stride;
        for y in 0..height as usize {
            for x in 0..width as usize {
                let px = y * stride + x * 3;
                plane.data[px..px + 3].copy_from_slice(&[30, 90, 200]);
            }
        }
    }

    let mut encoder = lib_heif
        .encoder_for_format(CompressionFormat::Hevc)
        .or_else(|_| lib_heif.encoder_for_format(CompressionFormat::Av1))
        .expect("libheif has no HEVC or AV1 encoder to build a fixture with");
    encoder.set_quality(EncoderQuality::Lossy(90)).unwrap();

    let mut context = HeifContext::new().unwrap();
    context.encode_image(&image, &mut encoder, None).unwrap();
    context.write_to_bytes().unwrap()
}
