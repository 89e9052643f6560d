//! Pure pixel math for flattening transparency.
//!
//! All functions here are pure and testable without any I/O or codecs.

use crate::format::Background;
use image::{DynamicImage, Rgb, RgbImage};

/// Composite one 8-bit channel over an opaque background.
///
/// `alpha` is straight (non-premultiplied). Fully transparent pixels become
/// exactly the background, fully opaque pixels keep their color.
///
/// # Examples
/// ```
/// # use image_converter::imaging::blend_channel;
/// assert_eq!(blend_channel(10, 0, 255), 255);
/// assert_eq!(blend_channel(10, 255, 255), 10);
/// assert_eq!(blend_channel(0, 128, 255), 127);
/// ```
pub fn blend_channel(color: u8, alpha: u8, background: u8) -> u8 {
    let a = alpha as u32;
    let blended = color as u32 * a + background as u32 * (255 - a);
    ((blended + 127) / 255) as u8
}

/// Flatten an image onto `background`, dropping the alpha channel.
///
/// Images without alpha are converted to RGB8 unchanged.
pub fn flatten(image: &DynamicImage, background: Background) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }

    let [br, bg, bb] = background.0;
    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        Rgb([
            blend_channel(r, a, br),
            blend_channel(g, a, bg),
            blend_channel(b, a, bb),
        ])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn transparent_becomes_background() {
        assert_eq!(blend_channel(0, 0, 255), 255);
        assert_eq!(blend_channel(200, 0, 17), 17);
    }

    #[test]
    fn opaque_keeps_color() {
        for c in [0u8, 1, 128, 254, 255] {
            assert_eq!(blend_channel(c, 255, 255), c);
            assert_eq!(blend_channel(c, 255, 0), c);
        }
    }

    #[test]
    fn half_alpha_mixes() {
        // Black at ~50% over white lands in the middle
        let v = blend_channel(0, 128, 255);
        assert!((126..=128).contains(&v), "got {v}");
    }

    #[test]
    fn flatten_rgba_onto_white() {
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
        img.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        img.put_pixel(1, 0, Rgba([0, 0, 255, 128]));

        let flat = flatten(&DynamicImage::ImageRgba8(img), Background::WHITE);
        assert_eq!(flat.dimensions(), (4, 4));
        assert_eq!(flat.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(flat.get_pixel(3, 3).0, [255, 0, 0]);
        let [r, g, b] = flat.get_pixel(1, 0).0;
        assert_eq!(b, 255);
        assert!(r > 120 && r < 135);
        assert_eq!(r, g);
    }

    #[test]
    fn flatten_rgb_is_passthrough() {
        let img = RgbImage::from_pixel(2, 3, Rgb([1, 2, 3]));
        let flat = flatten(&DynamicImage::ImageRgb8(img.clone()), Background::WHITE);
        assert_eq!(flat, img);
    }

    #[test]
    fn flatten_uses_custom_background() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([9, 9, 9, 0]));
        let flat = flatten(&DynamicImage::ImageRgba8(img), Background([10, 20, 30]));
        assert_eq!(flat.get_pixel(0, 0).0, [10, 20, 30]);
    }
}
