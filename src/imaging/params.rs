//! Parameter types for image operations.
//!
//! These describe *what* to encode, not *how*. The [`FormatSpec`] table in
//! [`crate::format`] picks values from here; the
//! [`backend`](super::backend) turns them into encoder settings.

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// Quality as the `u8` the JPEG encoder expects.
    pub fn as_u8(self) -> u8 {
        self.0.min(100) as u8
    }

    /// Quality as the `f32` the WebP encoder expects.
    pub fn as_f32(self) -> f32 {
        self.0 as f32
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_90() {
        assert_eq!(Quality::default().value(), 90);
    }

    #[test]
    fn quality_encoder_views() {
        assert_eq!(Quality::new(95).as_u8(), 95);
        assert_eq!(Quality::new(80).as_f32(), 80.0);
    }
}
