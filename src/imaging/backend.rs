//! Image codec backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations every backend must
//! support: decode an upload into a bitmap, and encode a bitmap into the
//! container a [`FormatSpec`] names.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend).

use crate::format::{FormatSpec, InputType};
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decoding failed: {0}")]
    DecodeFailed(String),
    #[error("Encoding failed: {0}")]
    EncodeFailed(String),
    #[error("{0} decoding is not available in this build")]
    Unavailable(InputType),
}

/// Trait for image codec backends.
///
/// Backends are shared across server requests and the blocking pool, so
/// they must be `Send + Sync`.
pub trait ImageBackend: Send + Sync {
    /// Decode uploaded bytes into a bitmap.
    ///
    /// `input` is the declared type. HEIC goes through a dedicated decoder;
    /// every other type is sniffed from the bytes.
    fn decode(&self, bytes: &[u8], input: InputType) -> Result<DynamicImage, BackendError>;

    /// Encode a bitmap according to `spec`.
    fn encode(&self, image: &DynamicImage, spec: &FormatSpec) -> Result<Vec<u8>, BackendError>;
}
