//! High-level conversion operations.
//!
//! These combine the format table with backend execution: resolve the
//! [`FormatSpec`], decode, encode, and report the resulting extension.

use super::backend::{BackendError, ImageBackend};
use crate::format::{FormatKey, FormatSpec, InputType, OutputExtension};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Encoded output of a single conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedImage {
    pub bytes: Vec<u8>,
    pub extension: OutputExtension,
}

/// Convert uploaded bytes to the rendition selected by `key`.
pub fn convert_bytes(
    backend: &(impl ImageBackend + ?Sized),
    bytes: &[u8],
    input: InputType,
    key: FormatKey,
) -> Result<ConvertedImage> {
    convert_with_spec(backend, bytes, input, &key.spec())
}

/// Convert uploaded bytes with an explicit [`FormatSpec`].
///
/// HEIC input is decoded to an intermediate bitmap first; everything else is
/// handed to the general decoder unchanged.
pub fn convert_with_spec(
    backend: &(impl ImageBackend + ?Sized),
    bytes: &[u8],
    input: InputType,
    spec: &FormatSpec,
) -> Result<ConvertedImage> {
    let image = backend.decode(bytes, input)?;
    tracing::debug!(
        input = %input,
        width = image.width(),
        height = image.height(),
        "decoded upload"
    );

    let encoded = backend.encode(&image, spec)?;
    if encoded.is_empty() {
        return Err(BackendError::EncodeFailed("encoder produced no output".into()));
    }

    Ok(ConvertedImage {
        bytes: encoded,
        extension: spec.container.extension(),
    })
}
