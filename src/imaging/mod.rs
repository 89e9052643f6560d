//! Image decoding and encoding.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::load_from_memory`, libheif for HEIC |
//! | **Flatten** | straight-alpha composite onto an opaque background |
//! | **Encode** | `JpegEncoder`, `webp::Encoder`, `PngEncoder` |
//!
//! The module is split into:
//! - **Calculations**: Pure pixel math (unit testable)
//! - **Parameters**: Quality and other encoder settings
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level conversion combining the format table + backend

pub mod backend;
mod calculations;
mod heic;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend};
pub use calculations::{blend_channel, flatten};
pub use operations::{ConvertedImage, convert_bytes, convert_with_spec};
pub use params::Quality;
pub use rust_backend::RustBackend;
