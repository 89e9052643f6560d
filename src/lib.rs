//! # Image Converter
//!
//! Converts HEIC, JPEG, PNG and WebP images into a small set of fixed
//! renditions (`jpg-high`, `jpg-balanced`, `webp-high`, `webp-balanced`,
//! `png`). A stateless HTTP service does the codec work one file per
//! request; a batch client walks a selection of files, sends them one at a
//! time, and bundles the results into a ZIP archive.
//!
//! # Architecture
//!
//! ```text
//! paths ──collect──▶ UploadedFile[] ──Batch::run──▶ ConversionJob[] ──build_archive──▶ .zip
//!                                        │
//!                                        ▼ one request at a time
//!                             POST /api/convert-single
//!                                        │
//!                                        ▼
//!                          decode ─ flatten ─ encode (imaging)
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`format`] | Input types, output keys and the rendition table behind them |
//! | [`imaging`] | Codec backend: decode, alpha flattening, JPEG/WebP/PNG encoding |
//! | [`server`] | HTTP endpoints: single conversion and the legacy ZIP bulk route |
//! | [`client`] | Converters the batch drives: HTTP or in-process |
//! | [`upload`] | Collects files from disk, filtered by the selected input type |
//! | [`batch`] | Sequential orchestrator with per-file status and decorative progress |
//! | [`archive`] | ZIP bundling of finished jobs with output-extension renaming |
//! | [`naming`] | Extension replacement and unique archive entry names |
//! | [`config`] | `config.toml` loading, merging and validation |
//! | [`output`] | CLI output formatting |
//! | [`logging`] | Tracing subscriber setup |
//!
//! # Design Decisions
//!
//! ## One File Per Request
//!
//! The client never sends more than one conversion at a time. Large HEIC
//! bursts stay under request-size and time limits on the service side, and
//! a corrupt file fails only its own job. The next file starts only after
//! the previous one has settled.
//!
//! ## Progress Is Decorative
//!
//! Progress percentages during a conversion are an animation capped at 95%,
//! not a measurement. Only completion (100%) and failure are real.
//!
//! ## Lossy WebP Through libwebp
//!
//! The `image` crate writes only lossless WebP, so the WebP renditions are
//! encoded with the `webp` crate. JPEG and PNG stay on `image`.
//!
//! ## HEIC Through libheif
//!
//! HEIC decoding is done by the system libheif through the default `heic`
//! feature. Building with `--no-default-features` leaves it out; HEIC
//! uploads then fail conversion with a clear cause in the logs.

pub mod archive;
pub mod batch;
pub mod client;
pub mod config;
pub mod format;
pub mod imaging;
pub mod logging;
pub mod naming;
pub mod output;
pub mod server;
pub mod upload;

#[cfg(test)]
pub(crate) mod test_helpers;
