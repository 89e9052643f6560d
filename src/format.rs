//! Input types, output keys, and the fixed format table.
//!
//! Every conversion is described by two values chosen from closed sets:
//!
//! - [`InputType`]: what the caller says it is uploading (`heic`, `jpg`,
//!   `png`, `webp`). It drives the upload allow-list and whether the HEIC
//!   decode stage runs.
//! - [`FormatKey`]: the output selection (`jpg-high`, `jpg-balanced`,
//!   `webp-high`, `webp-balanced`, `png`). Each key resolves to a
//!   [`FormatSpec`] through a static lookup.
//!
//! | Key | Container | Quality | Flatten |
//! |---|---|---|---|
//! | `jpg-high` | JPEG | 95 | white |
//! | `jpg-balanced` | JPEG | 80 | white |
//! | `webp-high` | WebP | 90 | white |
//! | `webp-balanced` | WebP | 80 | white |
//! | `png` | PNG | lossless | none |

use crate::imaging::Quality;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Unsupported input format: {0}")]
    UnsupportedInput(String),
    #[error("Unsupported output format: {0}")]
    UnsupportedOutput(String),
}

/// Declared type of an uploaded image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum InputType {
    #[default]
    Heic,
    Jpg,
    Png,
    Webp,
}

impl InputType {
    pub const ALL: [InputType; 4] = [
        InputType::Heic,
        InputType::Jpg,
        InputType::Png,
        InputType::Webp,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            InputType::Heic => "heic",
            InputType::Jpg => "jpg",
            InputType::Png => "png",
            InputType::Webp => "webp",
        }
    }

    /// File extensions accepted for this input type (lowercase).
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            InputType::Heic => &["heic", "heif"],
            InputType::Jpg => &["jpg", "jpeg"],
            InputType::Png => &["png"],
            InputType::Webp => &["webp"],
        }
    }

    /// MIME type assigned when the source cannot tell us one.
    pub fn mime_type(self) -> &'static str {
        match self {
            InputType::Heic => "image/heic",
            InputType::Jpg => "image/jpeg",
            InputType::Png => "image/png",
            InputType::Webp => "image/webp",
        }
    }

    /// Whether `ext` (any case) belongs to this input type's allow-list.
    pub fn accepts_extension(self, ext: &str) -> bool {
        self.extensions()
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ext))
    }

    /// Find the input type owning a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.accepts_extension(ext))
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputType {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| FormatError::UnsupportedInput(s.to_string()))
    }
}

/// Output selection key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum FormatKey {
    JpgHigh,
    JpgBalanced,
    WebpHigh,
    WebpBalanced,
    Png,
}

impl FormatKey {
    pub const ALL: [FormatKey; 5] = [
        FormatKey::JpgHigh,
        FormatKey::JpgBalanced,
        FormatKey::WebpHigh,
        FormatKey::WebpBalanced,
        FormatKey::Png,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FormatKey::JpgHigh => "jpg-high",
            FormatKey::JpgBalanced => "jpg-balanced",
            FormatKey::WebpHigh => "webp-high",
            FormatKey::WebpBalanced => "webp-balanced",
            FormatKey::Png => "png",
        }
    }

    pub fn spec(self) -> FormatSpec {
        match self {
            FormatKey::JpgHigh => FormatSpec::lossy(Container::Jpeg, 95),
            FormatKey::JpgBalanced => FormatSpec::lossy(Container::Jpeg, 80),
            FormatKey::WebpHigh => FormatSpec::lossy(Container::WebP, 90),
            FormatKey::WebpBalanced => FormatSpec::lossy(Container::WebP, 80),
            FormatKey::Png => FormatSpec {
                container: Container::Png,
                quality: None,
                flatten: None,
            },
        }
    }
}

impl fmt::Display for FormatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormatKey {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| FormatError::UnsupportedOutput(s.to_string()))
    }
}

/// Target image container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Container {
    Jpeg,
    WebP,
    Png,
}

impl Container {
    pub fn extension(self) -> OutputExtension {
        match self {
            Container::Jpeg => OutputExtension::Jpg,
            Container::WebP => OutputExtension::Webp,
            Container::Png => OutputExtension::Png,
        }
    }
}

/// Opaque RGB background used when compositing away transparency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Background(pub [u8; 3]);

impl Background {
    pub const WHITE: Background = Background([255, 255, 255]);
}

/// How a [`FormatKey`] is rendered: container, quality, flatten color.
///
/// `quality` is `None` for lossless containers. `flatten` is `None` when the
/// container keeps the alpha channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatSpec {
    pub container: Container,
    pub quality: Option<Quality>,
    pub flatten: Option<Background>,
}

impl FormatSpec {
    fn lossy(container: Container, quality: u32) -> Self {
        Self {
            container,
            quality: Some(Quality::new(quality)),
            flatten: Some(Background::WHITE),
        }
    }

    /// The JPEG rendition used by the legacy bulk endpoint.
    pub fn legacy_jpeg() -> Self {
        Self::lossy(Container::Jpeg, 90)
    }
}

/// Extension reported in `X-Output-Extension` and used for renaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputExtension {
    Jpg,
    Webp,
    Png,
}

impl OutputExtension {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputExtension::Jpg => "jpg",
            OutputExtension::Webp => "webp",
            OutputExtension::Png => "png",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            OutputExtension::Jpg => "image/jpeg",
            OutputExtension::Webp => "image/webp",
            OutputExtension::Png => "image/png",
        }
    }
}

impl fmt::Display for OutputExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputExtension {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(OutputExtension::Jpg),
            "webp" => Ok(OutputExtension::Webp),
            "png" => Ok(OutputExtension::Png),
            other => Err(FormatError::UnsupportedOutput(other.to_string())),
        }
    }
}
