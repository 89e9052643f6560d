//! Centralized file-name handling for converted outputs.
//!
//! Converted files keep their original stem and take the extension of the
//! container they were encoded to:
//! - `photo.HEIC` + jpg → `photo.jpg`
//! - `scan.final.jpeg` + webp → `scan.final.webp`
//! - `README` + png → `README.png` (no recognized extension, so one is appended)
//!
//! Archive entries must be unique, so [`EntryNames`] hands out
//! `photo (1).jpg`, `photo (2).jpg`, … when a name repeats.

use crate::format::InputType;
use std::collections::HashSet;

/// Split a file name into `(stem, extension)` when the extension is a
/// recognized input extension (case-insensitive).
///
/// - `"photo.HEIC"` → `Some(("photo", "HEIC"))`
/// - `"archive.tar.gz"` → `None`
/// - `".heic"` → `None` (a dotfile has no stem)
pub fn split_input_extension(name: &str) -> Option<(&str, &str)> {
    let dot = name.rfind('.')?;
    if dot == 0 {
        return None;
    }
    let (stem, ext) = (&name[..dot], &name[dot + 1..]);
    InputType::from_extension(ext).map(|_| (stem, ext))
}

/// Replace a recognized input extension with `new_ext`.
pub fn replace_extension(name: &str, new_ext: &str) -> String {
    match split_input_extension(name) {
        Some((stem, _)) => format!("{stem}.{new_ext}"),
        None => format!("{name}.{new_ext}"),
    }
}

/// Name used when an upload arrives without one.
pub fn fallback_name(input: InputType) -> String {
    format!("image.{}", input.extensions()[0])
}

/// Hands out unique archive entry names.
#[derive(Debug, Default)]
pub struct EntryNames {
    taken: HashSet<String>,
}

impl EntryNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `name` if unused, otherwise the first free `stem (n).ext`.
    ///
    /// Uniqueness is checked case-insensitively, since archives are often
    /// extracted onto case-insensitive filesystems.
    pub fn claim(&mut self, name: &str) -> String {
        if self.taken.insert(name.to_lowercase()) {
            return name.to_string();
        }

        let (stem, ext) = match name.rfind('.') {
            Some(dot) if dot > 0 => (&name[..dot], &name[dot..]),
            _ => (name, ""),
        };
        let mut n = 1;
        loop {
            let candidate = format!("{stem} ({n}){ext}");
            if self.taken.insert(candidate.to_lowercase()) {
                return candidate;
            }
            n += 1;
        }
    }
}
