//! Upload collection: turning paths into a batch of [`UploadedFile`]s.
//!
//! The collector accepts files and directories (walked recursively), keeps
//! files whose extension is allowed for the selected [`InputType`], and
//! re-wraps each one so it always carries a concrete MIME type and a
//! non-empty name. HEIC files in particular are often reported without a
//! MIME type, so the declared input type fills the gap.
//!
//! Every accepted file gets a fresh [`FileId`]. Jobs are keyed by that id,
//! so two files that happen to share a name never overwrite each other.
//!
//! Collection never fails on a single bad path: rejected paths are reported
//! as [`Skipped`] entries next to the accepted files.

use crate::format::InputType;
use crate::naming::fallback_name;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum CollectError {
    #[error("No {input} files found ({skipped} paths skipped)")]
    NothingAccepted { input: InputType, skipped: usize },
}

/// Unique identifier of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(u64);

impl FileId {
    /// Allocate a new id, unique for the lifetime of the process.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A file accepted into a batch. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub id: FileId,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Wrap raw bytes, normalizing name and MIME type.
    ///
    /// An empty name falls back to `image.<ext>`; a missing, empty, or
    /// generic (`application/octet-stream`) MIME type is replaced by the
    /// input type's canonical one.
    pub fn new(
        name: Option<&str>,
        declared_mime: Option<&str>,
        bytes: Vec<u8>,
        input: InputType,
    ) -> Self {
        let name = match name.map(str::trim) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => fallback_name(input),
        };
        let mime_type = match declared_mime.map(str::trim) {
            Some(m) if !m.is_empty() && m != "application/octet-stream" => m.to_string(),
            _ => input.mime_type().to_string(),
        };
        Self {
            id: FileId::next(),
            size: bytes.len() as u64,
            name,
            mime_type,
            bytes,
        }
    }
}

/// Why a path was not accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Extension not in the selected input type's allow-list.
    NotAllowed,
    /// Same file already collected in this batch.
    Duplicate,
    /// Zero-byte file.
    Empty,
    /// Missing or unreadable.
    Unreadable(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotAllowed => f.write_str("not an accepted file type"),
            SkipReason::Duplicate => f.write_str("already added"),
            SkipReason::Empty => f.write_str("empty file"),
            SkipReason::Unreadable(e) => write!(f, "unreadable: {e}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// Result of a collection pass.
#[derive(Debug, Default)]
pub struct Collection {
    pub files: Vec<UploadedFile>,
    pub skipped: Vec<Skipped>,
}

/// Collect every allowed file under `paths` for `input`.
///
/// Directories are walked recursively in file-name order. Returns
/// [`CollectError::NothingAccepted`] when no file made it through.
pub fn collect(paths: &[PathBuf], input: InputType) -> Result<Collection, CollectError> {
    let mut collection = Collection::default();
    let mut seen = HashSet::new();

    for root in paths {
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().unwrap_or(root).to_path_buf();
                    collection.skipped.push(Skipped {
                        path,
                        reason: SkipReason::Unreadable(e.to_string()),
                    });
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            match accept(entry.path(), input, &mut seen) {
                Ok(file) => collection.files.push(file),
                Err(reason) => collection.skipped.push(Skipped {
                    path: entry.path().to_path_buf(),
                    reason,
                }),
            }
        }
    }

    tracing::debug!(
        accepted = collection.files.len(),
        skipped = collection.skipped.len(),
        input = %input,
        "collected uploads"
    );

    if collection.files.is_empty() {
        return Err(CollectError::NothingAccepted {
            input,
            skipped: collection.skipped.len(),
        });
    }
    Ok(collection)
}

fn accept(
    path: &Path,
    input: InputType,
    seen: &mut HashSet<PathBuf>,
) -> Result<UploadedFile, SkipReason> {
    let allowed = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| input.accepts_extension(ext));
    if !allowed {
        return Err(SkipReason::NotAllowed);
    }

    let canonical = path
        .canonicalize()
        .map_err(|e| SkipReason::Unreadable(e.to_string()))?;
    if !seen.insert(canonical) {
        return Err(SkipReason::Duplicate);
    }

    let bytes = std::fs::read(path).map_err(|e| SkipReason::Unreadable(e.to_string()))?;
    if bytes.is_empty() {
        return Err(SkipReason::Empty);
    }

    let name = path.file_name().and_then(|n| n.to_str());
    Ok(UploadedFile::new(name, None, bytes, input))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn file_ids_are_unique() {
        let a = FileId::next();
        let b = FileId::next();
        assert_ne!(a, b);
        assert!(b.get() > a.get());
    }

    #[test]
    fn new_fills_missing_name_and_mime() {
        let file = UploadedFile::new(None, None, vec![1, 2, 3], InputType::Heic);
        assert_eq!(file.name, "image.heic");
        assert_eq!(file.mime_type, "image/heic");
        assert_eq!(file.size, 3);

        let file = UploadedFile::new(Some("  "), Some(""), vec![1], InputType::Png);
        assert_eq!(file.name, "image.png");
        assert_eq!(file.mime_type, "image/png");
    }

    #[test]
    fn new_replaces_generic_mime() {
        let file = UploadedFile::new(
            Some("IMG_1.HEIC"),
            Some("application/octet-stream"),
            vec![0],
            InputType::Heic,
        );
        assert_eq!(file.name, "IMG_1.HEIC");
        assert_eq!(file.mime_type, "image/heic");
    }

    #[test]
    fn new_keeps_concrete_mime() {
        let file = UploadedFile::new(Some("a.jpg"), Some("image/jpeg"), vec![0], InputType::Jpg);
        assert_eq!(file.mime_type, "image/jpeg");
    }

    #[test]
    fn collect_filters_by_allow_list() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a.HEIC", b"heic-a");
        write(tmp.path(), "b.heif", b"heic-b");
        write(tmp.path(), "c.jpg", b"jpeg");
        write(tmp.path(), "notes.txt", b"text");

        let collection = collect(&[tmp.path().to_path_buf()], InputType::Heic).unwrap();
        let names: Vec<&str> = collection.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.HEIC", "b.heif"]);
        assert!(collection.files.iter().all(|f| f.mime_type == "image/heic"));
        assert_eq!(collection.skipped.len(), 2);
        assert!(
            collection
                .skipped
                .iter()
                .all(|s| s.reason == SkipReason::NotAllowed)
        );
    }

    #[test]
    fn collect_walks_directories_recursively() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "top.png", b"p1");
        write(tmp.path(), "nested/deeper/inner.png", b"p2");

        let collection = collect(&[tmp.path().to_path_buf()], InputType::Png).unwrap();
        assert_eq!(collection.files.len(), 2);
        assert!(collection.files.iter().any(|f| f.name == "inner.png"));
    }

    #[test]
    fn collect_deduplicates_repeated_paths() {
        let tmp = TempDir::new().unwrap();
        let file = write(tmp.path(), "photo.webp", b"webp");

        let collection =
            collect(&[file.clone(), tmp.path().to_path_buf()], InputType::Webp).unwrap();
        assert_eq!(collection.files.len(), 1);
        assert_eq!(collection.skipped.len(), 1);
        assert_eq!(collection.skipped[0].reason, SkipReason::Duplicate);
    }

    #[test]
    fn collect_keeps_same_name_in_different_dirs() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a/photo.jpg", b"one");
        write(tmp.path(), "b/photo.jpg", b"two");

        let collection = collect(&[tmp.path().to_path_buf()], InputType::Jpg).unwrap();
        assert_eq!(collection.files.len(), 2);
        assert_ne!(collection.files[0].id, collection.files[1].id);
    }

    #[test]
    fn collect_skips_empty_and_missing() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "empty.png", b"");
        write(tmp.path(), "ok.png", b"png");
        let missing = tmp.path().join("missing.png");

        let collection =
            collect(&[tmp.path().to_path_buf(), missing.clone()], InputType::Png).unwrap();
        assert_eq!(collection.files.len(), 1);
        assert!(
            collection
                .skipped
                .iter()
                .any(|s| s.reason == SkipReason::Empty)
        );
        assert!(
            collection
                .skipped
                .iter()
                .any(|s| s.path == missing && matches!(s.reason, SkipReason::Unreadable(_)))
        );
    }

    #[test]
    fn collect_errors_when_nothing_accepted() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a.png", b"png");

        let result = collect(&[tmp.path().to_path_buf()], InputType::Heic);
        assert!(matches!(
            result,
            Err(CollectError::NothingAccepted { skipped: 1, .. })
        ));
    }
}
