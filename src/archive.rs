//! ZIP bundling of converted outputs.
//!
//! Entry names are the original file names with their extension replaced by
//! the job's recorded output extension. Only done jobs are bundled, and
//! repeated names are disambiguated so no entry overwrites another.

use crate::batch::{Batch, ConversionJob, JobStatus};
use crate::naming::{EntryNames, replace_extension};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("Nothing to bundle")]
    Empty,
}

/// One file headed for the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Archive entries for every done job, in the order given.
///
/// Names are renamed to the output extension and made unique.
pub fn entries_from_jobs<'a>(
    jobs: impl IntoIterator<Item = &'a ConversionJob>,
) -> Vec<ArchiveEntry> {
    let mut names = EntryNames::new();
    jobs.into_iter()
        .filter(|job| job.status == JobStatus::Done)
        .filter_map(|job| {
            let extension = job.output_extension?;
            let bytes = job.result_bytes.as_ref()?;
            Some(ArchiveEntry {
                name: names.claim(&replace_extension(&job.file_name, extension.as_str())),
                bytes: bytes.clone(),
            })
        })
        .collect()
}

/// Write entries into an in-memory ZIP archive (deflate).
pub fn write_zip(entries: &[ArchiveEntry]) -> Result<Vec<u8>, ArchiveError> {
    if entries.is_empty() {
        return Err(ArchiveError::Empty);
    }

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for entry in entries {
        writer.start_file(entry.name.as_str(), options)?;
        writer.write_all(&entry.bytes)?;
    }
    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
}

/// Bundle every done job into a ZIP archive.
pub fn build_archive<'a>(
    jobs: impl IntoIterator<Item = &'a ConversionJob>,
) -> Result<Vec<u8>, ArchiveError> {
    let entries = entries_from_jobs(jobs);
    tracing::debug!(entries = entries.len(), "building archive");
    write_zip(&entries)
}

/// What to do with a batch's outputs once it has run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Write the ZIP bundle of done jobs.
    Bundle,
    /// Write each done output into this directory.
    Individual(PathBuf),
    /// Some files failed and no alternative was asked for.
    Withheld,
    /// Nothing converted; there is nothing to write.
    Nothing,
}

/// Decide how to deliver results.
///
/// The bundle is written only when every job is done. `partial` bundles
/// whatever finished; otherwise `out_dir` receives the finished files one
/// by one.
pub fn plan_delivery(batch: &Batch, partial: bool, out_dir: Option<&Path>) -> Delivery {
    if batch.completed().is_empty() {
        return Delivery::Nothing;
    }
    if batch.all_done() || partial {
        return Delivery::Bundle;
    }
    match out_dir {
        Some(dir) => Delivery::Individual(dir.to_path_buf()),
        None => Delivery::Withheld,
    }
}

/// Write every done job into `dir` under its archive entry name.
pub fn write_individually<'a>(
    jobs: impl IntoIterator<Item = &'a ConversionJob>,
    dir: &Path,
) -> Result<Vec<PathBuf>, ArchiveError> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    for ArchiveEntry { name, bytes } in entries_from_jobs(jobs) {
        let path = dir.join(name);
        std::fs::write(&path, bytes)?;
        written.push(path);
    }
    Ok(written)
}
