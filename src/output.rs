//! CLI output formatting for collection and batch runs.
//!
//! # Output Format
//!
//! ```text
//! Skipped
//!     notes.txt: not an accepted file type
//!
//! [1/3] IMG_0001.heic
//!     40%
//!     done → jpg (412.3 KB)
//! [2/3] IMG_0002.heic
//!     failed: Server rejected conversion (500): Conversion failed
//! [3/3] IMG_0003.heic
//!     done → jpg (398.0 KB)
//!
//! 2 done, 1 failed
//! ```
//!
//! Each concern has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure.

use crate::batch::{BatchEvent, BatchSummary};
use crate::upload::Skipped;
use std::path::Path;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Human-readable byte size with one decimal place.
///
/// ```text
/// 512 B
/// 412.3 KB
/// 1.5 MB
/// ```
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{bytes} B")
    } else if b < MB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{:.1} MB", b / MB)
    }
}

/// Format a single batch event as display lines.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::Started {
            index, total, name, ..
        } => vec![format!("[{}/{}] {}", index + 1, total, name)],
        BatchEvent::Progress { percent, .. } => vec![format!("{}{}%", indent(1), percent)],
        BatchEvent::Finished {
            extension, size, ..
        } => vec![format!(
            "{}done \u{2192} {} ({})",
            indent(1),
            extension,
            format_size(*size)
        )],
        BatchEvent::Failed { error, .. } => vec![format!("{}failed: {}", indent(1), error)],
    }
}

/// Format paths the collector passed over.
pub fn format_skipped(skipped: &[Skipped]) -> Vec<String> {
    if skipped.is_empty() {
        return Vec::new();
    }
    let mut lines = vec!["Skipped".to_string()];
    for skip in skipped {
        let shown = skip
            .path
            .file_name()
            .map(Path::new)
            .unwrap_or(skip.path.as_path())
            .display();
        lines.push(format!("{}{}: {}", indent(1), shown, skip.reason));
    }
    lines.push(String::new());
    lines
}

/// Format the end-of-run tally, plus where the results went.
pub fn format_summary(summary: &BatchSummary, written: &[&Path]) -> Vec<String> {
    let mut lines = vec![String::new()];
    let mut tally = format!("{} done", summary.done);
    if summary.error > 0 {
        tally.push_str(&format!(", {} failed", summary.error));
    }
    if summary.pending + summary.processing > 0 {
        tally.push_str(&format!(
            ", {} not converted",
            summary.pending + summary.processing
        ));
    }
    lines.push(tally);
    for path in written {
        lines.push(format!("Wrote {}", path.display()));
    }
    lines
}

pub fn print_skipped(skipped: &[Skipped]) {
    for line in format_skipped(skipped) {
        println!("{}", line);
    }
}

pub fn print_summary(summary: &BatchSummary, written: &[&Path]) {
    for line in format_summary(summary, written) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::OutputExtension;
    use crate::upload::{FileId, SkipReason};
    use std::path::PathBuf;

    #[test]
    fn sizes() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024 / 2), "1.5 MB");
    }

    #[test]
    fn started_is_one_based() {
        let event = BatchEvent::Started {
            index: 0,
            total: 3,
            id: FileId::next(),
            name: "IMG_0001.heic".into(),
        };
        assert_eq!(format_batch_event(&event), vec!["[1/3] IMG_0001.heic"]);
    }

    #[test]
    fn finished_and_failed_lines() {
        let id = FileId::next();
        let done = BatchEvent::Finished {
            id,
            name: "a.heic".into(),
            extension: OutputExtension::Webp,
            size: 2048,
        };
        assert_eq!(format_batch_event(&done), vec!["    done → webp (2.0 KB)"]);

        let failed = BatchEvent::Failed {
            id,
            name: "a.heic".into(),
            error: "boom".into(),
        };
        assert_eq!(format_batch_event(&failed), vec!["    failed: boom"]);
    }

    #[test]
    fn skipped_shows_file_names() {
        let skipped = vec![Skipped {
            path: PathBuf::from("/photos/notes.txt"),
            reason: SkipReason::NotAllowed,
        }];
        assert_eq!(
            format_skipped(&skipped),
            vec!["Skipped", "    notes.txt: not an accepted file type", ""]
        );
        assert!(format_skipped(&[]).is_empty());
    }

    #[test]
    fn summary_mentions_failures_only_when_present() {
        let clean = BatchSummary {
            done: 3,
            ..Default::default()
        };
        assert_eq!(format_summary(&clean, &[]), vec!["", "3 done"]);

        let mixed = BatchSummary {
            done: 2,
            error: 1,
            ..Default::default()
        };
        let out = Path::new("converted.zip");
        assert_eq!(
            format_summary(&mixed, &[out]),
            vec!["", "2 done, 1 failed", "Wrote converted.zip"]
        );
    }
}
