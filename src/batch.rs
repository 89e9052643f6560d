//! Batch orchestration: one conversion job per uploaded file.
//!
//! A [`Batch`] owns the current files, their [`ConversionJob`]s, and the
//! running counters. [`Batch::run`] walks the files strictly in order with
//! one conversion in flight at a time:
//!
//! ```text
//! pending ──► processing ──► done   (percent = 100, output recorded)
//!                        └─► error  (percent = 0, batch continues)
//! ```
//!
//! A failed file never stops the batch and is never retried.
//!
//! ## Progress
//!
//! While a file is processing, a [`CosmeticProgress`] ticker nudges the
//! percentage upward by a random step every interval, capped at 95. It is a
//! decorative animation only. It knows nothing about bytes sent or codec
//! work; nothing should read it as a measurement. A real progress source
//! can replace it without touching the job state machine.
//!
//! ## Counters
//!
//! `total_uploaded` grows each time files are loaded and is not decremented
//! when files are removed. `total_completed` grows on every successful
//! conversion. Both reset only through [`Batch::reset_counters`].

use crate::client::ConvertError;
use crate::format::{FormatKey, InputType, OutputExtension};
use crate::imaging::ConvertedImage;
use crate::upload::{FileId, UploadedFile};
use rand::Rng;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::Sender;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Highest percentage the cosmetic ticker reaches on its own.
pub const PROGRESS_CAP: u8 = 95;
/// Largest random step per tick.
pub const MAX_PROGRESS_STEP: u8 = 15;

/// Anything that can turn one uploaded file into a converted image.
pub trait Converter {
    fn convert(
        &self,
        file: &UploadedFile,
        input: InputType,
        key: FormatKey,
    ) -> impl Future<Output = Result<ConvertedImage, ConvertError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Pending,
    Processing,
    Done,
    Error,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
        }
    }
}

/// Conversion state of a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionJob {
    pub file_id: FileId,
    pub file_name: String,
    pub status: JobStatus,
    /// Cosmetic only; see the [module docs](self).
    ///
    /// While processing, the live value is reported through
    /// [`BatchEvent::Progress`]. The last value shown is written here when
    /// the ticker stops, then replaced by 100 (done) or 0 (error).
    pub percent: u8,
    pub output_extension: Option<OutputExtension>,
    pub result_bytes: Option<Vec<u8>>,
    pub result_size: Option<u64>,
    pub error: Option<String>,
}

impl ConversionJob {
    fn pending(file: &UploadedFile) -> Self {
        Self {
            file_id: file.id,
            file_name: file.name.clone(),
            status: JobStatus::Pending,
            percent: 0,
            output_extension: None,
            result_bytes: None,
            result_size: None,
            error: None,
        }
    }

    fn start(&mut self) {
        self.status = JobStatus::Processing;
        self.percent = 0;
        self.output_extension = None;
        self.result_bytes = None;
        self.result_size = None;
        self.error = None;
    }

    fn finish(&mut self, output: ConvertedImage) {
        self.status = JobStatus::Done;
        self.percent = 100;
        self.output_extension = Some(output.extension);
        self.result_size = Some(output.bytes.len() as u64);
        self.result_bytes = Some(output.bytes);
    }

    fn fail(&mut self, error: &ConvertError) {
        self.status = JobStatus::Error;
        self.percent = 0;
        self.error = Some(error.to_string());
    }
}

/// Progress notifications emitted while a batch runs.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    Started {
        index: usize,
        total: usize,
        id: FileId,
        name: String,
    },
    Progress {
        id: FileId,
        name: String,
        percent: u8,
    },
    Finished {
        id: FileId,
        name: String,
        extension: OutputExtension,
        size: u64,
    },
    Failed {
        id: FileId,
        name: String,
        error: String,
    },
}

/// Count of jobs per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub pending: usize,
    pub processing: usize,
    pub done: usize,
    pub error: usize,
}

/// Files of the current batch and their jobs.
#[derive(Debug, Default)]
pub struct Batch {
    files: Vec<UploadedFile>,
    jobs: HashMap<FileId, ConversionJob>,
    total_uploaded: u64,
    total_completed: u64,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the batch wholesale. Every job starts over as pending.
    pub fn load(&mut self, files: Vec<UploadedFile>) {
        self.total_uploaded += files.len() as u64;
        self.jobs = files
            .iter()
            .map(|f| (f.id, ConversionJob::pending(f)))
            .collect();
        self.files = files;
    }

    /// Remove one file and its job. Counters are left alone.
    pub fn remove(&mut self, id: FileId) -> Option<UploadedFile> {
        let pos = self.files.iter().position(|f| f.id == id)?;
        self.jobs.remove(&id);
        Some(self.files.remove(pos))
    }

    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn job(&self, id: FileId) -> Option<&ConversionJob> {
        self.jobs.get(&id)
    }

    /// Jobs in file order.
    pub fn jobs(&self) -> impl Iterator<Item = &ConversionJob> {
        self.files.iter().filter_map(|f| self.jobs.get(&f.id))
    }

    /// Statuses in file order.
    pub fn statuses(&self) -> Vec<JobStatus> {
        self.jobs().map(|j| j.status).collect()
    }

    /// Successful jobs in file order.
    pub fn completed(&self) -> Vec<&ConversionJob> {
        self.jobs().filter(|j| j.status == JobStatus::Done).collect()
    }

    /// True when the batch is non-empty and every file's job is done.
    ///
    /// This gates the bulk download.
    pub fn all_done(&self) -> bool {
        !self.files.is_empty()
            && self
                .files
                .iter()
                .all(|f| self.jobs.get(&f.id).is_some_and(|j| j.status == JobStatus::Done))
    }

    pub fn summary(&self) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for job in self.jobs() {
            match job.status {
                JobStatus::Pending => summary.pending += 1,
                JobStatus::Processing => summary.processing += 1,
                JobStatus::Done => summary.done += 1,
                JobStatus::Error => summary.error += 1,
            }
        }
        summary
    }

    pub fn total_uploaded(&self) -> u64 {
        self.total_uploaded
    }

    pub fn total_completed(&self) -> u64 {
        self.total_completed
    }

    pub fn reset_counters(&mut self) {
        self.total_uploaded = 0;
        self.total_completed = 0;
    }

    /// Convert every file in order, one at a time.
    pub async fn run<C: Converter>(
        &mut self,
        converter: &C,
        input: InputType,
        key: FormatKey,
        progress_interval: Duration,
        events: Option<Sender<BatchEvent>>,
    ) {
        let total = self.files.len();
        tracing::info!(files = total, input = %input, format = %key, "starting batch");

        for (index, file) in self.files.iter().enumerate() {
            let Some(job) = self.jobs.get_mut(&file.id) else {
                continue;
            };
            job.start();
            emit(
                &events,
                BatchEvent::Started {
                    index,
                    total,
                    id: file.id,
                    name: file.name.clone(),
                },
            );

            let ticker = {
                let events = events.clone();
                let (id, name) = (file.id, file.name.clone());
                CosmeticProgress::start(progress_interval, move |percent| {
                    emit(
                        &events,
                        BatchEvent::Progress {
                            id,
                            name: name.clone(),
                            percent,
                        },
                    )
                })
            };

            let result = converter.convert(file, input, key).await;
            job.percent = ticker.stop();

            match result {
                Ok(output) => {
                    let extension = output.extension;
                    let size = output.bytes.len() as u64;
                    job.finish(output);
                    self.total_completed += 1;
                    tracing::debug!(file = %file.name, %extension, size, "converted");
                    emit(
                        &events,
                        BatchEvent::Finished {
                            id: file.id,
                            name: file.name.clone(),
                            extension,
                            size,
                        },
                    );
                }
                Err(e) => {
                    tracing::warn!(file = %file.name, error = %e, "conversion failed");
                    job.fail(&e);
                    emit(
                        &events,
                        BatchEvent::Failed {
                            id: file.id,
                            name: file.name.clone(),
                            error: e.to_string(),
                        },
                    );
                }
            }
        }

        let summary = self.summary();
        tracing::info!(done = summary.done, failed = summary.error, "batch finished");
    }
}

fn emit(events: &Option<Sender<BatchEvent>>, event: BatchEvent) {
    if let Some(tx) = events {
        // Receiver gone means nobody is watching; the batch goes on.
        let _ = tx.send(event);
    }
}

/// Next value of the decorative progress animation.
pub fn next_percent(current: u8, step: u8) -> u8 {
    current.saturating_add(step).min(PROGRESS_CAP)
}

/// Decorative progress animation for a file in flight.
///
/// Not derived from any I/O; see the [module docs](self). The ticker task is
/// aborted when this value is stopped or dropped.
pub struct CosmeticProgress {
    percent: Arc<AtomicU8>,
    handle: JoinHandle<()>,
}

impl CosmeticProgress {
    /// Start ticking on the current tokio runtime.
    pub fn start(interval: Duration, on_tick: impl Fn(u8) + Send + 'static) -> Self {
        let percent = Arc::new(AtomicU8::new(0));
        let shared = Arc::clone(&percent);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // interval() fires immediately; skip that tick
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let step = rand::thread_rng().gen_range(0..=MAX_PROGRESS_STEP);
                let current = shared.load(Ordering::Relaxed);
                let next = next_percent(current, step);
                shared.store(next, Ordering::Relaxed);
                on_tick(next);
            }
        });
        Self { percent, handle }
    }

    pub fn percent(&self) -> u8 {
        self.percent.load(Ordering::Relaxed)
    }

    /// Stop the animation, returning the last shown value.
    pub fn stop(self) -> u8 {
        self.handle.abort();
        self.percent()
    }
}

impl Drop for CosmeticProgress {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
