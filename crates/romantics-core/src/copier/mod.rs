pub mod collision;
mod engine;

pub use collision::{plan_collisions, unique_destination, CollisionPolicy, PlannedCollision};
pub use engine::copy_files;

use crossbeam_channel::{bounded, Receiver};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::error;

use crate::config::AppConfig;
use crate::error::Error;
use crate::space::SpaceProbe;

pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Events a background job may queue before the worker waits for the observer.
pub const EVENT_BACKLOG: usize = 256;

/// One file to copy. The destination directory is given per job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyTask {
    pub source: PathBuf,
    pub size: u64,
    /// Overrides the job's [`CopyOptions::collision`] for this file.
    pub on_collision: Option<CollisionPolicy>,
}

impl CopyTask {
    pub fn new(source: impl Into<PathBuf>, size: u64) -> Self {
        Self {
            source: source.into(),
            size,
            on_collision: None,
        }
    }

    /// Build a task from the file's current size on disk.
    pub fn from_path(path: &Path) -> Result<CopyTask, Error> {
        let metadata = fs::metadata(path).map_err(|e| Error::file(path, e))?;
        Ok(CopyTask::new(path, metadata.len()))
    }

    pub fn with_collision(mut self, policy: CollisionPolicy) -> Self {
        self.on_collision = Some(policy);
        self
    }
}

#[derive(Debug, Clone)]
pub struct CopyOptions {
    pub collision: CollisionPolicy,
    pub chunk_size: usize,
    /// Minimum gap between two `Progress` events.
    pub progress_interval: Duration,
    /// Compare the total against the destination's free space before starting.
    pub check_space: bool,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            collision: CollisionPolicy::AutoSuffix,
            chunk_size: DEFAULT_CHUNK_SIZE,
            progress_interval: Duration::from_millis(100),
            check_space: true,
        }
    }
}

impl From<&AppConfig> for CopyOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            collision: config.collision_policy,
            chunk_size: config.copy_chunk_size.max(1),
            progress_interval: config.progress_interval(),
            check_space: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Cancelled | JobStatus::Failed
        )
    }
}

/// Byte and file counters of a running job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyJobState {
    pub total_bytes: u64,
    pub bytes_copied: u64,
    pub total_files: usize,
    pub files_copied: usize,
    pub cancelled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CopyProgress {
    pub current_file: String,
    pub file_bytes_copied: u64,
    pub file_size: u64,
    pub bytes_copied: u64,
    pub total_bytes: u64,
    pub files_completed: usize,
    pub total_files: usize,
    pub bytes_per_sec: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopySummary {
    /// (source, destination) for every file fully written.
    pub copied: Vec<(PathBuf, PathBuf)>,
    pub skipped: Vec<PathBuf>,
    pub bytes_copied: u64,
}

impl CopySummary {
    pub fn files_copied(&self) -> usize {
        self.copied.len()
    }
}

#[derive(Debug)]
pub enum CopyOutcome {
    Completed(CopySummary),
    /// Files finished before the cancel stay in place.
    Cancelled(CopySummary),
    Failed { error: Error, summary: CopySummary },
}

impl CopyOutcome {
    pub fn status(&self) -> JobStatus {
        match self {
            CopyOutcome::Completed(_) => JobStatus::Completed,
            CopyOutcome::Cancelled(_) => JobStatus::Cancelled,
            CopyOutcome::Failed { .. } => JobStatus::Failed,
        }
    }

    pub fn summary(&self) -> &CopySummary {
        match self {
            CopyOutcome::Completed(summary) | CopyOutcome::Cancelled(summary) => summary,
            CopyOutcome::Failed { summary, .. } => summary,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CopyEvent {
    Started {
        total_files: usize,
        total_bytes: u64,
    },
    Progress(CopyProgress),
    FileCompleted {
        source: PathBuf,
        destination: PathBuf,
        files_completed: usize,
        bytes_copied: u64,
    },
    FileSkipped {
        source: PathBuf,
        existing: PathBuf,
    },
    Finished {
        status: JobStatus,
        message: Option<String>,
    },
}

/// Handle to a copy running on its own worker thread.
pub struct CopyJob {
    cancel: Arc<AtomicBool>,
    status: Arc<Mutex<JobStatus>>,
    events: Receiver<CopyEvent>,
    worker: JoinHandle<CopyOutcome>,
}

impl CopyJob {
    /// Ask the worker to stop. Never blocks; the worker notices before its
    /// next chunk.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// The flag behind [`CopyJob::cancel`], for callers that need to set it
    /// from elsewhere, such as a Ctrl-C handler.
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn status(&self) -> JobStatus {
        *self.status.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn events(&self) -> &Receiver<CopyEvent> {
        &self.events
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Block until the worker is done. Events nobody has read yet are dropped.
    pub fn wait(self) -> CopyOutcome {
        let CopyJob { events, worker, .. } = self;
        drop(events);
        match worker.join() {
            Ok(outcome) => outcome,
            Err(_) => {
                error!("Copy worker panicked");
                CopyOutcome::Failed {
                    error: Error::Io(std::io::Error::new(
                        std::io::ErrorKind::Other,
                        "copy worker panicked",
                    )),
                    summary: CopySummary::default(),
                }
            }
        }
    }
}

/// Start copying `tasks` into `dest_dir` on a background thread.
///
/// Tasks are copied one at a time in the given order. Progress and the final
/// status arrive on [`CopyJob::events`]; once [`EVENT_BACKLOG`] of them are
/// unread the worker pauses until the observer catches up. The full outcome
/// comes from [`CopyJob::wait`].
pub fn start_copy(
    tasks: Vec<CopyTask>,
    dest_dir: PathBuf,
    options: CopyOptions,
    probe: Arc<dyn SpaceProbe>,
) -> Result<CopyJob, Error> {
    let cancel = Arc::new(AtomicBool::new(false));
    let status = Arc::new(Mutex::new(JobStatus::Pending));
    let (sender, receiver) = bounded(EVENT_BACKLOG);

    let worker_cancel = Arc::clone(&cancel);
    let worker_status = Arc::clone(&status);
    let worker = thread::Builder::new()
        .name("romantics-copy".to_string())
        .spawn(move || {
            let set_status = |s: JobStatus| {
                *worker_status.lock().unwrap_or_else(|e| e.into_inner()) = s;
            };
            set_status(JobStatus::Running);

            let outcome = copy_files(
                &tasks,
                &dest_dir,
                &options,
                probe.as_ref(),
                &worker_cancel,
                &mut |event| {
                    // the observer may have hung up; the copy carries on regardless
                    let _ = sender.send(event);
                },
            );

            set_status(outcome.status());
            let message = match &outcome {
                CopyOutcome::Failed { error, .. } => Some(error.to_string()),
                _ => None,
            };
            let _ = sender.send(CopyEvent::Finished {
                status: outcome.status(),
                message,
            });
            outcome
        })?;

    Ok(CopyJob {
        cancel,
        status,
        events: receiver,
        worker,
    })
}
