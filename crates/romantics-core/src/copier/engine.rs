use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::collision::{resolve, Resolution};
use super::{CopyEvent, CopyJobState, CopyOptions, CopyOutcome, CopyProgress, CopySummary, CopyTask};
use crate::error::Error;
use crate::space::SpaceProbe;

enum FileResult {
    Done(u64),
    Cancelled,
}

/// Rate limiter for `Progress` events, shared by every file of a job.
struct Throttle {
    interval: Duration,
    last_emit: Option<Instant>,
}

impl Throttle {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_emit: None,
        }
    }

    fn ready(&mut self, now: Instant) -> bool {
        let due = self
            .last_emit
            .map_or(true, |last| now.duration_since(last) >= self.interval);
        if due {
            self.last_emit = Some(now);
        }
        due
    }
}

/// Copy `tasks` into `dest_dir` on the calling thread.
///
/// This is the body of [`super::start_copy`]; it is public so a front-end
/// that manages its own threads can drive it directly. `cancel` is checked
/// before every task and every chunk. A cancelled or failed file never leaves
/// a partial copy behind: data goes to a hidden `.part` file that is renamed
/// into place only once complete.
pub fn copy_files(
    tasks: &[CopyTask],
    dest_dir: &Path,
    options: &CopyOptions,
    probe: &dyn SpaceProbe,
    cancel: &AtomicBool,
    emit: &mut dyn FnMut(CopyEvent),
) -> CopyOutcome {
    let mut summary = CopySummary::default();
    let mut state = CopyJobState {
        total_bytes: tasks.iter().map(|t| t.size).sum(),
        total_files: tasks.len(),
        ..Default::default()
    };

    if let Err(error) = preflight(dest_dir, state.total_bytes, options, probe) {
        error!("Copy to {} not started: {}", dest_dir.display(), error);
        return CopyOutcome::Failed { error, summary };
    }

    info!(
        "Copying {} files ({} bytes) to {}",
        state.total_files,
        state.total_bytes,
        dest_dir.display()
    );
    emit(CopyEvent::Started {
        total_files: state.total_files,
        total_bytes: state.total_bytes,
    });

    let mut buffer = vec![0u8; options.chunk_size.max(1)];
    let mut throttle = Throttle::new(options.progress_interval);

    for task in tasks {
        if cancel.load(Ordering::Relaxed) {
            state.cancelled = true;
            break;
        }

        let Some(file_name) = task.source.file_name() else {
            let error = Error::file(
                &task.source,
                io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
            );
            return CopyOutcome::Failed { error, summary };
        };

        let policy = task.on_collision.unwrap_or(options.collision);
        let destination = match resolve(dest_dir, file_name, policy) {
            Ok(Resolution::Write(path)) => path,
            Ok(Resolution::Skip(existing)) => {
                debug!("Skipping {}: {} exists", task.source.display(), existing.display());
                summary.skipped.push(task.source.clone());
                emit(CopyEvent::FileSkipped {
                    source: task.source.clone(),
                    existing,
                });
                continue;
            }
            Err(error) => {
                error!("{}", error);
                return CopyOutcome::Failed { error, summary };
            }
        };

        match copy_one(task, &destination, &mut buffer, &mut state, &mut throttle, cancel, emit) {
            Ok(FileResult::Done(written)) => {
                state.files_copied += 1;
                summary.bytes_copied += written;
                summary
                    .copied
                    .push((task.source.clone(), destination.clone()));
                debug!("copied: {} -> {}", task.source.display(), destination.display());
                emit(CopyEvent::FileCompleted {
                    source: task.source.clone(),
                    destination,
                    files_completed: state.files_copied,
                    bytes_copied: state.bytes_copied,
                });
            }
            Ok(FileResult::Cancelled) => {
                state.cancelled = true;
                break;
            }
            Err(error) => {
                error!("Copy failed: {}", error);
                return CopyOutcome::Failed { error, summary };
            }
        }
    }

    if state.cancelled {
        warn!(
            "Copy cancelled after {} of {} files",
            state.files_copied, state.total_files
        );
        CopyOutcome::Cancelled(summary)
    } else {
        info!(
            "Copy complete: {} files, {} skipped, {} bytes",
            state.files_copied,
            summary.skipped.len(),
            summary.bytes_copied
        );
        CopyOutcome::Completed(summary)
    }
}

fn preflight(
    dest_dir: &Path,
    required: u64,
    options: &CopyOptions,
    probe: &dyn SpaceProbe,
) -> Result<(), Error> {
    fs::create_dir_all(dest_dir).map_err(|e| Error::directory(dest_dir, e))?;
    if !dest_dir.is_dir() {
        return Err(Error::directory(
            dest_dir,
            io::Error::new(io::ErrorKind::Other, "not a directory"),
        ));
    }

    if options.check_space {
        let available = probe
            .available_space(dest_dir)
            .map_err(|e| Error::directory(dest_dir, e))?;
        if required > available {
            return Err(Error::InsufficientSpace {
                path: dest_dir.to_path_buf(),
                required,
                available,
            });
        }
    }
    Ok(())
}

fn part_path(destination: &Path, attempt: u32) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(destination.file_name().unwrap_or_default());
    if attempt > 0 {
        name.push(format!(".{}", attempt));
    }
    name.push(".part");
    destination.with_file_name(name)
}

/// Create a fresh hidden `.part` sibling of `destination`. A name already on
/// disk is never reused, so a user's own `.name.part` is left alone.
fn claim_part_file(destination: &Path) -> io::Result<(PathBuf, File)> {
    let mut attempt = 0;
    loop {
        let candidate = part_path(destination, attempt);
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e),
        }
    }
}

fn copy_one(
    task: &CopyTask,
    destination: &Path,
    buffer: &mut [u8],
    state: &mut CopyJobState,
    throttle: &mut Throttle,
    cancel: &AtomicBool,
    emit: &mut dyn FnMut(CopyEvent),
) -> Result<FileResult, Error> {
    let mut source = File::open(&task.source).map_err(|e| Error::file(&task.source, e))?;
    let (partial, mut target) = claim_part_file(destination).map_err(|e| Error::file(destination, e))?;

    let current_file = task
        .source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    // speed is measured per file, between two emitted events
    let mut speed_mark = (Instant::now(), 0u64);
    let mut file_copied: u64 = 0;

    loop {
        if cancel.load(Ordering::Relaxed) {
            drop(target);
            discard(&partial);
            return Ok(FileResult::Cancelled);
        }

        let n = match source.read(buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                drop(target);
                discard(&partial);
                return Err(Error::file(&task.source, e));
            }
        };

        // a full disk shows up here as an ordinary write error
        if let Err(e) = target.write_all(&buffer[..n]) {
            drop(target);
            discard(&partial);
            return Err(Error::file(destination, e));
        }

        file_copied += n as u64;
        state.bytes_copied += n as u64;

        let now = Instant::now();
        if throttle.ready(now) {
            let elapsed = now.duration_since(speed_mark.0).as_secs_f64();
            let delta = file_copied - speed_mark.1;
            let bytes_per_sec = if elapsed > 0.0 { delta as f64 / elapsed } else { 0.0 };
            emit(CopyEvent::Progress(CopyProgress {
                current_file: current_file.clone(),
                file_bytes_copied: file_copied,
                file_size: task.size,
                bytes_copied: state.bytes_copied,
                total_bytes: state.total_bytes,
                files_completed: state.files_copied,
                total_files: state.total_files,
                bytes_per_sec,
            }));
            speed_mark = (now, file_copied);
        }
    }

    if let Err(e) = target.flush() {
        drop(target);
        discard(&partial);
        return Err(Error::file(destination, e));
    }
    drop(target);

    if let Err(e) = fs::rename(&partial, destination) {
        discard(&partial);
        return Err(Error::file(destination, e));
    }

    Ok(FileResult::Done(file_copied))
}

fn discard(partial: &Path) {
    if let Err(e) = fs::remove_file(partial) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!("Could not remove partial file {}: {}", partial.display(), e);
        }
    }
}
