pub mod actions;

use dashmap::DashMap;
use rayon::prelude::*;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, info, warn};

use crate::error::FileError;
use crate::hasher::{self, Fingerprint, PARTIAL_HASH_LENGTH};
use crate::progress::ProgressReporter;

/// What a cancelled scan hands back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CancelledScan {
    /// Groups built from the files fingerprinted before the cancel.
    #[default]
    KeepPartial,
    /// Nothing; the whole scan is void.
    Discard,
}

#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    /// Confirm fingerprint groups with a byte-for-byte comparison.
    pub verify: bool,
    pub cancelled_scan: CancelledScan,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            verify: true,
            cancelled_scan: CancelledScan::KeepPartial,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateMember {
    pub path: PathBuf,
    pub modified: Option<SystemTime>,
}

/// Files sharing one fingerprint. Always holds at least two members, ordered
/// newest first (unknown modification times last, then by path).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub fingerprint: Fingerprint,
    pub size: u64,
    pub members: Vec<DuplicateMember>,
    /// Members were compared byte-for-byte, not just by fingerprint.
    pub verified: bool,
}

impl DuplicateGroup {
    fn new(fingerprint: Fingerprint, candidates: Vec<Candidate>, verified: bool) -> Self {
        let size = candidates[0].size;
        let mut members: Vec<DuplicateMember> = candidates
            .into_iter()
            .map(|c| DuplicateMember {
                path: c.path,
                modified: c.modified,
            })
            .collect();
        members.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.path.cmp(&b.path)));
        Self {
            fingerprint,
            size,
            members,
            verified,
        }
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.members.iter().map(|m| m.path.as_path())
    }

    /// Bytes reclaimable by keeping a single copy.
    pub fn wasted_bytes(&self) -> u64 {
        self.size * (self.members.len() as u64 - 1)
    }
}

#[derive(Debug, Default)]
pub struct ScanReport {
    pub groups: Vec<DuplicateGroup>,
    /// Files that could not be read. They are left out of every group.
    pub errors: Vec<FileError>,
    pub files_scanned: usize,
    pub cancelled: bool,
    pub duration: Duration,
}

impl ScanReport {
    pub fn duplicate_files(&self) -> usize {
        self.groups.iter().map(|g| g.members.len()).sum()
    }

    pub fn wasted_bytes(&self) -> u64 {
        self.groups.iter().map(|g| g.wasted_bytes()).sum()
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    path: PathBuf,
    size: u64,
    modified: Option<SystemTime>,
}

struct HashProgress<'a> {
    reporter: &'a dyn ProgressReporter,
    done: AtomicUsize,
    total: AtomicUsize,
}

impl HashProgress<'_> {
    fn tick(&self, path: &Path) {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        self.reporter
            .on_hash_progress(done, self.total.load(Ordering::Relaxed), &path.to_string_lossy());
    }
}

/// Content-based duplicate detection over an explicit list of files.
///
/// Pipeline: group by size (a unique size can't have a duplicate), BLAKE3 of
/// the first 4 KiB, full streamed BLAKE3 on partial collisions, then an
/// optional byte-for-byte confirmation. Nothing is deleted or moved here; see
/// [`actions`] for that.
pub struct DuplicateFinder {
    options: ScanOptions,
    cancel: Arc<AtomicBool>,
}

impl DuplicateFinder {
    pub fn new(options: ScanOptions) -> Self {
        Self {
            options,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag checked before each file is read. Setting it makes the running
    /// scan return early according to [`ScanOptions::cancelled_scan`].
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    pub fn find(&self, paths: &[PathBuf], reporter: &dyn ProgressReporter) -> ScanReport {
        let start = Instant::now();
        let errors = Mutex::new(Vec::new());

        let (by_size, files_scanned) = self.group_by_size(paths, &errors);
        let candidates: Vec<Candidate> = by_size
            .into_values()
            .filter(|bucket| bucket.len() > 1)
            .flatten()
            .collect();
        debug!(
            "{} of {} files share a size with another file",
            candidates.len(),
            files_scanned
        );

        let progress = HashProgress {
            reporter,
            done: AtomicUsize::new(0),
            total: AtomicUsize::new(candidates.len()),
        };
        reporter.on_hash_start(candidates.len());

        // Phase 1: partial fingerprint
        let partial_groups =
            self.fingerprint_stage(candidates, hasher::partial_fingerprint, &progress, &errors);

        // Files no longer than the partial window were read whole already.
        let (complete, needs_full): (Vec<_>, Vec<_>) = partial_groups
            .into_iter()
            .partition(|(_, group)| group[0].size <= PARTIAL_HASH_LENGTH as u64);

        // Phase 2: full fingerprint on partial collisions
        let mut groups = complete;
        if !self.is_cancelled() {
            let full_candidates: Vec<Candidate> =
                needs_full.into_iter().flat_map(|(_, group)| group).collect();
            progress
                .total
                .fetch_add(full_candidates.len(), Ordering::Relaxed);
            groups.extend(self.fingerprint_stage(
                full_candidates,
                hasher::fingerprint_file,
                &progress,
                &errors,
            ));
        }

        // Phase 3: byte-for-byte confirmation
        let groups = if self.options.verify {
            self.verify_groups(groups, &errors)
        } else {
            groups.into_iter().map(|(fp, group)| (fp, group, false)).collect()
        };

        let mut groups: Vec<DuplicateGroup> = groups
            .into_iter()
            .map(|(fingerprint, group, verified)| DuplicateGroup::new(fingerprint, group, verified))
            .collect();
        groups.sort_by(|a, b| {
            b.size
                .cmp(&a.size)
                .then_with(|| a.fingerprint.cmp(&b.fingerprint))
                .then_with(|| a.members[0].path.cmp(&b.members[0].path))
        });

        let cancelled = self.is_cancelled();
        if cancelled {
            warn!(
                "Duplicate scan cancelled after {} files",
                progress.done.load(Ordering::Relaxed)
            );
            if self.options.cancelled_scan == CancelledScan::Discard {
                groups.clear();
            }
        }

        let mut errors = errors.into_inner().unwrap_or_else(|e| e.into_inner());
        errors.sort_by(|a, b| a.path.cmp(&b.path));

        let duration = start.elapsed();
        reporter.on_hash_complete(groups.len(), duration.as_secs_f64());
        info!(
            "Duplicate scan: {} files, {} groups, {} unreadable in {:.2}s",
            files_scanned,
            groups.len(),
            errors.len(),
            duration.as_secs_f64()
        );

        ScanReport {
            groups,
            errors,
            files_scanned,
            cancelled,
            duration,
        }
    }

    fn group_by_size(
        &self,
        paths: &[PathBuf],
        errors: &Mutex<Vec<FileError>>,
    ) -> (BTreeMap<u64, Vec<Candidate>>, usize) {
        let mut by_size: BTreeMap<u64, Vec<Candidate>> = BTreeMap::new();
        let mut seen: HashSet<FileId> = HashSet::new();
        let mut scanned = 0;

        for path in paths {
            if self.is_cancelled() {
                break;
            }
            // symlink_metadata: a link is another name for its target, never a copy
            match fs::symlink_metadata(path) {
                Ok(metadata) if metadata.file_type().is_symlink() => {
                    debug!("Skipping {}: symbolic link", path.display());
                }
                Ok(metadata) if metadata.is_file() => {
                    if !seen.insert(file_id(path, &metadata)) {
                        debug!("Skipping {}: same file already listed", path.display());
                        continue;
                    }
                    scanned += 1;
                    by_size.entry(metadata.len()).or_default().push(Candidate {
                        path: path.clone(),
                        size: metadata.len(),
                        modified: metadata.modified().ok(),
                    });
                }
                Ok(_) => debug!("Skipping {}: not a regular file", path.display()),
                Err(e) => record_error(errors, path, e),
            }
        }

        (by_size, scanned)
    }

    /// Fingerprint every candidate and keep the (size, fingerprint) buckets
    /// that still hold more than one file.
    fn fingerprint_stage<F>(
        &self,
        candidates: Vec<Candidate>,
        fingerprint: F,
        progress: &HashProgress<'_>,
        errors: &Mutex<Vec<FileError>>,
    ) -> Vec<(Fingerprint, Vec<Candidate>)>
    where
        F: Fn(&Path) -> io::Result<Fingerprint> + Sync,
    {
        let buckets: DashMap<(u64, Fingerprint), Vec<Candidate>> = DashMap::new();

        candidates.into_par_iter().for_each(|candidate| {
            if self.is_cancelled() {
                return;
            }
            let result = fingerprint(&candidate.path);
            progress.tick(&candidate.path);
            match result {
                Ok(fp) => buckets.entry((candidate.size, fp)).or_default().push(candidate),
                Err(e) => record_error(errors, &candidate.path, e),
            }
        });

        let mut kept: Vec<(Fingerprint, Vec<Candidate>)> = buckets
            .into_iter()
            .filter(|(_, group)| group.len() > 1)
            .map(|((_, fp), mut group)| {
                group.sort_by(|a, b| a.path.cmp(&b.path));
                (fp, group)
            })
            .collect();
        kept.sort_by(|a, b| a.0.cmp(&b.0));
        kept
    }

    /// Confirm each group byte-for-byte. Groups reached after a cancel pass
    /// through unconfirmed.
    fn verify_groups(
        &self,
        groups: Vec<(Fingerprint, Vec<Candidate>)>,
        errors: &Mutex<Vec<FileError>>,
    ) -> Vec<(Fingerprint, Vec<Candidate>, bool)> {
        groups
            .into_par_iter()
            .flat_map_iter(|(fp, group)| {
                if self.is_cancelled() {
                    return vec![(fp, group, false)];
                }
                let classes = confirm_identical(group, errors);
                if classes.len() > 1 {
                    warn!("Fingerprint {} covers files with different content", fp);
                }
                classes
                    .into_iter()
                    .map(|class| (fp, class, true))
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

/// Identity of the file behind a path, so hard links and repeated paths are
/// scanned once.
#[cfg(unix)]
type FileId = (u64, u64);
#[cfg(not(unix))]
type FileId = PathBuf;

#[cfg(unix)]
fn file_id(_path: &Path, metadata: &fs::Metadata) -> FileId {
    use std::os::unix::fs::MetadataExt;
    (metadata.dev(), metadata.ino())
}

#[cfg(not(unix))]
fn file_id(path: &Path, _metadata: &fs::Metadata) -> FileId {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Split a fingerprint group into classes of byte-identical files, keeping
/// only classes with two or more members.
fn confirm_identical(group: Vec<Candidate>, errors: &Mutex<Vec<FileError>>) -> Vec<Vec<Candidate>> {
    let mut classes: Vec<Vec<Candidate>> = Vec::new();

    'next: for candidate in group {
        for class in classes.iter_mut() {
            match hasher::files_identical(&class[0].path, &candidate.path) {
                Ok(true) => {
                    class.push(candidate);
                    continue 'next;
                }
                Ok(false) => {}
                Err(e) => {
                    record_error(errors, &candidate.path, e);
                    continue 'next;
                }
            }
        }
        classes.push(vec![candidate]);
    }

    classes.retain(|class| class.len() > 1);
    classes
}

fn record_error(errors: &Mutex<Vec<FileError>>, path: &Path, e: io::Error) {
    warn!("Could not scan {}: {}", path.display(), e);
    let mut guard = errors.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.push(FileError::new(path, e));
}

/// Scan `paths` with default options and no progress output.
pub fn find_duplicates(paths: &[PathBuf]) -> ScanReport {
    DuplicateFinder::new(ScanOptions::default()).find(paths, &crate::progress::SilentReporter)
}
