use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use super::DuplicateGroup;
use crate::copier::collision::unique_destination;
use crate::error::{Error, FileError};

/// Which member of a duplicate group survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeepPolicy {
    #[default]
    Newest,
    Oldest,
    FirstByPath,
}

/// The members of `group` to act on: everything except the one kept by `keep`.
pub fn select_redundant(group: &DuplicateGroup, keep: KeepPolicy) -> Vec<PathBuf> {
    let keep_index = match keep {
        // members are already ordered newest first
        KeepPolicy::Newest => 0,
        KeepPolicy::Oldest => group
            .members
            .iter()
            .enumerate()
            .filter_map(|(i, m)| m.modified.map(|t| (i, t)))
            .min_by_key(|(_, t)| *t)
            .map(|(i, _)| i)
            .unwrap_or(group.members.len() - 1),
        KeepPolicy::FirstByPath => group
            .members
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.path.cmp(&b.1.path))
            .map(|(i, _)| i)
            .unwrap_or(0),
    };

    group
        .members
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != keep_index)
        .map(|(_, m)| m.path.clone())
        .collect()
}

#[derive(Debug, Default)]
pub struct ActionReport {
    pub succeeded: Vec<PathBuf>,
    /// Gone since the scan; nothing was done for them.
    pub missing: Vec<PathBuf>,
    pub failed: Vec<FileError>,
}

/// Delete each file. The scan result may be stale, so every path is checked
/// again first; failures are collected and the rest still processed.
pub fn remove_files(paths: &[PathBuf]) -> ActionReport {
    let mut report = ActionReport::default();

    for path in paths {
        if !path.exists() {
            warn!("File '{}' no longer exists, skipping", path.display());
            report.missing.push(path.clone());
            continue;
        }
        match fs::remove_file(path) {
            Ok(()) => {
                debug!("removed: {}", path.display());
                report.succeeded.push(path.clone());
            }
            Err(e) => {
                error!("Failed to remove '{}': {}", path.display(), e);
                report.failed.push(FileError::new(path, e));
            }
        }
    }

    info!(
        "Removed {} files, {} missing, {} failed",
        report.succeeded.len(),
        report.missing.len(),
        report.failed.len()
    );
    report
}

/// Move each file into `dest_dir`, renaming to `name_1.ext`, `name_2.ext`, ...
/// when the name is taken.
pub fn move_files(paths: &[PathBuf], dest_dir: &Path) -> Result<ActionReport, Error> {
    fs::create_dir_all(dest_dir).map_err(|e| Error::directory(dest_dir, e))?;
    let mut report = ActionReport::default();

    for path in paths {
        if !path.exists() {
            warn!("File '{}' no longer exists, skipping", path.display());
            report.missing.push(path.clone());
            continue;
        }
        let Some(file_name) = path.file_name() else {
            report
                .failed
                .push(FileError::new(path, "path has no file name"));
            continue;
        };

        let target = unique_destination(dest_dir, file_name);
        match move_file(path, &target) {
            Ok(()) => {
                debug!("moved: {} -> {}", path.display(), target.display());
                report.succeeded.push(path.clone());
            }
            Err(e) => {
                error!("Failed to move '{}': {}", path.display(), e);
                report.failed.push(FileError::new(path, e));
            }
        }
    }

    info!(
        "Moved {} files to {}, {} missing, {} failed",
        report.succeeded.len(),
        dest_dir.display(),
        report.missing.len(),
        report.failed.len()
    );
    Ok(report)
}

/// Rename, falling back to copy-then-delete across filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            debug!(
                "rename {} failed ({}), copying instead",
                from.display(),
                rename_err
            );
            if let Err(e) = fs::copy(from, to) {
                let _ = fs::remove_file(to);
                return Err(e);
            }
            fs::remove_file(from)
        }
    }
}
