pub mod annotations;
pub mod clean;

pub use annotations::strip_annotations;
pub use clean::{clean_filename, split_extension};

use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{Error, FileError};
use crate::scanner::FileEntry;

/// A pending rename inside one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamePlan {
    pub from: PathBuf,
    pub to: PathBuf,
    pub old_name: String,
    pub new_name: String,
}

/// Plan renames for every entry whose name `transform` changes. Results that
/// can't name a file in the same directory (empty, `..`, containing a path
/// separator) are logged and dropped.
pub fn plan_renames<F>(entries: &[FileEntry], transform: F) -> Vec<RenamePlan>
where
    F: Fn(&str) -> String,
{
    entries
        .iter()
        .filter_map(|entry| {
            let new_name = transform(&entry.name);
            if new_name == entry.name {
                return None;
            }
            if let Err(e) = check_name(&new_name) {
                warn!("Not renaming {}: {}", entry.name, e);
                return None;
            }
            let to = entry.path.with_file_name(&new_name);
            Some(RenamePlan {
                from: entry.path.clone(),
                to,
                old_name: entry.name.clone(),
                new_name,
            })
        })
        .collect()
}

/// Plans from [`clean_filename`]. Nothing is renamed until the plans are
/// passed to [`apply_renames`], so this doubles as a preview.
pub fn plan_clean(entries: &[FileEntry]) -> Vec<RenamePlan> {
    plan_renames(entries, clean_filename)
}

/// Regex search-and-replace over file names. The replacement uses `$1` /
/// `${name}` for capture groups. A bad expression fails before any plan is made.
pub fn plan_pattern_rename(
    entries: &[FileEntry],
    search: &str,
    replace: &str,
) -> Result<Vec<RenamePlan>, Error> {
    let re = Regex::new(search).map_err(|source| Error::InvalidPattern {
        pattern: search.to_string(),
        source,
    })?;
    Ok(plan_renames(entries, |name| {
        re.replace_all(name, replace).into_owned()
    }))
}

#[derive(Debug, Default)]
pub struct RenameReport {
    pub renamed: Vec<RenamePlan>,
    pub failed: Vec<FileError>,
}

/// Carry out `plans` in order. An existing target is never overwritten; that
/// plan fails with a collision and the rest go on.
pub fn apply_renames(plans: &[RenamePlan]) -> RenameReport {
    let mut report = RenameReport::default();

    for plan in plans {
        match apply_one(plan) {
            Ok(()) => {
                debug!("renamed: {} -> {}", plan.old_name, plan.new_name);
                report.renamed.push(plan.clone());
            }
            Err(e) => {
                warn!("Error renaming {}: {}", plan.old_name, e);
                report.failed.push(FileError::new(&plan.from, e));
            }
        }
    }

    info!(
        "Renamed {} files, {} failed",
        report.renamed.len(),
        report.failed.len()
    );
    report
}

/// Plans are plain data, so their target is checked again before use.
fn apply_one(plan: &RenamePlan) -> Result<(), Error> {
    check_name(&plan.new_name)?;
    if plan.to != plan.from.with_file_name(&plan.new_name) {
        return Err(Error::InvalidName {
            name: plan.to.display().to_string(),
        });
    }
    rename_to(&plan.from, &plan.to)
}

/// A bare file name: not empty, not `.` or `..`, no path separator.
fn check_name(name: &str) -> Result<(), Error> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains(std::path::MAIN_SEPARATOR);
    if invalid {
        return Err(Error::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Rename one file within its directory.
pub fn rename_file(path: &Path, new_name: &str) -> Result<PathBuf, Error> {
    check_name(new_name)?;

    let target = path.with_file_name(new_name);
    rename_to(path, &target)?;
    info!("Renamed {} to {}", path.display(), new_name);
    Ok(target)
}

fn rename_to(from: &Path, to: &Path) -> Result<(), Error> {
    if fs::symlink_metadata(to).is_ok() && !same_file(from, to) {
        return Err(Error::Collision {
            path: to.to_path_buf(),
        });
    }
    fs::rename(from, to).map_err(|e| Error::file(from, e))
}

/// True when both paths resolve to one file, as with a case-only rename on a
/// case-insensitive filesystem.
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
