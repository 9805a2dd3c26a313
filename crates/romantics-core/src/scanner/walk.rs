use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::{list_files, FileEntry, ListOptions};
use crate::config::non_overlapping_directories;
use crate::error::Error;

/// Gather candidate files from several roots, e.g. a source and a destination
/// directory for a duplicate scan.
///
/// Roots nested inside another root are dropped so no file is seen twice.
/// With `recursive`, subdirectories are walked (symlinks are not followed and
/// unreadable subdirectories are logged and skipped); a root that cannot be
/// read is still an error.
pub fn collect_files(
    roots: &[PathBuf],
    options: &ListOptions,
    recursive: bool,
) -> Result<Vec<FileEntry>, Error> {
    let roots = non_overlapping_directories(roots.to_vec());
    let mut files = Vec::new();

    for root in &roots {
        if recursive {
            walk_root(root, options, &mut files)?;
        } else {
            files.extend(list_files(root, options)?);
        }
    }

    debug!("Collected {} files from {} roots", files.len(), roots.len());
    Ok(files)
}

fn walk_root(root: &Path, options: &ListOptions, files: &mut Vec<FileEntry>) -> Result<(), Error> {
    let mut found = Vec::new();

    for entry_result in WalkDir::new(root).follow_links(false) {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                let source = err
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "walk error"));
                return Err(Error::directory(root, source));
            }
            Err(err) => {
                warn!("Skipping entry under {}: {}", root.display(), err);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !options.accepts(&name) {
            continue;
        }

        match entry.metadata() {
            Ok(metadata) => found.push(FileEntry {
                name,
                path: entry.into_path(),
                size: metadata.len(),
                modified: metadata.modified().ok(),
            }),
            Err(err) => warn!("Skipping {}: {}", entry.path().display(), err),
        }
    }

    found.sort_by(|a, b| a.path.cmp(&b.path));
    files.extend(found);
    Ok(())
}
