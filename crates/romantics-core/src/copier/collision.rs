use serde::Deserialize;
use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};

use super::CopyTask;
use crate::error::Error;

/// What to do when the destination already has a file of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    /// Copy as `name_1.ext`, `name_2.ext`, ... picking the first free name.
    #[default]
    AutoSuffix,
    /// Leave the existing file alone and skip this task.
    Skip,
    /// Replace the existing file once the new copy is complete.
    Overwrite,
    /// Fail the job with [`Error::Collision`].
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Resolution {
    Write(PathBuf),
    Skip(PathBuf),
}

fn is_taken(path: &Path) -> bool {
    // symlink_metadata so a dangling link still counts as taken
    fs::symlink_metadata(path).is_ok()
}

/// First free path in `dir` for `file_name`, appending `_N` before the
/// extension when needed.
pub fn unique_destination(dir: &Path, file_name: &OsStr) -> PathBuf {
    let candidate = dir.join(file_name);
    if !is_taken(&candidate) {
        return candidate;
    }

    let as_path = Path::new(file_name);
    let stem = as_path.file_stem().unwrap_or(file_name);
    let extension = as_path.extension();

    let mut counter: u64 = 1;
    loop {
        let mut name = OsString::from(stem);
        name.push(format!("_{}", counter));
        if let Some(ext) = extension {
            name.push(".");
            name.push(ext);
        }
        let candidate = dir.join(&name);
        if !is_taken(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

pub(crate) fn resolve(
    dir: &Path,
    file_name: &OsStr,
    policy: CollisionPolicy,
) -> Result<Resolution, Error> {
    let target = dir.join(file_name);
    if !is_taken(&target) {
        return Ok(Resolution::Write(target));
    }
    match policy {
        CollisionPolicy::AutoSuffix => Ok(Resolution::Write(unique_destination(dir, file_name))),
        CollisionPolicy::Skip => Ok(Resolution::Skip(target)),
        CollisionPolicy::Overwrite => Ok(Resolution::Write(target)),
        CollisionPolicy::Fail => Err(Error::Collision { path: target }),
    }
}

/// A task whose file name is already taken at the destination, either by an
/// existing file or by an earlier task in the same batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCollision {
    pub index: usize,
    pub existing: PathBuf,
}

/// Report the collisions a copy into `dest_dir` would run into, without
/// touching anything. Used for dry runs and for asking the user up front.
pub fn plan_collisions(tasks: &[CopyTask], dest_dir: &Path) -> Vec<PlannedCollision> {
    let mut claimed: HashSet<OsString> = HashSet::new();
    let mut collisions = Vec::new();

    for (index, task) in tasks.iter().enumerate() {
        let Some(name) = task.source.file_name() else {
            continue;
        };
        let existing = dest_dir.join(name);
        if is_taken(&existing) || claimed.contains(name) {
            collisions.push(PlannedCollision { index, existing });
        }
        claimed.insert(name.to_os_string());
    }

    collisions
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_unique_destination_increments() {
        let dir = tempfile::tempdir().unwrap();
        let name = OsStr::new("Zelda (USA).sfc");
        assert_eq!(unique_destination(dir.path(), name), dir.path().join(name));

        fs::write(dir.path().join(name), b"1").unwrap();
        assert_eq!(
            unique_destination(dir.path(), name),
            dir.path().join("Zelda (USA)_1.sfc")
        );

        fs::write(dir.path().join("Zelda (USA)_1.sfc"), b"2").unwrap();
        assert_eq!(
            unique_destination(dir.path(), name),
            dir.path().join("Zelda (USA)_2.sfc")
        );
    }

    #[test]
    fn test_unique_destination_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("README"), b"1").unwrap();
        fs::write(dir.path().join(".hidden"), b"1").unwrap();
        assert_eq!(
            unique_destination(dir.path(), OsStr::new("README")),
            dir.path().join("README_1")
        );
        assert_eq!(
            unique_destination(dir.path(), OsStr::new(".hidden")),
            dir.path().join(".hidden_1")
        );
    }

    #[test]
    fn test_resolve_policies() {
        let dir = tempfile::tempdir().unwrap();
        let name = OsStr::new("a.bin");
        fs::write(dir.path().join(name), b"1").unwrap();

        assert_eq!(
            resolve(dir.path(), name, CollisionPolicy::AutoSuffix).unwrap(),
            Resolution::Write(dir.path().join("a_1.bin"))
        );
        assert_eq!(
            resolve(dir.path(), name, CollisionPolicy::Skip).unwrap(),
            Resolution::Skip(dir.path().join(name))
        );
        assert_eq!(
            resolve(dir.path(), name, CollisionPolicy::Overwrite).unwrap(),
            Resolution::Write(dir.path().join(name))
        );
        assert!(matches!(
            resolve(dir.path(), name, CollisionPolicy::Fail),
            Err(Error::Collision { .. })
        ));
        assert_eq!(
            resolve(dir.path(), OsStr::new("free.bin"), CollisionPolicy::Fail).unwrap(),
            Resolution::Write(dir.path().join("free.bin"))
        );
    }

    #[test]
    fn test_plan_collisions() {
        let dest = tempfile::tempdir().unwrap();
        fs::write(dest.path().join("taken.sfc"), b"1").unwrap();

        let tasks = vec![
            CopyTask::new("/src/taken.sfc", 1),
            CopyTask::new("/src/free.sfc", 1),
            CopyTask::new("/other/free.sfc", 1),
        ];
        let collisions = plan_collisions(&tasks, dest.path());
        let indexes: Vec<usize> = collisions.iter().map(|c| c.index).collect();
        assert_eq!(indexes, vec![0, 2]);
    }
}
