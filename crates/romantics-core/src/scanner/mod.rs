pub mod walk;

use glob::Pattern;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, error, warn};

use crate::error::Error;

/// A regular file found in a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<SystemTime>,
}

impl FileEntry {
    /// Stat `path` and build an entry for it. Fails if it is not a regular file.
    pub fn from_path(path: &Path) -> Result<FileEntry, Error> {
        let metadata = fs::metadata(path).map_err(|e| Error::file(path, e))?;
        if !metadata.is_file() {
            return Err(Error::file(
                path,
                std::io::Error::new(std::io::ErrorKind::Other, "not a regular file"),
            ));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(FileEntry {
            name,
            path: path.to_path_buf(),
            size: metadata.len(),
            modified: metadata.modified().ok(),
        })
    }
}

/// Which files a listing keeps, by name suffix.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExtensionFilter {
    #[default]
    All,
    /// Lower-cased suffix including the leading dot.
    Suffix(String),
}

impl ExtensionFilter {
    /// `"all"` (any case) keeps everything; anything else is a suffix, and a
    /// bare `mp3` is treated as `.mp3`.
    pub fn parse(value: &str) -> ExtensionFilter {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("all") {
            return ExtensionFilter::All;
        }
        let lowered = value.to_lowercase();
        if lowered.starts_with('.') {
            ExtensionFilter::Suffix(lowered)
        } else {
            ExtensionFilter::Suffix(format!(".{}", lowered))
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            ExtensionFilter::All => true,
            ExtensionFilter::Suffix(suffix) => name.to_lowercase().ends_with(suffix.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Case-insensitive name, ties broken by the exact name.
    #[default]
    Name,
    /// Largest first, ties broken by name.
    SizeDesc,
}

#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub filter: ExtensionFilter,
    pub sort: SortKey,
    pub ignore: Vec<Pattern>,
}

impl ListOptions {
    pub fn new(filter: ExtensionFilter) -> Self {
        Self {
            filter,
            ..Default::default()
        }
    }

    pub fn sort_by(mut self, sort: SortKey) -> Self {
        self.sort = sort;
        self
    }

    /// Add file-name globs to skip. Invalid globs are logged and dropped.
    pub fn ignoring<S: AsRef<str>>(mut self, globs: &[S]) -> Self {
        self.ignore.extend(globs.iter().filter_map(|glob| {
            match Pattern::new(glob.as_ref()) {
                Ok(p) => Some(p),
                Err(e) => {
                    error!("Invalid glob pattern '{}': {}", glob.as_ref(), e);
                    None
                }
            }
        }));
        self
    }

    pub(crate) fn accepts(&self, name: &str) -> bool {
        self.filter.matches(name) && !self.ignore.iter().any(|p| p.matches(name))
    }
}

/// List the regular files directly inside `dir`.
///
/// Directories, special files and symlinks that don't resolve to a regular
/// file are left out. Entries whose metadata can't be read are skipped.
pub fn list_files(dir: &Path, options: &ListOptions) -> Result<Vec<FileEntry>, Error> {
    let entries = fs::read_dir(dir).map_err(|e| Error::directory(dir, e))?;

    let mut files = Vec::new();
    for entry_result in entries {
        let entry = entry_result.map_err(|e| Error::directory(dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !options.accepts(&name) {
            continue;
        }

        let path = entry.path();
        // fs::metadata follows symlinks, so a link to a regular file counts
        let metadata = match fs::metadata(&path) {
            Ok(m) => m,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }

        files.push(FileEntry {
            name,
            path,
            size: metadata.len(),
            modified: metadata.modified().ok(),
        });
    }

    sort_entries(&mut files, options.sort);
    debug!("Listed {} files in {}", files.len(), dir.display());
    Ok(files)
}

/// Like [`list_files`], but a directory error yields an empty listing that the
/// caller can show next to the error.
pub fn list_files_or_empty(dir: &Path, options: &ListOptions) -> (Vec<FileEntry>, Option<Error>) {
    match list_files(dir, options) {
        Ok(files) => (files, None),
        Err(e) => {
            warn!("{}", e);
            (Vec::new(), Some(e))
        }
    }
}

pub fn sort_entries(files: &mut [FileEntry], sort: SortKey) {
    match sort {
        SortKey::Name => files.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name))
        }),
        SortKey::SizeDesc => files.sort_by(|a, b| {
            b.size
                .cmp(&a.size)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
                .then_with(|| a.name.cmp(&b.name))
        }),
    }
}

pub fn total_size(files: &[FileEntry]) -> u64 {
    files.iter().map(|f| f.size).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(files: &[FileEntry]) -> Vec<&str> {
        files.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn test_parse_filter() {
        assert_eq!(ExtensionFilter::parse("All"), ExtensionFilter::All);
        assert_eq!(ExtensionFilter::parse(""), ExtensionFilter::All);
        assert_eq!(
            ExtensionFilter::parse(".FLAC"),
            ExtensionFilter::Suffix(".flac".to_string())
        );
        assert_eq!(
            ExtensionFilter::parse("sfc"),
            ExtensionFilter::Suffix(".sfc".to_string())
        );
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let filter = ExtensionFilter::parse(".mp3");
        assert!(filter.matches("Track 01.MP3"));
        assert!(filter.matches("track.mp3"));
        assert!(!filter.matches("track.mp3.bak"));
    }

    #[test]
    fn test_list_files_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.mp3"), vec![0u8; 10]).unwrap();
        fs::write(dir.path().join("A.MP3"), vec![0u8; 30]).unwrap();
        fs::write(dir.path().join("c.flac"), vec![0u8; 20]).unwrap();
        fs::create_dir(dir.path().join("sub.mp3")).unwrap();

        let options = ListOptions::new(ExtensionFilter::parse(".mp3"));
        let files = list_files(dir.path(), &options).unwrap();
        assert_eq!(names(&files), vec!["A.MP3", "b.mp3"]);

        let options = ListOptions::new(ExtensionFilter::All).sort_by(SortKey::SizeDesc);
        let files = list_files(dir.path(), &options).unwrap();
        assert_eq!(names(&files), vec!["A.MP3", "c.flac", "b.mp3"]);
        assert_eq!(total_size(&files), 60);
    }

    #[test]
    fn test_list_files_ignores_globs() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("game.sfc"), b"x").unwrap();
        fs::write(dir.path().join("game.srm"), b"x").unwrap();
        fs::write(dir.path().join("Thumbs.db"), b"x").unwrap();

        let options = ListOptions::new(ExtensionFilter::All).ignoring(&["*.srm", "Thumbs.db", "[bad"]);
        let files = list_files(dir.path(), &options).unwrap();
        assert_eq!(names(&files), vec!["game.sfc"]);
    }

    #[test]
    fn test_missing_directory_is_directory_access_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = list_files(&missing, &ListOptions::default()).unwrap_err();
        assert!(matches!(err, Error::DirectoryAccess { .. }));

        let (files, err) = list_files_or_empty(&missing, &ListOptions::default());
        assert!(files.is_empty());
        assert!(err.unwrap().to_string().contains("nope"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_to_directory_is_excluded() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("real")).unwrap();
        fs::write(dir.path().join("file.bin"), b"data").unwrap();
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("link")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("file.bin"), dir.path().join("alias.bin"))
            .unwrap();

        let files = list_files(dir.path(), &ListOptions::default()).unwrap();
        assert_eq!(names(&files), vec!["alias.bin", "file.bin"]);
    }
}
