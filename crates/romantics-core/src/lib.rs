pub mod config;
pub mod copier;
pub mod duplicates;
pub mod error;
pub mod hasher;
pub mod progress;
pub mod rename;
pub mod scanner;
pub mod space;
pub mod units;

pub use config::AppConfig;
pub use copier::{copy_files, start_copy, CopyEvent, CopyJob, CopyOptions, CopyOutcome, CopyTask};
pub use duplicates::{find_duplicates, DuplicateFinder, DuplicateGroup, ScanReport};
pub use error::{Error, FileError};
pub use progress::{ProgressReporter, SilentReporter};
pub use rename::{clean_filename, strip_annotations};
pub use scanner::{list_files, FileEntry};
pub use space::{SpaceProbe, SystemSpaceProbe};
