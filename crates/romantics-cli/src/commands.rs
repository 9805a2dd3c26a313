use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use romantics_core::copier::CollisionPolicy;
use romantics_core::duplicates::actions::KeepPolicy;
use romantics_core::scanner::SortKey;

#[derive(Debug, Parser)]
#[command(name = "romantics")]
#[command(about = "Tidy up ROM and media collections", long_about = None)]
pub struct Cli {
    /// More log output; repeat for trace level. `TRACING_LEVEL` overrides it.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the files in a directory with their sizes
    List(ListArgs),
    /// Show the free space on the disk holding a directory
    Space {
        /// Directory to check (defaults to the configured destination)
        dir: Option<PathBuf>,
    },
    /// Find duplicate files and optionally remove or move the extras
    Dupes(DupesArgs),
    /// Copy files into a destination directory
    Copy(CopyArgs),
    /// Normalize file names in a directory
    Clean(CleanArgs),
    /// Rename files with a regular-expression search and replace
    Rename(RenameArgs),
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Directory to list (defaults to the configured source)
    pub dir: Option<PathBuf>,

    /// Extension filter, e.g. `.mp3`, or `all`
    #[arg(short, long, default_value = "all")]
    pub ext: String,

    #[arg(long, value_enum, default_value_t = SortArg::Name)]
    pub sort: SortArg,
}

#[derive(Debug, Args)]
pub struct DupesArgs {
    /// Directories to scan (defaults to the configured source and destination)
    pub dirs: Vec<PathBuf>,

    /// Descend into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Delete every duplicate except the kept one
    #[arg(long, conflicts_with = "move_to")]
    pub remove: bool,

    /// Move every duplicate except the kept one into this directory
    #[arg(long)]
    pub move_to: Option<PathBuf>,

    /// Which file of each group to keep
    #[arg(long, value_enum, default_value_t = KeepArg::Newest)]
    pub keep: KeepArg,

    /// Trust matching fingerprints without a byte-for-byte comparison
    #[arg(long)]
    pub no_verify: bool,

    /// Don't ask for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Debug, Args)]
pub struct CopyArgs {
    /// Files or directories to copy (directories contribute their files)
    pub sources: Vec<PathBuf>,

    /// Destination directory (defaults to the configured destination)
    #[arg(short, long)]
    pub to: Option<PathBuf>,

    /// Only copy files with this extension
    #[arg(short, long, default_value = "all")]
    pub ext: String,

    /// What to do when the destination already has the name
    #[arg(long, value_enum)]
    pub on_collision: Option<CollisionArg>,

    /// Don't compare the total size against the destination's free space
    #[arg(long)]
    pub no_space_check: bool,

    /// Show what would be copied and stop
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct CleanArgs {
    /// Directory whose files are renamed (defaults to the configured source)
    pub dir: Option<PathBuf>,

    /// Remove region, version and dump tags before cleaning
    #[arg(long)]
    pub strip_annotations: bool,

    /// Perform the renames instead of previewing them
    #[arg(long)]
    pub apply: bool,

    /// Don't ask for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Debug, Args)]
pub struct RenameArgs {
    /// Regular expression matched against each file name
    pub search: String,

    /// Replacement; `$1` refers to the first capture group
    pub replace: String,

    /// Directory whose files are renamed (defaults to the configured source)
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Perform the renames instead of previewing them
    #[arg(long)]
    pub apply: bool,

    /// Don't ask for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortArg {
    Name,
    Size,
}

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Name => SortKey::Name,
            SortArg::Size => SortKey::SizeDesc,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum KeepArg {
    Newest,
    Oldest,
    First,
}

impl From<KeepArg> for KeepPolicy {
    fn from(arg: KeepArg) -> Self {
        match arg {
            KeepArg::Newest => KeepPolicy::Newest,
            KeepArg::Oldest => KeepPolicy::Oldest,
            KeepArg::First => KeepPolicy::FirstByPath,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CollisionArg {
    AutoSuffix,
    Skip,
    Overwrite,
    Fail,
    /// Decide for each colliding file before the copy starts
    Ask,
}

impl CollisionArg {
    /// The job-wide policy; `Ask` has none and is resolved per file.
    pub fn policy(self) -> Option<CollisionPolicy> {
        match self {
            CollisionArg::AutoSuffix => Some(CollisionPolicy::AutoSuffix),
            CollisionArg::Skip => Some(CollisionPolicy::Skip),
            CollisionArg::Overwrite => Some(CollisionPolicy::Overwrite),
            CollisionArg::Fail => Some(CollisionPolicy::Fail),
            CollisionArg::Ask => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_copy() {
        let cli = Cli::parse_from([
            "romantics",
            "copy",
            "a.mp3",
            "roms",
            "--to",
            "/mnt/player",
            "--on-collision",
            "ask",
        ]);
        match cli.command {
            Some(Commands::Copy(args)) => {
                assert_eq!(args.sources.len(), 2);
                assert_eq!(args.to, Some(PathBuf::from("/mnt/player")));
                assert_eq!(args.on_collision, Some(CollisionArg::Ask));
                assert!(!args.dry_run);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_verbose_is_global() {
        let cli = Cli::parse_from(["romantics", "list", "-vv", "roms"]);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Some(Commands::List(_))));
        assert_eq!(Cli::parse_from(["romantics"]).verbose, 0);
    }

    #[test]
    fn test_remove_conflicts_with_move() {
        let result = Cli::try_parse_from(["romantics", "dupes", "--remove", "--move-to", "x"]);
        assert!(result.is_err());
    }
}
