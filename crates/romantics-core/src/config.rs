use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::copier::CollisionPolicy;
use crate::duplicates::CancelledScan;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub source_dir: Option<PathBuf>,
    pub dest_dir: Option<PathBuf>,
    pub extensions: Vec<String>,
    pub ignore_patterns: Vec<String>,
    pub collision_policy: CollisionPolicy,
    pub cancelled_scan: CancelledScan,
    pub verify_duplicates: bool,
    pub copy_chunk_size: usize,
    pub progress_interval_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source_dir: None,
            dest_dir: None,
            extensions: ["all", ".mp3", ".flac", ".wav", ".m4a", ".ogg"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            ignore_patterns: Vec::new(),
            collision_policy: CollisionPolicy::AutoSuffix,
            cancelled_scan: CancelledScan::KeepPartial,
            verify_duplicates: true,
            copy_chunk_size: crate::copier::DEFAULT_CHUNK_SIZE,
            progress_interval_ms: 100,
        }
    }
}

impl AppConfig {
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    /// Load from a specific file, still honoring `ROMANTICS_*` overrides.
    pub fn from_file(path: &Path) -> Result<AppConfig, ConfigError> {
        build(Config::builder().add_source(ConfigFile::from(path).required(true)))
    }
}

/// Load `Config.toml` from the working directory (optional) overlaid with
/// `ROMANTICS_*` environment variables.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    build(Config::builder().add_source(ConfigFile::with_name("Config").required(false)))
}

fn build(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> Result<AppConfig, ConfigError> {
    let config = builder
        .add_source(
            Environment::with_prefix("ROMANTICS")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("extensions")
                .with_list_parse_key("ignore_patterns"),
        )
        .build()?;
    let app: AppConfig = config.try_deserialize()?;
    if app.copy_chunk_size == 0 {
        return Err(ConfigError::Message(
            "copy_chunk_size must be greater than zero".to_string(),
        ));
    }
    Ok(app)
}

/// Remove directories that are subdirectories of other directories in the list.
pub fn non_overlapping_directories(dirs: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for dir in dirs {
        if result.iter().any(|kept| dir.starts_with(kept)) {
            continue;
        }
        result.retain(|kept| !kept.starts_with(&dir));
        result.push(dir);
    }

    result
}
