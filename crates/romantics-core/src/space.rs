use std::fs;
use std::io;
use std::path::Path;
use sysinfo::Disks;

/// Free-space query for a destination directory.
pub trait SpaceProbe: Send + Sync {
    fn available_space(&self, path: &Path) -> io::Result<u64>;
}

/// Looks up the mounted disk holding `path` (longest matching mount point).
pub struct SystemSpaceProbe;

impl SpaceProbe for SystemSpaceProbe {
    fn available_space(&self, path: &Path) -> io::Result<u64> {
        let canonical = fs::canonicalize(path)?;
        let disks = Disks::new_with_refreshed_list();

        disks
            .iter()
            .filter(|disk| canonical.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().components().count())
            .map(|disk| disk.available_space())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no mounted disk contains {}", canonical.display()),
                )
            })
    }
}

/// Reports the same number of free bytes for every path.
#[derive(Debug, Clone, Copy)]
pub struct FixedSpace(pub u64);

impl SpaceProbe for FixedSpace {
    fn available_space(&self, _path: &Path) -> io::Result<u64> {
        Ok(self.0)
    }
}

pub fn free_space(path: &Path) -> io::Result<u64> {
    SystemSpaceProbe.available_space(path)
}
