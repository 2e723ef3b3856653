// Device locator: finds the OP-1 among the mounted volumes. A volume is the
// device when it carries the four content directories and reports the
// exact capacity of the OP-1's internal storage.

use std::io;
use std::path::{Path, PathBuf};
use sysinfo::Disks;
use thiserror::Error;
use tracing::debug;

/// Directories present at the root of every OP-1 volume.
pub const SIGNATURE_DIRS: [&str; 4] = ["album", "drum", "synth", "tape"];

/// Total capacity in bytes reported for the OP-1 volume.
pub const DEVICE_CAPACITY: u64 = 402_399_232;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("op-1 not connected!")]
    NotFound,
}

/// Reports the total capacity of the volume mounted at a path.
pub trait VolumeProbe {
    fn total_capacity(&self, root: &Path) -> io::Result<u64>;
}

/// Queries the operating system for volume sizes.
pub struct SystemProbe {
    disks: Disks,
}

impl SystemProbe {
    pub fn new() -> Self {
        SystemProbe {
            disks: Disks::new_with_refreshed_list(),
        }
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl VolumeProbe for SystemProbe {
    fn total_capacity(&self, root: &Path) -> io::Result<u64> {
        let mounts = self
            .disks
            .list()
            .iter()
            .map(|disk| (disk.mount_point(), disk.total_space()));
        mounted_capacity(mounts, root).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no mounted volume holds {}", root.display()),
            )
        })
    }
}

/// Capacity of the innermost mount point containing `root`.
fn mounted_capacity<'a, I>(mounts: I, root: &Path) -> Option<u64>
where
    I: IntoIterator<Item = (&'a Path, u64)>,
{
    mounts
        .into_iter()
        .filter(|(mount_point, _)| root.starts_with(mount_point))
        .max_by_key(|(mount_point, _)| mount_point.components().count())
        .map(|(_, total)| total)
}

/// Volume roots worth probing on this platform.
#[cfg(windows)]
pub fn candidate_roots() -> Vec<PathBuf> {
    (b'A'..=b'Z')
        .map(|letter| PathBuf::from(format!("{}:\\", letter as char)))
        .filter(|root| root.exists())
        .collect()
}

/// Volume roots worth probing on this platform.
#[cfg(not(windows))]
pub fn candidate_roots() -> Vec<PathBuf> {
    let mut parents = vec![PathBuf::from("/Volumes"), PathBuf::from("/media")];
    if let Ok(user) = std::env::var("USER") {
        parents.push(Path::new("/media").join(&user));
        parents.push(Path::new("/run/media").join(&user));
    }
    parents.push(PathBuf::from("/mnt"));

    let mut roots = Vec::new();
    for parent in parents {
        let entries = match std::fs::read_dir(&parent) {
            Ok(entries) => entries,
            Err(_) => continue,
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() && !roots.contains(&path) {
                roots.push(path);
            }
        }
    }
    roots
}

/// Whether `root` looks like an OP-1 volume.
pub fn is_device_root(root: &Path, probe: &dyn VolumeProbe) -> bool {
    if !SIGNATURE_DIRS.iter().all(|dir| root.join(dir).exists()) {
        return false;
    }
    match probe.total_capacity(root) {
        Ok(total) => {
            debug!("{} reports {total} bytes", root.display());
            total == DEVICE_CAPACITY
        }
        Err(e) => {
            debug!("could not read capacity of {}: {e}", root.display());
            false
        }
    }
}

/// `extra` first, then the platform candidates that are not `extra`.
pub fn with_extra(extra: Option<PathBuf>, platform: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = extra.into_iter().collect();
    for root in platform {
        if !roots.contains(&root) {
            roots.push(root);
        }
    }
    roots
}

/// Every root to probe, with an explicitly configured one ahead of the rest.
pub fn candidates(extra: Option<PathBuf>) -> Vec<PathBuf> {
    with_extra(extra, candidate_roots())
}

/// Return the first candidate that qualifies as the device root.
pub fn locate<I>(candidates: I, probe: &dyn VolumeProbe) -> Result<PathBuf, DeviceError>
where
    I: IntoIterator<Item = PathBuf>,
{
    candidates
        .into_iter()
        .find(|root| is_device_root(root, probe))
        .ok_or(DeviceError::NotFound)
}
