//! Free/total byte probes for the volume hosting a directory

use crate::error::{Error, Result};
use std::path::Path;

/// Total capacity in bytes of the volume hosting `path`.
#[cfg(unix)]
pub(crate) fn disk_total_size(path: &Path) -> Result<u64> {
    let stat = nix::sys::statvfs::statvfs(path).map_err(|e| Error::DiskProbe(e.to_string()))?;
    Ok(stat.blocks() as u64 * stat.fragment_size() as u64)
}

/// Bytes available to unprivileged users on the volume hosting `path`.
#[cfg(unix)]
pub(crate) fn disk_free_size(path: &Path) -> Result<u64> {
    let stat = nix::sys::statvfs::statvfs(path).map_err(|e| Error::DiskProbe(e.to_string()))?;
    Ok(stat.blocks_available() as u64 * stat.fragment_size() as u64)
}

#[cfg(not(unix))]
pub(crate) fn disk_total_size(_path: &Path) -> Result<u64> {
    Err(Error::DiskProbe("unsupported platform".into()))
}

#[cfg(not(unix))]
pub(crate) fn disk_free_size(_path: &Path) -> Result<u64> {
    Err(Error::DiskProbe("unsupported platform".into()))
}
