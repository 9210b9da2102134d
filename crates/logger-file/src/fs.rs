//! Guarded filesystem helpers with path sanitization
//!
//! Every path handed to the writer goes through [`validate_path`] first; a
//! path containing a parent-directory component fails with
//! [`Error::PathDenied`] before any I/O happens.

use crate::error::{Error, Result};
use std::fs::{File, OpenOptions};
use std::path::{Component, Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt, PermissionsExt};

pub(crate) const DIR_MODE: u32 = 0o755;
pub(crate) const FILE_MODE: u32 = 0o600;
pub(crate) const GZIP_FILE_MODE: u32 = 0o400;

/// Reject paths that could escape the configured log directory. The
/// cleaned path must not contain `..` anywhere: parent-directory
/// components and file names embedding two consecutive dots included.
pub(crate) fn validate_path(path: &Path) -> Result<()> {
    let cleaned: PathBuf = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    if cleaned.to_string_lossy().contains("..") {
        return Err(Error::PathDenied(path.to_path_buf()));
    }
    Ok(())
}

/// Create (truncating) a file with mode 0600. The explicit chmod after the
/// open keeps the mode independent of the process umask.
pub(crate) fn create(path: &Path) -> Result<File> {
    validate_path(path)?;
    let mut opts = OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    #[cfg(unix)]
    opts.mode(FILE_MODE);
    let file = opts.open(path)?;
    set_mode(path, FILE_MODE)?;
    Ok(file)
}

/// Open an existing file for appending.
pub(crate) fn open_append(path: &Path) -> Result<File> {
    validate_path(path)?;
    Ok(OpenOptions::new().append(true).open(path)?)
}

/// Open an existing file for reading.
pub(crate) fn open_read(path: &Path) -> Result<File> {
    validate_path(path)?;
    Ok(File::open(path)?)
}

/// Remove a file.
pub(crate) fn remove(path: &Path) -> Result<()> {
    validate_path(path)?;
    Ok(std::fs::remove_file(path)?)
}

/// Recursively create a directory with mode 0755.
pub(crate) fn create_dir_all(path: &Path) -> Result<()> {
    validate_path(path)?;
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(DIR_MODE);
    builder.create(path).map_err(|source| Error::CreateDirectory {
        path: path.to_path_buf(),
        source,
    })
}

/// Set the permission bits on `path`.
#[cfg(unix)]
pub(crate) fn set_mode(path: &Path, mode: u32) -> Result<()> {
    Ok(std::fs::set_permissions(
        path,
        std::fs::Permissions::from_mode(mode),
    )?)
}

#[cfg(not(unix))]
pub(crate) fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn rejects_parent_components() {
        assert!(matches!(
            validate_path(Path::new("/var/log/../etc/passwd")),
            Err(Error::PathDenied(_))
        ));
        assert!(matches!(
            validate_path(Path::new("../relative.log")),
            Err(Error::PathDenied(_))
        ));
        assert!(validate_path(Path::new("/var/log/app/server.log")).is_ok());
    }

    #[test]
    fn rejects_embedded_double_dots() {
        assert!(matches!(
            validate_path(Path::new("/var/log/app/svc..backup.log")),
            Err(Error::PathDenied(_))
        ));
        assert!(matches!(
            validate_path(Path::new("..hidden/server.log")),
            Err(Error::PathDenied(_))
        ));
        // Single dots in names and current-dir components stay legal.
        assert!(validate_path(Path::new("./logs/svc_server.log")).is_ok());
        assert!(validate_path(Path::new("/var/log/app/svc.backup.log")).is_ok());
    }

    #[test]
    fn create_sets_owner_only_mode() {
        let dir = tempfile::TempDir::new().unwrap();
        let path: PathBuf = dir.path().join("probe.log");
        let _file = create(&path).unwrap();
        #[cfg(unix)]
        {
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, FILE_MODE);
        }
    }
}
