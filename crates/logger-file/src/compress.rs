//! Gzip compression of archived segments with a free-space guard

use crate::disk;
use crate::error::{Error, Result};
use crate::fs;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io;
use std::path::{Path, PathBuf};

/// Compress `src` into `<src>.gz` and remove the source.
///
/// The output is created with mode 0600, flipped to 0400 once the stream is
/// complete, and the source is removed only after the encoder has been
/// finished and closed. Any failure along the way leaves the source intact
/// so a retry is safe.
pub(crate) fn gzip_file(src: &Path) -> Result<()> {
    ensure_enough_space(src)?;

    let mut input = fs::open_read(src)?;
    let gz_path = gzip_path(src);
    let output = fs::create(&gz_path)?;

    let mut encoder = GzEncoder::new(output, Compression::default());
    io::copy(&mut input, &mut encoder).map_err(|e| Error::Compress(e.to_string()))?;
    let output = encoder.finish().map_err(|e| Error::Compress(e.to_string()))?;
    output.sync_all()?;
    drop(output);
    fs::set_mode(&gz_path, fs::GZIP_FILE_MODE)?;

    fs::remove(src)
}

pub(crate) fn gzip_path(src: &Path) -> PathBuf {
    let mut os = src.as_os_str().to_os_string();
    os.push(crate::rule::GZIP_EXT);
    PathBuf::from(os)
}

/// Make room for compressing `src`: when the volume's free space is below
/// the source size, delete sibling archives sharing the source's stem,
/// oldest modification time first, re-probing after each removal. Failing
/// to free enough space is a hard error; the retry loop will come back.
fn ensure_enough_space(src: &Path) -> Result<()> {
    let dir = src
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let required = std::fs::metadata(src)?.len();

    let mut free = disk::disk_free_size(dir)?;
    if free >= required {
        return Ok(());
    }

    eprintln!(
        "insufficient disk space for compression (available: {free}, required: {required}), cleaning up"
    );

    let stem = src
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let prefix = format!("{stem}.");

    let mut candidates: Vec<(PathBuf, std::time::SystemTime)> = Vec::new();
    for entry in std::fs::read_dir(dir)?.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !name.starts_with(&prefix) {
            continue;
        }
        let path = entry.path();
        if path == src {
            continue;
        }
        if let Ok(modified) = entry.metadata().and_then(|m| m.modified()) {
            candidates.push((path, modified));
        }
    }
    candidates.sort_by_key(|(_, modified)| *modified);

    for (path, _) in candidates {
        if let Err(e) = fs::remove(&path) {
            eprintln!("failed to remove archive {path:?} while freeing space: {e}");
            continue;
        }
        free = disk::disk_free_size(dir)?;
        if free >= required {
            return Ok(());
        }
    }

    Err(Error::Compress(format!(
        "still insufficient disk space after cleanup (available: {free}, required: {required})"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use tempfile::TempDir;

    #[test]
    fn gzip_round_trips_and_removes_source() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("svc_server-2026-01-01T00.00.00.000000000Z.log");
        let payload = b"one line\nanother line\n".repeat(128);
        std::fs::write(&src, &payload).unwrap();

        gzip_file(&src).unwrap();

        let gz = gzip_path(&src);
        assert!(!src.exists());
        assert!(gz.exists());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&gz).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o400);
        }

        let mut decoder = GzDecoder::new(std::fs::File::open(&gz).unwrap());
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed).unwrap();
        assert_eq!(decompressed, payload);
    }

    #[test]
    fn missing_source_fails_and_creates_nothing() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("absent.log");
        assert!(gzip_file(&src).is_err());
        assert!(!gzip_path(&src).exists());
    }
}
