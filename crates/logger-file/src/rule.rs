//! Rotation rules: when to rotate the active file and which archives are
//! outdated
//!
//! Two shapes exist. The daily rule rotates on UTC date change and retains
//! by age only. The size-limit rule rotates when the projected file size
//! exceeds the configured cap and retains by backup count, disk usage and
//! age, in that order. Archive names embed a sortable timestamp so that
//! lexicographic order equals chronological order.

use crate::disk;
use chrono::{Duration as ChronoDuration, Utc};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

pub(crate) const GZIP_EXT: &str = ".gz";
const DATE_FORMAT: &str = "%Y-%m-%d";
const FILE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S.%fZ";
const HOURS_PER_DAY: i64 = 24;
const MEGABYTE: u64 = 1 << 20;
/// Share of the volume the archive set may occupy before eviction starts.
const DISK_USAGE_CEILING: f64 = 0.8;

/// Decides when the active file rotates and what its archives are called.
#[derive(Debug, Clone)]
pub enum RotateRule {
    /// Rotate when the UTC date changes.
    Daily(DailyRule),
    /// Rotate when the projected size exceeds the cap.
    SizeLimit(SizeLimitRule),
}

/// State for date-driven rotation.
#[derive(Debug, Clone)]
pub struct DailyRule {
    rotated: String,
    filename: PathBuf,
    delimiter: String,
    keep_days: u32,
    gzip: bool,
}

/// State for size-driven rotation; extends the daily rule with a byte cap
/// and a backup count.
#[derive(Debug, Clone)]
pub struct SizeLimitRule {
    daily: DailyRule,
    max_bytes: u64,
    max_backups: usize,
}

impl RotateRule {
    /// A rule that rotates on UTC date change and keeps `keep_days` of
    /// archives (0 retains everything).
    pub fn daily(
        filename: impl Into<PathBuf>,
        delimiter: impl Into<String>,
        keep_days: u32,
        gzip: bool,
    ) -> Self {
        RotateRule::Daily(DailyRule {
            rotated: now_date(),
            filename: filename.into(),
            delimiter: delimiter.into(),
            keep_days,
            gzip,
        })
    }

    /// A rule that rotates once the active file would exceed `max_size_mib`
    /// mebibytes (0 disables size rotation) and keeps at most `max_backups`
    /// archives (0 retains everything).
    pub fn size_limit(
        filename: impl Into<PathBuf>,
        delimiter: impl Into<String>,
        keep_days: u32,
        max_size_mib: u64,
        max_backups: usize,
        gzip: bool,
    ) -> Self {
        RotateRule::SizeLimit(SizeLimitRule {
            daily: DailyRule {
                rotated: now_file_stamp(),
                filename: filename.into(),
                delimiter: delimiter.into(),
                keep_days,
                gzip,
            },
            max_bytes: max_size_mib * MEGABYTE,
            max_backups,
        })
    }

    /// Whether a write bringing the active file to `projected` bytes should
    /// trigger a rotation first.
    pub fn shall_rotate(&self, projected: u64) -> bool {
        match self {
            RotateRule::Daily(rule) => !rule.rotated.is_empty() && now_date() != rule.rotated,
            RotateRule::SizeLimit(rule) => rule.max_bytes > 0 && projected > rule.max_bytes,
        }
    }

    /// The archive name the active file would be renamed to right now.
    pub fn backup_file_name(&self) -> PathBuf {
        match self {
            RotateRule::Daily(rule) => append_to_path(
                &rule.filename,
                &format!("{}{}", rule.delimiter, now_date()),
            ),
            RotateRule::SizeLimit(rule) => {
                let (prefix, ext) = rule.parse_filename();
                rule.dir().join(format!(
                    "{prefix}{}{}{ext}",
                    rule.daily.delimiter,
                    now_file_stamp()
                ))
            }
        }
    }

    /// Record that a rotation has just happened.
    pub(crate) fn mark_rotated(&mut self) {
        match self {
            RotateRule::Daily(rule) => rule.rotated = now_date(),
            RotateRule::SizeLimit(rule) => rule.daily.rotated = now_file_stamp(),
        }
    }

    /// Archives that the retention policy no longer wants on disk. The
    /// active file is never a member.
    pub fn outdated_files(&self) -> Vec<PathBuf> {
        match self {
            RotateRule::Daily(rule) => rule.outdated(),
            RotateRule::SizeLimit(rule) => rule.outdated(),
        }
    }

    /// Archives matching this rule's naming scheme that have not been
    /// gzipped yet, excluding the active file.
    pub(crate) fn uncompressed_archives(&self) -> Vec<PathBuf> {
        let (dir, prefix, suffix, active) = match self {
            RotateRule::Daily(rule) => (
                rule.dir(),
                rule.archive_prefix(),
                String::new(),
                rule.filename.clone(),
            ),
            RotateRule::SizeLimit(rule) => {
                let (prefix, ext) = rule.parse_filename();
                (
                    rule.dir(),
                    format!("{prefix}{}", rule.daily.delimiter),
                    ext,
                    rule.daily.filename.clone(),
                )
            }
        };
        let mut files = list_matching(&dir, &prefix, &suffix, Some(&active));
        files.retain(|f| !f.to_string_lossy().ends_with(GZIP_EXT));
        files.sort();
        files
    }
}

impl DailyRule {
    fn dir(&self) -> PathBuf {
        parent_dir(&self.filename)
    }

    fn archive_prefix(&self) -> String {
        let base = self
            .filename
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{base}{}", self.delimiter)
    }

    fn outdated(&self) -> Vec<PathBuf> {
        if self.keep_days == 0 {
            return Vec::new();
        }

        let suffix = if self.gzip { GZIP_EXT.to_string() } else { String::new() };
        let files = list_matching(&self.dir(), &self.archive_prefix(), &suffix, Some(&self.filename));

        let boundary_date = (Utc::now() - ChronoDuration::hours(HOURS_PER_DAY * i64::from(self.keep_days)))
            .format(DATE_FORMAT)
            .to_string();
        // Built the same way list_matching builds its entries, so the
        // lexicographic comparison sees identical path spellings.
        let mut boundary_name = format!("{}{boundary_date}", self.archive_prefix());
        if self.gzip {
            boundary_name.push_str(GZIP_EXT);
        }
        let boundary = self.dir().join(boundary_name);

        files.into_iter().filter(|f| *f < boundary).collect()
    }
}

impl SizeLimitRule {
    fn dir(&self) -> PathBuf {
        parent_dir(&self.daily.filename)
    }

    fn parse_filename(&self) -> (String, String) {
        let prefix = self
            .daily
            .filename
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = self
            .daily
            .filename
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        (prefix, ext)
    }

    fn outdated(&self) -> Vec<PathBuf> {
        let dir = self.dir();
        let (prefix, ext) = self.parse_filename();
        let match_prefix = format!("{prefix}{}", self.daily.delimiter);
        let match_suffix = if self.daily.gzip {
            format!("{ext}{GZIP_EXT}")
        } else {
            ext.clone()
        };
        let mut files = list_matching(&dir, &match_prefix, &match_suffix, Some(&self.daily.filename));
        files.sort();

        let mut outdated: BTreeSet<PathBuf> = BTreeSet::new();

        // Backup-count overflow first; the survivors feed the next checks.
        if self.max_backups > 0 && files.len() > self.max_backups {
            let cut = files.len() - self.max_backups;
            for f in files.drain(..cut) {
                outdated.insert(f);
            }
        }

        // Disk-pressure overflow on the survivors.
        let mut sizes: HashMap<PathBuf, u64> = HashMap::new();
        let mut total: u64 = 0;
        let mut largest: u64 = 0;
        for f in &files {
            match std::fs::metadata(f) {
                Ok(meta) => {
                    total += meta.len();
                    largest = largest.max(meta.len());
                    sizes.insert(f.clone(), meta.len());
                }
                Err(e) => eprintln!("failed to stat archive {f:?}: {e}"),
            }
        }

        let mut free = u64::MAX;
        if !files.is_empty() {
            if let Ok(v) = disk::disk_free_size(&dir) {
                free = v;
                // Compression needs scratch space roughly the size of the
                // segment being compressed; charge extra so the sweep frees
                // more than strictly necessary.
                if self.daily.gzip && largest > free {
                    total = total.saturating_add(largest * 2);
                }
            }
        }

        let max_total = match disk::disk_total_size(&dir) {
            Ok(t) if t > 0 => (t as f64 * DISK_USAGE_CEILING) as u64,
            _ => ((self.max_bytes * self.max_backups as u64) as f64 * DISK_USAGE_CEILING) as u64,
        };

        if self.max_bytes > 0
            && self.max_backups > 0
            && (total > max_total || free < largest)
        {
            for f in &files {
                if outdated.insert(f.clone()) {
                    total = total.saturating_sub(sizes.get(f).copied().unwrap_or(0));
                }
                if total <= max_total {
                    break;
                }
            }
        }

        // Age overflow: the boundary name uses the same sortable stamp
        // format as real archives, so a plain comparison suffices.
        if self.daily.keep_days > 0 {
            let stamp = (Utc::now()
                - ChronoDuration::hours(HOURS_PER_DAY * i64::from(self.daily.keep_days)))
            .format(FILE_TIME_FORMAT)
            .to_string()
            .replace(':', ".");
            let mut boundary = dir.join(format!("{prefix}{}{stamp}{ext}", self.daily.delimiter));
            if self.daily.gzip {
                boundary = append_to_path(&boundary, GZIP_EXT);
            }
            for f in &files {
                if *f >= boundary {
                    break;
                }
                outdated.insert(f.clone());
            }
        }

        outdated.into_iter().collect()
    }
}

fn now_date() -> String {
    Utc::now().format(DATE_FORMAT).to_string()
}

/// RFC3339 with nanoseconds, colons replaced by dots so the stamp is a
/// valid file-name component that still sorts chronologically.
fn now_file_stamp() -> String {
    Utc::now()
        .format(FILE_TIME_FORMAT)
        .to_string()
        .replace(':', ".")
}

fn append_to_path(path: &Path, suffix: &str) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(suffix);
    PathBuf::from(os)
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Directory listing filtered by file-name prefix and suffix; `exclude`
/// (the active file) is always filtered out.
fn list_matching(dir: &Path, prefix: &str, suffix: &str, exclude: Option<&Path>) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("failed to list log directory {dir:?}: {e}");
            return Vec::new();
        }
    };

    let mut files = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !name.starts_with(prefix) || !name.ends_with(suffix) {
            continue;
        }
        // All matches live in one directory; comparing file names keeps
        // the exclusion independent of relative/absolute path spelling.
        let active_name = exclude.and_then(Path::file_name).and_then(|n| n.to_str());
        if active_name == Some(name) {
            continue;
        }
        files.push(entry.path());
    }
    files
}
