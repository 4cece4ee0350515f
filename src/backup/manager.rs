//! Snapshot manager for SheetKeep
//!
//! Snapshots are verbatim byte copies of the workbook file, stored flat in the
//! backup directory as `backup_{label}_{yyyyMMdd_HHmmss}[_{n}].<ext>`. There is
//! no manifest: the directory listing is the catalog.
//!
//! `n` counts snapshots taken within the same second, whatever their label,
//! so snapshots of one second order by name alone.

use std::cmp::Reverse;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::paths::SheetPaths;
use crate::config::settings::BackupRetention;
use crate::error::{SheetError, SheetResult};

const BACKUP_PREFIX: &str = "backup_";
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Metadata about a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupInfo {
    /// Snapshot filename
    pub filename: String,
    /// Full path to the snapshot
    pub path: PathBuf,
    /// Operation label the snapshot was taken for
    pub label: String,
    /// When the snapshot was created (second resolution)
    pub created_at: DateTime<Utc>,
    /// Position within its second, 0 for the first snapshot of that second
    pub sequence: u32,
    /// Size in bytes
    pub size_bytes: u64,
    #[serde(skip)]
    modified: Option<SystemTime>,
}

impl BackupInfo {
    fn sort_key(&self) -> (DateTime<Utc>, u32, Option<SystemTime>) {
        (self.created_at, self.sequence, self.modified)
    }

    fn is_listed_in(&self, paths: &[PathBuf]) -> bool {
        paths
            .iter()
            .any(|p| p.file_name().map_or(false, |n| n.to_string_lossy() == self.filename))
    }
}

/// Manages snapshot creation, listing, and retention
pub struct BackupManager {
    /// Path to backup directory
    backup_dir: PathBuf,
    /// Workbook file being snapshotted
    source: PathBuf,
    /// Retention policy
    retention: BackupRetention,
}

impl BackupManager {
    /// Create a new BackupManager
    pub fn new(paths: &SheetPaths, retention: BackupRetention) -> Self {
        Self::with_dirs(paths.workbook_file(), paths.backup_dir(), retention)
    }

    /// Create a BackupManager over an explicit source file and directory
    pub fn with_dirs(source: PathBuf, backup_dir: PathBuf, retention: BackupRetention) -> Self {
        Self {
            backup_dir,
            source,
            retention,
        }
    }

    /// Get backup directory path
    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Get the live file this manager snapshots
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn retention(&self) -> &BackupRetention {
        &self.retention
    }

    fn extension(&self) -> String {
        self.source
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_else(|| "bak".to_string())
    }

    /// Snapshot the workbook under `label`
    ///
    /// Returns the path of the new snapshot. Every snapshot after the first
    /// one of a second gets a `_{n}` suffix, so nothing is ever replaced.
    pub fn create_snapshot(&self, label: &str) -> SheetResult<PathBuf> {
        if !self.source.exists() {
            return Err(SheetError::file_not_found(self.source.display().to_string()));
        }

        fs::create_dir_all(&self.backup_dir)
            .map_err(|e| SheetError::Io(format!("Failed to create backup directory: {}", e)))?;

        let label = sanitize_label(label);
        let stamp = Utc::now().format(TIMESTAMP_FORMAT).to_string();
        let ext = self.extension();

        let mut sequence = self.next_sequence(&stamp)?;
        let backup_path = loop {
            let filename = if sequence == 0 {
                format!("{}{}_{}.{}", BACKUP_PREFIX, label, stamp, ext)
            } else {
                format!("{}{}_{}_{}.{}", BACKUP_PREFIX, label, stamp, sequence, ext)
            };
            let candidate = self.backup_dir.join(filename);
            if !candidate.exists() {
                break candidate;
            }
            sequence += 1;
        };

        fs::copy(&self.source, &backup_path)
            .map_err(|e| SheetError::Io(format!("Failed to write snapshot: {}", e)))?;

        tracing::info!(snapshot = %backup_path.display(), label = %label, "snapshot created");
        Ok(backup_path)
    }

    /// First free sequence number for snapshots stamped `stamp`
    fn next_sequence(&self, stamp: &str) -> SheetResult<u32> {
        Ok(self
            .list_snapshots()?
            .iter()
            .filter(|b| b.created_at.format(TIMESTAMP_FORMAT).to_string() == stamp)
            .map(|b| b.sequence + 1)
            .max()
            .unwrap_or(0))
    }

    /// Snapshot, then prune down to the configured retention
    ///
    /// Snapshots in `protected` survive the prune. A failed prune is logged
    /// and reported as zero removals; only a failed snapshot is an error.
    pub fn create_snapshot_with_retention(
        &self,
        label: &str,
        protected: &[PathBuf],
    ) -> SheetResult<(PathBuf, usize)> {
        let backup_path = self.create_snapshot(label)?;
        let removed = match self.enforce_retention(protected) {
            Ok(removed) => removed,
            Err(e) => {
                tracing::warn!(error = %e, "snapshot pruning failed");
                0
            }
        };
        Ok((backup_path, removed))
    }

    /// List all snapshots, newest first
    ///
    /// A missing backup directory yields an empty list.
    pub fn list_snapshots(&self) -> SheetResult<Vec<BackupInfo>> {
        if !self.backup_dir.exists() {
            return Ok(Vec::new());
        }

        let ext = self.extension();
        let mut backups = Vec::new();

        for entry in fs::read_dir(&self.backup_dir)
            .map_err(|e| SheetError::Io(format!("Failed to read backup directory: {}", e)))?
        {
            let entry = entry
                .map_err(|e| SheetError::Io(format!("Failed to read directory entry: {}", e)))?;

            let path = entry.path();
            if path.extension().map_or(false, |e| e.to_string_lossy() == ext) {
                if let Some(info) = parse_backup_info(&path) {
                    backups.push(info);
                }
            }
        }

        backups.sort_by_key(|b| Reverse(b.sort_key()));

        Ok(backups)
    }

    /// Delete every snapshot beyond the `keep_last` most recent
    ///
    /// Stops at the first failed deletion; snapshots already removed stay
    /// removed.
    pub fn prune(&self, keep_last: usize) -> SheetResult<usize> {
        self.prune_protecting(keep_last, &[])
    }

    /// `prune`, except that snapshots in `protected` are never deleted
    ///
    /// Protected snapshots still count toward `keep_last` when they are
    /// among the newest.
    pub fn prune_protecting(&self, keep_last: usize, protected: &[PathBuf]) -> SheetResult<usize> {
        let backups = self.list_snapshots()?;
        let mut removed = 0;

        for backup in backups.into_iter().skip(keep_last) {
            if backup.is_listed_in(protected) {
                tracing::debug!(snapshot = %backup.filename, "keeping protected snapshot");
                continue;
            }
            fs::remove_file(&backup.path).map_err(|e| {
                tracing::warn!(snapshot = %backup.path.display(), error = %e, "prune stopped");
                SheetError::Io(format!(
                    "Failed to delete old snapshot {} after removing {}: {}",
                    backup.filename, removed, e
                ))
            })?;
            removed += 1;
        }

        if removed > 0 {
            tracing::info!(removed, keep_last, "pruned old snapshots");
        }
        Ok(removed)
    }

    /// Prune to the configured retention
    ///
    /// Always keeps at least the newest snapshot, even with `keep_last: 0`.
    pub fn enforce_retention(&self, protected: &[PathBuf]) -> SheetResult<usize> {
        self.prune_protecting(self.retention.keep_last.max(1), protected)
    }

    /// Get a specific snapshot by filename
    pub fn find_snapshot(&self, filename: &str) -> SheetResult<Option<BackupInfo>> {
        let path = self.backup_dir.join(filename);
        if path.exists() {
            Ok(parse_backup_info(&path))
        } else {
            Ok(None)
        }
    }

    /// Get the most recent snapshot
    pub fn latest_snapshot(&self) -> SheetResult<Option<BackupInfo>> {
        Ok(self.list_snapshots()?.into_iter().next())
    }
}

/// Replace characters that cannot appear in a file name
fn sanitize_label(label: &str) -> String {
    let cleaned: String = label
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "manual".to_string()
    } else {
        cleaned
    }
}

/// Parse snapshot metadata from its file name
fn parse_backup_info(path: &Path) -> Option<BackupInfo> {
    let filename = path.file_name()?.to_string_lossy().to_string();
    let stem = path.file_stem()?.to_string_lossy().to_string();
    let rest = stem.strip_prefix(BACKUP_PREFIX)?;

    let (label, created_at, sequence) = split_name(rest)?;

    let metadata = fs::metadata(path).ok()?;

    Some(BackupInfo {
        filename,
        path: path.to_path_buf(),
        label,
        created_at,
        sequence,
        size_bytes: metadata.len(),
        modified: metadata.modified().ok(),
    })
}

/// Split `{label}_{date}_{time}[_{seq}]` into its parts
fn split_name(rest: &str) -> Option<(String, DateTime<Utc>, u32)> {
    fn is_digits(s: &str, len: usize) -> bool {
        s.len() == len && s.bytes().all(|b| b.is_ascii_digit())
    }

    let parts: Vec<&str> = rest.split('_').collect();

    let (label_end, sequence) = match parts.as_slice() {
        [.., date, time] if is_digits(date, 8) && is_digits(time, 6) => (parts.len() - 2, 0),
        [.., date, time, seq]
            if is_digits(date, 8) && is_digits(time, 6) && seq.parse::<u32>().is_ok() =>
        {
            (parts.len() - 3, seq.parse().ok()?)
        }
        _ => return None,
    };

    if label_end == 0 {
        return None;
    }

    let label = parts[..label_end].join("_");
    let stamp = format!("{}_{}", parts[label_end], parts[label_end + 1]);
    let naive = NaiveDateTime::parse_from_str(&stamp, TIMESTAMP_FORMAT).ok()?;

    Some((label, DateTime::from_naive_utc_and_offset(naive, Utc), sequence))
}
