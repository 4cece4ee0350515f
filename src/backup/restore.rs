//! Snapshot restoration for SheetKeep
//!
//! Restoring always snapshots the live workbook first (label
//! `before_restore`), then swaps the snapshot's bytes in atomically.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{SheetError, SheetResult};
use crate::models::{Workbook, WorkbookDocument};
use crate::storage::file_io::write_bytes_atomic;

use super::manager::BackupManager;

/// Label of the safety snapshot taken before every restore
pub const BEFORE_RESTORE_LABEL: &str = "before_restore";

impl BackupManager {
    /// Overwrite the live workbook with a snapshot's bytes
    ///
    /// A `before_restore` snapshot of the current workbook is taken first. It
    /// is skipped only when there is no live workbook to protect.
    pub fn restore_snapshot(&self, backup_path: &Path) -> SheetResult<RestoreResult> {
        if !backup_path.is_file() {
            return Err(SheetError::snapshot_not_found(
                backup_path.display().to_string(),
            ));
        }

        let safety_snapshot = if self.source().exists() {
            Some(self.create_snapshot(BEFORE_RESTORE_LABEL)?)
        } else {
            tracing::warn!(
                workbook = %self.source().display(),
                "no live workbook, restoring without a safety snapshot"
            );
            None
        };

        let bytes = fs::read(backup_path)
            .map_err(|e| SheetError::Io(format!("Failed to read snapshot: {}", e)))?;

        write_bytes_atomic(self.source(), &bytes)?;

        tracing::info!(
            snapshot = %backup_path.display(),
            bytes = bytes.len(),
            "workbook restored from snapshot"
        );

        Ok(RestoreResult {
            restored_from: backup_path.to_path_buf(),
            safety_snapshot,
            bytes_restored: bytes.len() as u64,
        })
    }

    /// Inspect a snapshot without restoring it
    pub fn validate_snapshot(&self, backup_path: &Path) -> SheetResult<ValidationResult> {
        let contents = fs::read(backup_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SheetError::snapshot_not_found(backup_path.display().to_string())
            } else {
                SheetError::Io(format!("Failed to read snapshot: {}", e))
            }
        })?;

        Ok(match serde_json::from_slice::<WorkbookDocument>(&contents) {
            Ok(doc) => {
                let schema_version = doc.schema_version;
                let workbook = Workbook::from(doc);
                ValidationResult {
                    is_valid: true,
                    schema_version,
                    tables: workbook
                        .tables()
                        .iter()
                        .map(|t| (t.name.clone(), t.row_count()))
                        .collect(),
                    problem: None,
                }
            }
            Err(e) => ValidationResult {
                is_valid: false,
                schema_version: 0,
                tables: Vec::new(),
                problem: Some(e.to_string()),
            },
        })
    }
}

/// Result of a restore operation
#[derive(Debug, Clone)]
pub struct RestoreResult {
    /// Snapshot that was copied over the workbook
    pub restored_from: PathBuf,
    /// Snapshot of the workbook as it was before the restore
    pub safety_snapshot: Option<PathBuf>,
    /// Size of the restored workbook
    pub bytes_restored: u64,
}

impl RestoreResult {
    /// Get a summary of the restore
    pub fn summary(&self) -> String {
        let from = file_name(&self.restored_from);
        match &self.safety_snapshot {
            Some(safety) => format!(
                "Restored {} ({} bytes); previous state saved as {}",
                from,
                self.bytes_restored,
                file_name(safety)
            ),
            None => format!("Restored {} ({} bytes)", from, self.bytes_restored),
        }
    }
}

/// Result of validating a snapshot
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether the snapshot parses as a workbook
    pub is_valid: bool,
    /// Workbook document version
    pub schema_version: u32,
    /// Table names with their row counts
    pub tables: Vec<(String, usize)>,
    /// Parse error, when invalid
    pub problem: Option<String>,
}

impl ValidationResult {
    /// Get a summary of the snapshot contents
    pub fn summary(&self) -> String {
        if !self.is_valid {
            return format!(
                "Invalid snapshot: {}",
                self.problem.as_deref().unwrap_or("unknown error")
            );
        }
        if self.tables.is_empty() {
            return format!("Empty workbook (v{})", self.schema_version);
        }
        let tables: Vec<String> = self
            .tables
            .iter()
            .map(|(name, rows)| format!("{} ({} rows)", name, rows))
            .collect();
        format!("Workbook v{}: {}", self.schema_version, tables.join(", "))
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
