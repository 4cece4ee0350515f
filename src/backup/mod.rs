//! Snapshot system for SheetKeep
//!
//! Provides whole-file snapshots of the workbook with a keep-last retention
//! policy and restore functionality.
//!
//! # Architecture
//!
//! - `BackupManager`: creates, lists, and prunes snapshots (`manager`), and
//!   restores or validates them (`restore`)
//!
//! # Snapshot Format
//!
//! A snapshot is a byte-for-byte copy of the workbook file named
//! `backup_{label}_{yyyyMMdd_HHmmss}.<ext>`, with a `_{n}` suffix when the
//! same label is snapshotted twice within one second.
//!
//! # Retention Policy
//!
//! Guarded mutations prune to the 10 most recent snapshots by default
//! (`BackupRetention::keep_last`).
//!
//! # Example
//!
//! ```rust,ignore
//! use sheetkeep::backup::BackupManager;
//! use sheetkeep::config::{SheetPaths, BackupRetention};
//!
//! let paths = SheetPaths::new()?;
//! let manager = BackupManager::new(&paths, BackupRetention::default());
//!
//! let snapshot = manager.create_snapshot("manual")?;
//! manager.prune(10)?;
//!
//! // Later, roll back
//! let result = manager.restore_snapshot(&snapshot)?;
//! println!("{}", result.summary());
//! ```

mod manager;
mod restore;

pub use manager::{BackupInfo, BackupManager};
pub use restore::{RestoreResult, ValidationResult, BEFORE_RESTORE_LABEL};
