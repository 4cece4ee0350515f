//! Configuration module for SheetKeep
//!
//! This module provides configuration management including:
//! - Path resolution for the workbook, journal, and snapshots
//! - Settings persistence (retention, strictness, lock timeout)

pub mod paths;
pub mod settings;

pub use paths::SheetPaths;
pub use settings::{BackupRetention, Settings};
