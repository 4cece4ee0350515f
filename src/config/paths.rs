//! Path management for SheetKeep
//!
//! Provides path resolution for configuration, the workbook, the mutation
//! journal, and snapshots.
//!
//! ## Path Resolution Order
//!
//! 1. `SHEETKEEP_DATA_DIR` environment variable (if set)
//! 2. The platform config directory from `directories::ProjectDirs`
//!    (`~/.config/sheetkeep` on Linux, `%APPDATA%\sheetkeep` on Windows)

use std::path::PathBuf;

use directories::ProjectDirs;

use crate::error::SheetError;

/// Default workbook file name inside the data directory
pub const DEFAULT_WORKBOOK_FILE: &str = "workbook.json";

/// Manages all paths used by SheetKeep
#[derive(Debug, Clone)]
pub struct SheetPaths {
    /// Base directory for all SheetKeep data
    base_dir: PathBuf,
    /// Workbook file name inside the data directory
    workbook_file: String,
}

impl SheetPaths {
    /// Create a new SheetPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if no home/config directory can be determined.
    pub fn new() -> Result<Self, SheetError> {
        let base_dir = if let Ok(custom) = std::env::var("SHEETKEEP_DATA_DIR") {
            PathBuf::from(custom)
        } else {
            resolve_default_path()?
        };

        Ok(Self::with_base_dir(base_dir))
    }

    /// Create SheetPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            workbook_file: DEFAULT_WORKBOOK_FILE.to_string(),
        }
    }

    /// Use a different workbook file name inside the data directory
    pub fn with_workbook_file(mut self, name: impl Into<String>) -> Self {
        self.workbook_file = name.into();
        self
    }

    /// Get the base directory
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the data directory (<base>/data/)
    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    /// Get the snapshot directory (<base>/backups/)
    pub fn backup_dir(&self) -> PathBuf {
        self.base_dir.join("backups")
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the path to the workbook
    pub fn workbook_file(&self) -> PathBuf {
        self.data_dir().join(&self.workbook_file)
    }

    /// Get the path to the advisory lock file guarding the workbook
    pub fn lock_file(&self) -> PathBuf {
        self.data_dir().join(format!("{}.lock", self.workbook_file))
    }

    /// Get the path to the mutation journal
    pub fn journal_file(&self) -> PathBuf {
        self.data_dir().join("journal.jsonl")
    }

    /// Ensure all required directories exist
    pub fn ensure_directories(&self) -> Result<(), SheetError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| SheetError::Io(format!("Failed to create base directory: {}", e)))?;

        std::fs::create_dir_all(self.data_dir())
            .map_err(|e| SheetError::Io(format!("Failed to create data directory: {}", e)))?;

        std::fs::create_dir_all(self.backup_dir())
            .map_err(|e| SheetError::Io(format!("Failed to create backup directory: {}", e)))?;

        Ok(())
    }

    /// Check if a workbook has been created
    pub fn is_initialized(&self) -> bool {
        self.workbook_file().exists()
    }
}

fn resolve_default_path() -> Result<PathBuf, SheetError> {
    ProjectDirs::from("", "", "sheetkeep")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| SheetError::Config("Could not determine a home directory".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_custom_base_dir() {
        let temp_dir = TempDir::new().unwrap();
        let paths = SheetPaths::with_base_dir(temp_dir.path().to_path_buf());

        assert_eq!(paths.base_dir(), temp_dir.path());
        assert_eq!(paths.data_dir(), temp_dir.path().join("data"));
        assert_eq!(paths.backup_dir(), temp_dir.path().join("backups"));
    }

    #[test]
    fn test_env_var_override() {
        let temp_dir = TempDir::new().unwrap();
        let custom_path = temp_dir.path().to_str().unwrap();

        env::set_var("SHEETKEEP_DATA_DIR", custom_path);

        let paths = SheetPaths::new().unwrap();
        assert_eq!(paths.base_dir(), temp_dir.path());

        env::remove_var("SHEETKEEP_DATA_DIR");
    }

    #[test]
    fn test_ensure_directories() {
        let temp_dir = TempDir::new().unwrap();
        let paths = SheetPaths::with_base_dir(temp_dir.path().to_path_buf());

        paths.ensure_directories().unwrap();

        assert!(paths.data_dir().exists());
        assert!(paths.backup_dir().exists());
        assert!(!paths.is_initialized());
    }

    #[test]
    fn test_file_paths() {
        let temp_dir = TempDir::new().unwrap();
        let paths = SheetPaths::with_base_dir(temp_dir.path().to_path_buf())
            .with_workbook_file("financas.json");

        assert_eq!(paths.settings_file(), temp_dir.path().join("config.json"));
        assert_eq!(
            paths.workbook_file(),
            temp_dir.path().join("data").join("financas.json")
        );
        assert_eq!(
            paths.lock_file(),
            temp_dir.path().join("data").join("financas.json.lock")
        );
    }
}
