//! User settings for SheetKeep
//!
//! Manages snapshot retention, column strictness, lock timeout, and the
//! required-column checks applied to well-known tables.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::paths::{SheetPaths, DEFAULT_WORKBOOK_FILE};
use crate::error::SheetError;

/// Snapshot retention settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupRetention {
    /// Number of most recent snapshots to keep after each automatic prune
    pub keep_last: usize,
}

impl Default for BackupRetention {
    fn default() -> Self {
        Self { keep_last: 10 }
    }
}

/// User settings for SheetKeep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Workbook file name inside the data directory
    #[serde(default = "default_workbook_file")]
    pub workbook_file: String,

    /// Snapshot retention policy
    #[serde(default)]
    pub backup_retention: BackupRetention,

    /// Reject updates naming columns that are not in the table schema
    #[serde(default)]
    pub strict_columns: bool,

    /// How long a mutation waits for the workbook lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,

    /// Columns each known table must carry
    #[serde(default = "default_required_columns")]
    pub required_columns: BTreeMap<String, Vec<String>>,
}

fn default_schema_version() -> u32 {
    1
}

fn default_workbook_file() -> String {
    DEFAULT_WORKBOOK_FILE.to_string()
}

fn default_lock_timeout_ms() -> u64 {
    5_000
}

fn default_required_columns() -> BTreeMap<String, Vec<String>> {
    let table = |cols: &[&str]| cols.iter().map(|c| c.to_string()).collect::<Vec<_>>();

    let mut required = BTreeMap::new();
    required.insert(
        "Receitas".to_string(),
        table(&["Data", "Descrição", "VALOR", "CATEGORIA"]),
    );
    required.insert(
        "Despesas".to_string(),
        table(&["Data", "Descrição", "VALOR", "CATEGORIA", "FAVORECIDO", "PAGO"]),
    );
    required.insert(
        "Div_CC".to_string(),
        table(&["Data", "Descrição", "VALOR", "CATEGORIA"]),
    );
    required.insert("Orcamento".to_string(), table(&["CATEGORIA", "Percentual"]));
    required
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            workbook_file: default_workbook_file(),
            backup_retention: BackupRetention::default(),
            strict_columns: false,
            lock_timeout_ms: default_lock_timeout_ms(),
            required_columns: default_required_columns(),
        }
    }
}

impl Settings {
    /// Lock wait as a `Duration`
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Required columns for a table, if it is one of the known tables
    pub fn required_columns_for(&self, table: &str) -> Option<&[String]> {
        self.required_columns.get(table).map(Vec::as_slice)
    }

    /// Load settings from disk, or create default settings if file doesn't exist
    pub fn load_or_create(paths: &SheetPaths) -> Result<Self, SheetError> {
        let settings_path = paths.settings_file();

        if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path)
                .map_err(|e| SheetError::Io(format!("Failed to read settings file: {}", e)))?;

            let settings: Settings = serde_json::from_str(&contents).map_err(|e| {
                SheetError::Config(format!("Failed to parse settings file: {}", e))
            })?;

            Ok(settings)
        } else {
            // Don't save yet - let caller decide when to persist
            Ok(Settings::default())
        }
    }

    /// Save settings to disk
    pub fn save(&self, paths: &SheetPaths) -> Result<(), SheetError> {
        paths.ensure_directories()?;

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| SheetError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(paths.settings_file(), contents)
            .map_err(|e| SheetError::Io(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.backup_retention.keep_last, 10);
        assert!(!settings.strict_columns);
        assert_eq!(settings.lock_timeout(), Duration::from_secs(5));
        assert_eq!(settings.workbook_file, "workbook.json");
        assert!(settings.required_columns_for("Despesas").is_some());
        assert!(settings.required_columns_for("Vendas").is_none());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let paths = SheetPaths::with_base_dir(temp_dir.path().to_path_buf());

        let mut settings = Settings::default();
        settings.backup_retention.keep_last = 3;
        settings.strict_columns = true;

        settings.save(&paths).unwrap();

        let loaded = Settings::load_or_create(&paths).unwrap();
        assert_eq!(loaded.backup_retention.keep_last, 3);
        assert!(loaded.strict_columns);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let loaded: Settings = serde_json::from_str(r#"{"strict_columns": true}"#).unwrap();
        assert!(loaded.strict_columns);
        assert_eq!(loaded.backup_retention.keep_last, 10);
        assert_eq!(loaded.lock_timeout_ms, 5_000);
        assert_eq!(loaded.required_columns.len(), 4);
    }
}
