//! Table store over the workbook file
//!
//! Loads a named table as a full in-memory copy and saves a table by
//! rewriting the entire workbook. Every save reads the workbook currently on
//! disk, swaps in the one table, and writes the whole document atomically, so
//! the other tables are carried over exactly as they were committed.

use std::path::{Path, PathBuf};

use crate::error::{SheetError, SheetResult};
use crate::models::{Table, Workbook, WorkbookDocument};

use super::file_io::{read_json_required, write_json_atomic};

/// Persistence for the tables of one workbook file
#[derive(Debug, Clone)]
pub struct TableStore {
    path: PathBuf,
}

impl TableStore {
    /// Create a store for the workbook at `path`
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Path of the workbook file
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Create an empty workbook if none exists yet
    ///
    /// Returns `true` when a new file was written.
    pub fn initialize(&self) -> SheetResult<bool> {
        if self.exists() {
            return Ok(false);
        }
        write_json_atomic(&self.path, &WorkbookDocument::default())?;
        tracing::info!(workbook = %self.path.display(), "created empty workbook");
        Ok(true)
    }

    /// Load every table of the workbook
    pub fn load_workbook(&self) -> SheetResult<Workbook> {
        let doc: WorkbookDocument = read_json_required(&self.path)?;
        Ok(Workbook::from(doc))
    }

    /// Load one table as a detached copy
    pub fn load(&self, table_name: &str) -> SheetResult<Table> {
        let workbook = self.load_workbook()?;
        let table = workbook
            .table(table_name)
            .cloned()
            .ok_or_else(|| SheetError::table_not_found(table_name))?;

        tracing::debug!(
            table = table_name,
            rows = table.row_count(),
            version = table.version,
            "loaded table"
        );
        Ok(table)
    }

    /// Names of all tables in workbook order
    pub fn table_names(&self) -> SheetResult<Vec<String>> {
        Ok(self.load_workbook()?.table_names())
    }

    /// Replace the named table and rewrite the whole workbook
    ///
    /// The table is appended when the workbook has no table of that name.
    /// Returns the table's new version stamp. Callers holding copies of other
    /// tables must reload them afterwards.
    pub fn save(&self, table_name: &str, table: &Table) -> SheetResult<u64> {
        let mut workbook = self.load_workbook()?;

        let mut table = table.clone();
        table.name = table_name.to_string();
        table.version += 1;
        let version = table.version;
        let rows = table.row_count();

        workbook.put_table(table);
        write_json_atomic(&self.path, &WorkbookDocument::from(&workbook))?;

        tracing::debug!(table = table_name, rows, version, "saved table");
        Ok(version)
    }

    /// Add a new, empty table with the given columns
    pub fn create_table(&self, table_name: &str, columns: &[String]) -> SheetResult<Table> {
        let name = table_name.trim();
        if name.is_empty() {
            return Err(SheetError::Validation("Table name cannot be empty".into()));
        }

        for (i, column) in columns.iter().enumerate() {
            if column.trim().is_empty() {
                return Err(SheetError::Validation(format!(
                    "Column {} of '{}' has an empty name",
                    i, name
                )));
            }
            if columns[..i].contains(column) {
                return Err(SheetError::Validation(format!(
                    "Column '{}' appears twice in '{}'",
                    column, name
                )));
            }
        }

        if self.load_workbook()?.contains(name) {
            return Err(SheetError::Duplicate {
                entity_type: "Table",
                identifier: name.to_string(),
            });
        }

        let table = Table::new(name, columns.to_vec());
        self.save(name, &table)?;
        self.load(name)
    }

    /// Check that a table carries every required column
    ///
    /// Fails with `Validation` naming all missing columns.
    pub fn check_columns(&self, table_name: &str, required: &[String]) -> SheetResult<()> {
        let table = self.load(table_name)?;
        let missing: Vec<&str> = required
            .iter()
            .filter(|c| !table.has_column(c))
            .map(String::as_str)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(SheetError::Validation(format!(
                "Table '{}' is missing columns: {}",
                table_name,
                missing.join(", ")
            )))
        }
    }
}
