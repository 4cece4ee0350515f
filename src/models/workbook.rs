//! Workbook model and its on-disk document format
//!
//! The workbook is an ordered set of uniquely-named tables. On disk every
//! table is stored sheet-style: `rows[0]` is the header, the remaining rows are
//! data in insertion order. Surrogate ids travel in a parallel `row_ids` list
//! so the cells themselves stay exactly what a reader of the sheet sees.

use serde::{Deserialize, Serialize};

use super::cell::CellValue;
use super::table::Table;

/// Current workbook document version
pub const WORKBOOK_SCHEMA_VERSION: u32 = 1;

/// Serialized form of one table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetDocument {
    pub name: String,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub next_row_id: u64,
    /// Header row followed by data rows
    #[serde(default)]
    pub rows: Vec<Vec<CellValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_ids: Option<Vec<u64>>,
}

/// Serialized form of the workbook file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkbookDocument {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub tables: Vec<SheetDocument>,
}

fn default_schema_version() -> u32 {
    WORKBOOK_SCHEMA_VERSION
}

impl Default for WorkbookDocument {
    fn default() -> Self {
        Self {
            schema_version: WORKBOOK_SCHEMA_VERSION,
            tables: Vec::new(),
        }
    }
}

impl From<SheetDocument> for Table {
    fn from(sheet: SheetDocument) -> Self {
        let mut rows = sheet.rows.into_iter();
        let columns = rows
            .next()
            .map(|header| {
                header
                    .iter()
                    .enumerate()
                    .map(|(i, cell)| match cell {
                        CellValue::Null => format!("Unnamed: {}", i),
                        other => other.to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Table::from_parts(
            sheet.name,
            columns,
            rows.collect(),
            sheet.row_ids,
            sheet.version,
            sheet.next_row_id,
        )
    }
}

impl From<&Table> for SheetDocument {
    fn from(table: &Table) -> Self {
        let header = table
            .columns()
            .iter()
            .map(|c| CellValue::Text(c.clone()))
            .collect();

        let mut rows = Vec::with_capacity(table.row_count() + 1);
        rows.push(header);
        rows.extend(table.records().iter().map(|r| r.cells.clone()));

        Self {
            name: table.name.clone(),
            version: table.version,
            next_row_id: table.next_row_id(),
            rows,
            row_ids: Some(table.records().iter().map(|r| r.id.value()).collect()),
        }
    }
}

/// The whole workbook, fully loaded
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    tables: Vec<Table>,
}

impl Workbook {
    /// Table names in workbook order
    pub fn table_names(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.name.clone()).collect()
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table(name).is_some()
    }

    /// Replace the named table in place, or append it at the end
    pub fn put_table(&mut self, table: Table) {
        match self.tables.iter_mut().find(|t| t.name == table.name) {
            Some(slot) => *slot = table,
            None => self.tables.push(table),
        }
    }
}

impl From<WorkbookDocument> for Workbook {
    fn from(doc: WorkbookDocument) -> Self {
        Self {
            tables: doc.tables.into_iter().map(Table::from).collect(),
        }
    }
}

impl From<&Workbook> for WorkbookDocument {
    fn from(workbook: &Workbook) -> Self {
        Self {
            schema_version: WORKBOOK_SCHEMA_VERSION,
            tables: workbook.tables.iter().map(SheetDocument::from).collect(),
        }
    }
}
