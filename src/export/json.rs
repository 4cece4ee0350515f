//! JSON Export functionality
//!
//! Exports a table as an array of column -> value objects, or the whole
//! workbook with export metadata.

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{SheetError, SheetResult};
use crate::models::{Table, Workbook};

/// Current export schema version
pub const EXPORT_SCHEMA_VERSION: &str = "1.0.0";

/// One exported table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableExport {
    pub name: String,
    pub columns: Vec<String>,
    pub records: Vec<Value>,
}

impl From<&Table> for TableExport {
    fn from(table: &Table) -> Self {
        Self {
            name: table.name.clone(),
            columns: table.columns().to_vec(),
            records: (0..table.row_count())
                .filter_map(|i| table.record_json(i))
                .collect(),
        }
    }
}

/// Full workbook export structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkbookExport {
    /// Schema version for compatibility checking
    pub schema_version: String,

    /// Export timestamp
    pub exported_at: DateTime<Utc>,

    /// Application version that created the export
    pub app_version: String,

    pub tables: Vec<TableExport>,
}

impl WorkbookExport {
    pub fn from_workbook(workbook: &Workbook) -> Self {
        Self {
            schema_version: EXPORT_SCHEMA_VERSION.to_string(),
            exported_at: Utc::now(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            tables: workbook.tables().iter().map(TableExport::from).collect(),
        }
    }
}

/// Export one table's records as a JSON array
pub fn export_table_json<W: Write>(table: &Table, writer: W, pretty: bool) -> SheetResult<()> {
    let records = TableExport::from(table).records;

    if pretty {
        serde_json::to_writer_pretty(writer, &records)
    } else {
        serde_json::to_writer(writer, &records)
    }
    .map_err(|e| SheetError::Export(e.to_string()))
}

/// Export every table in the workbook
pub fn export_workbook_json<W: Write>(
    workbook: &Workbook,
    writer: W,
    pretty: bool,
) -> SheetResult<()> {
    let export = WorkbookExport::from_workbook(workbook);

    if pretty {
        serde_json::to_writer_pretty(writer, &export)
    } else {
        serde_json::to_writer(writer, &export)
    }
    .map_err(|e| SheetError::Export(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CellValue;
    use std::collections::BTreeMap;

    fn sample_table() -> Table {
        let mut table = Table::new("Receitas", vec!["VALOR".to_string(), "PAGO".to_string()]);
        let mut values = BTreeMap::new();
        values.insert("VALOR".to_string(), CellValue::from(1500.0));
        values.insert("PAGO".to_string(), CellValue::Bool(true));
        table.append(&values);
        table
    }

    #[test]
    fn test_export_table_json() {
        let mut output = Vec::new();
        export_table_json(&sample_table(), &mut output, false).unwrap();

        let parsed: Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(parsed[0]["VALOR"], serde_json::json!(1500.0));
        assert_eq!(parsed[0]["PAGO"], serde_json::json!(true));
    }

    #[test]
    fn test_export_workbook_json() {
        let mut workbook = Workbook::default();
        workbook.put_table(sample_table());

        let mut output = Vec::new();
        export_workbook_json(&workbook, &mut output, true).unwrap();

        let export: WorkbookExport = serde_json::from_slice(&output).unwrap();
        assert_eq!(export.schema_version, EXPORT_SCHEMA_VERSION);
        assert_eq!(export.tables.len(), 1);
        assert_eq!(export.tables[0].name, "Receitas");
        assert_eq!(export.tables[0].records.len(), 1);
    }
}
