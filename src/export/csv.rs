//! CSV Export functionality
//!
//! Exports one table to CSV: a header row with the column names, then one
//! line per record in ordinal order. Null cells are empty fields.

use std::io::Write;

use crate::error::SheetResult;
use crate::models::Table;

/// Export a table to CSV
pub fn export_table_csv<W: Write>(table: &Table, writer: W) -> SheetResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer.write_record(table.columns())?;

    for record in table.records() {
        csv_writer.write_record(record.cells.iter().map(|cell| cell.to_string()))?;
    }

    csv_writer
        .flush()
        .map_err(|e| crate::error::SheetError::Export(e.to_string()))?;
    Ok(())
}
