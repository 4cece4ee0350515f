//! Export module for SheetKeep
//!
//! - CSV: one table, spreadsheet-compatible
//! - JSON: one table as an array of records, or the whole workbook

pub mod csv;
pub mod json;

pub use self::csv::export_table_csv;
pub use json::{
    export_table_json, export_workbook_json, TableExport, WorkbookExport, EXPORT_SCHEMA_VERSION,
};
