//! Core data models for SheetKeep
//!
//! This module contains the data structures of the storage layer: the
//! workbook, its tables and records, cell values, and typed ids.

pub mod cell;
pub mod ids;
pub mod table;
pub mod workbook;

pub use cell::CellValue;
pub use ids::{MutationId, RecordId};
pub use table::{Record, Table};
pub use workbook::{SheetDocument, Workbook, WorkbookDocument};
