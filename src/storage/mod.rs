//! Storage layer for SheetKeep
//!
//! Provides the workbook-backed table store with atomic writes, record
//! addressing over loaded tables, and the advisory workbook lock.

pub mod file_io;
pub mod lock;
pub mod record_index;
pub mod table_store;

pub use file_io::{read_json_required, write_bytes_atomic, write_json_atomic};
pub use lock::WorkbookLock;
pub use record_index::{RecordIndex, RecordRef};
pub use table_store::TableStore;
