//! Display formatting for terminal output
//!
//! Renders tables, single records, and snapshot listings.

pub mod table;

pub use table::{format_duration, format_record, format_size, format_snapshot_list, format_table};
