//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the service layer.

pub mod backup;
pub mod journal;
pub mod record;
pub mod table;

pub use backup::{handle_backup_command, BackupCommands};
pub use journal::{handle_journal_command, JournalCommands};
pub use record::{handle_record_command, RecordCommands};
pub use table::{handle_table_command, TableCommands};
