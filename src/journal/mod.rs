//! Mutation journal for SheetKeep
//!
//! Records the lifecycle of every guarded mutation in an append-only JSONL
//! file next to the workbook.
//!
//! # Architecture
//!
//! - `JournalEntry`: one state transition (`started`, `committed`, `failed`,
//!   `rolled_back`) of one mutation, with the pre-snapshot it can be undone
//!   from.
//! - `MutationJournal`: appends entries and finds mutations that were
//!   interrupted after `started`.
//! - `generate_diff`: summarizes the cells a mutation changed.
//!
//! # Example
//!
//! ```rust,ignore
//! use sheetkeep::journal::MutationJournal;
//!
//! let journal = MutationJournal::new(paths.journal_file());
//! for entry in journal.incomplete()? {
//!     println!("interrupted: {} ({})", entry.operation(), entry.mutation_id);
//! }
//! ```

mod diff;
mod entry;
mod logger;

pub use diff::generate_diff;
pub use entry::{JournalEntry, MutationKind, MutationStatus};
pub use logger::MutationJournal;
