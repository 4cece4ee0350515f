//! SheetKeep - workbook-backed table storage with snapshot backups
//!
//! This library stores named tables in one shared workbook file and guards
//! every mutation with whole-file snapshots taken before and after the
//! change. Interrupted mutations are tracked in a journal and can be rolled
//! back from their pre-mutation snapshot.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `models`: Cells, records, tables, and the workbook document
//! - `storage`: Workbook file access, ordinal resolution, and locking
//! - `backup`: Snapshot creation, listing, pruning, and restore
//! - `journal`: Append-only log of guarded mutations
//! - `services`: The mutation guard and the CRUD facade
//! - `export`: CSV and JSON export
//! - `display`: Terminal formatting
//! - `cli`: Command handlers for the `sheetkeep` binary
//!
//! # Example
//!
//! ```rust,ignore
//! use sheetkeep::config::{SheetPaths, Settings};
//! use sheetkeep::services::CrudService;
//!
//! let paths = SheetPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! let service = CrudService::new(&paths, &settings);
//! let report = service.delete_record("Despesas", 4)?;
//! ```

pub mod backup;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod export;
pub mod journal;
pub mod models;
pub mod services;
pub mod storage;

pub use error::{SheetError, SheetResult};
