//! Service layer for SheetKeep
//!
//! The service layer sits on top of storage and backups. `MutationGuard`
//! brackets each mutation with snapshots and journal entries, and
//! `CrudService` is the facade callers use for every read and write.

pub mod crud;
pub mod guard;

pub use crud::{CrudService, MutationReport, Outcome};
pub use guard::{Applied, GuardState, Guarded, MutationGuard};
