//! Mutation guard
//!
//! Wraps every mutating call in the same protocol:
//!
//! ```text
//! Idle -> BackedUp -> Applying -> Committed -> Idle
//!                             \-> Failed    -> Idle
//! ```
//!
//! The workbook lock is held for the whole cycle. A `before_<op>` snapshot is
//! taken and journaled before the mutation runs; only a successful mutation
//! gets an `after_<op>` snapshot. After a failure the pre-snapshot is the only
//! recovery point. This is not a transaction: a crash while saving leaves a
//! `started` journal entry that must be rolled back by hand. Retention never
//! deletes the pre-snapshot of such an entry.

use std::cell::Cell;
use std::path::PathBuf;
use std::time::Duration;

use crate::backup::BackupManager;
use crate::error::SheetResult;
use crate::journal::{JournalEntry, MutationJournal, MutationKind};
use crate::models::MutationId;
use crate::storage::{TableStore, WorkbookLock};

/// Where a guarded call currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Idle,
    BackedUp,
    Applying,
    Committed,
    Failed,
}

/// What a mutation hands back to the guard
#[derive(Debug)]
pub struct Applied<T> {
    pub value: T,
    /// Summary written to the journal on commit
    pub detail: Option<String>,
}

impl<T> Applied<T> {
    pub fn new(value: T, detail: Option<String>) -> Self {
        Self { value, detail }
    }
}

/// Result of a committed guarded call
#[derive(Debug)]
pub struct Guarded<T> {
    pub value: T,
    pub mutation_id: MutationId,
    pub operation: String,
    pub pre_snapshot: PathBuf,
    /// Missing when the post-mutation snapshot could not be taken
    pub post_snapshot: Option<PathBuf>,
}

/// Before/after snapshot wrapper around mutations of one workbook
pub struct MutationGuard {
    store: TableStore,
    backups: BackupManager,
    journal: MutationJournal,
    lock_path: PathBuf,
    lock_timeout: Duration,
    state: Cell<GuardState>,
}

impl MutationGuard {
    pub fn new(
        store: TableStore,
        backups: BackupManager,
        journal: MutationJournal,
        lock_path: PathBuf,
        lock_timeout: Duration,
    ) -> Self {
        Self {
            store,
            backups,
            journal,
            lock_path,
            lock_timeout,
            state: Cell::new(GuardState::Idle),
        }
    }

    pub fn store(&self) -> &TableStore {
        &self.store
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    pub fn journal(&self) -> &MutationJournal {
        &self.journal
    }

    /// Current state; `Idle` whenever no call is in flight
    pub fn state(&self) -> GuardState {
        self.state.get()
    }

    fn transition(&self, next: GuardState, operation: &str) {
        tracing::debug!(operation, from = ?self.state.get(), to = ?next, "guard transition");
        self.state.set(next);
    }

    /// Hold the workbook lock for the duration of `f`
    pub fn with_lock<T>(&self, f: impl FnOnce() -> SheetResult<T>) -> SheetResult<T> {
        let _lock = WorkbookLock::acquire(&self.lock_path, self.lock_timeout)?;
        f()
    }

    /// Run `mutation` under the guard protocol
    pub fn run<T, F>(&self, kind: MutationKind, table: &str, mutation: F) -> SheetResult<Guarded<T>>
    where
        F: FnOnce(&TableStore) -> SheetResult<Applied<T>>,
    {
        let operation = format!("{}_{}", table, kind.verb());
        let _lock = WorkbookLock::acquire(&self.lock_path, self.lock_timeout)?;

        let pre_snapshot = self.snapshot(&format!("before_{}", operation))?;

        let mutation_id = MutationId::new();
        let started = JournalEntry::started(mutation_id, kind, table, pre_snapshot.clone());
        self.journal.append(&started)?;
        self.transition(GuardState::BackedUp, &operation);

        self.transition(GuardState::Applying, &operation);
        match mutation(&self.store) {
            Ok(applied) => {
                self.transition(GuardState::Committed, &operation);

                let post_snapshot = match self.snapshot(&format!("after_{}", operation)) {
                    Ok(path) => Some(path),
                    Err(e) => {
                        tracing::warn!(operation = %operation, error = %e, "post-mutation snapshot failed");
                        None
                    }
                };

                let committed =
                    JournalEntry::committed(&started, post_snapshot.clone(), applied.detail);
                if let Err(e) = self.journal.append(&committed) {
                    tracing::warn!(operation = %operation, error = %e, "could not journal commit");
                }

                tracing::info!(operation = %operation, mutation = %mutation_id, "mutation committed");
                self.transition(GuardState::Idle, &operation);

                Ok(Guarded {
                    value: applied.value,
                    mutation_id,
                    operation,
                    pre_snapshot,
                    post_snapshot,
                })
            }
            Err(err) => {
                self.transition(GuardState::Failed, &operation);

                if let Err(e) = self.journal.append(&JournalEntry::failed(&started, err.to_string())) {
                    tracing::warn!(operation = %operation, error = %e, "could not journal failure");
                }

                tracing::warn!(
                    operation = %operation,
                    error = %err,
                    recovery = %pre_snapshot.display(),
                    "mutation failed"
                );
                self.transition(GuardState::Idle, &operation);
                Err(err)
            }
        }
    }

    /// Pre-snapshots of mutations that never finished
    pub fn protected_snapshots(&self) -> SheetResult<Vec<PathBuf>> {
        Ok(self
            .journal
            .incomplete()?
            .into_iter()
            .filter_map(|e| e.pre_snapshot)
            .collect())
    }

    /// Take a snapshot and apply retention around pending recovery points
    ///
    /// With an unreadable journal nothing is pruned.
    fn snapshot(&self, label: &str) -> SheetResult<PathBuf> {
        match self.protected_snapshots() {
            Ok(protected) => self
                .backups
                .create_snapshot_with_retention(label, &protected)
                .map(|(path, _)| path),
            Err(e) => {
                tracing::warn!(error = %e, "journal unreadable, skipping retention");
                self.backups.create_snapshot(label)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::BackupRetention;
    use crate::error::SheetError;
    use crate::journal::MutationStatus;
    use crate::models::{CellValue, Table};
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_guard(keep_last: usize) -> (MutationGuard, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let data = temp_dir.path().join("data");
        let store = TableStore::new(data.join("workbook.json"));
        store.initialize().unwrap();
        store
            .save("Despesas", &Table::new("Despesas", vec!["VALOR".into()]))
            .unwrap();

        let guard = MutationGuard::new(
            store.clone(),
            BackupManager::with_dirs(
                store.path().to_path_buf(),
                temp_dir.path().join("backups"),
                BackupRetention { keep_last },
            ),
            MutationJournal::new(data.join("journal.jsonl")),
            data.join("workbook.json.lock"),
            Duration::from_millis(200),
        );
        (guard, temp_dir)
    }

    fn append_one(store: &TableStore) -> SheetResult<Applied<usize>> {
        let mut table = store.load("Despesas")?;
        let mut values = BTreeMap::new();
        values.insert("VALOR".to_string(), CellValue::Number(1.0));
        table.append(&values);
        store.save("Despesas", &table)?;
        Ok(Applied::new(table.row_count(), Some("1 row appended".into())))
    }

    #[test]
    fn test_success_takes_both_snapshots() {
        let (guard, _temp) = create_test_guard(10);

        let guarded = guard.run(MutationKind::Append, "Despesas", append_one).unwrap();

        assert_eq!(guarded.value, 1);
        assert_eq!(guarded.operation, "Despesas_append");
        assert_eq!(guard.state(), GuardState::Idle);

        let labels: Vec<String> = guard
            .backups()
            .list_snapshots()
            .unwrap()
            .into_iter()
            .map(|b| b.label)
            .collect();
        assert!(labels.contains(&"before_Despesas_append".to_string()));
        assert!(labels.contains(&"after_Despesas_append".to_string()));
        assert!(guarded.post_snapshot.is_some());

        let entries = guard.journal().read_all().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].status, MutationStatus::Committed);
        assert_eq!(entries[1].detail.as_deref(), Some("1 row appended"));
    }

    #[test]
    fn test_pre_snapshot_holds_previous_state() {
        let (guard, _temp) = create_test_guard(10);
        let before = fs::read(guard.store().path()).unwrap();

        let guarded = guard.run(MutationKind::Append, "Despesas", append_one).unwrap();

        assert_eq!(fs::read(&guarded.pre_snapshot).unwrap(), before);
        assert_eq!(
            fs::read(guarded.post_snapshot.unwrap()).unwrap(),
            fs::read(guard.store().path()).unwrap()
        );
    }

    #[test]
    fn test_failure_skips_post_snapshot() {
        let (guard, _temp) = create_test_guard(10);

        let result: SheetResult<Guarded<()>> = guard.run(MutationKind::Update, "Despesas", |_| {
            Err(SheetError::OutOfRange {
                ordinal: 3,
                row_count: 0,
            })
        });

        assert!(result.unwrap_err().is_out_of_range());
        assert_eq!(guard.state(), GuardState::Idle);

        let backups = guard.backups().list_snapshots().unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(backups[0].label, "before_Despesas_update");

        let entries = guard.journal().read_all().unwrap();
        assert_eq!(entries.last().unwrap().status, MutationStatus::Failed);
        assert!(guard.journal().incomplete().unwrap().is_empty());
    }

    #[test]
    fn test_missing_workbook_aborts_before_mutation() {
        let (guard, _temp) = create_test_guard(10);
        fs::remove_file(guard.store().path()).unwrap();

        let mut ran = false;
        let result = guard.run(MutationKind::Update, "Despesas", |_| {
            ran = true;
            Ok(Applied::new((), None))
        });

        assert!(result.unwrap_err().is_not_found());
        assert!(!ran);
        assert!(guard.journal().read_all().unwrap().is_empty());
    }

    #[test]
    fn test_held_lock_times_out() {
        let (guard, temp) = create_test_guard(10);
        let lock_path = temp.path().join("data").join("workbook.json.lock");
        let _held = WorkbookLock::acquire(&lock_path, Duration::from_millis(50)).unwrap();

        let result = guard.run(MutationKind::Append, "Despesas", append_one);

        assert!(matches!(result, Err(SheetError::Locked(_))));
        assert!(guard.backups().list_snapshots().unwrap().is_empty());
    }

    #[test]
    fn test_failed_post_snapshot_still_commits() {
        let (guard, temp) = create_test_guard(10);
        let backup_dir = temp.path().join("backups");

        let guarded = guard
            .run(MutationKind::Append, "Despesas", |store| {
                let applied = append_one(store)?;
                // A file where the backup directory should be
                fs::remove_dir_all(&backup_dir)?;
                fs::write(&backup_dir, b"")?;
                Ok(applied)
            })
            .unwrap();

        assert!(guarded.post_snapshot.is_none());
        assert_eq!(guarded.value, 1);
        assert_eq!(guard.state(), GuardState::Idle);
        assert_eq!(guard.store().load("Despesas").unwrap().row_count(), 1);

        let last = guard.journal().read_all().unwrap().pop().unwrap();
        assert_eq!(last.status, MutationStatus::Committed);
        assert!(last.post_snapshot.is_none());
        assert!(guard.journal().incomplete().unwrap().is_empty());
    }

    #[test]
    fn test_retention_keeps_pending_pre_snapshot() {
        let (guard, _temp) = create_test_guard(3);
        let pending_pre = guard.backups().create_snapshot("before_T_update").unwrap();
        guard
            .journal()
            .append(&JournalEntry::started(
                MutationId::new(),
                MutationKind::Update,
                "T",
                pending_pre.clone(),
            ))
            .unwrap();

        for _ in 0..6 {
            guard.run(MutationKind::Append, "Despesas", append_one).unwrap();
        }

        assert!(pending_pre.exists());
        assert_eq!(guard.backups().list_snapshots().unwrap().len(), 4);
        assert_eq!(guard.protected_snapshots().unwrap(), vec![pending_pre]);
    }

    #[test]
    fn test_retention_applies_to_guard_snapshots() {
        let (guard, _temp) = create_test_guard(3);

        for _ in 0..4 {
            guard.run(MutationKind::Append, "Despesas", append_one).unwrap();
        }

        assert_eq!(guard.backups().list_snapshots().unwrap().len(), 3);
    }
}
