//! Record CRUD service
//!
//! The single entry point callers use to read and mutate tables. Every
//! mutation runs under the [`MutationGuard`], so it is bracketed by
//! before/after snapshots and recorded in the journal.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::backup::{BackupInfo, BackupManager, RestoreResult};
use crate::config::paths::SheetPaths;
use crate::config::settings::Settings;
use crate::error::{SheetError, SheetResult};
use crate::journal::{generate_diff, JournalEntry, MutationJournal, MutationKind};
use crate::models::{CellValue, MutationId, RecordId, Table};
use crate::storage::{RecordIndex, TableStore};

use super::guard::{Applied, Guarded, MutationGuard};

/// What a committed mutation did
#[derive(Debug, Clone)]
pub struct MutationReport {
    pub mutation_id: MutationId,
    /// `<table>_<verb>`
    pub operation: String,
    pub table: String,
    pub rows_affected: usize,
    /// Rows in the table after the mutation
    pub row_count: usize,
    /// Stable ids of the rows touched (the new id for an append)
    pub record_ids: Vec<RecordId>,
    /// Change keys that matched no column and were dropped
    pub ignored_columns: Vec<String>,
    pub pre_snapshot: Option<PathBuf>,
    pub post_snapshot: Option<PathBuf>,
}

impl MutationReport {
    fn empty(operation: String, table: &str, row_count: usize) -> Self {
        Self {
            mutation_id: MutationId::new(),
            operation,
            table: table.to_string(),
            rows_affected: 0,
            row_count,
            record_ids: Vec::new(),
            ignored_columns: Vec::new(),
            pre_snapshot: None,
            post_snapshot: None,
        }
    }

    fn from_guarded(guarded: Guarded<Change>, table: &str) -> Self {
        Self {
            mutation_id: guarded.mutation_id,
            operation: guarded.operation,
            table: table.to_string(),
            rows_affected: guarded.value.record_ids.len(),
            row_count: guarded.value.row_count,
            record_ids: guarded.value.record_ids,
            ignored_columns: guarded.value.ignored_columns,
            pre_snapshot: Some(guarded.pre_snapshot),
            post_snapshot: guarded.post_snapshot,
        }
    }

    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{}: {} row(s) affected, {} row(s) remain",
            self.operation, self.rows_affected, self.row_count
        );
        if !self.ignored_columns.is_empty() {
            summary.push_str(&format!(
                " (ignored unknown columns: {})",
                self.ignored_columns.join(", ")
            ));
        }
        summary
    }
}

/// Flat success/message result for callers that only need a status line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub success: bool,
    pub message: String,
}

impl From<SheetResult<MutationReport>> for Outcome {
    fn from(result: SheetResult<MutationReport>) -> Self {
        match result {
            Ok(report) => Outcome {
                success: true,
                message: report.summary(),
            },
            Err(e) => Outcome {
                success: false,
                message: e.to_string(),
            },
        }
    }
}

/// What a mutation closure produced
struct Change {
    record_ids: Vec<RecordId>,
    row_count: usize,
    ignored_columns: Vec<String>,
}

/// Service for reading and mutating workbook tables
pub struct CrudService {
    guard: MutationGuard,
    strict_columns: bool,
    required_columns: BTreeMap<String, Vec<String>>,
}

impl CrudService {
    /// Create a service for the workbook described by `paths` and `settings`
    pub fn new(paths: &SheetPaths, settings: &Settings) -> Self {
        let store = TableStore::new(paths.workbook_file());
        let backups = BackupManager::new(paths, settings.backup_retention.clone());
        let journal = MutationJournal::new(paths.journal_file());
        let guard = MutationGuard::new(
            store,
            backups,
            journal,
            paths.lock_file(),
            settings.lock_timeout(),
        );

        Self {
            guard,
            strict_columns: settings.strict_columns,
            required_columns: settings.required_columns.clone(),
        }
    }

    pub fn store(&self) -> &TableStore {
        self.guard.store()
    }

    pub fn backups(&self) -> &BackupManager {
        self.guard.backups()
    }

    pub fn journal(&self) -> &MutationJournal {
        self.guard.journal()
    }

    pub fn guard(&self) -> &MutationGuard {
        &self.guard
    }

    // --- reads ---

    /// Load a table; never takes a snapshot
    pub fn load_table(&self, table: &str) -> SheetResult<Table> {
        self.store().load(table)
    }

    pub fn table_names(&self) -> SheetResult<Vec<String>> {
        self.store().table_names()
    }

    /// One record as a column -> value map
    pub fn get_record(&self, table: &str, ordinal: i64) -> SheetResult<BTreeMap<String, CellValue>> {
        let loaded = self.load_table(table)?;
        let found = RecordIndex::new(&loaded).resolve(ordinal)?;
        loaded
            .record_map(found.ordinal)
            .ok_or_else(|| SheetError::record_not_found(ordinal.to_string()))
    }

    /// Check a table against its configured required columns
    ///
    /// Tables with no configured requirement always pass.
    pub fn check_required_columns(&self, table: &str) -> SheetResult<()> {
        match self.required_columns.get(table) {
            Some(required) => self.store().check_columns(table, required),
            None => {
                self.load_table(table)?;
                Ok(())
            }
        }
    }

    // --- structure ---

    /// Create an empty table, bracketed by snapshots like any mutation
    pub fn create_table(&self, table: &str, columns: &[String]) -> SheetResult<Table> {
        let guarded = self.guard.run(MutationKind::Create, table, |store| {
            let created = store.create_table(table, columns)?;
            let detail = format!("columns: {}", created.columns().join(", "));
            Ok(Applied::new(created, Some(detail)))
        })?;
        Ok(guarded.value)
    }

    // --- mutations ---

    /// Overwrite cells of the record at `ordinal`
    ///
    /// Keys naming no existing column are ignored, or rejected when
    /// `strict_columns` is set. An empty change set still runs the guard and
    /// leaves every cell as it was.
    pub fn update_record(
        &self,
        table: &str,
        ordinal: i64,
        changes: &BTreeMap<String, CellValue>,
    ) -> SheetResult<MutationReport> {
        self.update_where(table, changes, |loaded| {
            RecordIndex::new(loaded).resolve(ordinal)
        })
    }

    /// Overwrite cells of the record with a stable id
    pub fn update_by_id(
        &self,
        table: &str,
        id: RecordId,
        changes: &BTreeMap<String, CellValue>,
    ) -> SheetResult<MutationReport> {
        self.update_where(table, changes, |loaded| RecordIndex::new(loaded).resolve_id(id))
    }

    fn update_where<F>(
        &self,
        table: &str,
        changes: &BTreeMap<String, CellValue>,
        locate: F,
    ) -> SheetResult<MutationReport>
    where
        F: FnOnce(&Table) -> SheetResult<crate::storage::RecordRef>,
    {
        let strict = self.strict_columns;
        let guarded = self.guard.run(MutationKind::Update, table, |store| {
            let mut loaded = store.load(table)?;
            let target = locate(&loaded)?;

            if strict {
                let unknown: Vec<&str> = changes
                    .keys()
                    .filter(|k| !loaded.has_column(k))
                    .map(String::as_str)
                    .collect();
                if !unknown.is_empty() {
                    return Err(SheetError::Validation(format!(
                        "Unknown column(s) in '{}': {}",
                        table,
                        unknown.join(", ")
                    )));
                }
            }

            let before = loaded.record_json(target.ordinal).unwrap_or(Value::Null);
            let ignored_columns = loaded.assign(target.ordinal, changes);
            if !ignored_columns.is_empty() {
                tracing::debug!(table, ignored = ?ignored_columns, "ignoring unknown columns");
            }
            let after = loaded.record_json(target.ordinal).unwrap_or(Value::Null);

            store.save(table, &loaded)?;

            let detail = generate_diff(&before, &after)
                .map(|diff| format!("{}: {}", target.id, diff));
            Ok(Applied::new(
                Change {
                    record_ids: vec![target.id],
                    row_count: loaded.row_count(),
                    ignored_columns,
                },
                detail,
            ))
        })?;

        Ok(MutationReport::from_guarded(guarded, table))
    }

    /// Remove the record at `ordinal`; later rows shift down by one
    pub fn delete_record(&self, table: &str, ordinal: i64) -> SheetResult<MutationReport> {
        let guarded = self.guard.run(MutationKind::Delete, table, |store| {
            let mut loaded = store.load(table)?;
            let target = RecordIndex::new(&loaded).resolve(ordinal)?;
            Self::remove_refs(store, table, &mut loaded, &[target])
        })?;

        Ok(MutationReport::from_guarded(guarded, table))
    }

    /// Remove the record with a stable id
    pub fn delete_by_id(&self, table: &str, id: RecordId) -> SheetResult<MutationReport> {
        let guarded = self.guard.run(MutationKind::Delete, table, |store| {
            let mut loaded = store.load(table)?;
            let target = RecordIndex::new(&loaded).resolve_id(id)?;
            Self::remove_refs(store, table, &mut loaded, &[target])
        })?;

        Ok(MutationReport::from_guarded(guarded, table))
    }

    /// Remove several records in one save
    ///
    /// Ordinals refer to positions before any removal. Duplicates count once.
    /// If any ordinal is out of range nothing is removed. An empty batch is a
    /// no-op that takes no snapshots.
    pub fn delete_multiple_records(
        &self,
        table: &str,
        ordinals: &[i64],
    ) -> SheetResult<MutationReport> {
        if ordinals.is_empty() {
            let row_count = self.load_table(table)?.row_count();
            return Ok(MutationReport::empty(
                format!("{}_{}", table, MutationKind::BulkDelete.verb()),
                table,
                row_count,
            ));
        }

        let guarded = self.guard.run(MutationKind::BulkDelete, table, |store| {
            let mut loaded = store.load(table)?;
            let targets = RecordIndex::new(&loaded).resolve_many(ordinals)?;
            Self::remove_refs(store, table, &mut loaded, &targets)
        })?;

        Ok(MutationReport::from_guarded(guarded, table))
    }

    /// Add a record at the end of the table
    ///
    /// Keys naming new columns extend the table; missing keys are null.
    pub fn append_record(
        &self,
        table: &str,
        values: &BTreeMap<String, CellValue>,
    ) -> SheetResult<MutationReport> {
        let guarded = self.guard.run(MutationKind::Append, table, |store| {
            let mut loaded = store.load(table)?;
            let before_columns = loaded.columns().len();
            let id = loaded.append(values);
            store.save(table, &loaded)?;

            let mut detail = format!("{} appended", id);
            if loaded.columns().len() > before_columns {
                detail.push_str(&format!(
                    " (new columns: {})",
                    loaded.columns()[before_columns..].join(", ")
                ));
            }
            Ok(Applied::new(
                Change {
                    record_ids: vec![id],
                    row_count: loaded.row_count(),
                    ignored_columns: Vec::new(),
                },
                Some(detail),
            ))
        })?;

        Ok(MutationReport::from_guarded(guarded, table))
    }

    /// Remove resolved rows highest ordinal first, then save
    fn remove_refs(
        store: &TableStore,
        table: &str,
        loaded: &mut Table,
        targets: &[crate::storage::RecordRef],
    ) -> SheetResult<Applied<Change>> {
        let mut ordered = targets.to_vec();
        ordered.sort_by(|a, b| b.ordinal.cmp(&a.ordinal));

        let mut record_ids = Vec::with_capacity(ordered.len());
        for target in &ordered {
            record_ids.push(loaded.remove(target.ordinal).id);
        }
        record_ids.reverse();

        store.save(table, loaded)?;

        let detail = format!(
            "removed {}",
            record_ids
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(Applied::new(
            Change {
                record_ids,
                row_count: loaded.row_count(),
                ignored_columns: Vec::new(),
            },
            Some(detail),
        ))
    }

    // --- snapshots ---

    /// Manual snapshot; not subject to retention until the next guarded call
    pub fn create_snapshot(&self, label: &str) -> SheetResult<PathBuf> {
        self.guard
            .with_lock(|| self.backups().create_snapshot(label))
    }

    pub fn list_snapshots(&self) -> SheetResult<Vec<BackupInfo>> {
        self.backups().list_snapshots()
    }

    /// Replace the workbook with a snapshot, keeping a `before_restore` copy
    pub fn restore_snapshot(&self, snapshot: &Path) -> SheetResult<RestoreResult> {
        self.guard
            .with_lock(|| self.backups().restore_snapshot(snapshot))
    }

    /// Delete all but the newest `keep_last` snapshots
    ///
    /// Pre-snapshots of interrupted mutations are kept regardless.
    pub fn prune_snapshots(&self, keep_last: usize) -> SheetResult<usize> {
        self.guard.with_lock(|| {
            let protected = self.guard.protected_snapshots()?;
            self.backups().prune_protecting(keep_last, &protected)
        })
    }

    // --- recovery ---

    /// Mutations that were interrupted after their pre-snapshot
    pub fn pending_recoveries(&self) -> SheetResult<Vec<JournalEntry>> {
        self.journal().incomplete()
    }

    /// Restore the pre-snapshot of an interrupted mutation
    pub fn rollback_incomplete(&self, mutation_id: MutationId) -> SheetResult<RestoreResult> {
        let pending = self
            .pending_recoveries()?
            .into_iter()
            .find(|e| e.mutation_id == mutation_id);

        let started = match pending {
            Some(entry) => entry,
            None => {
                return match self.journal().find_started(mutation_id)? {
                    Some(_) => Err(SheetError::Validation(format!(
                        "Mutation {} already finished",
                        mutation_id
                    ))),
                    None => Err(SheetError::mutation_not_found(mutation_id.to_string())),
                }
            }
        };

        let snapshot = started.pre_snapshot.clone().ok_or_else(|| {
            SheetError::Validation(format!("Mutation {} has no pre-snapshot", mutation_id))
        })?;

        let result = self.guard.with_lock(|| {
            let result = self.backups().restore_snapshot(&snapshot)?;
            self.journal().append(&JournalEntry::rolled_back(&started))?;
            Ok(result)
        })?;

        tracing::info!(mutation = %mutation_id, snapshot = %snapshot.display(), "rolled back");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::MutationStatus;
    use tempfile::TempDir;

    fn create_test_service(strict: bool) -> (CrudService, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let paths = SheetPaths::with_base_dir(temp_dir.path().to_path_buf());
        paths.ensure_directories().unwrap();

        let settings = Settings {
            strict_columns: strict,
            ..Settings::default()
        };
        let service = CrudService::new(&paths, &settings);
        service.store().initialize().unwrap();
        service
            .create_table(
                "Despesas",
                &["DESCRICAO".to_string(), "VALOR".to_string()],
            )
            .unwrap();
        (service, temp_dir)
    }

    fn row(desc: &str, valor: f64) -> BTreeMap<String, CellValue> {
        let mut values = BTreeMap::new();
        values.insert("DESCRICAO".to_string(), CellValue::from(desc));
        values.insert("VALOR".to_string(), CellValue::from(valor));
        values
    }

    fn seed(service: &CrudService, count: usize) {
        for i in 0..count {
            service
                .append_record("Despesas", &row(&format!("item {}", i), i as f64))
                .unwrap();
        }
    }

    fn descriptions(service: &CrudService) -> Vec<String> {
        let table = service.load_table("Despesas").unwrap();
        (0..table.row_count())
            .map(|i| table.cell(i, "DESCRICAO").unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_update_changes_only_named_cell() {
        let (service, _temp) = create_test_service(false);
        seed(&service, 3);

        let mut changes = BTreeMap::new();
        changes.insert("VALOR".to_string(), CellValue::from(-42.5));
        let report = service.update_record("Despesas", 1, &changes).unwrap();

        assert_eq!(report.rows_affected, 1);
        assert_eq!(report.row_count, 3);
        let table = service.load_table("Despesas").unwrap();
        assert_eq!(table.cell(1, "VALOR"), Some(&CellValue::Number(-42.5)));
        assert_eq!(table.cell(1, "DESCRICAO").unwrap().to_string(), "item 1");
        assert_eq!(table.cell(0, "VALOR"), Some(&CellValue::Number(0.0)));
    }

    #[test]
    fn test_update_ignores_unknown_columns() {
        let (service, _temp) = create_test_service(false);
        seed(&service, 1);

        let mut changes = BTreeMap::new();
        changes.insert("NOPE".to_string(), CellValue::from(1.0));
        let report = service.update_record("Despesas", 0, &changes).unwrap();

        assert_eq!(report.ignored_columns, vec!["NOPE".to_string()]);
        assert!(!service.load_table("Despesas").unwrap().has_column("NOPE"));
    }

    #[test]
    fn test_strict_update_rejects_unknown_columns() {
        let (service, _temp) = create_test_service(true);
        seed(&service, 1);
        let before = std::fs::read(service.store().path()).unwrap();

        let mut changes = BTreeMap::new();
        changes.insert("NOPE".to_string(), CellValue::from(1.0));
        let err = service.update_record("Despesas", 0, &changes).unwrap_err();

        assert!(err.is_validation());
        assert_eq!(std::fs::read(service.store().path()).unwrap(), before);
    }

    #[test]
    fn test_out_of_range_update_fails() {
        let (service, _temp) = create_test_service(false);
        seed(&service, 2);

        let err = service.update_record("Despesas", 2, &row("x", 1.0)).unwrap_err();
        assert!(err.is_not_found());
        assert!(service.update_record("Despesas", -1, &row("x", 1.0)).is_err());
    }

    #[test]
    fn test_delete_shifts_rows() {
        let (service, _temp) = create_test_service(false);
        seed(&service, 3);

        let report = service.delete_record("Despesas", 0).unwrap();

        assert_eq!(report.row_count, 2);
        assert_eq!(descriptions(&service), vec!["item 1", "item 2"]);
    }

    #[test]
    fn test_bulk_delete_uses_original_positions() {
        let (service, _temp) = create_test_service(false);
        seed(&service, 5);

        let report = service
            .delete_multiple_records("Despesas", &[3, 0, 3])
            .unwrap();

        assert_eq!(report.rows_affected, 2);
        assert_eq!(descriptions(&service), vec!["item 1", "item 2", "item 4"]);
    }

    #[test]
    fn test_bulk_delete_is_all_or_nothing() {
        let (service, _temp) = create_test_service(false);
        seed(&service, 3);

        let err = service
            .delete_multiple_records("Despesas", &[0, 7])
            .unwrap_err();

        assert!(err.is_out_of_range());
        assert_eq!(descriptions(&service).len(), 3);
    }

    #[test]
    fn test_empty_bulk_delete_takes_no_snapshot() {
        let (service, _temp) = create_test_service(false);
        seed(&service, 2);
        let snapshots = service.list_snapshots().unwrap().len();

        let report = service.delete_multiple_records("Despesas", &[]).unwrap();

        assert_eq!(report.rows_affected, 0);
        assert_eq!(report.row_count, 2);
        assert!(report.pre_snapshot.is_none());
        assert_eq!(service.list_snapshots().unwrap().len(), snapshots);
    }

    #[test]
    fn test_append_grows_columns() {
        let (service, _temp) = create_test_service(false);

        let mut values = row("novo", 5.0);
        values.insert("PAGO".to_string(), CellValue::Bool(true));
        let report = service.append_record("Despesas", &values).unwrap();

        let table = service.load_table("Despesas").unwrap();
        assert_eq!(table.columns(), &["DESCRICAO", "VALOR", "PAGO"]);
        assert_eq!(report.record_ids, vec![table.records()[0].id]);
    }

    #[test]
    fn test_id_operations_survive_shifts() {
        let (service, _temp) = create_test_service(false);
        seed(&service, 3);
        let last = service.load_table("Despesas").unwrap().records()[2].id;

        service.delete_record("Despesas", 0).unwrap();
        service.delete_by_id("Despesas", last).unwrap();

        assert_eq!(descriptions(&service), vec!["item 1"]);
        assert!(service
            .delete_by_id("Despesas", last)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_update_by_id() {
        let (service, _temp) = create_test_service(false);
        seed(&service, 2);
        let id = service.load_table("Despesas").unwrap().records()[1].id;

        let mut changes = BTreeMap::new();
        changes.insert("DESCRICAO".to_string(), CellValue::from("pago"));
        service.update_by_id("Despesas", id, &changes).unwrap();

        assert_eq!(descriptions(&service), vec!["item 0", "pago"]);
    }

    #[test]
    fn test_unknown_table() {
        let (service, _temp) = create_test_service(false);

        assert!(service.load_table("Vendas").unwrap_err().is_not_found());
        assert!(service
            .append_record("Vendas", &row("x", 1.0))
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_get_record() {
        let (service, _temp) = create_test_service(false);
        seed(&service, 1);

        let record = service.get_record("Despesas", 0).unwrap();
        assert_eq!(record["VALOR"], CellValue::Number(0.0));
    }

    #[test]
    fn test_rollback_incomplete_restores_pre_snapshot() {
        let (service, _temp) = create_test_service(false);
        seed(&service, 1);
        let before = std::fs::read(service.store().path()).unwrap();

        let pre = service.create_snapshot("before_Despesas_update").unwrap();
        let started = JournalEntry::started(
            MutationId::new(),
            MutationKind::Update,
            "Despesas",
            pre,
        );
        service.journal().append(&started).unwrap();
        seed(&service, 2);

        assert_eq!(service.pending_recoveries().unwrap().len(), 1);
        service.rollback_incomplete(started.mutation_id).unwrap();

        assert_eq!(std::fs::read(service.store().path()).unwrap(), before);
        assert!(service.pending_recoveries().unwrap().is_empty());
        let last = service.journal().read_all().unwrap().pop().unwrap();
        assert_eq!(last.status, MutationStatus::RolledBack);
    }

    #[test]
    fn test_create_table_is_guarded() {
        let (service, _temp) = create_test_service(false);

        let created = service
            .create_table("Receitas", &["VALOR".to_string()])
            .unwrap();

        assert_eq!(created.columns(), &["VALOR"]);
        let labels: Vec<String> = service
            .list_snapshots()
            .unwrap()
            .into_iter()
            .map(|b| b.label)
            .collect();
        assert!(labels.contains(&"before_Receitas_create".to_string()));
        assert!(labels.contains(&"after_Receitas_create".to_string()));

        let last = service.journal().read_all().unwrap().pop().unwrap();
        assert_eq!(last.kind, MutationKind::Create);
        assert_eq!(last.status, MutationStatus::Committed);

        assert!(matches!(
            service.create_table("Receitas", &["VALOR".to_string()]),
            Err(SheetError::Duplicate { .. })
        ));
    }

    #[test]
    fn test_manual_prune_keeps_pending_pre_snapshot() {
        let (service, _temp) = create_test_service(false);
        let pre = service.create_snapshot("before_Despesas_update").unwrap();
        service
            .journal()
            .append(&JournalEntry::started(
                MutationId::new(),
                MutationKind::Update,
                "Despesas",
                pre.clone(),
            ))
            .unwrap();

        service.prune_snapshots(0).unwrap();

        let remaining = service.list_snapshots().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].path, pre);
    }

    #[test]
    fn test_rollback_rejects_finished_mutation() {
        let (service, _temp) = create_test_service(false);
        let report = service.append_record("Despesas", &row("x", 1.0)).unwrap();

        assert!(service
            .rollback_incomplete(report.mutation_id)
            .unwrap_err()
            .is_validation());
        assert!(service
            .rollback_incomplete(MutationId::new())
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_outcome_from_result() {
        let (service, _temp) = create_test_service(false);

        let ok: Outcome = service.append_record("Despesas", &row("x", 1.0)).into();
        assert!(ok.success);
        assert!(ok.message.contains("Despesas_append"));

        let failed: Outcome = service.delete_record("Despesas", 9).into();
        assert!(!failed.success);
    }

    #[test]
    fn test_required_columns_check() {
        let (service, _temp) = create_test_service(false);

        // Despesas has a configured requirement the test table lacks
        assert!(service
            .check_required_columns("Despesas")
            .unwrap_err()
            .is_validation());
    }
}
