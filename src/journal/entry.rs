//! Journal entry data structures
//!
//! Every guarded mutation writes a `started` entry once its pre-snapshot
//! exists and a terminal entry (`committed`, `failed`, or later
//! `rolled_back`) when it finishes. A `started` entry with no terminal entry
//! marks a mutation interrupted mid-flight.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::MutationId;

/// Kinds of guarded mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Update,
    Delete,
    BulkDelete,
    Append,
    Create,
}

impl MutationKind {
    /// Verb used in operation labels (`<table>_<verb>`)
    pub fn verb(&self) -> &'static str {
        match self {
            MutationKind::Update => "update",
            MutationKind::Delete => "delete",
            MutationKind::BulkDelete => "bulk_delete",
            MutationKind::Append => "append",
            MutationKind::Create => "create",
        }
    }
}

impl std::fmt::Display for MutationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.verb().to_uppercase())
    }
}

/// Lifecycle state recorded by an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationStatus {
    /// Pre-snapshot taken, mutation about to run
    Started,
    /// Table saved
    Committed,
    /// Mutation failed; pre-snapshot is the recovery point
    Failed,
    /// Interrupted mutation undone by restoring its pre-snapshot
    RolledBack,
}

impl MutationStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, MutationStatus::Started)
    }
}

impl std::fmt::Display for MutationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MutationStatus::Started => write!(f, "STARTED"),
            MutationStatus::Committed => write!(f, "COMMITTED"),
            MutationStatus::Failed => write!(f, "FAILED"),
            MutationStatus::RolledBack => write!(f, "ROLLED BACK"),
        }
    }
}

/// A single journal entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    /// When the transition happened (UTC)
    pub timestamp: DateTime<Utc>,

    /// Mutation this entry belongs to
    pub mutation_id: MutationId,

    /// State reached
    pub status: MutationStatus,

    /// Kind of mutation
    pub kind: MutationKind,

    /// Table being mutated
    pub table: String,

    /// Snapshot taken before the mutation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_snapshot: Option<PathBuf>,

    /// Snapshot taken after a successful mutation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_snapshot: Option<PathBuf>,

    /// Diff summary on commit, error message on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl JournalEntry {
    fn new(
        mutation_id: MutationId,
        status: MutationStatus,
        kind: MutationKind,
        table: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            mutation_id,
            status,
            kind,
            table: table.into(),
            pre_snapshot: None,
            post_snapshot: None,
            detail: None,
        }
    }

    /// Entry written once the pre-snapshot exists
    pub fn started(
        mutation_id: MutationId,
        kind: MutationKind,
        table: impl Into<String>,
        pre_snapshot: PathBuf,
    ) -> Self {
        let mut entry = Self::new(mutation_id, MutationStatus::Started, kind, table);
        entry.pre_snapshot = Some(pre_snapshot);
        entry
    }

    /// Entry written after the table was saved
    pub fn committed(
        started: &JournalEntry,
        post_snapshot: Option<PathBuf>,
        detail: Option<String>,
    ) -> Self {
        let mut entry = Self::follow_up(started, MutationStatus::Committed);
        entry.post_snapshot = post_snapshot;
        entry.detail = detail;
        entry
    }

    /// Entry written when the mutation failed
    pub fn failed(started: &JournalEntry, error: impl Into<String>) -> Self {
        let mut entry = Self::follow_up(started, MutationStatus::Failed);
        entry.detail = Some(error.into());
        entry
    }

    /// Entry written when an interrupted mutation was rolled back
    pub fn rolled_back(started: &JournalEntry) -> Self {
        Self::follow_up(started, MutationStatus::RolledBack)
    }

    fn follow_up(started: &JournalEntry, status: MutationStatus) -> Self {
        let mut entry = Self::new(started.mutation_id, status, started.kind, &started.table);
        entry.pre_snapshot = started.pre_snapshot.clone();
        entry
    }

    /// Operation name, `<table>_<verb>`
    pub fn operation(&self) -> String {
        format!("{}_{}", self.table, self.kind.verb())
    }

    /// Format the entry for human-readable display
    pub fn format_human_readable(&self) -> String {
        let mut output = format!(
            "[{}] {} {} {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            self.status,
            self.kind,
            self.table
        );

        if let Some(detail) = &self.detail {
            output.push_str(&format!("\n  {}", detail));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started() -> JournalEntry {
        JournalEntry::started(
            MutationId::new(),
            MutationKind::BulkDelete,
            "Despesas",
            PathBuf::from("backups/backup_before_Despesas_bulk_delete_20240101_000000.json"),
        )
    }

    #[test]
    fn test_follow_ups_share_identity() {
        let start = started();
        let commit = JournalEntry::committed(&start, None, Some("2 rows removed".into()));
        let fail = JournalEntry::failed(&start, "disk full");

        assert_eq!(commit.mutation_id, start.mutation_id);
        assert_eq!(commit.pre_snapshot, start.pre_snapshot);
        assert_eq!(fail.status, MutationStatus::Failed);
        assert_eq!(fail.detail.as_deref(), Some("disk full"));
        assert!(fail.status.is_terminal());
        assert!(!start.status.is_terminal());
    }

    #[test]
    fn test_operation_name() {
        assert_eq!(started().operation(), "Despesas_bulk_delete");
    }

    #[test]
    fn test_serialization() {
        let entry = started();
        let json = serde_json::to_string(&entry).unwrap();

        assert!(json.contains("\"status\":\"started\""));
        assert!(json.contains("\"kind\":\"bulk_delete\""));
        assert!(!json.contains("post_snapshot"));

        let back: JournalEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.mutation_id, entry.mutation_id);
    }

    #[test]
    fn test_human_readable_format() {
        let start = started();
        let entry = JournalEntry::failed(&start, "Row 10 is out of range (table has 5 rows)");
        let formatted = entry.format_human_readable();

        assert!(formatted.contains("FAILED"));
        assert!(formatted.contains("BULK_DELETE"));
        assert!(formatted.contains("Despesas"));
        assert!(formatted.contains("out of range"));
    }
}
