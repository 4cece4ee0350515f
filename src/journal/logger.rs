//! Append-only mutation journal
//!
//! Each entry is written as a single JSON line and flushed immediately, so an
//! interrupted process leaves every state transition it reached on disk. A
//! line torn by a crash mid-write is cut off before the next append.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{SheetError, SheetResult};
use crate::models::MutationId;

use super::entry::{JournalEntry, MutationStatus};

/// Handles writing and reading the mutation journal (JSONL)
pub struct MutationJournal {
    /// Path to the journal file
    log_path: PathBuf,
}

impl MutationJournal {
    /// Create a journal that writes to the specified path
    pub fn new(log_path: PathBuf) -> Self {
        Self { log_path }
    }

    /// Append an entry and flush
    pub fn append(&self, entry: &JournalEntry) -> SheetResult<()> {
        if let Some(parent) = self.log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        self.truncate_torn_tail()?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|e| SheetError::Io(format!("Failed to open journal: {}", e)))?;

        let json = serde_json::to_string(entry)
            .map_err(|e| SheetError::Json(format!("Failed to serialize journal entry: {}", e)))?;

        writeln!(file, "{}", json)
            .map_err(|e| SheetError::Io(format!("Failed to write journal entry: {}", e)))?;

        file.sync_data()
            .map_err(|e| SheetError::Io(format!("Failed to flush journal: {}", e)))?;

        Ok(())
    }

    /// Drop a trailing line with no newline, left by a crash mid-append
    fn truncate_torn_tail(&self) -> SheetResult<()> {
        let mut file = match OpenOptions::new().read(true).write(true).open(&self.log_path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(SheetError::Io(format!("Failed to open journal: {}", e))),
        };

        let len = file.metadata()?.len();
        if len == 0 {
            return Ok(());
        }

        let mut last = [0u8; 1];
        file.seek(SeekFrom::End(-1))?;
        file.read_exact(&mut last)?;
        if last[0] == b'\n' {
            return Ok(());
        }

        let mut contents = Vec::new();
        file.seek(SeekFrom::Start(0))?;
        file.read_to_end(&mut contents)?;
        let keep = contents
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |i| i + 1) as u64;

        file.set_len(keep)
            .map_err(|e| SheetError::Io(format!("Failed to repair journal: {}", e)))?;
        file.sync_data()?;

        tracing::warn!(dropped_bytes = len - keep, "discarded torn journal line");
        Ok(())
    }

    /// Read all entries, oldest first
    ///
    /// A torn last line (crash mid-write) is skipped; any other unparsable
    /// line is an error.
    pub fn read_all(&self) -> SheetResult<Vec<JournalEntry>> {
        if !self.log_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.log_path)
            .map_err(|e| SheetError::Io(format!("Failed to open journal: {}", e)))?;

        let lines: Vec<String> = BufReader::new(file)
            .lines()
            .collect::<Result<_, _>>()
            .map_err(|e| SheetError::Io(format!("Failed to read journal: {}", e)))?;

        let last = lines.len().saturating_sub(1);
        let mut entries = Vec::new();

        for (line_num, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<JournalEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) if line_num == last => {
                    tracing::warn!(line = line_num + 1, error = %e, "skipping torn journal line");
                }
                Err(e) => {
                    return Err(SheetError::Json(format!(
                        "Failed to parse journal entry at line {}: {}",
                        line_num + 1,
                        e
                    )))
                }
            }
        }

        Ok(entries)
    }

    /// Read the most recent N entries
    pub fn read_recent(&self, count: usize) -> SheetResult<Vec<JournalEntry>> {
        let all_entries = self.read_all()?;
        let start = all_entries.len().saturating_sub(count);
        Ok(all_entries[start..].to_vec())
    }

    /// `started` entries that never reached a terminal state, oldest first
    pub fn incomplete(&self) -> SheetResult<Vec<JournalEntry>> {
        let entries = self.read_all()?;

        let mut latest: HashMap<MutationId, MutationStatus> = HashMap::new();
        for entry in &entries {
            latest.insert(entry.mutation_id, entry.status);
        }

        Ok(entries
            .into_iter()
            .filter(|e| {
                e.status == MutationStatus::Started
                    && latest.get(&e.mutation_id) == Some(&MutationStatus::Started)
            })
            .collect())
    }

    /// The `started` entry of a mutation
    pub fn find_started(&self, mutation_id: MutationId) -> SheetResult<Option<JournalEntry>> {
        Ok(self
            .read_all()?
            .into_iter()
            .find(|e| e.mutation_id == mutation_id && e.status == MutationStatus::Started))
    }

    pub fn exists(&self) -> bool {
        self.log_path.exists()
    }

    /// Get the path to the journal file
    pub fn path(&self) -> &Path {
        &self.log_path
    }
}
