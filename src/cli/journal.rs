//! Journal CLI commands
//!
//! Inspect the mutation journal and roll back mutations that were
//! interrupted mid-flight.

use clap::Subcommand;

use crate::error::{SheetError, SheetResult};
use crate::models::MutationId;
use crate::services::CrudService;

/// Journal subcommands
#[derive(Subcommand)]
pub enum JournalCommands {
    /// Show the most recent journal entries
    Recent {
        /// Number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// List mutations that started but never finished
    Pending,

    /// Restore the pre-snapshot of an interrupted mutation
    Rollback {
        /// Mutation id (mut-...)
        id: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

/// Handle a journal command
pub fn handle_journal_command(service: &CrudService, cmd: JournalCommands) -> SheetResult<()> {
    match cmd {
        JournalCommands::Recent { limit } => {
            let entries = service.journal().read_recent(limit)?;
            if entries.is_empty() {
                println!("Journal is empty.");
                return Ok(());
            }
            for entry in entries {
                println!("{}  {}", entry.format_human_readable(), entry.mutation_id);
            }
        }

        JournalCommands::Pending => {
            let pending = service.pending_recoveries()?;
            if pending.is_empty() {
                println!("No interrupted mutations.");
                return Ok(());
            }

            println!("Interrupted mutations");
            println!("=====================");
            for entry in &pending {
                println!(
                    "{}  {}  {}",
                    entry.mutation_id,
                    entry.operation(),
                    entry.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
                );
                if let Some(pre) = &entry.pre_snapshot {
                    println!("  recover from: {}", pre.display());
                }
            }
            println!();
            println!("Roll one back with: sheetkeep journal rollback <id> --force");
        }

        JournalCommands::Rollback { id, force } => {
            let mutation_id: MutationId = id
                .parse()
                .map_err(|_| SheetError::Validation(format!("Invalid mutation id: {}", id)))?;

            if !force {
                println!("WARNING: This will replace the whole workbook with the");
                println!("snapshot taken before mutation {}.", mutation_id);
                println!("To proceed, run again with --force flag:");
                println!("  sheetkeep journal rollback {} --force", id);
                return Ok(());
            }

            let result = service.rollback_incomplete(mutation_id)?;
            println!("Rolled back {}", mutation_id);
            println!("{}", result.summary());
        }
    }

    Ok(())
}
