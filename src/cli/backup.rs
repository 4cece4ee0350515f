//! Backup CLI commands
//!
//! Implements CLI commands for snapshot management.

use std::path::PathBuf;

use clap::Subcommand;

use crate::backup::BackupManager;
use crate::display::{format_size, format_snapshot_list};
use crate::error::{SheetError, SheetResult};
use crate::services::CrudService;

/// Backup subcommands
#[derive(Subcommand)]
pub enum BackupCommands {
    /// Take a snapshot of the workbook now
    Create {
        /// Label embedded in the snapshot name
        #[arg(short, long, default_value = "manual")]
        label: String,
    },

    /// List snapshots, newest first
    List {
        /// Show detailed information
        #[arg(short, long)]
        verbose: bool,
    },

    /// Restore the workbook from a snapshot
    Restore {
        /// Snapshot filename or path (use 'latest' for most recent)
        backup: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Show information about a specific snapshot
    Info {
        /// Snapshot filename or path
        backup: String,
    },

    /// Delete all but the newest snapshots
    Prune {
        /// How many snapshots to keep (default: retention setting)
        #[arg(short, long)]
        keep: Option<usize>,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

/// Handle a backup command
pub fn handle_backup_command(service: &CrudService, cmd: BackupCommands) -> SheetResult<()> {
    let manager = service.backups();

    match cmd {
        BackupCommands::Create { label } => {
            let backup_path = service.create_snapshot(&label)?;
            println!("Snapshot created: {}", file_name(&backup_path));
            println!("Location: {}", backup_path.display());
        }

        BackupCommands::List { verbose } => {
            let snapshots = service.list_snapshots()?;
            println!("{}", format_snapshot_list(&snapshots, verbose));
            if snapshots.is_empty() {
                println!("Create one with: sheetkeep backup create");
            }
        }

        BackupCommands::Restore { backup, force } => {
            let backup_path = resolve_backup_path(manager, &backup)?;
            let validation = manager.validate_snapshot(&backup_path)?;

            println!("Snapshot: {}", backup_path.display());
            println!("Status:   {}", validation.summary());
            println!();

            if !validation.is_valid {
                return Err(SheetError::Validation(format!(
                    "Refusing to restore an unreadable snapshot: {}",
                    file_name(&backup_path)
                )));
            }

            if !force {
                println!("WARNING: This will overwrite the whole workbook!");
                println!("To proceed, run again with --force flag:");
                println!("  sheetkeep backup restore {} --force", backup);
                return Ok(());
            }

            let result = service.restore_snapshot(&backup_path)?;
            println!("Restore complete!");
            println!("{}", result.summary());
        }

        BackupCommands::Info { backup } => {
            let backup_path = resolve_backup_path(manager, &backup)?;
            let validation = manager.validate_snapshot(&backup_path)?;
            let metadata = std::fs::metadata(&backup_path)?;

            println!("Snapshot Details");
            println!("================");
            println!("File: {}", backup_path.display());
            println!("Size: {}", format_size(metadata.len()));
            if let Some(info) = manager.find_snapshot(&file_name(&backup_path))? {
                println!("Label: {}", info.label);
                println!(
                    "Created: {}",
                    info.created_at.format("%Y-%m-%d %H:%M:%S UTC")
                );
            }
            println!();
            println!("Contents:");
            for (table, rows) in &validation.tables {
                println!("  {:<20} {} row(s)", table, rows);
            }
            println!();
            println!("Status: {}", validation.summary());
        }

        BackupCommands::Prune { keep, force } => {
            let keep = keep.unwrap_or(manager.retention().keep_last);
            let snapshots = service.list_snapshots()?;
            let to_delete = snapshots.len().saturating_sub(keep);

            if to_delete == 0 {
                println!("No snapshots to prune.");
                println!("Keeping the newest {}; you have {}.", keep, snapshots.len());
                return Ok(());
            }

            if !force {
                println!(
                    "{} of {} snapshot(s) would be deleted (keeping the newest {}).",
                    to_delete,
                    snapshots.len(),
                    keep
                );
                println!("To delete them, run again with --force flag:");
                println!("  sheetkeep backup prune --keep {} --force", keep);
                return Ok(());
            }

            let deleted = service.prune_snapshots(keep)?;
            println!("Deleted {} snapshot(s).", deleted);
        }
    }

    Ok(())
}

/// Resolve a snapshot identifier to a full path
fn resolve_backup_path(manager: &BackupManager, backup: &str) -> SheetResult<PathBuf> {
    if backup.eq_ignore_ascii_case("latest") {
        return manager
            .latest_snapshot()?
            .map(|b| b.path)
            .ok_or_else(|| SheetError::snapshot_not_found("latest"));
    }

    let path = PathBuf::from(backup);
    if path.exists() {
        return Ok(path);
    }

    let in_dir = manager.backup_dir().join(backup);
    if in_dir.exists() {
        return Ok(in_dir);
    }

    if let Some(ext) = manager.source().extension() {
        let with_ext = manager
            .backup_dir()
            .join(format!("{}.{}", backup, ext.to_string_lossy()));
        if with_ext.exists() {
            return Ok(with_ext);
        }
    }

    Err(SheetError::snapshot_not_found(backup))
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
