use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sheetkeep::cli::{
    handle_backup_command, handle_journal_command, handle_record_command, handle_table_command,
};
use sheetkeep::config::{paths::SheetPaths, settings::Settings};
use sheetkeep::services::CrudService;

#[derive(Parser)]
#[command(
    name = "sheetkeep",
    author = "Kaylee Beyene",
    version,
    about = "Workbook-backed tables with snapshot backups",
    long_about = "SheetKeep stores named tables in a single workbook file. Every \
                  change is bracketed by before/after snapshots and recorded in a \
                  journal, so any edit can be undone from the command line."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directories and an empty workbook
    Init {
        /// Also create every table listed in required_columns
        #[arg(long)]
        with_tables: bool,
    },

    /// Show current configuration and paths
    Config,

    /// Table management commands
    #[command(subcommand)]
    Table(sheetkeep::cli::TableCommands),

    /// Record management commands
    #[command(subcommand, alias = "row")]
    Record(sheetkeep::cli::RecordCommands),

    /// Snapshot management commands
    #[command(subcommand)]
    Backup(sheetkeep::cli::BackupCommands),

    /// Mutation journal commands
    #[command(subcommand)]
    Journal(sheetkeep::cli::JournalCommands),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("SHEETKEEP_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Initialize paths and settings
    let paths = SheetPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;
    let paths = paths.with_workbook_file(settings.workbook_file.clone());

    let service = CrudService::new(&paths, &settings);

    if !matches!(cli.command, Some(Commands::Init { .. }) | Some(Commands::Journal(_)) | None) {
        warn_pending(&service);
    }

    match cli.command {
        Some(Commands::Init { with_tables }) => {
            println!("Initializing SheetKeep at: {}", paths.base_dir().display());
            paths.ensure_directories()?;
            settings.save(&paths)?;

            if service.store().initialize()? {
                println!("Created empty workbook: {}", paths.workbook_file().display());
            } else {
                println!("Workbook already exists: {}", paths.workbook_file().display());
            }

            if with_tables {
                let existing = service.table_names()?;
                for (table, columns) in &settings.required_columns {
                    if existing.contains(table) {
                        continue;
                    }
                    service.create_table(table, columns)?;
                    println!("  created {} ({})", table, columns.join(", "));
                }
            }

            println!("Initialization complete!");
            println!();
            println!("Run 'sheetkeep table list' to see all tables.");
        }
        Some(Commands::Config) => {
            println!("SheetKeep Configuration");
            println!("=======================");
            println!("Base directory:   {}", paths.base_dir().display());
            println!("Workbook:         {}", paths.workbook_file().display());
            println!("Backup directory: {}", paths.backup_dir().display());
            println!("Journal:          {}", paths.journal_file().display());
            println!();
            println!("Settings:");
            println!("  Keep last snapshots: {}", settings.backup_retention.keep_last);
            println!("  Strict columns:      {}", settings.strict_columns);
            println!("  Lock timeout:        {} ms", settings.lock_timeout_ms);
            println!("  Required columns:");
            for (table, columns) in &settings.required_columns {
                println!("    {}: {}", table, columns.join(", "));
            }
        }
        Some(Commands::Table(cmd)) => handle_table_command(&service, cmd)?,
        Some(Commands::Record(cmd)) => handle_record_command(&service, cmd)?,
        Some(Commands::Backup(cmd)) => handle_backup_command(&service, cmd)?,
        Some(Commands::Journal(cmd)) => handle_journal_command(&service, cmd)?,
        None => {
            println!("SheetKeep - workbook tables with snapshot backups");
            println!();
            println!("Run 'sheetkeep --help' for usage information.");
            println!("Run 'sheetkeep init' to create a workbook.");
        }
    }

    Ok(())
}

/// Interrupted mutations are reported before any other command runs
fn warn_pending(service: &CrudService) {
    match service.pending_recoveries() {
        Ok(pending) if !pending.is_empty() => {
            eprintln!(
                "warning: {} interrupted mutation(s) found; see 'sheetkeep journal pending'",
                pending.len()
            );
        }
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "could not read mutation journal"),
    }
}
