//! Table CLI commands
//!
//! Listing, showing, creating, checking, and exporting workbook tables.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use clap::{Subcommand, ValueEnum};

use crate::display::format_table;
use crate::error::{SheetError, SheetResult};
use crate::export::{export_table_csv, export_table_json, export_workbook_json};
use crate::services::CrudService;

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// One line per record (single table)
    Csv,
    /// Array of records, or the full workbook with --all
    Json,
}

/// Table subcommands
#[derive(Subcommand)]
pub enum TableCommands {
    /// List tables with their row counts
    List,

    /// Print a table
    Show {
        /// Table name
        name: String,

        /// Show at most this many rows
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Create an empty table
    Create {
        /// Table name
        name: String,

        /// Column names, in order
        #[arg(required = true)]
        columns: Vec<String>,
    },

    /// Check tables against their configured required columns
    Check {
        /// Table to check (default: every configured table present)
        name: Option<String>,
    },

    /// Export a table (or the whole workbook)
    Export {
        /// Table name (omit with --all)
        name: Option<String>,

        /// Export format
        #[arg(short, long, value_enum, default_value = "csv")]
        format: ExportFormat,

        /// Export every table (JSON only)
        #[arg(long)]
        all: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
}

/// Handle a table command
pub fn handle_table_command(service: &CrudService, cmd: TableCommands) -> SheetResult<()> {
    match cmd {
        TableCommands::List => {
            let workbook = service.store().load_workbook()?;
            if workbook.tables().is_empty() {
                println!("No tables found.");
                println!("Create one with: sheetkeep table create <name> <columns>...");
                return Ok(());
            }

            for table in workbook.tables() {
                println!(
                    "  {:<20} {:>6} row(s)  {} column(s)  v{}",
                    table.name,
                    table.row_count(),
                    table.columns().len(),
                    table.version
                );
            }
        }

        TableCommands::Show { name, limit } => {
            let table = service.load_table(&name)?;
            println!("{}", format_table(&table, limit));
        }

        TableCommands::Create { name, columns } => {
            let table = service.create_table(&name, &columns)?;
            println!(
                "Created table '{}' with columns: {}",
                table.name,
                table.columns().join(", ")
            );
        }

        TableCommands::Check { name } => {
            let names = match name {
                Some(name) => vec![name],
                None => service.table_names()?,
            };

            let mut failures = 0;
            for table in &names {
                match service.check_required_columns(table) {
                    Ok(()) => println!("  OK      {}", table),
                    Err(e) if e.is_validation() => {
                        failures += 1;
                        println!("  FAILED  {}: {}", table, e);
                    }
                    Err(e) => return Err(e),
                }
            }

            if failures > 0 {
                return Err(SheetError::Validation(format!(
                    "{} table(s) missing required columns",
                    failures
                )));
            }
        }

        TableCommands::Export {
            name,
            format,
            all,
            output,
            pretty,
        } => {
            let writer: Box<dyn Write> = match &output {
                Some(path) => Box::new(BufWriter::new(File::create(path)?)),
                None => Box::new(io::stdout().lock()),
            };

            match (name, all) {
                (_, true) => {
                    if format != ExportFormat::Json {
                        return Err(SheetError::Validation(
                            "--all is only supported with --format json".into(),
                        ));
                    }
                    let workbook = service.store().load_workbook()?;
                    export_workbook_json(&workbook, writer, pretty)?;
                }
                (Some(name), false) => {
                    let table = service.load_table(&name)?;
                    match format {
                        ExportFormat::Csv => export_table_csv(&table, writer)?,
                        ExportFormat::Json => export_table_json(&table, writer, pretty)?,
                    }
                }
                (None, false) => {
                    return Err(SheetError::Validation(
                        "Name a table to export, or pass --all".into(),
                    ));
                }
            }

            if let Some(path) = output {
                eprintln!("Exported to {}", path.display());
            }
        }
    }

    Ok(())
}
