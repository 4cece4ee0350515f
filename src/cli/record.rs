//! Record CLI commands
//!
//! Rows are addressed either by ordinal (`0`, `1`, ...) or by stable id
//! (`row-7`). Values are given as `COLUMN=VALUE` pairs.

use std::collections::BTreeMap;

use clap::Subcommand;

use crate::display::format_record;
use crate::error::{SheetError, SheetResult};
use crate::models::{CellValue, RecordId};
use crate::services::{CrudService, MutationReport};
use crate::storage::RecordIndex;

/// Record subcommands
#[derive(Subcommand)]
pub enum RecordCommands {
    /// Show one record
    Show {
        /// Table name
        table: String,

        /// Row ordinal or id (row-N)
        #[arg(allow_hyphen_values = true)]
        row: String,
    },

    /// Update cells of one record
    Update {
        /// Table name
        table: String,

        /// Row ordinal or id (row-N)
        #[arg(allow_hyphen_values = true)]
        row: String,

        /// COLUMN=VALUE pairs
        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Delete one or more records
    Delete {
        /// Table name
        table: String,

        /// Row ordinals, or a single id (row-N)
        #[arg(required = true, allow_hyphen_values = true)]
        rows: Vec<String>,
    },

    /// Append a record
    Append {
        /// Table name
        table: String,

        /// COLUMN=VALUE pairs; unknown columns are added
        values: Vec<String>,
    },
}

/// How a row was addressed on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowTarget {
    Ordinal(i64),
    Id(RecordId),
}

impl RowTarget {
    pub fn parse(input: &str) -> SheetResult<Self> {
        let input = input.trim();
        if input.starts_with("row-") {
            return input
                .parse::<RecordId>()
                .map(RowTarget::Id)
                .map_err(|_| SheetError::Validation(format!("Invalid row id: {}", input)));
        }
        input
            .parse::<i64>()
            .map(RowTarget::Ordinal)
            .map_err(|_| SheetError::Validation(format!("Invalid row: {}", input)))
    }
}

/// Parse a `COLUMN=VALUE` pair
pub fn parse_assignment(input: &str) -> SheetResult<(String, CellValue)> {
    let (column, value) = input.split_once('=').ok_or_else(|| {
        SheetError::Validation(format!("Expected COLUMN=VALUE, got '{}'", input))
    })?;

    let column = column.trim();
    if column.is_empty() {
        return Err(SheetError::Validation(format!(
            "Missing column name in '{}'",
            input
        )));
    }

    Ok((column.to_string(), CellValue::parse(value)))
}

fn parse_assignments(values: &[String]) -> SheetResult<BTreeMap<String, CellValue>> {
    values.iter().map(|v| parse_assignment(v)).collect()
}

/// Handle a record command
pub fn handle_record_command(service: &CrudService, cmd: RecordCommands) -> SheetResult<()> {
    match cmd {
        RecordCommands::Show { table, row } => {
            let loaded = service.load_table(&table)?;
            let index = RecordIndex::new(&loaded);
            let found = match RowTarget::parse(&row)? {
                RowTarget::Ordinal(ordinal) => index.resolve(ordinal)?,
                RowTarget::Id(id) => index.resolve_id(id)?,
            };
            print!("{}", format_record(&loaded, found.ordinal));
        }

        RecordCommands::Update { table, row, values } => {
            let changes = parse_assignments(&values)?;
            let report = match RowTarget::parse(&row)? {
                RowTarget::Ordinal(ordinal) => service.update_record(&table, ordinal, &changes)?,
                RowTarget::Id(id) => service.update_by_id(&table, id, &changes)?,
            };
            print_report(&report);
        }

        RecordCommands::Delete { table, rows } => {
            let targets = rows
                .iter()
                .map(|r| RowTarget::parse(r))
                .collect::<SheetResult<Vec<_>>>()?;

            let report = match targets.as_slice() {
                [RowTarget::Ordinal(ordinal)] => service.delete_record(&table, *ordinal)?,
                [RowTarget::Id(id)] => service.delete_by_id(&table, *id)?,
                _ => {
                    let mut ordinals = Vec::with_capacity(targets.len());
                    for target in &targets {
                        match target {
                            RowTarget::Ordinal(ordinal) => ordinals.push(*ordinal),
                            RowTarget::Id(id) => {
                                return Err(SheetError::Validation(format!(
                                    "Ids cannot be mixed into a bulk delete ({})",
                                    id
                                )))
                            }
                        }
                    }
                    service.delete_multiple_records(&table, &ordinals)?
                }
            };
            print_report(&report);
        }

        RecordCommands::Append { table, values } => {
            let values = parse_assignments(&values)?;
            let report = service.append_record(&table, &values)?;
            print_report(&report);
        }
    }

    Ok(())
}

fn print_report(report: &MutationReport) {
    println!("{}", report.summary());
    if let Some(pre) = &report.pre_snapshot {
        println!("  before: {}", pre.display());
    }
    match &report.post_snapshot {
        Some(post) => println!("  after:  {}", post.display()),
        None if report.pre_snapshot.is_some() => {
            println!("  after:  (snapshot failed, see log)")
        }
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignment() {
        let (column, value) = parse_assignment("VALOR=-42.5").unwrap();
        assert_eq!(column, "VALOR");
        assert_eq!(value, CellValue::Number(-42.5));

        let (_, value) = parse_assignment("Descrição=a=b").unwrap();
        assert_eq!(value, CellValue::Text("a=b".into()));

        let (_, value) = parse_assignment("PAGO=").unwrap();
        assert_eq!(value, CellValue::Null);
    }

    #[test]
    fn test_parse_assignment_errors() {
        assert!(parse_assignment("VALOR").unwrap_err().is_validation());
        assert!(parse_assignment("=1").unwrap_err().is_validation());
    }

    #[test]
    fn test_row_target() {
        assert_eq!(RowTarget::parse("3").unwrap(), RowTarget::Ordinal(3));
        assert_eq!(RowTarget::parse("-1").unwrap(), RowTarget::Ordinal(-1));
        assert_eq!(
            RowTarget::parse("row-7").unwrap(),
            RowTarget::Id(RecordId::new(7))
        );
        assert!(RowTarget::parse("row-x").is_err());
        assert!(RowTarget::parse("abc").is_err());
    }
}
