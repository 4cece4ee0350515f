//! Table and record models
//!
//! A `Table` is a full in-memory copy of one sheet of the workbook: an ordered
//! list of column names and an ordered list of records. Every record holds
//! exactly one cell per column.

use std::collections::BTreeMap;

use super::cell::CellValue;
use super::ids::RecordId;

/// One row of a table
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Surrogate key, stable across loads
    pub id: RecordId,
    /// Cell values in column order
    pub cells: Vec<CellValue>,
}

impl Record {
    /// Look up a cell by column position
    pub fn cell(&self, index: usize) -> Option<&CellValue> {
        self.cells.get(index)
    }
}

/// A named table loaded from the workbook
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Sheet name
    pub name: String,
    /// Column names (header row)
    columns: Vec<String>,
    /// Records in display order
    records: Vec<Record>,
    /// Number of committed saves of this table
    pub version: u64,
    /// Next surrogate id to hand out
    next_row_id: u64,
}

impl Table {
    /// Create an empty table with the given columns
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            records: Vec::new(),
            version: 0,
            next_row_id: 1,
        }
    }

    /// Rebuild a table from persisted parts
    ///
    /// Rows are padded with nulls (or the header with placeholder names) so
    /// every record has one cell per column. Rows without a persisted id get
    /// the next free ids in order.
    pub(crate) fn from_parts(
        name: String,
        mut columns: Vec<String>,
        rows: Vec<Vec<CellValue>>,
        row_ids: Option<Vec<u64>>,
        version: u64,
        next_row_id: u64,
    ) -> Self {
        let widest = rows.iter().map(Vec::len).max().unwrap_or(0);
        while columns.len() < widest {
            columns.push(format!("Unnamed: {}", columns.len()));
        }

        let ids = row_ids.filter(|ids| ids.len() == rows.len());
        let max_id = ids.as_ref().and_then(|ids| ids.iter().max().copied());
        let mut next_row_id = next_row_id.max(max_id.map_or(1, |m| m + 1)).max(1);

        let records = rows
            .into_iter()
            .enumerate()
            .map(|(i, mut cells)| {
                cells.resize(columns.len(), CellValue::Null);
                let id = match &ids {
                    Some(ids) => RecordId::new(ids[i]),
                    None => {
                        let id = RecordId::new(next_row_id);
                        next_row_id += 1;
                        id
                    }
                };
                Record { id, cells }
            })
            .collect();

        Self {
            name,
            columns,
            records,
            version,
            next_row_id,
        }
    }

    /// Column names in order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Records in order
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of data rows
    pub fn row_count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The id the next appended record will receive
    pub fn next_row_id(&self) -> u64 {
        self.next_row_id
    }

    /// Position of a column by name
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_index(column).is_some()
    }

    /// Add a column, filling existing records with nulls
    ///
    /// Returns the column's position. Adding an existing column is a no-op.
    pub fn add_column(&mut self, column: impl Into<String>) -> usize {
        let column = column.into();
        if let Some(index) = self.column_index(&column) {
            return index;
        }
        self.columns.push(column);
        for record in &mut self.records {
            record.cells.push(CellValue::Null);
        }
        self.columns.len() - 1
    }

    /// Get a cell by ordinal and column name
    pub fn cell(&self, ordinal: usize, column: &str) -> Option<&CellValue> {
        let index = self.column_index(column)?;
        self.records.get(ordinal)?.cell(index)
    }

    /// Overwrite the cells named in `changes` on the record at `ordinal`
    ///
    /// Keys that are not columns of this table are skipped and returned.
    pub(crate) fn assign(
        &mut self,
        ordinal: usize,
        changes: &BTreeMap<String, CellValue>,
    ) -> Vec<String> {
        let mut ignored = Vec::new();
        for (column, value) in changes {
            match self.column_index(column) {
                Some(index) => {
                    if let Some(record) = self.records.get_mut(ordinal) {
                        record.cells[index] = value.clone();
                    }
                }
                None => ignored.push(column.clone()),
            }
        }
        ignored
    }

    /// Append a record built from named values
    ///
    /// Names not yet in the schema become new columns.
    pub fn append(&mut self, values: &BTreeMap<String, CellValue>) -> RecordId {
        for column in values.keys() {
            self.add_column(column.as_str());
        }

        let cells = self
            .columns
            .iter()
            .map(|c| values.get(c).cloned().unwrap_or_default())
            .collect();

        let id = RecordId::new(self.next_row_id);
        self.next_row_id += 1;
        self.records.push(Record { id, cells });
        id
    }

    /// Remove the record at `ordinal`; following ordinals shift down by one
    pub(crate) fn remove(&mut self, ordinal: usize) -> Record {
        self.records.remove(ordinal)
    }

    /// Record at `ordinal` as a column → value map
    pub fn record_map(&self, ordinal: usize) -> Option<BTreeMap<String, CellValue>> {
        let record = self.records.get(ordinal)?;
        Some(
            self.columns
                .iter()
                .cloned()
                .zip(record.cells.iter().cloned())
                .collect(),
        )
    }

    /// Record at `ordinal` as a JSON object
    pub fn record_json(&self, ordinal: usize) -> Option<serde_json::Value> {
        let record = self.records.get(ordinal)?;
        let object = self
            .columns
            .iter()
            .zip(&record.cells)
            .map(|(c, v)| (c.clone(), v.to_json()))
            .collect::<serde_json::Map<_, _>>();
        Some(serde_json::Value::Object(object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn changes(pairs: &[(&str, CellValue)]) -> BTreeMap<String, CellValue> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn despesas() -> Table {
        let mut table = Table::new("Despesas", vec!["DESCRICAO".into(), "VALOR".into()]);
        for (desc, valor) in [("Aluguel", 1500.0), ("Mercado", 320.5), ("Luz", 98.0)] {
            table.append(&changes(&[
                ("DESCRICAO", desc.into()),
                ("VALOR", valor.into()),
            ]));
        }
        table
    }

    #[test]
    fn test_append_assigns_increasing_ids() {
        let table = despesas();
        let ids: Vec<u64> = table.records().iter().map(|r| r.id.value()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(table.next_row_id(), 4);
    }

    #[test]
    fn test_append_grows_columns() {
        let mut table = despesas();
        table.append(&changes(&[("PAGO", true.into())]));

        assert_eq!(table.columns(), &["DESCRICAO", "VALOR", "PAGO"]);
        assert_eq!(table.cell(0, "PAGO"), Some(&CellValue::Null));
        assert_eq!(table.cell(3, "PAGO"), Some(&CellValue::Bool(true)));
        assert_eq!(table.cell(3, "VALOR"), Some(&CellValue::Null));
    }

    #[test]
    fn test_assign_skips_unknown_columns() {
        let mut table = despesas();
        let ignored = table.assign(
            1,
            &changes(&[("VALOR", (-42.5).into()), ("NOPE", "x".into())]),
        );

        assert_eq!(ignored, vec!["NOPE".to_string()]);
        assert_eq!(table.cell(1, "VALOR"), Some(&CellValue::Number(-42.5)));
        assert!(!table.has_column("NOPE"));
    }

    #[test]
    fn test_remove_shifts_following_rows() {
        let mut table = despesas();
        let removed = table.remove(0);

        assert_eq!(removed.id.value(), 1);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.cell(0, "DESCRICAO"), Some(&CellValue::from("Mercado")));
    }

    #[test]
    fn test_from_parts_pads_rows_and_assigns_ids() {
        let rows = vec![
            vec![CellValue::from("a")],
            vec![CellValue::from("b"), CellValue::from(2.0), CellValue::Null],
        ];
        let table = Table::from_parts("T".into(), vec!["X".into(), "Y".into()], rows, None, 0, 0);

        assert_eq!(table.columns(), &["X", "Y", "Unnamed: 2"]);
        assert!(table.records().iter().all(|r| r.cells.len() == 3));
        assert_eq!(table.records()[0].id.value(), 1);
        assert_eq!(table.records()[1].id.value(), 2);
        assert_eq!(table.next_row_id(), 3);
    }

    #[test]
    fn test_from_parts_keeps_persisted_ids() {
        let rows = vec![vec![CellValue::from(1.0)], vec![CellValue::from(2.0)]];
        let table = Table::from_parts("T".into(), vec!["X".into()], rows, Some(vec![7, 3]), 2, 5);

        assert_eq!(table.records()[0].id.value(), 7);
        assert_eq!(table.records()[1].id.value(), 3);
        assert_eq!(table.next_row_id(), 8);
        assert_eq!(table.version, 2);
    }

    #[test]
    fn test_record_json() {
        let table = despesas();
        let json = table.record_json(2).unwrap();
        assert_eq!(json["DESCRICAO"], "Luz");
        assert_eq!(json["VALOR"], 98.0);
        assert!(table.record_json(3).is_none());
    }
}
