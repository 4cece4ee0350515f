//! Record addressing within a loaded table snapshot
//!
//! Ordinals are positions in one particular load of a table. They are not
//! keys: once a preceding row is removed or inserted, the same ordinal names a
//! different record. `RecordId` lookups survive that.

use std::collections::BTreeSet;

use crate::error::{SheetError, SheetResult};
use crate::models::{RecordId, Table};

/// A resolved record: its position in this snapshot and its stable id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordRef {
    pub ordinal: usize,
    pub id: RecordId,
}

/// Resolver over one loaded table
#[derive(Debug, Clone, Copy)]
pub struct RecordIndex<'a> {
    table: &'a Table,
}

impl<'a> RecordIndex<'a> {
    pub fn new(table: &'a Table) -> Self {
        Self { table }
    }

    /// Resolve a zero-based ordinal
    ///
    /// Fails with `OutOfRange` when `ordinal < 0` or `ordinal >= row_count`.
    pub fn resolve(&self, ordinal: i64) -> SheetResult<RecordRef> {
        let row_count = self.table.row_count();
        let out_of_range = || SheetError::OutOfRange { ordinal, row_count };

        let index = usize::try_from(ordinal).map_err(|_| out_of_range())?;
        let record = self.table.records().get(index).ok_or_else(out_of_range)?;

        Ok(RecordRef {
            ordinal: index,
            id: record.id,
        })
    }

    /// Resolve a set of ordinals against this one snapshot
    ///
    /// Duplicates collapse. The result is sorted ascending. The first invalid
    /// ordinal fails the whole set.
    pub fn resolve_many(&self, ordinals: &[i64]) -> SheetResult<Vec<RecordRef>> {
        let distinct: BTreeSet<i64> = ordinals.iter().copied().collect();
        distinct.into_iter().map(|o| self.resolve(o)).collect()
    }

    /// Resolve a record by its surrogate id
    pub fn resolve_id(&self, id: RecordId) -> SheetResult<RecordRef> {
        self.table
            .records()
            .iter()
            .position(|r| r.id == id)
            .map(|ordinal| RecordRef { ordinal, id })
            .ok_or_else(|| {
                SheetError::record_not_found(format!("{} in {}", id, self.table.name))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CellValue;
    use std::collections::BTreeMap;

    fn table_with_rows(n: usize) -> Table {
        let mut table = Table::new("Despesas", vec!["VALOR".into()]);
        for i in 0..n {
            let mut values = BTreeMap::new();
            values.insert("VALOR".to_string(), CellValue::Number(i as f64));
            table.append(&values);
        }
        table
    }

    #[test]
    fn test_resolve_bounds() {
        let table = table_with_rows(5);
        let index = RecordIndex::new(&table);

        assert_eq!(index.resolve(0).unwrap().ordinal, 0);
        assert_eq!(index.resolve(4).unwrap().id, RecordId::new(5));
        assert!(matches!(
            index.resolve(5),
            Err(SheetError::OutOfRange { ordinal: 5, row_count: 5 })
        ));
        assert!(index.resolve(-1).unwrap_err().is_out_of_range());
    }

    #[test]
    fn test_resolve_on_empty_table() {
        let table = table_with_rows(0);
        assert!(RecordIndex::new(&table).resolve(0).is_err());
    }

    #[test]
    fn test_resolve_many_sorts_and_dedupes() {
        let table = table_with_rows(5);
        let refs = RecordIndex::new(&table).resolve_many(&[3, 1, 3]).unwrap();
        let ordinals: Vec<usize> = refs.iter().map(|r| r.ordinal).collect();
        assert_eq!(ordinals, vec![1, 3]);
    }

    #[test]
    fn test_resolve_many_rejects_any_invalid() {
        let table = table_with_rows(5);
        let err = RecordIndex::new(&table).resolve_many(&[0, 9]).unwrap_err();
        assert!(err.is_out_of_range());
    }

    #[test]
    fn test_ordinal_drifts_but_id_does_not() {
        let mut table = table_with_rows(3);
        let target = RecordIndex::new(&table).resolve(2).unwrap();

        table.remove(0);

        let index = RecordIndex::new(&table);
        assert!(index.resolve(2).is_err());
        assert_eq!(index.resolve_id(target.id).unwrap().ordinal, 1);
    }

    #[test]
    fn test_resolve_unknown_id() {
        let table = table_with_rows(2);
        let err = RecordIndex::new(&table)
            .resolve_id(RecordId::new(99))
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
