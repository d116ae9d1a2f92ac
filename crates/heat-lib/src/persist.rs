//! In-memory tabular store for summaries
//!
//! Each summary variant maps to one table named by `table_name()`. The first
//! write fixes the table's schema; later writes must agree with it, so a
//! variant whose rows drift from its declared columns is caught on write.

use crate::error::{HeatError, Result};
use crate::summary::{Column, GenericSummary, SqlValue};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Rows of one summary variant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub schema: Vec<Column>,
    pub rows: Vec<Vec<SqlValue>>,
}

impl Table {
    pub(crate) fn new(schema: Vec<Column>) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    /// Values of one column, in row order
    pub fn column(&self, name: &str) -> Option<Vec<&SqlValue>> {
        let idx = self.schema.iter().position(|c| c.name == name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }
}

/// Default cap on rows kept per table
pub const DEFAULT_MAX_ROWS_PER_TABLE: usize = 10_000;

/// Table name, schema and values of one row awaiting insertion
type PendingRow = (&'static str, Vec<Column>, Vec<SqlValue>);

/// Rows that passed schema checks against a store, not yet inserted
#[derive(Debug, Default)]
pub struct StagedRows {
    rows: Vec<PendingRow>,
}

impl StagedRows {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Summary rows grouped by table
#[derive(Debug, Default)]
pub struct TableStore {
    tables: BTreeMap<String, Table>,
}

impl TableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist `summary` and everything nested under it
    ///
    /// Returns the number of rows written. Rows are validated before any of
    /// them is stored, so a failing tree writes nothing.
    pub fn write(&mut self, summary: &dyn GenericSummary) -> Result<usize> {
        let staged = self.stage(&[summary])?;
        Ok(self.commit(staged))
    }

    /// Build and schema-check the rows of every summary tree without storing them
    pub fn stage(&self, summaries: &[&dyn GenericSummary]) -> Result<StagedRows> {
        let mut rows = Vec::new();
        for summary in summaries {
            collect_rows(*summary, &mut rows)?;
        }

        let mut schemas: BTreeMap<&str, &Vec<Column>> = self
            .tables
            .iter()
            .map(|(name, table)| (name.as_str(), &table.schema))
            .collect();
        for (table_name, schema, _) in &rows {
            let expected = *schemas.entry(*table_name).or_insert(schema);
            if expected != schema {
                return Err(HeatError::SchemaMismatch {
                    table: table_name.to_string(),
                    reason: "schema differs from the existing table".to_string(),
                });
            }
        }

        Ok(StagedRows { rows })
    }

    /// Insert rows returned by `stage` on this store
    pub fn commit(&mut self, staged: StagedRows) -> usize {
        let written = staged.rows.len();
        for (table_name, schema, row) in staged.rows {
            self.tables
                .entry(table_name.to_string())
                .or_insert_with(|| Table::new(schema))
                .rows
                .push(row);
        }
        debug!(rows = written, "Persisted summary rows");
        written
    }

    /// Drop the oldest rows of every table holding more than `max_rows`
    ///
    /// Returns the number of rows dropped.
    pub fn retain_newest(&mut self, max_rows: usize) -> usize {
        let mut dropped = 0;
        for (name, table) in self.tables.iter_mut() {
            let excess = table.rows.len().saturating_sub(max_rows);
            if excess > 0 {
                table.rows.drain(..excess);
                debug!(table = %name, dropped = excess, "Dropped oldest rows");
                dropped += excess;
            }
        }
        dropped
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    pub fn clear(&mut self) {
        self.tables.clear();
    }

    #[cfg(test)]
    pub(crate) fn insert_table(&mut self, name: &str, table: Table) {
        self.tables.insert(name.to_string(), table);
    }
}
