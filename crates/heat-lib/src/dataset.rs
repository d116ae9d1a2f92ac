//! Typed-row datasets handed over by the metric collectors
//!
//! Collectors are scheduled independently and deliver small relations. Each
//! consumer states the shape it expects with a [`DatasetShape`] and checks it
//! before touching any row; cells are then read by column name and expected
//! type. Text cells are parsed on access so that a collector that emits
//! numbers as strings still works, and a cell that does not parse is reported
//! as [`HeatError::ValueFormat`].

use crate::error::{HeatError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Double(f64),
    Text(String),
}

impl Value {
    fn raw(&self) -> String {
        match self {
            Value::Integer(v) => v.to_string(),
            Value::Double(v) => v.to_string(),
            Value::Text(v) => v.clone(),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

/// Small named relation: ordered columns and rows of equal width
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDataset {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
}

impl MetricDataset {
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row; its width must match the column count
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(HeatError::structural(
                &self.name,
                format!(
                    "row has {} values but dataset declares {} columns",
                    row.len(),
                    self.columns.len()
                ),
            ));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn with_rows<I>(mut self, rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = Vec<Value>>,
    {
        for row in rows {
            self.push_row(row)?;
        }
        Ok(self)
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    fn column_index(&self, column: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| {
                HeatError::structural(&self.name, format!("missing column {:?}", column))
            })
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> + '_ {
        self.rows.iter().map(move |values| Row {
            dataset: self,
            values,
        })
    }

    /// Checks the row/column cardinality against an expected shape
    pub fn check_shape(&self, shape: &DatasetShape) -> Result<()> {
        if self.num_columns() != shape.columns {
            return Err(HeatError::structural(
                &self.name,
                format!(
                    "expected {} columns, found {}",
                    shape.columns,
                    self.num_columns()
                ),
            ));
        }
        if let RowCount::Exactly(expected) = shape.rows {
            if self.num_rows() != expected {
                return Err(HeatError::structural(
                    &self.name,
                    format!("expected {} rows, found {}", expected, self.num_rows()),
                ));
            }
        }
        // Widths are enforced by push_row, but deserialized datasets skip it
        if let Some(bad) = self.rows.iter().position(|r| r.len() != self.num_columns()) {
            return Err(HeatError::structural(
                &self.name,
                format!("row {} does not match the column count", bad),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for MetricDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: [{}]", self.name, self.columns.join(", "))?;
        for row in &self.rows {
            let cells: Vec<String> = row.iter().map(Value::raw).collect();
            write!(f, " [{}]", cells.join(", "))?;
        }
        Ok(())
    }
}

/// One row borrowed from a dataset
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    dataset: &'a MetricDataset,
    values: &'a [Value],
}

impl<'a> Row<'a> {
    fn cell(&self, column: &str) -> Result<&'a Value> {
        let idx = self.dataset.column_index(column)?;
        self.values.get(idx).ok_or_else(|| {
            HeatError::structural(&self.dataset.name, format!("row is missing {:?}", column))
        })
    }

    fn format_error(&self, column: &str, value: &Value, expected: &'static str) -> HeatError {
        HeatError::ValueFormat {
            dataset: self.dataset.name.clone(),
            column: column.to_string(),
            raw: value.raw(),
            expected,
        }
    }

    pub fn get_str(&self, column: &str) -> Result<&'a str> {
        match self.cell(column)? {
            Value::Text(s) => Ok(s.as_str()),
            other => Err(self.format_error(column, other, "string")),
        }
    }

    pub fn get_i32(&self, column: &str) -> Result<i32> {
        let value = self.cell(column)?;
        let parsed = match value {
            Value::Integer(v) => i32::try_from(*v).ok(),
            Value::Text(s) => s.trim().parse::<i32>().ok(),
            Value::Double(_) => None,
        };
        parsed.ok_or_else(|| self.format_error(column, value, "i32"))
    }

    pub fn get_f64(&self, column: &str) -> Result<f64> {
        let value = self.cell(column)?;
        let parsed = match value {
            Value::Integer(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            Value::Text(s) => s.trim().parse::<f64>().ok(),
        };
        parsed.ok_or_else(|| self.format_error(column, value, "f64"))
    }
}

/// Expected number of rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowCount {
    Exactly(usize),
    Any,
}

/// Expected shape of a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetShape {
    pub columns: usize,
    pub rows: RowCount,
}

impl DatasetShape {
    /// One row, one column
    pub const SCALAR: DatasetShape = DatasetShape {
        columns: 1,
        rows: RowCount::Exactly(1),
    };

    pub const fn table(columns: usize) -> Self {
        Self {
            columns,
            rows: RowCount::Any,
        }
    }
}

/// Requires exactly one dataset of the given shape and returns it
pub fn expect_single_dataset<'a>(
    label: &str,
    datasets: &'a [MetricDataset],
    shape: &DatasetShape,
) -> Result<&'a MetricDataset> {
    match datasets {
        [single] => {
            single.check_shape(shape)?;
            Ok(single)
        }
        _ => Err(HeatError::structural(
            label,
            format!("expected exactly one dataset, found {}", datasets.len()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shards() -> MetricDataset {
        MetricDataset::new("by_shard", ["IndexName", "ShardID", "sum"])
            .with_rows([
                vec!["geonames".into(), 0.into(), 0.35.into()],
                vec!["geonames".into(), "2".into(), "0.03".into()],
            ])
            .unwrap()
    }

    #[test]
    fn test_push_row_rejects_wrong_width() {
        let mut ds = MetricDataset::new("by_shard", ["IndexName", "ShardID", "sum"]);
        let err = ds.push_row(vec!["a".into(), 1.into()]).unwrap_err();
        assert!(matches!(err, HeatError::StructuralValidation { .. }));
        assert_eq!(ds.num_rows(), 0);
    }

    #[test]
    fn test_typed_access_parses_text() {
        let ds = shards();
        let rows: Vec<_> = ds.rows().collect();
        assert_eq!(rows[0].get_str("IndexName").unwrap(), "geonames");
        assert_eq!(rows[0].get_i32("ShardID").unwrap(), 0);
        assert_eq!(rows[1].get_i32("ShardID").unwrap(), 2);
        assert_eq!(rows[1].get_f64("sum").unwrap(), 0.03);
    }

    #[test]
    fn test_value_format_error_carries_raw_value() {
        let ds = MetricDataset::new("node_total", ["sum"])
            .with_rows([vec!["n/a".into()]])
            .unwrap();
        let row = ds.rows().next().unwrap();
        match row.get_f64("sum").unwrap_err() {
            HeatError::ValueFormat {
                dataset, raw, column, ..
            } => {
                assert_eq!(dataset, "node_total");
                assert_eq!(column, "sum");
                assert_eq!(raw, "n/a");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_column_is_structural() {
        let ds = shards();
        let row = ds.rows().next().unwrap();
        assert!(matches!(
            row.get_f64("avg"),
            Err(HeatError::StructuralValidation { .. })
        ));
    }

    #[test]
    fn test_shape_checks() {
        let ds = shards();
        assert!(ds.check_shape(&DatasetShape::table(3)).is_ok());
        assert!(ds.check_shape(&DatasetShape::table(2)).is_err());
        assert!(ds.check_shape(&DatasetShape::SCALAR).is_err());

        let scalar = MetricDataset::new("avg", ["avg"])
            .with_rows([vec![20.0.into()]])
            .unwrap();
        assert!(scalar.check_shape(&DatasetShape::SCALAR).is_ok());
    }

    #[test]
    fn test_expect_single_dataset() {
        let ds = shards();
        assert!(expect_single_dataset("by_shard", &[], &DatasetShape::table(3)).is_err());
        assert!(
            expect_single_dataset("by_shard", &[ds.clone(), ds.clone()], &DatasetShape::table(3))
                .is_err()
        );
        assert!(expect_single_dataset("by_shard", &[ds], &DatasetShape::table(3)).is_ok());
    }

    #[test]
    fn test_deserialize_mixed_cells() {
        let json = r#"{"name":"by_shard","columns":["IndexName","ShardID","sum"],
                       "rows":[["idx",1,2.5],["idx","3","4"]]}"#;
        let ds: MetricDataset = serde_json::from_str(json).unwrap();
        assert_eq!(ds.rows[0][1], Value::Integer(1));
        assert_eq!(ds.rows[0][2], Value::Double(2.5));
        assert_eq!(ds.rows[1][1], Value::Text("3".to_string()));
    }

    #[test]
    fn test_deserialized_ragged_rows_fail_shape_check() {
        let json = r#"{"name":"by_shard","columns":["IndexName","ShardID","sum"],
                       "rows":[["idx",1]]}"#;
        let ds: MetricDataset = serde_json::from_str(json).unwrap();
        assert!(ds.check_shape(&DatasetShape::table(3)).is_err());
    }
}
