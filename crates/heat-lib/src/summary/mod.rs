//! Summary framework
//!
//! A summary is one node of a result tree. Every variant knows how to:
//! - build its own wire message, and attach the messages of its nested summaries
//! - describe the table it is persisted into (name and ordered typed columns)
//! - produce its own row in schema order
//!
//! The set of variants is closed ([`Summary`]); decoding dispatches on the
//! wire oneof rather than on type names.

mod node_temperature;
mod top_consumer;

pub use node_temperature::{DetailedNodeTemperatureSummary, ShardProfileSummary};
pub use top_consumer::TopConsumerSummary;

use crate::error::{HeatError, Result};
use crate::proto::{summary_message, SummaryMessage};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Column types understood by the tabular store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Text,
    Integer,
    Double,
}

/// A named, typed column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: &'static str,
    pub column_type: ColumnType,
}

impl Column {
    pub const fn new(name: &'static str, column_type: ColumnType) -> Self {
        Self { name, column_type }
    }
}

/// A cell of a persisted row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Integer(i64),
    Double(f64),
    Text(String),
}

impl SqlValue {
    pub fn column_type(&self) -> ColumnType {
        match self {
            SqlValue::Integer(_) => ColumnType::Integer,
            SqlValue::Double(_) => ColumnType::Double,
            SqlValue::Text(_) => ColumnType::Text,
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Integer(v) => write!(f, "{}", v),
            SqlValue::Double(v) => write!(f, "{}", v),
            SqlValue::Text(v) => f.write_str(v),
        }
    }
}

/// Capabilities shared by every summary variant
pub trait GenericSummary: fmt::Display {
    /// Wire message for this summary alone, without nested summaries
    fn build_summary_message(&self) -> SummaryMessage;

    /// Summaries nested directly under this one
    fn nested_summaries(&self) -> Vec<&dyn GenericSummary> {
        Vec::new()
    }

    /// Append the messages of all nested summaries to `parent`
    fn attach_nested_summaries(&self, parent: &mut SummaryMessage) {
        for nested in self.nested_summaries() {
            parent.nested_summaries.push(nested.to_message());
        }
    }

    /// Full wire message: own fields plus the nested tree
    fn to_message(&self) -> SummaryMessage {
        let mut message = self.build_summary_message();
        self.attach_nested_summaries(&mut message);
        message
    }

    fn table_name(&self) -> &'static str;

    fn sql_schema(&self) -> Vec<Column>;

    /// Row values in the order of [`GenericSummary::sql_schema`]
    fn sql_values(&self) -> Vec<SqlValue>;

    /// Row values checked against the schema, position by position
    fn sql_row(&self) -> Result<Vec<SqlValue>> {
        let schema = self.sql_schema();
        let values = self.sql_values();
        if schema.len() != values.len() {
            return Err(HeatError::SchemaMismatch {
                table: self.table_name().to_string(),
                reason: format!(
                    "schema has {} columns but row has {} values",
                    schema.len(),
                    values.len()
                ),
            });
        }
        for (column, value) in schema.iter().zip(&values) {
            if column.column_type != value.column_type() {
                return Err(HeatError::SchemaMismatch {
                    table: self.table_name().to_string(),
                    reason: format!(
                        "column {} is {:?} but value is {:?}",
                        column.name,
                        column.column_type,
                        value.column_type()
                    ),
                });
            }
        }
        Ok(values)
    }

    fn to_json(&self) -> serde_json::Value;
}

/// Every summary variant the engine produces
#[derive(Debug, Clone, PartialEq)]
pub enum Summary {
    TopConsumer(TopConsumerSummary),
    ShardProfile(ShardProfileSummary),
    NodeTemperature(DetailedNodeTemperatureSummary),
}

impl Summary {
    /// Rebuild a summary, and its nested summaries, from a wire message
    pub fn from_message(message: &SummaryMessage) -> Result<Self> {
        match &message.summary {
            Some(summary_message::Summary::TopConsumer(m)) => Ok(Summary::TopConsumer(
                TopConsumerSummary::from_message(m),
            )),
            Some(summary_message::Summary::ShardProfile(m)) => Ok(Summary::ShardProfile(
                ShardProfileSummary::from_message(m)?,
            )),
            Some(summary_message::Summary::NodeTemperature(m)) => Ok(Summary::NodeTemperature(
                DetailedNodeTemperatureSummary::from_message(m, &message.nested_summaries)?,
            )),
            None => Err(HeatError::EmptySummary),
        }
    }

    pub fn as_generic(&self) -> &dyn GenericSummary {
        match self {
            Summary::TopConsumer(s) => s,
            Summary::ShardProfile(s) => s,
            Summary::NodeTemperature(s) => s,
        }
    }

    /// Table name and schema of every variant
    pub fn registered_tables() -> Vec<(&'static str, Vec<Column>)> {
        vec![
            (
                TopConsumerSummary::TABLE_NAME,
                TopConsumerSummary::SCHEMA.to_vec(),
            ),
            (
                ShardProfileSummary::TABLE_NAME,
                ShardProfileSummary::SCHEMA.to_vec(),
            ),
            (
                DetailedNodeTemperatureSummary::TABLE_NAME,
                DetailedNodeTemperatureSummary::SCHEMA.to_vec(),
            ),
        ]
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_generic().fmt(f)
    }
}
