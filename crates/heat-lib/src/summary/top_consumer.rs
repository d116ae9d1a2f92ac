//! Name and usage of a single resource consumer

use super::{Column, ColumnType, GenericSummary, SqlValue};
use crate::proto::{summary_message, SummaryMessage, TopConsumerSummaryMessage};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowest level of the summary hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopConsumerSummary {
    name: String,
    value: f64,
}

impl TopConsumerSummary {
    pub const TABLE_NAME: &'static str = "TopConsumerSummary";
    pub const SCHEMA: [Column; 2] = [
        Column::new("Name", ColumnType::Text),
        Column::new("Value", ColumnType::Double),
    ];

    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn from_message(message: &TopConsumerSummaryMessage) -> Self {
        Self::new(message.name.clone(), message.value)
    }
}

impl GenericSummary for TopConsumerSummary {
    fn build_summary_message(&self) -> SummaryMessage {
        SummaryMessage {
            summary: Some(summary_message::Summary::TopConsumer(
                TopConsumerSummaryMessage {
                    name: self.name.clone(),
                    value: self.value,
                },
            )),
            nested_summaries: Vec::new(),
        }
    }

    // Nothing is nested under a consumer.
    fn attach_nested_summaries(&self, _parent: &mut SummaryMessage) {}

    fn table_name(&self) -> &'static str {
        Self::TABLE_NAME
    }

    fn sql_schema(&self) -> Vec<Column> {
        Self::SCHEMA.to_vec()
    }

    fn sql_values(&self) -> Vec<SqlValue> {
        vec![SqlValue::Text(self.name.clone()), SqlValue::Double(self.value)]
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "name": self.name, "value": self.value })
    }
}

impl fmt::Display for TopConsumerSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.value)
    }
}
