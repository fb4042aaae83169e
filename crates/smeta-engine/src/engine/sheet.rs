//! Sheets: ordered rows plus a footer of total rows.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::row::{Row, lenient_opt_string};

/// Display-only total rows shown under a sheet.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Footer {
    #[serde(default, deserialize_with = "lenient_rows")]
    pub items: Vec<Row>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Footer {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// One sheet of an estimate.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    #[serde(
        default,
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_rows")]
    pub data: Vec<Row>,
    #[serde(default, deserialize_with = "lenient_footer")]
    pub footer: Footer,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Sheet {
    pub fn new(name: &str) -> Sheet {
        Sheet {
            name: Some(name.to_string()),
            ..Sheet::default()
        }
    }

    pub fn with_rows(mut self, rows: Vec<Row>) -> Sheet {
        self.data = rows;
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Accept an array of row objects; anything else is an empty list and
/// non-object entries are dropped.
fn lenient_rows<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Row>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(rows_from_value(value))
}

fn rows_from_value(value: Value) -> Vec<Row> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter(Value::is_object)
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    }
}

/// Accept `{items: [...]}`, the legacy bare array, or nothing.
fn lenient_footer<'de, D: Deserializer<'de>>(d: D) -> Result<Footer, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(match value {
        Value::Array(_) => Footer {
            items: rows_from_value(value),
            extra: Map::new(),
        },
        Value::Object(_) => serde_json::from_value(value).unwrap_or_default(),
        _ => Footer::default(),
    })
}
