//! Parser for JSON estimate documents

use crate::document::{Estimate, Repair};
use crate::error::Result;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// A parsed document plus the repairs its raw shape called for.
#[derive(Debug)]
pub struct Loaded {
    pub estimate: Estimate,
    pub repairs: Vec<Repair>,
}

/// Parse an estimate file
pub fn parse_estimate(path: &Path) -> Result<Loaded> {
    let content = fs::read_to_string(path)?;
    parse_estimate_str(&content)
}

/// Parse estimate JSON from a string
///
/// Only invalid JSON or a top level that is not an object fails; everything
/// inside is read leniently. `null` is an empty document.
pub fn parse_estimate_str(content: &str) -> Result<Loaded> {
    let raw: Value = serde_json::from_str(content)?;
    if raw.is_null() {
        return Ok(Loaded {
            estimate: Estimate::default(),
            repairs: Vec::new(),
        });
    }
    let repairs = legacy_footers(&raw)
        .into_iter()
        .map(|sheet| Repair::LegacyFooter { sheet })
        .collect();
    let estimate = serde_json::from_value(raw)?;
    Ok(Loaded { estimate, repairs })
}

/// Indices of sheets whose footer is a bare array of rows.
fn legacy_footers(raw: &Value) -> Vec<usize> {
    let Some(sheets) = raw.get("sheets").and_then(Value::as_array) else {
        return Vec::new();
    };
    sheets
        .iter()
        .filter(|sheet| sheet.is_object())
        .enumerate()
        .filter(|(_, sheet)| sheet.get("footer").is_some_and(Value::is_array))
        .map(|(idx, _)| idx)
        .collect()
}
