//! Writer for JSON estimate documents

use crate::document::Estimate;
use crate::error::Result;
use std::fs;
use std::path::Path;

/// Write an estimate to a file
pub fn write_estimate(path: &Path, estimate: &Estimate) -> Result<()> {
    let mut content = write_estimate_string(estimate)?;
    content.push('\n');
    fs::write(path, content)?;
    Ok(())
}

/// Write an estimate as pretty-printed JSON
pub fn write_estimate_string(estimate: &Estimate) -> Result<String> {
    Ok(serde_json::to_string_pretty(estimate)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn test_write_uses_document_keys() {
        let estimate = Estimate::new("ИТОГО");
        let out: Value = serde_json::from_str(&write_estimate_string(&estimate).unwrap()).unwrap();
        assert_eq!(out["currentSheet"], json!(0));
        assert_eq!(out["sheets"][0]["name"], json!("Лист 1"));
        assert_eq!(out["sheets"][0]["footer"]["items"][0]["_type"], json!("grand_total"));
        assert_eq!(out["totals"]["grand_total"], json!(0.0));
        assert!(out.get("meta").is_none());
    }
}
