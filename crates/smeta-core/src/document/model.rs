use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use smeta_engine::engine::{Row, Sheet, SheetTotals, parse_number};
use std::fmt;

/// Name given to the sheet created for documents that have none.
pub const DEFAULT_SHEET_NAME: &str = "Лист 1";

/// Document-level totals, summed over every sheet.
///
/// `work_total` and `materials_total` are contractor costs; the `client_*`
/// fields are what the client pays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TotalsSummary {
    pub work_total: f64,
    pub materials_total: f64,
    pub grand_total: f64,
    pub client_work_total: f64,
    pub client_materials_total: f64,
    pub client_grand_total: f64,
}

impl TotalsSummary {
    pub fn from_sheets<'a>(sheets: impl IntoIterator<Item = &'a SheetTotals>) -> Self {
        let mut summary = TotalsSummary::default();
        for totals in sheets {
            summary.work_total += totals.work.cost;
            summary.materials_total += totals.material.cost;
            summary.client_work_total += totals.work.client;
            summary.client_materials_total += totals.material.client;
        }
        summary.client_grand_total = summary.client_work_total + summary.client_materials_total;
        summary.grand_total = summary.client_grand_total;
        summary
    }
}

/// A complete estimate: sheets plus document metadata.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    #[serde(default, deserialize_with = "lenient_sheets")]
    pub sheets: Vec<Sheet>,
    #[serde(
        rename = "currentSheet",
        alias = "current_sheet",
        default,
        deserialize_with = "lenient_index"
    )]
    pub current_sheet: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    /// Derived on every pass; whatever a file carries here is discarded.
    #[serde(default, deserialize_with = "discard_totals")]
    pub totals: TotalsSummary,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A structural fix applied while loading a document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Repair {
    /// The document had no sheets; an empty one was created.
    AddedSheet,
    /// The sheet had no footer rows; a grand-total row was added.
    AddedFooter { sheet: usize },
    /// The footer was a bare array and now lives under `items`.
    LegacyFooter { sheet: usize },
    /// `currentSheet` pointed past the last sheet.
    ClampedCurrentSheet { requested: usize },
}

impl fmt::Display for Repair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Repair::AddedSheet => {
                write!(f, "document has no sheets, created \"{DEFAULT_SHEET_NAME}\"")
            }
            Repair::AddedFooter { sheet } => {
                write!(f, "sheet {sheet} has no footer, added a total row")
            }
            Repair::LegacyFooter { sheet } => {
                write!(f, "sheet {sheet} uses the legacy array footer")
            }
            Repair::ClampedCurrentSheet { requested } => {
                write!(f, "current sheet {requested} does not exist, using sheet 0")
            }
        }
    }
}

impl Estimate {
    /// Single empty sheet with a footer, ready for editing.
    pub fn new(footer_label: &str) -> Self {
        let mut estimate = Estimate::default();
        estimate.normalize(footer_label);
        estimate
    }

    /// Fix structural problems in place and report what was changed.
    pub fn normalize(&mut self, footer_label: &str) -> Vec<Repair> {
        let mut repairs = Vec::new();
        if self.sheets.is_empty() {
            self.sheets.push(Sheet::new(DEFAULT_SHEET_NAME));
            repairs.push(Repair::AddedSheet);
        }
        for (idx, sheet) in self.sheets.iter_mut().enumerate() {
            if sheet.footer.is_empty() {
                sheet.footer.items.push(Row::grand_total(footer_label));
                // Implied by AddedSheet.
                if repairs.first() != Some(&Repair::AddedSheet) {
                    repairs.push(Repair::AddedFooter { sheet: idx });
                }
            }
        }
        if self.current_sheet >= self.sheets.len() {
            repairs.push(Repair::ClampedCurrentSheet {
                requested: self.current_sheet,
            });
            self.current_sheet = 0;
        }
        repairs
    }
}

fn lenient_sheets<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Sheet>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter(Value::is_object)
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient_index<'de, D: Deserializer<'de>>(d: D) -> Result<usize, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(parse_number(&value)
        .filter(|n| *n >= 0.0 && *n <= usize::MAX as f64)
        .map(|n| n as usize)
        .unwrap_or(0))
}

fn discard_totals<'de, D: Deserializer<'de>>(d: D) -> Result<TotalsSummary, D::Error> {
    serde::de::IgnoredAny::deserialize(d)?;
    Ok(TotalsSummary::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalize_empty_document() {
        let mut estimate: Estimate = serde_json::from_value(json!({})).unwrap();
        let repairs = estimate.normalize("ИТОГО");
        assert_eq!(repairs, vec![Repair::AddedSheet]);
        assert_eq!(estimate.sheets.len(), 1);
        assert_eq!(estimate.sheets[0].name.as_deref(), Some(DEFAULT_SHEET_NAME));
        assert_eq!(estimate.sheets[0].footer.items.len(), 1);
        assert_eq!(estimate.sheets[0].footer.items[0].is_grand_total, Some(true));
    }

    #[test]
    fn clamps_current_sheet_and_accepts_alias() {
        let mut estimate: Estimate = serde_json::from_value(json!({
            "sheets": [{"data": []}],
            "current_sheet": 7
        }))
        .unwrap();
        assert_eq!(estimate.current_sheet, 7);
        let repairs = estimate.normalize("ИТОГО");
        assert!(repairs.contains(&Repair::ClampedCurrentSheet { requested: 7 }));
        assert!(repairs.contains(&Repair::AddedFooter { sheet: 0 }));
        assert_eq!(estimate.current_sheet, 0);
    }

    #[test]
    fn incoming_totals_are_ignored_and_unknown_keys_kept() {
        let estimate: Estimate = serde_json::from_value(json!({
            "sheets": [],
            "currentSheet": "1",
            "totals": {"grand_total": 1e9},
            "version": 3
        }))
        .unwrap();
        assert_eq!(estimate.totals, TotalsSummary::default());
        assert_eq!(estimate.current_sheet, 1);
        assert_eq!(estimate.extra.get("version"), Some(&json!(3)));
        assert!(!estimate.extra.contains_key("totals"));

        let out = serde_json::to_value(&estimate).unwrap();
        assert_eq!(out["currentSheet"], json!(1));
        assert_eq!(out["version"], json!(3));
    }

    #[test]
    fn garbage_sheets_are_dropped() {
        let estimate: Estimate = serde_json::from_value(json!({
            "sheets": [42, {"name": "Кухня"}, null],
            "currentSheet": -3
        }))
        .unwrap();
        assert_eq!(estimate.sheets.len(), 1);
        assert_eq!(estimate.current_sheet, 0);
    }
}
