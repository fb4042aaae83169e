//! Row classification.
//!
//! Decides what a row is (priced item, section header, grand-total row) and
//! which cost category an item belongs to. Classification never fails: a row
//! that matches nothing is an item of category work.
//!
//! The category keyword match on the row name is a heuristic kept for
//! documents that predate explicit categories. An explicit `category` field
//! always wins.

use serde::{Deserialize, Serialize};

use super::number::parse_number;
use super::row::{Category, Row};

/// What role a row plays in its sheet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RowKind {
    Item,
    SectionHeader,
    GrandTotal,
}

/// Classification result for a single row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Classification {
    pub kind: RowKind,
    pub category: Category,
}

/// Keyword-driven row classifier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Classifier {
    /// Name fragments that mark an item as material.
    pub material_keywords: Vec<String>,
    /// Name fragments that mark a quantity-less row as a legacy total row.
    pub total_keywords: Vec<String>,
    /// Value of the `type` field that marks an item as material.
    pub materials_type: String,
}

impl Default for Classifier {
    fn default() -> Self {
        Classifier {
            material_keywords: ["материал", "краска", "плитка", "обои"]
                .iter()
                .map(|k| k.to_string())
                .collect(),
            total_keywords: vec!["итог".to_string(), "total".to_string()],
            materials_type: "materials".to_string(),
        }
    }
}

impl Classifier {
    pub fn classify(&self, row: &Row) -> Classification {
        Classification {
            kind: self.kind(row),
            category: self.category(row),
        }
    }

    pub fn kind(&self, row: &Row) -> RowKind {
        if is_header(row) {
            return RowKind::SectionHeader;
        }
        let tagged_total = row
            .tag
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case("grand_total"));
        if tagged_total || row.is_grand_total == Some(true) {
            return RowKind::GrandTotal;
        }
        let tagged_item = row
            .tag
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case("item"));
        // Legacy documents carry untagged "Итого" rows inside the data.
        if !tagged_item
            && !has_usable_quantity(row)
            && contains_any(&row.name, &self.total_keywords)
        {
            return RowKind::GrandTotal;
        }
        RowKind::Item
    }

    /// Category of the row, defaulting to work.
    pub fn category(&self, row: &Row) -> Category {
        self.explicit_category(row).unwrap_or_default()
    }

    /// Category if anything about the row indicates one.
    pub fn explicit_category(&self, row: &Row) -> Option<Category> {
        if let Some(category) = row.category {
            return Some(category);
        }
        let typed_material = row
            .item_type
            .as_deref()
            .is_some_and(|t| t.trim().eq_ignore_ascii_case(&self.materials_type));
        if typed_material || contains_any(&row.name, &self.material_keywords) {
            return Some(Category::Material);
        }
        None
    }
}

/// Classify with the default keyword sets.
pub fn classify(row: &Row) -> Classification {
    Classifier::default().classify(row)
}

/// Whether the row is a section header.
pub fn is_header(row: &Row) -> bool {
    row.is_header == Some(true)
        || row
            .tag
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case("header"))
}

fn has_usable_quantity(row: &Row) -> bool {
    parse_number(&row.quantity).is_some_and(|q| q > 0.0)
}

fn contains_any(name: &str, keywords: &[String]) -> bool {
    if name.is_empty() {
        return false;
    }
    let name = name.to_lowercase();
    keywords
        .iter()
        .filter(|k| !k.is_empty())
        .any(|k| name.contains(&k.to_lowercase()))
}
