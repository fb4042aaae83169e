//! Per-row pricing.
//!
//! Derived amounts are always recomputed from the raw inputs, never from a
//! previously derived value, so running a pass twice yields identical rows.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::classify::{Classifier, RowKind};
use super::number::{finite_or_zero, parse_number};
use super::row::Row;

/// Defaults applied to rows that do not carry their own pricing.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pricing {
    /// Markup percent for rows without a `markup` field.
    pub markup: f64,
    /// Discount percent for rows without a usable `discount`.
    pub discount: f64,
}

impl Default for Pricing {
    fn default() -> Self {
        Pricing {
            markup: 20.0,
            discount: 0.0,
        }
    }
}

/// Sanitized numeric inputs of an item row.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RowInputs {
    pub quantity: f64,
    pub price: f64,
    pub markup: f64,
    pub discount: f64,
}

impl RowInputs {
    pub fn from_row(row: &Row, pricing: &Pricing) -> RowInputs {
        let markup = match &row.markup {
            None | Some(Value::Null) => pricing.markup,
            Some(raw) => parse_number(raw).unwrap_or(0.0),
        };
        let discount = if row.discount.is_null() {
            pricing.discount
        } else {
            parse_number(&row.discount).unwrap_or(0.0)
        };
        RowInputs {
            quantity: non_negative(parse_number(&row.quantity).unwrap_or(0.0)),
            price: non_negative(parse_number(&row.price).unwrap_or(0.0)),
            markup: finite_or_zero(markup),
            discount: finite_or_zero(discount),
        }
    }
}

/// Amounts computed from [`RowInputs`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Derived {
    pub cost: f64,
    pub client_price: f64,
    pub client_cost: f64,
}

impl Derived {
    pub fn from_inputs(inputs: &RowInputs) -> Derived {
        let client_price = finite_or_zero(
            inputs.price * (1.0 + inputs.markup / 100.0) * (1.0 - inputs.discount / 100.0),
        );
        Derived {
            cost: finite_or_zero(inputs.quantity * inputs.price),
            client_price,
            client_cost: finite_or_zero(inputs.quantity * client_price),
        }
    }
}

fn non_negative(n: f64) -> f64 {
    if n > 0.0 { finite_or_zero(n) } else { 0.0 }
}

/// Derived amounts of a row, or `None` if it is not an item.
pub fn derive(row: &Row, classifier: &Classifier, pricing: &Pricing) -> Option<Derived> {
    (classifier.kind(row) == RowKind::Item)
        .then(|| Derived::from_inputs(&RowInputs::from_row(row, pricing)))
}

/// Return a copy of the row with its derived fields recomputed.
pub fn calculate(row: &Row, classifier: &Classifier, pricing: &Pricing) -> Row {
    let mut out = row.clone();
    apply_calculation(&mut out, classifier, pricing);
    out
}

/// Recompute a row's derived fields in place.
///
/// Section headers carry no amounts, so their derived fields are reset to zero.
/// Grand-total rows are left for the aggregator. Returns whether any derived
/// field changed.
pub fn apply_calculation(row: &mut Row, classifier: &Classifier, pricing: &Pricing) -> bool {
    let derived = match classifier.kind(row) {
        RowKind::Item => Derived::from_inputs(&RowInputs::from_row(row, pricing)),
        RowKind::SectionHeader => Derived::default(),
        RowKind::GrandTotal => return false,
    };
    let changed = row.cost.to_bits() != derived.cost.to_bits()
        || row.client_price.to_bits() != derived.client_price.to_bits()
        || row.client_cost.to_bits() != derived.client_cost.to_bits();
    row.cost = derived.cost;
    row.client_price = derived.client_price;
    row.client_cost = derived.client_cost;
    changed
}
