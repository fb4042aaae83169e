//! Estimate row data structures.
//!
//! This module provides the record types a sheet is made of:
//! - [`Row`] - One line of an estimate (item, section header or total row)
//! - [`Category`] - Cost category of an item (work or material)
//! - [`Field`] - Named, editable row attributes
//!
//! Raw inputs (`quantity`, `price`, `markup`, `discount`) keep whatever the user
//! typed so edits round-trip; derived amounts are always plain numbers. Fields
//! the engine does not know about are carried along untouched in [`Row::extra`].

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::number::{parse_bool, parse_number};

/// Prefix given to the name of a duplicated row.
pub const COPY_PREFIX: &str = "Копия: ";

/// Cost category of an item row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Work,
    Material,
}

impl Category {
    /// Parse a category name as found in documents (`"materials"`, `"work"`, ...).
    pub fn parse(input: &str) -> Option<Category> {
        match input.trim().to_lowercase().as_str() {
            "work" | "works" | "работа" | "работы" => Some(Category::Work),
            "material" | "materials" | "материал" | "материалы" => Some(Category::Material),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Work => "work",
            Category::Material => "material",
        }
    }
}

/// A single line of an estimate sheet.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Identity of the row; never copied by [`Row::duplicate`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub unit: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub quantity: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub price: Value,
    /// `None` means "not set": the configured default markup applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markup: Option<Value>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub discount: Value,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub cost: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub client_price: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub client_cost: f64,
    /// Explicit category override; wins over `type` and the name heuristic.
    #[serde(
        default,
        deserialize_with = "lenient_category",
        skip_serializing_if = "Option::is_none"
    )]
    pub category: Option<Category>,
    /// Legacy category hint (`"materials"`).
    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub item_type: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_opt_bool",
        skip_serializing_if = "Option::is_none"
    )]
    pub is_header: Option<bool>,
    #[serde(
        default,
        deserialize_with = "lenient_opt_bool",
        skip_serializing_if = "Option::is_none"
    )]
    pub is_grand_total: Option<bool>,
    /// Row tag (`"header"`, `"grand_total"`).
    #[serde(
        rename = "_type",
        default,
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub tag: Option<String>,
    /// Section a footer row reports on (index into the sheet's sections).
    #[serde(
        default,
        deserialize_with = "lenient_opt_index",
        skip_serializing_if = "Option::is_none"
    )]
    pub section: Option<usize>,
    /// Written by the aggregator into grand-total rows.
    #[serde(
        default,
        deserialize_with = "lenient_opt_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub grand_total: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Row {
    /// Create a priced item row.
    pub fn item(name: &str, unit: &str, quantity: f64, price: f64) -> Row {
        Row {
            name: name.to_string(),
            unit: unit.to_string(),
            quantity: Value::from(quantity),
            price: Value::from(price),
            ..Row::default()
        }
    }

    /// Set markup and discount percentages.
    pub fn with_pricing(mut self, markup: f64, discount: f64) -> Row {
        self.markup = Some(Value::from(markup));
        self.discount = Value::from(discount);
        self
    }

    pub fn with_category(mut self, category: Category) -> Row {
        self.category = Some(category);
        self
    }

    /// Create a section header row.
    pub fn header(title: &str) -> Row {
        Row {
            name: title.to_string(),
            is_header: Some(true),
            tag: Some("header".to_string()),
            ..Row::default()
        }
    }

    /// Create a grand-total row.
    pub fn grand_total(label: &str) -> Row {
        Row {
            name: label.to_string(),
            is_grand_total: Some(true),
            tag: Some("grand_total".to_string()),
            ..Row::default()
        }
    }

    /// Deep copy of the row without its identity, renamed `"Копия: <name>"`.
    pub fn duplicate(&self) -> Row {
        let mut copy = self.clone();
        copy.id = None;
        copy.name = format!("{}{}", COPY_PREFIX, self.name);
        copy
    }

    /// Read a field as a JSON value.
    pub fn get(&self, field: &Field) -> Value {
        match field {
            Field::Id => self.id.clone().unwrap_or(Value::Null),
            Field::Name => Value::from(self.name.clone()),
            Field::Unit => Value::from(self.unit.clone()),
            Field::Quantity => self.quantity.clone(),
            Field::Price => self.price.clone(),
            Field::Markup => self.markup.clone().unwrap_or(Value::Null),
            Field::Discount => self.discount.clone(),
            Field::Cost => Value::from(self.cost),
            Field::ClientPrice => Value::from(self.client_price),
            Field::ClientCost => Value::from(self.client_cost),
            Field::Category => self
                .category
                .map(|c| Value::from(c.as_str()))
                .unwrap_or(Value::Null),
            Field::Type => opt_string_value(&self.item_type),
            Field::IsHeader => self.is_header.map(Value::from).unwrap_or(Value::Null),
            Field::IsGrandTotal => self.is_grand_total.map(Value::from).unwrap_or(Value::Null),
            Field::Tag => opt_string_value(&self.tag),
            Field::Section => self.section.map(Value::from).unwrap_or(Value::Null),
            Field::Other(name) => self.extra.get(name).cloned().unwrap_or(Value::Null),
        }
    }

    /// Write a field from a JSON value, coercing it the same way loading does.
    ///
    /// Derived amounts are engine outputs and are left untouched; returns
    /// `false` in that case.
    pub fn set(&mut self, field: &Field, value: Value) -> bool {
        match field {
            Field::Cost | Field::ClientPrice | Field::ClientCost => return false,
            Field::Id => self.id = (!value.is_null()).then_some(value),
            Field::Name => self.name = value_to_string(&value),
            Field::Unit => self.unit = value_to_string(&value),
            Field::Quantity => self.quantity = value,
            Field::Price => self.price = value,
            Field::Markup => self.markup = (!value.is_null()).then_some(value),
            Field::Discount => self.discount = value,
            Field::Category => self.category = value.as_str().and_then(Category::parse),
            Field::Type => self.item_type = non_empty_string(&value),
            Field::IsHeader => self.is_header = parse_bool(&value),
            Field::IsGrandTotal => self.is_grand_total = parse_bool(&value),
            Field::Tag => self.tag = non_empty_string(&value),
            Field::Section => self.section = parse_index(&value),
            Field::Other(name) => {
                if value.is_null() {
                    self.extra.remove(name);
                } else {
                    self.extra.insert(name.clone(), value);
                }
            }
        }
        true
    }
}

/// Named row attribute, as addressed by cell edits.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Name,
    Unit,
    Quantity,
    Price,
    Markup,
    Discount,
    Cost,
    ClientPrice,
    ClientCost,
    Category,
    Type,
    IsHeader,
    IsGrandTotal,
    Tag,
    Section,
    Other(String),
}

impl Field {
    /// Resolve a field from its document key.
    pub fn from_name(name: &str) -> Field {
        match name {
            "id" => Field::Id,
            "name" => Field::Name,
            "unit" => Field::Unit,
            "quantity" => Field::Quantity,
            "price" => Field::Price,
            "markup" => Field::Markup,
            "discount" => Field::Discount,
            "cost" => Field::Cost,
            "client_price" => Field::ClientPrice,
            "client_cost" => Field::ClientCost,
            "category" => Field::Category,
            "type" => Field::Type,
            "is_header" => Field::IsHeader,
            "is_grand_total" => Field::IsGrandTotal,
            "_type" => Field::Tag,
            "section" => Field::Section,
            other => Field::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Field::Id => "id",
            Field::Name => "name",
            Field::Unit => "unit",
            Field::Quantity => "quantity",
            Field::Price => "price",
            Field::Markup => "markup",
            Field::Discount => "discount",
            Field::Cost => "cost",
            Field::ClientPrice => "client_price",
            Field::ClientCost => "client_cost",
            Field::Category => "category",
            Field::Type => "type",
            Field::IsHeader => "is_header",
            Field::IsGrandTotal => "is_grand_total",
            Field::Tag => "_type",
            Field::Section => "section",
            Field::Other(name) => name,
        }
    }

    /// Whether the field is computed by the engine.
    pub fn is_derived(&self) -> bool {
        matches!(self, Field::Cost | Field::ClientPrice | Field::ClientCost)
    }

    /// Whether editing the field can change any total.
    ///
    /// `name` counts: it drives the material keyword heuristic and the legacy
    /// grand-total fallback.
    pub fn affects_totals(&self) -> bool {
        !matches!(self, Field::Id | Field::Unit | Field::Other(_))
    }
}

fn opt_string_value(value: &Option<String>) -> Value {
    value.clone().map(Value::from).unwrap_or(Value::Null)
}

pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn non_empty_string(value: &Value) -> Option<String> {
    let s = value_to_string(value);
    (!s.trim().is_empty()).then_some(s)
}

fn parse_index(value: &Value) -> Option<usize> {
    parse_number(value)
        .filter(|n| *n >= 0.0 && n.fract() == 0.0)
        .map(|n| n as usize)
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(value_to_string(&Value::deserialize(d)?))
}

pub(crate) fn lenient_opt_string<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Option<String>, D::Error> {
    Ok(non_empty_string(&Value::deserialize(d)?))
}

fn lenient_opt_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    Ok(parse_bool(&Value::deserialize(d)?))
}

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(parse_number(&Value::deserialize(d)?).unwrap_or(0.0))
}

fn lenient_opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(parse_number(&Value::deserialize(d)?))
}

fn lenient_opt_index<'de, D: Deserializer<'de>>(d: D) -> Result<Option<usize>, D::Error> {
    Ok(parse_index(&Value::deserialize(d)?))
}

fn lenient_category<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Category>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(value.as_str().and_then(Category::parse))
}
