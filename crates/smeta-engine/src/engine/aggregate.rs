//! Section and sheet totals.
//!
//! Totals are computed from the rows' raw inputs on every call, so they never
//! depend on derived values cached in the rows. Total rows (in-data grand-total
//! rows and footer rows) are outputs only: [`recalculate_sheet`] writes the
//! fresh totals into them.

use serde::Serialize;
use std::ops::{Add, AddAssign};

use super::calc::{self, Pricing};
use super::classify::{Classifier, RowKind};
use super::row::{Category, Row};
use super::sections::{SectionSpan, section_of, section_spans};
use super::sheet::Sheet;

/// Contractor cost and client cost of a group of rows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Subtotal {
    pub cost: f64,
    pub client: f64,
}

impl Add for Subtotal {
    type Output = Subtotal;

    fn add(self, rhs: Subtotal) -> Subtotal {
        Subtotal {
            cost: self.cost + rhs.cost,
            client: self.client + rhs.client,
        }
    }
}

impl AddAssign for Subtotal {
    fn add_assign(&mut self, rhs: Subtotal) {
        *self = *self + rhs;
    }
}

/// Totals of one section.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SectionTotals {
    /// Header row index, `None` for rows above the first header.
    pub header: Option<usize>,
    pub start: usize,
    pub end: usize,
    pub work: Subtotal,
    pub material: Subtotal,
}

impl SectionTotals {
    fn empty(span: &SectionSpan) -> Self {
        SectionTotals {
            header: span.header,
            start: span.start,
            end: span.end,
            work: Subtotal::default(),
            material: Subtotal::default(),
        }
    }

    pub fn span(&self) -> SectionSpan {
        SectionSpan {
            header: self.header,
            start: self.start,
            end: self.end,
        }
    }

    pub fn combined(&self) -> Subtotal {
        self.work + self.material
    }
}

/// Aggregation result for a sheet.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SheetTotals {
    pub sections: Vec<SectionTotals>,
    pub work: Subtotal,
    pub material: Subtotal,
    /// Client work plus client materials.
    pub grand_total: f64,
}

impl SheetTotals {
    pub fn combined(&self) -> Subtotal {
        self.work + self.material
    }

    /// Index of the section containing `row`.
    pub fn section_of(&self, row: usize) -> Option<usize> {
        let spans: Vec<SectionSpan> = self.sections.iter().map(SectionTotals::span).collect();
        section_of(&spans, row)
    }
}

/// Aggregate a sheet without modifying it.
pub fn aggregate(sheet: &Sheet, classifier: &Classifier, pricing: &Pricing) -> SheetTotals {
    let mut totals = SheetTotals::default();
    for span in section_spans(&sheet.data) {
        let mut section = SectionTotals::empty(&span);
        for row in &sheet.data[span.members()] {
            let Some(derived) = calc::derive(row, classifier, pricing) else {
                continue;
            };
            let amount = Subtotal {
                cost: derived.cost,
                client: derived.client_cost,
            };
            match classifier.category(row) {
                Category::Work => section.work += amount,
                Category::Material => section.material += amount,
            }
        }
        totals.work += section.work;
        totals.material += section.material;
        totals.sections.push(section);
    }
    totals.grand_total = totals.work.client + totals.material.client;
    totals
}

/// Recompute every item row of the sheet, aggregate, and refresh total rows.
pub fn recalculate_sheet(
    sheet: &mut Sheet,
    classifier: &Classifier,
    pricing: &Pricing,
) -> SheetTotals {
    for row in sheet.data.iter_mut() {
        calc::apply_calculation(row, classifier, pricing);
    }
    let totals = aggregate(sheet, classifier, pricing);

    for idx in 0..sheet.data.len() {
        if classifier.kind(&sheet.data[idx]) != RowKind::GrandTotal {
            continue;
        }
        if let Some(section) = totals.section_of(idx).map(|s| &totals.sections[s]) {
            write_total_row(&mut sheet.data[idx], section.work, section.material, classifier);
        }
    }

    for row in sheet.footer.items.iter_mut() {
        let (work, material) = match row.section.and_then(|s| totals.sections.get(s)) {
            Some(section) => (section.work, section.material),
            None => (totals.work, totals.material),
        };
        write_total_row(row, work, material, classifier);
    }

    totals
}

fn write_total_row(row: &mut Row, work: Subtotal, material: Subtotal, classifier: &Classifier) {
    let shown = match classifier.explicit_category(row) {
        Some(Category::Work) => work,
        Some(Category::Material) => material,
        None => work + material,
    };
    row.cost = shown.cost;
    row.client_price = 0.0;
    row.client_cost = shown.client;
    let is_grand_total = row.is_grand_total == Some(true)
        || row
            .tag
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case("grand_total"));
    if is_grand_total {
        row.grand_total = Some(work.client + material.client);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < EPS
    }

    fn scenario() -> Sheet {
        let mut sheet = Sheet::new("Смета").with_rows(vec![
            Row::header("Раздел 1"),
            Row::item("Штукатурка", "м2", 10.0, 500.0).with_pricing(20.0, 0.0),
            Row::item("Плитка", "м2", 5.0, 1000.0).with_pricing(10.0, 5.0),
        ]);
        sheet.footer.items.push(Row::grand_total("ИТОГО"));
        sheet
    }

    #[test]
    fn example_estimate_totals() {
        let mut sheet = scenario();
        let totals = recalculate_sheet(&mut sheet, &Classifier::default(), &Pricing::default());

        assert!(approx(totals.work.cost, 5000.0));
        assert!(approx(totals.work.client, 6000.0));
        assert!(approx(totals.material.cost, 5000.0));
        assert!(approx(totals.material.client, 5225.0));
        assert!(approx(totals.grand_total, 11225.0));
        assert_eq!(totals.sections.len(), 1);
        assert_eq!(totals.sections[0].header, Some(0));

        let footer = &sheet.footer.items[0];
        assert!(approx(footer.cost, 10000.0));
        assert!(approx(footer.client_cost, 11225.0));
        assert!(approx(footer.grand_total.unwrap(), 11225.0));
    }

    #[test]
    fn header_contributes_nothing() {
        let mut sheet = scenario();
        sheet.data[1].is_header = Some(true);
        let totals = recalculate_sheet(&mut sheet, &Classifier::default(), &Pricing::default());
        assert!(approx(totals.work.client, 0.0));
        assert!(approx(totals.grand_total, 5225.0));
        // The former item now opens its own section.
        assert_eq!(totals.sections.len(), 2);
        assert_eq!(sheet.data[1].cost, 0.0);
        assert_eq!(sheet.data[1].client_cost, 0.0);
    }

    #[test]
    fn aggregate_ignores_stale_cached_fields() {
        let mut sheet = scenario();
        sheet.data[1].client_cost = 999_999.0;
        let totals = aggregate(&sheet, &Classifier::default(), &Pricing::default());
        assert!(approx(totals.work.client, 6000.0));
    }

    #[test]
    fn footer_rows_are_outputs_not_inputs() {
        let mut sheet = scenario();
        sheet.footer.items[0].cost = 1e9;
        sheet.footer.items[0].quantity = serde_json::json!(100);
        let totals = recalculate_sheet(&mut sheet, &Classifier::default(), &Pricing::default());
        assert!(approx(totals.grand_total, 11225.0));
        assert!(approx(sheet.footer.items[0].cost, 10000.0));
    }

    #[test]
    fn total_rows_drop_leftover_client_price() {
        let mut sheet = scenario();
        sheet.footer.items[0].client_price = 777.0;
        // An item whose quantity was cleared falls back to a legacy total row.
        let mut cleaning = Row::item("Итоговая уборка", "шт", 3.0, 1000.0);
        cleaning.client_price = 1200.0;
        cleaning.quantity = serde_json::json!("");
        sheet.data.push(cleaning);

        recalculate_sheet(&mut sheet, &Classifier::default(), &Pricing::default());
        assert_eq!(sheet.footer.items[0].client_price, 0.0);
        assert!(approx(sheet.footer.items[0].client_cost, 11225.0));
        assert_eq!(sheet.data[3].client_price, 0.0);
        assert!(approx(sheet.data[3].client_cost, 11225.0));
    }

    #[test]
    fn categorized_and_section_scoped_footers() {
        let mut sheet = Sheet::new("Смета").with_rows(vec![
            Row::header("Раздел 1"),
            Row::item("Штукатурка", "м2", 10.0, 500.0).with_pricing(20.0, 0.0),
            Row::header("Раздел 2"),
            Row::item("Обои", "рулон", 4.0, 250.0).with_pricing(0.0, 0.0),
        ]);
        let materials_total = Row {
            name: "Итого материалы".into(),
            ..Row::default()
        };
        let section_two = Row {
            name: "Итого по разделу 2".into(),
            section: Some(1),
            ..Row::default()
        };
        sheet.footer.items = vec![materials_total, section_two];

        recalculate_sheet(&mut sheet, &Classifier::default(), &Pricing::default());
        assert!(approx(sheet.footer.items[0].client_cost, 1000.0));
        assert!(approx(sheet.footer.items[1].client_cost, 1000.0));
        assert!(approx(sheet.footer.items[1].cost, 1000.0));
    }

    #[test]
    fn in_data_total_row_reports_its_section() {
        let mut sheet = Sheet::new("Смета").with_rows(vec![
            Row::header("Раздел 1"),
            Row::item("Штукатурка", "м2", 10.0, 500.0).with_pricing(20.0, 0.0),
            Row {
                name: "Итого по разделу".into(),
                ..Row::default()
            },
            Row::header("Раздел 2"),
            Row::item("Демонтаж", "м2", 1.0, 100.0).with_pricing(0.0, 0.0),
        ]);
        let totals = recalculate_sheet(&mut sheet, &Classifier::default(), &Pricing::default());
        assert!(approx(sheet.data[2].client_cost, 6000.0));
        assert!(approx(totals.grand_total, 6100.0));
    }

    #[test]
    fn recalculation_is_idempotent() {
        let mut sheet = scenario();
        let classifier = Classifier::default();
        let pricing = Pricing::default();
        let first = recalculate_sheet(&mut sheet, &classifier, &pricing);
        let snapshot = sheet.clone();
        let second = recalculate_sheet(&mut sheet, &classifier, &pricing);
        assert_eq!(first, second);
        assert_eq!(sheet, snapshot);
    }

    #[test]
    fn empty_sheet_totals_zero() {
        let mut sheet = Sheet::new("Пусто");
        let totals = recalculate_sheet(&mut sheet, &Classifier::default(), &Pricing::default());
        assert!(totals.sections.is_empty());
        assert_eq!(totals.grand_total, 0.0);
    }
}
