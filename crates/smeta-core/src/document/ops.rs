use serde_json::{Map, Value};
use smeta_engine::engine::{
    Direction, Field, MoveBlocked, Row, RowMove, Sheet, plan_row_move, plan_section_move,
    section_spans,
};
use std::time::Instant;
use uuid::Uuid;

use super::DocumentStore;
use super::model::TotalsSummary;
use super::state::StagedEdit;
use crate::error::{EstimateError, Result};

/// Resolve an editable field by name.
fn editable_field(name: &str) -> Result<Field> {
    if name.trim().is_empty() {
        return Err(EstimateError::InvalidField(name.to_string()));
    }
    let field = Field::from_name(name);
    if field.is_derived() {
        return Err(EstimateError::DerivedField(field.name().to_string()));
    }
    Ok(field)
}

fn move_error(blocked: MoveBlocked, row: usize) -> EstimateError {
    match blocked {
        MoveBlocked::AtSheetEdge => EstimateError::AtSheetEdge { row },
        MoveBlocked::AtSectionBoundary => EstimateError::AtSectionBoundary { row },
    }
}

fn with_fresh_id(mut row: Row) -> Row {
    if row.id.as_ref().is_none_or(Value::is_null) {
        row.id = Some(Value::from(Uuid::new_v4().to_string()));
    }
    row
}

impl DocumentStore {
    /// Request a pass over `rows` of `sheet` and run it now.
    fn commit(&mut self, sheet: usize, rows: impl IntoIterator<Item = usize>) -> TotalsSummary {
        let now = Instant::now();
        self.coordinator.request(sheet, rows, now);
        self.run_passes(now, true);
        self.estimate.totals
    }

    /// Like [`commit`](Self::commit), but only when the edit can move a total.
    fn commit_if(
        &mut self,
        affects_totals: bool,
        sheet: usize,
        rows: impl IntoIterator<Item = usize>,
    ) -> TotalsSummary {
        if affects_totals {
            self.commit(sheet, rows)
        } else {
            self.estimate.totals
        }
    }

    fn push_sheet_undo(&mut self, sheet: usize) {
        let entry = self.snapshot_sheets([sheet]);
        self.push_undo(entry);
    }

    /// Apply any staged edits immediately.
    pub fn flush(&mut self) -> TotalsSummary {
        self.run_passes(Instant::now(), true);
        self.estimate.totals
    }

    /// Queue a cell edit; it is applied by the pass that [`tick`](Self::tick)
    /// starts once the debounce window has elapsed.
    ///
    /// Fields that cannot change any total (`id`, `unit`, unknown keys) are
    /// written at once and schedule no pass.
    pub fn stage_cell(
        &mut self,
        sheet: usize,
        row: usize,
        field: &str,
        value: Value,
        now: Instant,
    ) -> Result<()> {
        self.check_row(sheet, row)?;
        let field = editable_field(field)?;
        if !field.affects_totals() {
            self.push_sheet_undo(sheet);
            self.estimate.sheets[sheet].data[row].set(&field, value);
            return Ok(());
        }
        self.staged.push(StagedEdit {
            sheet,
            row,
            field,
            value,
        });
        self.coordinator.request(sheet, [row], now);
        Ok(())
    }

    /// Run the pending pass if its debounce window has elapsed.
    ///
    /// Returns the new summary when a pass ran.
    pub fn tick(&mut self, now: Instant) -> Option<TotalsSummary> {
        self.run_passes(now, false).then_some(self.estimate.totals)
    }

    /// Set one field of a row.
    pub fn set_cell(
        &mut self,
        sheet: usize,
        row: usize,
        field: &str,
        value: Value,
    ) -> Result<TotalsSummary> {
        self.flush();
        self.check_row(sheet, row)?;
        let field = editable_field(field)?;

        self.push_sheet_undo(sheet);
        let affects_totals = field.affects_totals();
        self.estimate.sheets[sheet].data[row].set(&field, value);
        Ok(self.commit_if(affects_totals, sheet, [row]))
    }

    /// Set several fields of a row at once. Nothing is changed if any field
    /// name is rejected.
    pub fn update_row(
        &mut self,
        sheet: usize,
        row: usize,
        fields: &Map<String, Value>,
    ) -> Result<TotalsSummary> {
        self.flush();
        self.check_row(sheet, row)?;
        let updates = fields
            .iter()
            .map(|(name, value)| -> Result<(Field, Value)> {
                Ok((editable_field(name)?, value.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        self.push_sheet_undo(sheet);
        let affects_totals = updates.iter().any(|(field, _)| field.affects_totals());
        let target = &mut self.estimate.sheets[sheet].data[row];
        for (field, value) in updates {
            target.set(&field, value);
        }
        Ok(self.commit_if(affects_totals, sheet, [row]))
    }

    /// Insert `row` after index `after`, or at the top when `after` is `None`.
    ///
    /// A row without an id is given one.
    pub fn insert_row(
        &mut self,
        sheet: usize,
        after: Option<usize>,
        row: Row,
    ) -> Result<TotalsSummary> {
        self.flush();
        let at = match after {
            Some(after) => {
                self.check_row(sheet, after)?;
                after + 1
            }
            None => {
                self.check_sheet(sheet)?;
                0
            }
        };

        self.push_sheet_undo(sheet);
        self.estimate.sheets[sheet].data.insert(at, with_fresh_id(row));
        Ok(self.commit(sheet, [at]))
    }

    /// Append an empty item priced with the configured defaults.
    ///
    /// The row is tagged `_type: "item"`, so naming it "Итоговая ..." before
    /// typing a quantity does not turn it into a total row.
    pub fn add_row(&mut self, sheet: usize) -> Result<TotalsSummary> {
        self.flush();
        self.check_sheet(sheet)?;
        let pricing = self.config.pricing;
        let mut row = Row::item("", "", 0.0, 0.0).with_pricing(pricing.markup, pricing.discount);
        row.tag = Some("item".to_string());

        self.push_sheet_undo(sheet);
        let data = &mut self.estimate.sheets[sheet].data;
        data.push(with_fresh_id(row));
        let at = data.len() - 1;
        Ok(self.commit(sheet, [at]))
    }

    /// Delete a row. A section whose last member goes stays as an empty section.
    pub fn remove_row(&mut self, sheet: usize, row: usize) -> Result<TotalsSummary> {
        self.flush();
        self.check_row(sheet, row)?;

        self.push_sheet_undo(sheet);
        self.estimate.sheets[sheet].data.remove(row);
        Ok(self.commit(sheet, [row.saturating_sub(1)]))
    }

    /// Insert a copy of a row right after it.
    pub fn duplicate_row(&mut self, sheet: usize, row: usize) -> Result<TotalsSummary> {
        self.flush();
        self.check_row(sheet, row)?;

        self.push_sheet_undo(sheet);
        let data = &mut self.estimate.sheets[sheet].data;
        let copy = with_fresh_id(data[row].duplicate());
        data.insert(row + 1, copy);
        Ok(self.commit(sheet, [row, row + 1]))
    }

    /// Move a row one step within its section. Moving a header moves its
    /// whole section.
    pub fn move_row(
        &mut self,
        sheet: usize,
        row: usize,
        direction: Direction,
    ) -> Result<TotalsSummary> {
        self.flush();
        self.check_row(sheet, row)?;
        let plan = plan_row_move(&self.estimate.sheets[sheet].data, row, direction, false)
            .map_err(|blocked| move_error(blocked, row))?;
        Ok(self.apply_move(sheet, plan))
    }

    /// Move a row one step, hopping over an adjacent header into the
    /// neighbouring section.
    pub fn move_row_across(
        &mut self,
        sheet: usize,
        row: usize,
        direction: Direction,
    ) -> Result<TotalsSummary> {
        self.flush();
        self.check_row(sheet, row)?;
        let plan = plan_row_move(&self.estimate.sheets[sheet].data, row, direction, true)
            .map_err(|blocked| move_error(blocked, row))?;
        Ok(self.apply_move(sheet, plan))
    }

    /// Append a section header.
    pub fn add_section(&mut self, sheet: usize, title: &str) -> Result<TotalsSummary> {
        self.flush();
        self.check_sheet(sheet)?;

        self.push_sheet_undo(sheet);
        let data = &mut self.estimate.sheets[sheet].data;
        data.push(with_fresh_id(Row::header(title)));
        let at = data.len() - 1;
        Ok(self.commit(sheet, [at]))
    }

    /// Move section number `section` (header and members) past its neighbour.
    pub fn move_section(
        &mut self,
        sheet: usize,
        section: usize,
        direction: Direction,
    ) -> Result<TotalsSummary> {
        self.flush();
        self.check_sheet(sheet)?;
        let data = &self.estimate.sheets[sheet].data;
        let spans = section_spans(data);
        let Some(span) = spans.get(section) else {
            return Err(EstimateError::SectionOutOfRange {
                sheet,
                section,
                count: spans.len(),
            });
        };
        let first = span.block().start;
        let plan = plan_section_move(data, section, direction)
            .map_err(|blocked| move_error(blocked, first))?;
        Ok(self.apply_move(sheet, plan))
    }

    fn apply_move(&mut self, sheet: usize, plan: RowMove) -> TotalsSummary {
        self.push_sheet_undo(sheet);
        plan.apply(&mut self.estimate.sheets[sheet].data);
        tracing::debug!(sheet, from = ?plan.from, to = ?plan.destination(), "moved rows");
        self.commit(sheet, plan.touched())
    }

    /// Append a sheet with an empty footer total row.
    pub fn add_sheet(&mut self, name: &str) -> Result<TotalsSummary> {
        self.flush();
        self.push_document_undo();
        let mut new_sheet = Sheet::new(name);
        new_sheet
            .footer
            .items
            .push(Row::grand_total(&self.config.footer.label));
        self.estimate.sheets.push(new_sheet);
        let idx = self.estimate.sheets.len() - 1;
        Ok(self.commit(idx, std::iter::empty()))
    }

    /// Remove a sheet. The only sheet of a document cannot be removed.
    pub fn remove_sheet(&mut self, index: usize) -> Result<TotalsSummary> {
        self.flush();
        self.check_sheet(index)?;
        if self.estimate.sheets.len() == 1 {
            return Err(EstimateError::LastSheet);
        }

        self.push_document_undo();
        self.estimate.sheets.remove(index);
        let current = self.estimate.current_sheet;
        if current > index {
            self.estimate.current_sheet = current - 1;
        }
        let last = self.estimate.sheets.len() - 1;
        self.estimate.current_sheet = self.estimate.current_sheet.min(last);
        let current = self.estimate.current_sheet;
        Ok(self.commit(current, std::iter::empty()))
    }

    pub fn rename_sheet(&mut self, index: usize, name: &str) -> Result<TotalsSummary> {
        self.flush();
        self.check_sheet(index)?;

        self.push_sheet_undo(index);
        self.estimate.sheets[index].name = Some(name.to_string());
        Ok(self.commit(index, std::iter::empty()))
    }

    /// Make `index` the sheet being edited and recompute it.
    ///
    /// Not an edit: history and the modified flag are left alone.
    pub fn switch_sheet(&mut self, index: usize) -> Result<TotalsSummary> {
        self.flush();
        self.check_sheet(index)?;
        self.estimate.current_sheet = index;
        Ok(self.commit(index, std::iter::empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use serde_json::json;

    fn store_with(rows: Vec<Row>) -> DocumentStore {
        let mut estimate = crate::document::Estimate::default();
        estimate.sheets.push(Sheet::new("Смета").with_rows(rows));
        DocumentStore::from_estimate(estimate, EngineConfig::default())
    }

    fn names(store: &DocumentStore) -> Vec<String> {
        store.sheet(0).unwrap().data.iter().map(|r| r.name.clone()).collect()
    }

    #[test]
    fn derived_and_empty_fields_are_rejected() {
        let mut store = store_with(vec![Row::item("Штукатурка", "м2", 10.0, 500.0)]);
        assert!(matches!(
            store.set_cell(0, 0, "client_cost", json!(1)),
            Err(EstimateError::DerivedField(f)) if f == "client_cost"
        ));
        assert!(matches!(
            store.set_cell(0, 0, "", json!(1)),
            Err(EstimateError::InvalidField(_))
        ));
        assert!(!store.can_undo());
    }

    #[test]
    fn update_row_is_all_or_nothing() {
        let mut store = store_with(vec![Row::item("Штукатурка", "м2", 10.0, 500.0)]);
        let mut fields = Map::new();
        fields.insert("quantity".into(), json!(1));
        fields.insert("cost".into(), json!(5));
        assert!(store.update_row(0, 0, &fields).is_err());
        assert_eq!(store.sheet(0).unwrap().data[0].quantity, json!(10.0));

        fields.remove("cost");
        fields.insert("note".into(), json!("угол"));
        store.update_row(0, 0, &fields).unwrap();
        let row = &store.sheet(0).unwrap().data[0];
        assert_eq!(row.cost, 500.0);
        assert_eq!(row.extra.get("note"), Some(&json!("угол")));
    }

    #[test]
    fn out_of_range_leaves_document_unchanged() {
        let mut store = store_with(vec![Row::item("Штукатурка", "м2", 10.0, 500.0)]);
        let before = store.document().clone();
        assert!(matches!(
            store.remove_row(0, 5),
            Err(EstimateError::RowOutOfRange { row: 5, count: 1, .. })
        ));
        assert!(matches!(
            store.add_row(3),
            Err(EstimateError::SheetOutOfRange { index: 3, .. })
        ));
        assert!(matches!(
            store.move_section(0, 4, Direction::Up),
            Err(EstimateError::SectionOutOfRange { section: 4, .. })
        ));
        assert_eq!(store.document(), &before);
        assert!(!store.is_modified());
    }

    #[test]
    fn insert_and_add_assign_ids() {
        let mut store = store_with(vec![Row::item("Штукатурка", "м2", 10.0, 500.0)]);
        store.insert_row(0, None, Row::header("Раздел 1")).unwrap();
        store.insert_row(0, Some(1), Row::item("Шпаклёвка", "м2", 1.0, 1.0)).unwrap();
        store.add_row(0).unwrap();
        assert_eq!(names(&store), vec!["Раздел 1", "Штукатурка", "Шпаклёвка", ""]);
        let data = &store.sheet(0).unwrap().data;
        assert!([0, 2, 3].iter().all(|&i| data[i].id.is_some()));
        assert!(data[1].id.is_none());
        assert_eq!(data[3].markup, Some(json!(20.0)));
        assert!(store.is_modified());
    }

    #[test]
    fn duplicate_inserts_renamed_copy() {
        let mut original = Row::item("Плитка", "м2", 5.0, 1000.0).with_pricing(10.0, 5.0);
        original.id = Some(json!(7));
        let mut store = store_with(vec![original]);
        store.duplicate_row(0, 0).unwrap();

        let data = &store.sheet(0).unwrap().data;
        assert_eq!(data[1].name, "Копия: Плитка");
        assert_ne!(data[1].id, data[0].id);
        assert_eq!(data[1].client_cost, data[0].client_cost);
        assert!((store.totals().client_materials_total - 10450.0).abs() < 1e-6);
    }

    #[test]
    fn moves_respect_sections() {
        let mut store = store_with(vec![
            Row::header("Раздел 1"),
            Row::item("А", "шт", 1.0, 1.0),
            Row::header("Раздел 2"),
            Row::item("Б", "шт", 1.0, 1.0),
        ]);
        assert!(matches!(
            store.move_row(0, 1, Direction::Down),
            Err(EstimateError::AtSectionBoundary { row: 1 })
        ));
        assert!(matches!(
            store.move_row(0, 3, Direction::Down),
            Err(EstimateError::AtSheetEdge { row: 3 })
        ));

        store.move_row_across(0, 1, Direction::Down).unwrap();
        assert_eq!(names(&store), vec!["Раздел 1", "Раздел 2", "А", "Б"]);

        store.move_section(0, 1, Direction::Up).unwrap();
        assert_eq!(names(&store), vec!["Раздел 2", "А", "Б", "Раздел 1"]);
    }

    #[test]
    fn removing_last_member_keeps_empty_section() {
        let mut store = store_with(vec![
            Row::header("Раздел 1"),
            Row::item("А", "шт", 1.0, 100.0),
            Row::header("Раздел 2"),
        ]);
        store.remove_row(0, 1).unwrap();
        let sections = store.sections(0).unwrap();
        assert_eq!(sections.len(), 2);
        assert!(sections[0].members().is_empty());
        assert_eq!(store.totals().grand_total, 0.0);
    }

    #[test]
    fn sheet_lifecycle() {
        let mut store = DocumentStore::default();
        assert!(matches!(store.remove_sheet(0), Err(EstimateError::LastSheet)));

        store.add_sheet("Кухня").unwrap();
        store.add_sheet("Ванная").unwrap();
        store.switch_sheet(2).unwrap();
        store.remove_sheet(0).unwrap();
        assert_eq!(store.current_sheet_index(), 1);
        assert_eq!(store.sheet(1).unwrap().name.as_deref(), Some("Ванная"));

        store.rename_sheet(0, "Кухня-гостиная").unwrap();
        assert_eq!(store.sheet(0).unwrap().name.as_deref(), Some("Кухня-гостиная"));
        assert_eq!(store.sheet(0).unwrap().footer.items.len(), 1);
        assert!(matches!(
            store.switch_sheet(9),
            Err(EstimateError::SheetOutOfRange { index: 9, count: 2 })
        ));
    }

    #[test]
    fn staged_edits_wait_for_debounce() {
        let mut store = store_with(vec![Row::item("Штукатурка", "м2", 10.0, 500.0)]);
        let t0 = Instant::now();
        store.stage_cell(0, 0, "quantity", json!("2"), t0).unwrap();
        store.stage_cell(0, 0, "quantity", json!("20"), t0).unwrap();
        assert!(store.has_pending());
        assert_eq!(store.sheet(0).unwrap().data[0].quantity, json!(10.0));
        assert!(store.tick(t0).is_none());

        let due = store.next_pass_at().unwrap();
        assert_eq!(due, t0 + store.config().debounce());
        let totals = store.tick(due).unwrap();
        assert!((totals.grand_total - 12000.0).abs() < 1e-6);
        assert!(!store.has_pending());

        // Both keystrokes form one history entry.
        store.undo().unwrap();
        assert_eq!(store.sheet(0).unwrap().data[0].quantity, json!(10.0));
        assert!(!store.can_undo());
    }

    #[test]
    fn descriptive_edits_schedule_no_pass() {
        let mut store = store_with(vec![Row::item("Штукатурка", "м2", 10.0, 500.0)]);
        let passes = store.passes();
        store.set_cell(0, 0, "unit", json!("м²")).unwrap();
        let mut fields = Map::new();
        fields.insert("note".into(), json!("северная стена"));
        store.update_row(0, 0, &fields).unwrap();
        store
            .stage_cell(0, 0, "id", json!("row-1"), Instant::now())
            .unwrap();
        assert_eq!(store.passes(), passes);
        assert!(!store.has_pending());

        let row = &store.sheet(0).unwrap().data[0];
        assert_eq!(row.unit, "м²");
        assert_eq!(row.id, Some(json!("row-1")));
        assert!(store.is_modified());

        store.set_cell(0, 0, "quantity", json!(2)).unwrap();
        assert_eq!(store.passes(), passes + 1);
    }

    #[test]
    fn added_row_named_like_a_total_stays_an_item() {
        let mut store = store_with(vec![Row::item("Штукатурка", "м2", 10.0, 500.0)]);
        store.add_row(0).unwrap();
        store.set_cell(0, 1, "name", json!("Итоговая уборка")).unwrap();
        assert_eq!(
            store.classify_row(0, 1).unwrap().kind,
            smeta_engine::engine::RowKind::Item
        );
        let row = &store.sheet(0).unwrap().data[1];
        assert_eq!(row.client_cost, 0.0);
        assert!((store.totals().grand_total - 6000.0).abs() < 1e-6);
    }

    #[test]
    fn staging_validates_eagerly() {
        let mut store = store_with(vec![]);
        let now = Instant::now();
        assert!(store.stage_cell(0, 0, "price", json!(1), now).is_err());
        assert!(!store.has_pending());
    }
}
