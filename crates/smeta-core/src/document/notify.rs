use smeta_engine::engine::SheetTotals;

use super::model::TotalsSummary;

/// Published once per recomputed sheet after a pass completes.
#[derive(Clone, Debug, PartialEq)]
pub struct ChangeEvent {
    pub sheet: usize,
    /// Sections containing the rows that changed.
    pub sections: Vec<usize>,
    pub sheet_totals: SheetTotals,
    /// Document summary after the pass.
    pub totals: TotalsSummary,
}

/// Handle returned by [`DocumentStore::subscribe`](super::DocumentStore::subscribe).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub type Listener = Box<dyn FnMut(&ChangeEvent)>;

#[derive(Default)]
pub(crate) struct Listeners {
    next_id: u64,
    entries: Vec<(SubscriptionId, Listener)>,
}

impl Listeners {
    pub(crate) fn subscribe(&mut self, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, listener));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub(crate) fn emit(&mut self, event: &ChangeEvent) {
        for (_, listener) in self.entries.iter_mut() {
            listener(event);
        }
    }
}

/// Map touched row indices to the sections that contain them.
///
/// Indices past the end (a row removed from the tail) belong to the last section.
pub(crate) fn touched_sections(
    totals: &SheetTotals,
    rows: impl IntoIterator<Item = usize>,
) -> Vec<usize> {
    let mut sections: Vec<usize> = rows
        .into_iter()
        .filter_map(|row| {
            totals
                .section_of(row)
                .or_else(|| totals.sections.len().checked_sub(1))
        })
        .collect();
    sections.sort_unstable();
    sections.dedup();
    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use smeta_engine::engine::{Classifier, Pricing, Row, Sheet, aggregate};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn subscribe_emit_unsubscribe() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut listeners = Listeners::default();
        let sink = Rc::clone(&seen);
        let id = listeners.subscribe(Box::new(move |event: &ChangeEvent| {
            sink.borrow_mut().push(event.sheet)
        }));
        let event = ChangeEvent {
            sheet: 2,
            sections: vec![],
            sheet_totals: SheetTotals::default(),
            totals: TotalsSummary::default(),
        };
        listeners.emit(&event);
        assert!(listeners.unsubscribe(id));
        assert!(!listeners.unsubscribe(id));
        listeners.emit(&event);
        assert_eq!(*seen.borrow(), vec![2]);
        assert!(listeners.entries.is_empty());
    }

    #[test]
    fn rows_map_to_sections() {
        let sheet = Sheet::new("Смета").with_rows(vec![
            Row::item("Вывоз мусора", "рейс", 1.0, 100.0),
            Row::header("Раздел 1"),
            Row::item("Штукатурка", "м2", 10.0, 500.0),
            Row::header("Раздел 2"),
        ]);
        let totals = aggregate(&sheet, &Classifier::default(), &Pricing::default());
        assert_eq!(touched_sections(&totals, [2, 0, 1]), vec![0, 1]);
        assert_eq!(touched_sections(&totals, [3, 9]), vec![2]);
        assert!(touched_sections(&SheetTotals::default(), [0]).is_empty());
    }
}
