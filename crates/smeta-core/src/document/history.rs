use smeta_engine::engine::Sheet;
use std::time::Instant;

use super::DocumentStore;
use super::model::TotalsSummary;
use crate::error::{EstimateError, Result};

/// Maximum number of undo entries to keep
pub(crate) const MAX_UNDO_STACK: usize = 100;

/// State needed to reverse one mutation.
#[derive(Clone, Debug)]
pub(crate) enum HistoryEntry {
    /// Copies of the sheets a row-level mutation touched.
    Sheets(Vec<(usize, Sheet)>),
    /// The whole sheet list, for mutations that add or remove sheets.
    Document {
        sheets: Vec<Sheet>,
        current_sheet: usize,
    },
}

impl DocumentStore {
    /// Push an undo entry before mutating.
    pub(crate) fn push_undo(&mut self, entry: HistoryEntry) {
        self.undo_stack.push(entry);
        self.redo_stack.clear();
        if self.undo_stack.len() > MAX_UNDO_STACK {
            self.undo_stack.remove(0);
        }
        self.modified = true;
    }

    pub(crate) fn snapshot_sheets(&self, sheets: impl IntoIterator<Item = usize>) -> HistoryEntry {
        let mut saved: Vec<(usize, Sheet)> = Vec::new();
        for idx in sheets {
            if saved.iter().any(|(i, _)| *i == idx) {
                continue;
            }
            if let Some(sheet) = self.estimate.sheets.get(idx) {
                saved.push((idx, sheet.clone()));
            }
        }
        HistoryEntry::Sheets(saved)
    }

    fn snapshot_document(&self) -> HistoryEntry {
        HistoryEntry::Document {
            sheets: self.estimate.sheets.clone(),
            current_sheet: self.estimate.current_sheet,
        }
    }

    pub(crate) fn push_document_undo(&mut self) {
        let entry = self.snapshot_document();
        self.push_undo(entry);
    }

    /// Swap `entry` into the document and return the state it replaced.
    fn restore(&mut self, entry: HistoryEntry) -> (HistoryEntry, Vec<usize>) {
        match entry {
            HistoryEntry::Sheets(saved) => {
                let affected: Vec<usize> = saved.iter().map(|(idx, _)| *idx).collect();
                let inverse = self.snapshot_sheets(affected.iter().copied());
                for (idx, sheet) in saved {
                    if let Some(slot) = self.estimate.sheets.get_mut(idx) {
                        *slot = sheet;
                    }
                }
                (inverse, affected)
            }
            HistoryEntry::Document {
                sheets,
                current_sheet,
            } => {
                let inverse = self.snapshot_document();
                self.estimate.sheets = sheets;
                let last = self.estimate.sheets.len().saturating_sub(1);
                self.estimate.current_sheet = current_sheet.min(last);
                (inverse, (0..self.estimate.sheets.len()).collect())
            }
        }
    }

    fn replay(&mut self, affected: Vec<usize>) -> TotalsSummary {
        let now = Instant::now();
        for sheet in affected {
            self.coordinator.request(sheet, std::iter::empty(), now);
        }
        self.modified = true;
        self.run_passes(now, true);
        self.estimate.totals
    }

    /// Undo the last mutation.
    pub fn undo(&mut self) -> Result<TotalsSummary> {
        self.flush();
        let entry = self.undo_stack.pop().ok_or(EstimateError::NothingToUndo)?;
        let (inverse, affected) = self.restore(entry);
        self.redo_stack.push(inverse);
        Ok(self.replay(affected))
    }

    /// Redo the last undone mutation.
    pub fn redo(&mut self) -> Result<TotalsSummary> {
        self.flush();
        let entry = self.redo_stack.pop().ok_or(EstimateError::NothingToRedo)?;
        let (inverse, affected) = self.restore(entry);
        self.undo_stack.push(inverse);
        Ok(self.replay(affected))
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }
}
