use serde_json::Value;
use smeta_engine::engine::{
    Classification, Field, SectionSpan, Sheet, SheetTotals, aggregate, recalculate_sheet,
    section_spans,
};
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::history::HistoryEntry;
use super::model::{Estimate, Repair, TotalsSummary};
use super::notify::{ChangeEvent, Listener, Listeners, SubscriptionId, touched_sections};
use crate::config::EngineConfig;
use crate::error::{EstimateError, Result};
use crate::recalc::{Coordinator, RecalcState};
use crate::storage;

/// A cell edit waiting for the next pass.
#[derive(Clone, Debug)]
pub(crate) struct StagedEdit {
    pub sheet: usize,
    pub row: usize,
    pub field: Field,
    pub value: Value,
}

/// Owner of an estimate document.
///
/// All edits go through the store. Each one is validated before anything is
/// touched, then a recalculation pass runs so that callers only ever observe
/// documents whose derived fields and totals agree with the raw inputs.
pub struct DocumentStore {
    pub(crate) estimate: Estimate,
    pub(crate) config: EngineConfig,
    pub(crate) coordinator: Coordinator,
    pub(crate) staged: Vec<StagedEdit>,
    pub(crate) listeners: Listeners,
    /// Current file path
    pub(crate) file_path: Option<PathBuf>,
    /// Whether the document has unsaved changes
    pub(crate) modified: bool,
    pub(crate) undo_stack: Vec<HistoryEntry>,
    pub(crate) redo_stack: Vec<HistoryEntry>,
}

impl DocumentStore {
    /// Create a store holding a single empty sheet.
    ///
    /// This constructor is side-effect free: it does not touch the filesystem.
    pub fn new(config: EngineConfig) -> Self {
        let estimate = Estimate::new(&config.footer.label);
        Self::from_estimate(estimate, config)
    }

    /// Take ownership of a parsed document, repairing and recomputing it.
    pub fn from_estimate(mut estimate: Estimate, config: EngineConfig) -> Self {
        let repairs = estimate.normalize(&config.footer.label);
        log_repairs(&repairs);
        let mut store = DocumentStore {
            estimate,
            coordinator: Coordinator::new(config.debounce()),
            config,
            staged: Vec::new(),
            listeners: Listeners::default(),
            file_path: None,
            modified: false,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
        };
        store.recalculate_all();
        store
    }

    /// Parse a JSON document.
    pub fn from_json_str(content: &str, config: EngineConfig) -> Result<Self> {
        let loaded = storage::parse_estimate_str(content)?;
        log_repairs(&loaded.repairs);
        Ok(Self::from_estimate(loaded.estimate, config))
    }

    /// Create a store and load a file if provided.
    ///
    /// A path that does not exist yet becomes the save target of an empty document.
    pub fn with_file(path: Option<PathBuf>, config: EngineConfig) -> Result<Self> {
        let mut store = Self::new(config);
        if let Some(p) = path {
            if p.exists() {
                store.load_file(&p)?;
            } else {
                store.file_path = Some(p);
                store.modified = false;
            }
        }
        Ok(store)
    }

    /// Run every pass that may start at `now`. Returns whether any ran.
    pub(crate) fn run_passes(&mut self, now: Instant, force: bool) -> bool {
        let mut ran = false;
        while let Some(scope) = self.coordinator.begin(now, force) {
            self.apply_staged();

            let mut recomputed = Vec::with_capacity(scope.sheets.len());
            for (&idx, rows) in &scope.sheets {
                let Some(sheet) = self.estimate.sheets.get_mut(idx) else {
                    continue;
                };
                let totals = recalculate_sheet(sheet, &self.config.classify, &self.config.pricing);
                let sections = touched_sections(&totals, rows.iter().copied());
                recomputed.push((idx, sections, totals));
            }
            self.estimate.totals = self.compute_summary();
            self.coordinator.finish();
            tracing::debug!(
                sheets = recomputed.len(),
                pass = self.coordinator.passes(),
                grand_total = self.estimate.totals.grand_total,
                "recalculation pass complete"
            );

            for (sheet, sections, sheet_totals) in recomputed {
                self.listeners.emit(&ChangeEvent {
                    sheet,
                    sections,
                    sheet_totals,
                    totals: self.estimate.totals,
                });
            }
            ran = true;
        }
        ran
    }

    /// Apply queued cell edits as one undoable step.
    fn apply_staged(&mut self) {
        if self.staged.is_empty() {
            return;
        }
        let staged = std::mem::take(&mut self.staged);
        let entry = self.snapshot_sheets(staged.iter().map(|edit| edit.sheet));
        self.push_undo(entry);
        for edit in staged {
            let row = self
                .estimate
                .sheets
                .get_mut(edit.sheet)
                .and_then(|sheet| sheet.data.get_mut(edit.row));
            match row {
                Some(row) => {
                    row.set(&edit.field, edit.value);
                }
                None => tracing::warn!(
                    sheet = edit.sheet,
                    row = edit.row,
                    "dropping staged edit for a row that no longer exists"
                ),
            }
        }
    }

    pub(crate) fn compute_summary(&self) -> TotalsSummary {
        let per_sheet: Vec<SheetTotals> = self
            .estimate
            .sheets
            .iter()
            .map(|sheet| aggregate(sheet, &self.config.classify, &self.config.pricing))
            .collect();
        TotalsSummary::from_sheets(&per_sheet)
    }

    /// Recompute every sheet now.
    pub fn recalculate_all(&mut self) -> TotalsSummary {
        let now = Instant::now();
        for idx in 0..self.estimate.sheets.len() {
            self.coordinator.request(idx, std::iter::empty(), now);
        }
        self.run_passes(now, true);
        self.estimate.totals
    }

    pub(crate) fn check_sheet(&self, sheet: usize) -> Result<()> {
        if sheet < self.estimate.sheets.len() {
            Ok(())
        } else {
            Err(EstimateError::SheetOutOfRange {
                index: sheet,
                count: self.estimate.sheets.len(),
            })
        }
    }

    pub(crate) fn check_row(&self, sheet: usize, row: usize) -> Result<()> {
        self.check_sheet(sheet)?;
        let count = self.estimate.sheets[sheet].data.len();
        if row < count {
            Ok(())
        } else {
            Err(EstimateError::RowOutOfRange { sheet, row, count })
        }
    }

    /// Register a listener for completed passes.
    pub fn subscribe(&mut self, listener: impl FnMut(&ChangeEvent) + 'static) -> SubscriptionId {
        let listener: Listener = Box::new(listener);
        self.listeners.subscribe(listener)
    }

    /// Returns whether the listener was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }


    pub fn document(&self) -> &Estimate {
        &self.estimate
    }

    pub fn sheet(&self, index: usize) -> Option<&Sheet> {
        self.estimate.sheets.get(index)
    }

    pub fn current_sheet_index(&self) -> usize {
        self.estimate.current_sheet
    }

    /// Document summary as of the last completed pass.
    pub fn totals(&self) -> TotalsSummary {
        self.estimate.totals
    }

    /// Section and category totals of one sheet.
    pub fn sheet_totals(&self, index: usize) -> Result<SheetTotals> {
        self.check_sheet(index)?;
        Ok(aggregate(
            &self.estimate.sheets[index],
            &self.config.classify,
            &self.config.pricing,
        ))
    }

    pub fn sections(&self, index: usize) -> Result<Vec<SectionSpan>> {
        self.check_sheet(index)?;
        Ok(section_spans(&self.estimate.sheets[index].data))
    }

    pub fn classify_row(&self, sheet: usize, row: usize) -> Result<Classification> {
        self.check_row(sheet, row)?;
        Ok(self
            .config
            .classify
            .classify(&self.estimate.sheets[sheet].data[row]))
    }

    /// Whether staged edits are waiting for their pass.
    pub fn has_pending(&self) -> bool {
        !self.staged.is_empty() || self.coordinator.state() != RecalcState::Idle
    }

    /// When the pending debounced pass becomes due, if one is scheduled.
    ///
    /// Callers driving [`tick`](Self::tick) from a timer wait until then.
    pub fn next_pass_at(&self) -> Option<Instant> {
        self.coordinator.deadline()
    }

    pub fn recalc_state(&self) -> RecalcState {
        self.coordinator.state()
    }

    /// Number of completed recalculation passes.
    pub fn passes(&self) -> u64 {
        self.coordinator.passes()
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

pub(crate) fn log_repairs(repairs: &[Repair]) {
    for repair in repairs {
        tracing::warn!("normalized document: {repair}");
    }
}
