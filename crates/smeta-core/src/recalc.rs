//! Recalculation scheduling.
//!
//! The coordinator decides when a pass runs and what it covers. It owns no
//! document data: the store asks it for the next pass, runs it, and reports
//! back. Requests that arrive while a pass is pending are merged into it;
//! requests that arrive while a pass is running are queued for the next one,
//! so passes never interleave.
//!
//! ```text
//!   Idle ──request──▶ Scheduled ──begin (due or forced)──▶ Running
//!    ▲                   ▲  │ request: merge, restart window    │
//!    │                   │  ▼                                   │
//!    │                   └─── finish, more requests queued ◀────┤
//!    └──────────────────────── finish, nothing queued ◀─────────┘
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

/// Coordinator state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecalcState {
    Idle,
    Scheduled,
    Running,
}

/// Sheets a pass must recompute, with the rows touched on each.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecalcScope {
    pub sheets: BTreeMap<usize, BTreeSet<usize>>,
}

impl RecalcScope {
    pub fn add(&mut self, sheet: usize, rows: impl IntoIterator<Item = usize>) {
        self.sheets.entry(sheet).or_default().extend(rows);
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

#[derive(Debug)]
pub struct Coordinator {
    state: RecalcState,
    debounce: Duration,
    deadline: Option<Instant>,
    pending: RecalcScope,
    passes: u64,
}

impl Coordinator {
    pub fn new(debounce: Duration) -> Self {
        Coordinator {
            state: RecalcState::Idle,
            debounce,
            deadline: None,
            pending: RecalcScope::default(),
            passes: 0,
        }
    }

    pub fn state(&self) -> RecalcState {
        self.state
    }

    /// Number of completed passes.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Record that `rows` of `sheet` changed.
    pub fn request(&mut self, sheet: usize, rows: impl IntoIterator<Item = usize>, now: Instant) {
        self.pending.add(sheet, rows);
        match self.state {
            RecalcState::Idle | RecalcState::Scheduled => {
                self.state = RecalcState::Scheduled;
                self.deadline = Some(now + self.debounce);
            }
            RecalcState::Running => {
                // Picked up right after the running pass finishes.
                self.deadline = Some(now);
            }
        }
        tracing::trace!(sheet, state = ?self.state, "recalc requested");
    }

    /// Whether a scheduled pass may start at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        self.state == RecalcState::Scheduled && self.deadline.is_some_and(|d| now >= d)
    }

    /// Start the scheduled pass if it is due, or unconditionally when `force`.
    pub fn begin(&mut self, now: Instant, force: bool) -> Option<RecalcScope> {
        if self.state != RecalcState::Scheduled || !(force || self.is_due(now)) {
            return None;
        }
        self.state = RecalcState::Running;
        self.deadline = None;
        tracing::trace!(passes = self.passes, "recalc pass started");
        Some(std::mem::take(&mut self.pending))
    }

    /// Mark the running pass complete.
    pub fn finish(&mut self) {
        debug_assert_eq!(self.state, RecalcState::Running);
        self.passes += 1;
        self.state = if self.pending.is_empty() {
            self.deadline = None;
            RecalcState::Idle
        } else {
            RecalcState::Scheduled
        };
        tracing::trace!(passes = self.passes, state = ?self.state, "recalc pass finished");
    }
}
