//! Estimate engine API.
//!
//! This module provides the pure computation side of an estimate:
//!
//! - [`Row`], [`Category`], [`Field`] - Row records and their editable fields
//! - [`Sheet`], [`Footer`] - Ordered rows plus display-only total rows
//! - [`Classifier`] - Item / section header / grand-total and work / material
//! - [`calculate`], [`Pricing`] - Per-row cost, client price and client cost
//! - [`section_spans`], [`plan_row_move`] - Positional sections and safe moves
//! - [`aggregate`], [`recalculate_sheet`] - Section and sheet totals
//! - [`format_money`] - Format amounts for display

mod aggregate;
mod calc;
mod classify;
mod format;
mod number;
mod row;
mod sections;
mod sheet;

pub use aggregate::{SectionTotals, SheetTotals, Subtotal, aggregate, recalculate_sheet};
pub use calc::{Derived, Pricing, RowInputs, apply_calculation, calculate, derive};
pub use classify::{Classification, Classifier, RowKind, classify, is_header};
pub use format::format_money;
pub use number::{finite_or_zero, parse_bool, parse_number, parse_number_str};
pub use row::{COPY_PREFIX, Category, Field, Row};
pub use sections::{
    Direction, MoveBlocked, RowMove, SectionSpan, plan_row_move, plan_section_move, section_of,
    section_spans,
};
pub use sheet::{Footer, Sheet};
