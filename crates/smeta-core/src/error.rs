//! Error types for Smeta core.

use thiserror::Error;

/// Errors that can occur while editing or storing an estimate.
///
/// Every variant leaves the document unchanged: operations validate before
/// they mutate.
#[derive(Error, Debug)]
pub enum EstimateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Sheet {index} does not exist (document has {count} sheets)")]
    SheetOutOfRange { index: usize, count: usize },

    #[error("Row {row} does not exist on sheet {sheet} ({count} rows)")]
    RowOutOfRange { sheet: usize, row: usize, count: usize },

    #[error("Section {section} does not exist on sheet {sheet} ({count} sections)")]
    SectionOutOfRange {
        sheet: usize,
        section: usize,
        count: usize,
    },

    #[error("Field `{0}` is computed by the engine and cannot be edited")]
    DerivedField(String),

    #[error("Invalid field name: {0:?}")]
    InvalidField(String),

    #[error("Row {row} cannot move past its section boundary")]
    AtSectionBoundary { row: usize },

    #[error("Row {row} is already at the edge of the sheet")]
    AtSheetEdge { row: usize },

    #[error("Cannot remove the only sheet")]
    LastSheet,

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,

    #[error("No file path set")]
    NoFilePath,
}

pub type Result<T> = std::result::Result<T, EstimateError>;
