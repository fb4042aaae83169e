//! Positional sections and section-aware row moves.
//!
//! A section starts at a header row and runs until the next header or the end
//! of the sheet. Rows above the first header form a leading section without a
//! header. Membership is purely positional; no row points at its section.

use std::ops::Range;

use super::classify::is_header;
use super::row::Row;

/// Location of one section inside a sheet's rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SectionSpan {
    /// Index of the header row, `None` for the leading section.
    pub header: Option<usize>,
    /// First member row (just after the header).
    pub start: usize,
    /// One past the last member row.
    pub end: usize,
}

impl SectionSpan {
    /// Member rows, excluding the header.
    pub fn members(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Header plus members.
    pub fn block(&self) -> Range<usize> {
        self.header.unwrap_or(self.start)..self.end
    }

    pub fn contains(&self, row: usize) -> bool {
        self.block().contains(&row)
    }
}

/// Split rows into sections.
pub fn section_spans(rows: &[Row]) -> Vec<SectionSpan> {
    let mut spans = Vec::new();
    let mut current = SectionSpan {
        header: None,
        start: 0,
        end: 0,
    };
    for (idx, row) in rows.iter().enumerate() {
        if is_header(row) {
            if current.header.is_some() || idx > 0 {
                current.end = idx;
                spans.push(current);
            }
            current = SectionSpan {
                header: Some(idx),
                start: idx + 1,
                end: idx + 1,
            };
        }
    }
    if current.header.is_some() || !rows.is_empty() {
        current.end = rows.len();
        spans.push(current);
    }
    spans
}

/// Index of the section containing `row`.
pub fn section_of(spans: &[SectionSpan], row: usize) -> Option<usize> {
    spans.iter().position(|s| s.contains(row))
}

/// Direction of a row or section move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
}

/// Why a move cannot happen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveBlocked {
    /// Nothing above or below to move past.
    AtSheetEdge,
    /// The move would silently change section membership.
    AtSectionBoundary,
}

/// A block of rows relocated within a sheet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowMove {
    /// Rows taken out.
    pub from: Range<usize>,
    /// Index of the block's first row after the move.
    pub to: usize,
}

impl RowMove {
    /// Every index whose row may differ after the move.
    pub fn touched(&self) -> Range<usize> {
        let len = self.from.len();
        self.from.start.min(self.to)..self.from.end.max(self.to + len)
    }

    /// Where the block's rows end up.
    pub fn destination(&self) -> Range<usize> {
        self.to..self.to + self.from.len()
    }

    pub fn apply(&self, rows: &mut Vec<Row>) {
        let block: Vec<Row> = rows.drain(self.from.clone()).collect();
        let at = self.to.min(rows.len());
        rows.splice(at..at, block);
    }
}

/// Plan moving a single row one step.
///
/// Items stay inside their section unless `cross_sections` is set, in which
/// case an item next to a header hops over it into the neighbouring section.
/// Moving a header moves its whole section.
pub fn plan_row_move(
    rows: &[Row],
    index: usize,
    direction: Direction,
    cross_sections: bool,
) -> Result<RowMove, MoveBlocked> {
    if is_header(&rows[index]) {
        return plan_section_block_move(rows, index, direction);
    }
    let neighbour = match direction {
        Direction::Up => index.checked_sub(1),
        Direction::Down => Some(index + 1).filter(|n| *n < rows.len()),
    };
    let Some(neighbour) = neighbour else {
        return Err(MoveBlocked::AtSheetEdge);
    };
    if is_header(&rows[neighbour]) && !cross_sections {
        return Err(MoveBlocked::AtSectionBoundary);
    }
    Ok(RowMove {
        from: index..index + 1,
        to: neighbour,
    })
}

/// Plan moving section number `section` one step.
pub fn plan_section_move(
    rows: &[Row],
    section: usize,
    direction: Direction,
) -> Result<RowMove, MoveBlocked> {
    let spans = section_spans(rows);
    match spans.get(section).and_then(|s| s.header) {
        Some(header) => plan_section_block_move(rows, header, direction),
        None => Err(MoveBlocked::AtSectionBoundary),
    }
}

fn plan_section_block_move(
    rows: &[Row],
    header: usize,
    direction: Direction,
) -> Result<RowMove, MoveBlocked> {
    let spans = section_spans(rows);
    let Some(k) = spans.iter().position(|s| s.header == Some(header)) else {
        return Err(MoveBlocked::AtSectionBoundary);
    };
    let block = spans[k].block();
    match direction {
        Direction::Down => {
            let next = spans.get(k + 1).ok_or(MoveBlocked::AtSheetEdge)?;
            Ok(RowMove {
                to: block.start + next.block().len(),
                from: block,
            })
        }
        Direction::Up => {
            let prev = k.checked_sub(1).map(|p| spans[p]).ok_or(MoveBlocked::AtSheetEdge)?;
            // The leading rows have no header to travel with; swapping past
            // them would pull them into this section.
            let prev_header = prev.header.ok_or(MoveBlocked::AtSectionBoundary)?;
            Ok(RowMove {
                from: block,
                to: prev_header,
            })
        }
    }
}
