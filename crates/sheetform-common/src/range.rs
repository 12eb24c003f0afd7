use std::fmt;

use crate::reference::{CellReference, ReferenceError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Inclusive rectangular range normalised to top-left / bottom-right corners.
///
/// Anchors are dropped on construction so two ranges covering the same cells
/// compare equal regardless of how they were written.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRange {
    begin: CellReference,
    end: CellReference,
}

impl CellRange {
    /// Build from any two opposite corners.
    pub fn new(a: CellReference, b: CellReference) -> Self {
        let (left, right) = if a.column().value() <= b.column().value() {
            (a.column(), b.column())
        } else {
            (b.column(), a.column())
        };
        let (top, bottom) = if a.row().value() <= b.row().value() {
            (a.row(), b.row())
        } else {
            (b.row(), a.row())
        };
        Self {
            begin: CellReference::new(left, top).to_relative(),
            end: CellReference::new(right, bottom).to_relative(),
        }
    }

    /// A 1×1 range.
    pub fn cell(cell: CellReference) -> Self {
        Self::new(cell, cell)
    }

    /// Parse `A1:B2` or a single `A1`.
    pub fn parse(text: &str) -> Result<Self, ReferenceError> {
        match text.split_once(':') {
            Some((begin, end)) => Ok(Self::new(
                CellReference::parse(begin)?,
                CellReference::parse(end)?,
            )),
            None => CellReference::parse(text).map(Self::cell),
        }
    }

    /// Top-left corner.
    pub fn begin(&self) -> CellReference {
        self.begin
    }

    /// Bottom-right corner.
    pub fn end(&self) -> CellReference {
        self.end
    }

    pub fn width(&self) -> u32 {
        self.end.column().value() - self.begin.column().value() + 1
    }

    pub fn height(&self) -> u32 {
        self.end.row().value() - self.begin.row().value() + 1
    }

    pub fn is_single_cell(&self) -> bool {
        self.begin == self.end
    }

    /// True when `cell` lies inside the rectangle (anchors ignored).
    pub fn contains(&self, cell: CellReference) -> bool {
        let column = cell.column().value();
        let row = cell.row().value();
        column >= self.begin.column().value()
            && column <= self.end.column().value()
            && row >= self.begin.row().value()
            && row <= self.end.row().value()
    }
}

impl From<CellReference> for CellRange {
    fn from(cell: CellReference) -> Self {
        Self::cell(cell)
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single_cell() {
            write!(f, "{}", self.begin)
        } else {
            write!(f, "{}:{}", self.begin, self.end)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "serde")]
    #[test]
    fn ranges_serialize_normalised_corners() {
        let range = CellRange::parse("$B$3:A1").unwrap();
        let json = serde_json::to_value(range).unwrap();
        let corner = |column: u32, row: u32| {
            serde_json::json!({
                "column": { "value": column, "kind": "Relative" },
                "row": { "value": row, "kind": "Relative" },
            })
        };
        assert_eq!(json, serde_json::json!({ "begin": corner(0, 0), "end": corner(1, 2) }));
        assert_eq!(serde_json::from_value::<CellRange>(json).unwrap(), range);
    }

    #[test]
    fn corners_are_normalised() {
        let range = CellRange::parse("$C$5:A1").unwrap();
        assert_eq!(range.begin().to_string(), "A1");
        assert_eq!(range.end().to_string(), "C5");
        assert_eq!(range.width(), 3);
        assert_eq!(range.height(), 5);
        assert_eq!(range, CellRange::parse("A1:C5").unwrap());

        let crossed = CellRange::parse("C1:A5").unwrap();
        assert_eq!(crossed.to_string(), "A1:C5");
    }

    #[test]
    fn contains_checks_both_axes() {
        let range = CellRange::parse("B2:C3").unwrap();
        assert!(range.contains(CellReference::parse("B2").unwrap()));
        assert!(range.contains(CellReference::parse("$C$3").unwrap()));
        assert!(!range.contains(CellReference::parse("A2").unwrap()));
        assert!(!range.contains(CellReference::parse("D3").unwrap()));
        assert!(!range.contains(CellReference::parse("B4").unwrap()));
    }

    #[test]
    fn single_cell_display() {
        let range = CellRange::parse("D4").unwrap();
        assert!(range.is_single_cell());
        assert_eq!(range.to_string(), "D4");
    }
}
