//! Labels and the selection kinds a reference can resolve to.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::range::CellRange;
use crate::reference::{CellReference, ColumnReference, RowReference};

/// Longest label accepted.
pub const MAX_LABEL_LENGTH: usize = 255;

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum LabelError {
    #[error("empty label")]
    Empty,
    #[error("label {0:?} longer than {MAX_LABEL_LENGTH} characters")]
    TooLong(String),
    #[error("invalid character {ch:?} at {pos} in label {text:?}")]
    InvalidCharacter { ch: char, pos: usize, text: String },
    #[error("label {0:?} is a cell reference")]
    CellReference(String),
}

/// A named alias for a cell or range. Comparison ignores case.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
#[derive(Clone, Debug)]
pub struct LabelName(String);

impl LabelName {
    pub fn new(text: impl Into<String>) -> Result<Self, LabelError> {
        let text = text.into();
        let mut chars = text.char_indices();
        match chars.next() {
            None => return Err(LabelError::Empty),
            Some((_, c)) if c.is_ascii_alphabetic() || c == '_' || c == '\\' => {}
            Some((pos, ch)) => return Err(LabelError::InvalidCharacter { ch, pos, text }),
        }
        for (pos, ch) in chars {
            if !(ch.is_ascii_alphanumeric() || ch == '_' || ch == '.') {
                return Err(LabelError::InvalidCharacter { ch, pos, text });
            }
        }
        if text.len() > MAX_LABEL_LENGTH {
            return Err(LabelError::TooLong(text));
        }
        if CellReference::parse(&text).is_ok() {
            return Err(LabelError::CellReference(text));
        }
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if `c` may appear after the first character of a label.
    pub fn is_part(c: char) -> bool {
        c.is_ascii_alphanumeric() || c == '_' || c == '.'
    }

    /// True if `c` may start a label.
    pub fn is_start(c: char) -> bool {
        c.is_ascii_alphabetic() || c == '_' || c == '\\'
    }
}

impl PartialEq for LabelName {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for LabelName {}

impl Hash for LabelName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.0.bytes() {
            state.write_u8(b.to_ascii_uppercase());
        }
    }
}

impl Ord for LabelName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .bytes()
            .map(|b| b.to_ascii_uppercase())
            .cmp(other.0.bytes().map(|b| b.to_ascii_uppercase()))
    }
}

impl PartialOrd for LabelName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl TryFrom<String> for LabelName {
    type Error = LabelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LabelName> for String {
    fn from(value: LabelName) -> Self {
        value.0
    }
}

impl fmt::Display for LabelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Anything a reference in a formula or a converter can point at.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SpreadsheetSelection {
    Cell(CellReference),
    Range(CellRange),
    Column(ColumnReference),
    Row(RowReference),
    Label(LabelName),
}

impl SpreadsheetSelection {
    /// Parse a cell, a range or a label, in that order.
    pub fn parse(text: &str) -> Option<Self> {
        if let Ok(cell) = CellReference::parse(text) {
            return Some(Self::Cell(cell));
        }
        if text.contains(':') {
            return CellRange::parse(text).ok().map(Self::Range);
        }
        LabelName::new(text).ok().map(Self::Label)
    }

    /// The cells covered, when this selection is cell-shaped.
    pub fn to_range(&self) -> Option<CellRange> {
        match self {
            Self::Cell(cell) => Some(CellRange::cell(*cell)),
            Self::Range(range) => Some(*range),
            Self::Column(_) | Self::Row(_) | Self::Label(_) => None,
        }
    }
}

impl fmt::Display for SpreadsheetSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cell(cell) => write!(f, "{cell}"),
            Self::Range(range) => write!(f, "{range}"),
            Self::Column(column) => write!(f, "{column}"),
            Self::Row(row) => write!(f, "{row}"),
            Self::Label(label) => write!(f, "{label}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_compare_ignoring_case() {
        let a = LabelName::new("Total").unwrap();
        let b = LabelName::new("TOTAL").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "Total");
    }

    #[test]
    fn labels_reject_cell_references_and_bad_chars() {
        assert_eq!(
            LabelName::new("A1"),
            Err(LabelError::CellReference("A1".into()))
        );
        assert!(matches!(
            LabelName::new("1abc"),
            Err(LabelError::InvalidCharacter { pos: 0, .. })
        ));
        assert!(matches!(
            LabelName::new("ab-c"),
            Err(LabelError::InvalidCharacter { ch: '-', pos: 2, .. })
        ));
        assert_eq!(LabelName::new(""), Err(LabelError::Empty));
    }

    #[test]
    fn selection_parse_order() {
        assert!(matches!(
            SpreadsheetSelection::parse("B2"),
            Some(SpreadsheetSelection::Cell(_))
        ));
        assert!(matches!(
            SpreadsheetSelection::parse("B2:C3"),
            Some(SpreadsheetSelection::Range(_))
        ));
        assert!(matches!(
            SpreadsheetSelection::parse("Sales.Total"),
            Some(SpreadsheetSelection::Label(_))
        ));
        assert!(SpreadsheetSelection::parse("1+").is_none());
    }
}
