//! Column, row and cell references.
//!
//! References keep the `$` anchor of the source text as a [`ReferenceKind`]
//! so `$A$1` renders back unchanged. Ordering is row-major: top-to-bottom,
//! then left-to-right, which is the order the range store indexes corners in.

use core::fmt;
use std::cmp::Ordering;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of columns in a sheet (`A` ..= `XFD`).
pub const MAX_COLUMNS: u32 = 16_384;
/// Number of rows in a sheet.
pub const MAX_ROWS: u32 = 1_048_576;

/// Errors produced while parsing or constructing references.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ReferenceError {
    #[error("empty reference")]
    Empty,
    #[error("invalid character {ch:?} at {pos} in {text:?}")]
    InvalidCharacter { ch: char, pos: usize, text: String },
    #[error("column {0} out of range (max {MAX_COLUMNS})")]
    ColumnOutOfRange(u64),
    #[error("row {0} out of range (max {MAX_ROWS})")]
    RowOutOfRange(u64),
}

impl ReferenceError {
    fn invalid(text: &str, pos: usize) -> Self {
        ReferenceError::InvalidCharacter {
            ch: text[pos..].chars().next().unwrap_or('\0'),
            pos,
            text: text.to_string(),
        }
    }
}

/// Whether a coordinate is anchored (`$`) or relative.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum ReferenceKind {
    Relative,
    Absolute,
}

impl ReferenceKind {
    fn prefix(self) -> &'static str {
        match self {
            ReferenceKind::Absolute => "$",
            ReferenceKind::Relative => "",
        }
    }
}

/// 0-based column with anchor kind.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ColumnReference {
    value: u32,
    kind: ReferenceKind,
}

impl ColumnReference {
    pub fn new(value: u32, kind: ReferenceKind) -> Result<Self, ReferenceError> {
        if value >= MAX_COLUMNS {
            return Err(ReferenceError::ColumnOutOfRange(value as u64));
        }
        Ok(Self { value, kind })
    }

    pub fn relative(value: u32) -> Result<Self, ReferenceError> {
        Self::new(value, ReferenceKind::Relative)
    }

    #[inline(always)]
    pub fn value(self) -> u32 {
        self.value
    }

    #[inline(always)]
    pub fn kind(self) -> ReferenceKind {
        self.kind
    }

    pub fn set_kind(self, kind: ReferenceKind) -> Self {
        Self { kind, ..self }
    }

    /// Parse `AB` or `$AB`.
    pub fn parse(text: &str) -> Result<Self, ReferenceError> {
        match scan_column(text, 0)? {
            Some((column, end)) if end == text.len() => Ok(column),
            Some((_, end)) => Err(ReferenceError::invalid(text, end)),
            None if text.is_empty() => Err(ReferenceError::Empty),
            None => Err(ReferenceError::invalid(text, 0)),
        }
    }
}

impl Ord for ColumnReference {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value
            .cmp(&other.value)
            .then(self.kind.cmp(&other.kind))
    }
}

impl PartialOrd for ColumnReference {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ColumnReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.prefix(), column_to_letters(self.value))
    }
}

/// 0-based row with anchor kind.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct RowReference {
    value: u32,
    kind: ReferenceKind,
}

impl RowReference {
    pub fn new(value: u32, kind: ReferenceKind) -> Result<Self, ReferenceError> {
        if value >= MAX_ROWS {
            return Err(ReferenceError::RowOutOfRange(value as u64));
        }
        Ok(Self { value, kind })
    }

    pub fn relative(value: u32) -> Result<Self, ReferenceError> {
        Self::new(value, ReferenceKind::Relative)
    }

    #[inline(always)]
    pub fn value(self) -> u32 {
        self.value
    }

    #[inline(always)]
    pub fn kind(self) -> ReferenceKind {
        self.kind
    }

    pub fn set_kind(self, kind: ReferenceKind) -> Self {
        Self { kind, ..self }
    }

    /// Parse `12` or `$12` (1-based text).
    pub fn parse(text: &str) -> Result<Self, ReferenceError> {
        match scan_row(text, 0)? {
            Some((row, end)) if end == text.len() => Ok(row),
            Some((_, end)) => Err(ReferenceError::invalid(text, end)),
            None if text.is_empty() => Err(ReferenceError::Empty),
            None => Err(ReferenceError::invalid(text, 0)),
        }
    }
}

impl Ord for RowReference {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value
            .cmp(&other.value)
            .then(self.kind.cmp(&other.kind))
    }
}

impl PartialOrd for RowReference {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RowReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.prefix(), self.value + 1)
    }
}

/// A single cell, e.g. `B3` or `$B$3`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct CellReference {
    column: ColumnReference,
    row: RowReference,
}

impl CellReference {
    pub const fn new(column: ColumnReference, row: RowReference) -> Self {
        Self { column, row }
    }

    /// Relative reference from 0-based coordinates.
    pub fn from_coords(column: u32, row: u32) -> Result<Self, ReferenceError> {
        Ok(Self::new(
            ColumnReference::relative(column)?,
            RowReference::relative(row)?,
        ))
    }

    #[inline(always)]
    pub fn column(self) -> ColumnReference {
        self.column
    }

    #[inline(always)]
    pub fn row(self) -> RowReference {
        self.row
    }

    /// Same coordinates with both anchors cleared.
    pub fn to_relative(self) -> Self {
        Self {
            column: self.column.set_kind(ReferenceKind::Relative),
            row: self.row.set_kind(ReferenceKind::Relative),
        }
    }

    /// Parse a complete A1 reference.
    pub fn parse(text: &str) -> Result<Self, ReferenceError> {
        if text.is_empty() {
            return Err(ReferenceError::Empty);
        }
        match Self::scan(text, 0)? {
            Some((cell, end)) if end == text.len() => Ok(cell),
            Some((_, end)) => Err(ReferenceError::invalid(text, end)),
            None => Err(ReferenceError::invalid(text, 0)),
        }
    }

    /// Scan a reference starting at byte `pos`, returning it and the end offset.
    ///
    /// Returns `Ok(None)` when the text at `pos` does not have the shape of a
    /// reference at all, and an error when it does but is out of bounds.
    pub fn scan(text: &str, pos: usize) -> Result<Option<(Self, usize)>, ReferenceError> {
        let Some((column, after_column)) = scan_column(text, pos)? else {
            return Ok(None);
        };
        let Some((row, end)) = scan_row(text, after_column)? else {
            return Ok(None);
        };
        Ok(Some((Self::new(column, row), end)))
    }
}

impl Ord for CellReference {
    fn cmp(&self, other: &Self) -> Ordering {
        self.row
            .value
            .cmp(&other.row.value)
            .then(self.column.value.cmp(&other.column.value))
            .then(self.row.kind.cmp(&other.row.kind))
            .then(self.column.kind.cmp(&other.column.kind))
    }
}

impl PartialOrd for CellReference {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for CellReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column, self.row)
    }
}

fn scan_column(
    text: &str,
    pos: usize,
) -> Result<Option<(ColumnReference, usize)>, ReferenceError> {
    let bytes = text.as_bytes();
    let mut i = pos;
    let kind = if bytes.get(i) == Some(&b'$') {
        i += 1;
        ReferenceKind::Absolute
    } else {
        ReferenceKind::Relative
    };
    let start = i;
    while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
        i += 1;
    }
    if i == start {
        return Ok(None);
    }
    // More than three letters is a name, never a column.
    if i - start > 3 {
        return Ok(None);
    }
    let value = letters_to_column_index(&text[start..i]).ok_or_else(|| {
        ReferenceError::ColumnOutOfRange(u64::MAX)
    })?;
    Ok(Some((ColumnReference::new(value, kind)?, i)))
}

fn scan_row(text: &str, pos: usize) -> Result<Option<(RowReference, usize)>, ReferenceError> {
    let bytes = text.as_bytes();
    let mut i = pos;
    let kind = if bytes.get(i) == Some(&b'$') {
        i += 1;
        ReferenceKind::Absolute
    } else {
        ReferenceKind::Relative
    };
    let start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == start || bytes[start] == b'0' {
        return Ok(None);
    }
    let one_based: u64 = text[start..i]
        .parse()
        .map_err(|_| ReferenceError::RowOutOfRange(u64::MAX))?;
    if one_based > MAX_ROWS as u64 {
        return Err(ReferenceError::RowOutOfRange(one_based));
    }
    Ok(Some((RowReference::new((one_based - 1) as u32, kind)?, i)))
}

/// `0 -> A`, `25 -> Z`, `26 -> AA`.
pub fn column_to_letters(mut col: u32) -> String {
    let mut buf = Vec::new();
    loop {
        let rem = (col % 26) as u8;
        buf.push(b'A' + rem);
        col /= 26;
        if col == 0 {
            break;
        }
        col -= 1;
    }
    buf.reverse();
    buf.into_iter().map(char::from).collect()
}

/// Inverse of [`column_to_letters`], case-insensitive.
pub fn letters_to_column_index(s: &str) -> Option<u32> {
    if s.is_empty() {
        return None;
    }
    let mut col: u32 = 0;
    for (idx, ch) in s.bytes().enumerate() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let val = (ch.to_ascii_uppercase() - b'A') as u32;
        col = col.checked_mul(26)?;
        col = col.checked_add(val)?;
        if idx != s.len() - 1 {
            col = col.checked_add(1)?;
        }
    }
    Some(col)
}
