//! Spreadsheet error *values* (`#DIV/0!`, `#VALUE!`, …).
//!
//! These are not Rust errors in the `?` sense: they are values a formula can
//! evaluate to, carried inside [`LiteralValue::Error`]. Parsers and formatters
//! report their own failures with dedicated error types.
//!
//! - **`ExcelErrorKind`** : the canonical set of error codes
//! - **`ExcelError`**     : a kind plus an optional human explanation

use std::{error::Error, fmt};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::LiteralValue;

/// All recognised spreadsheet error codes.
///
/// **Note:** names are CamelCase (idiomatic Rust) while `Display`
/// renders them exactly as a spreadsheet shows them (`#DIV/0!`, …).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExcelErrorKind {
    Null,
    Div,
    Value,
    Ref,
    Name,
    Num,
    Na,
    Spill,
    Calc,
}

impl ExcelErrorKind {
    pub const ALL: [ExcelErrorKind; 9] = [
        Self::Null,
        Self::Div,
        Self::Value,
        Self::Ref,
        Self::Name,
        Self::Num,
        Self::Na,
        Self::Spill,
        Self::Calc,
    ];

    pub fn text(self) -> &'static str {
        match self {
            Self::Null => "#NULL!",
            Self::Div => "#DIV/0!",
            Self::Value => "#VALUE!",
            Self::Ref => "#REF!",
            Self::Name => "#NAME?",
            Self::Num => "#NUM!",
            Self::Na => "#N/A",
            Self::Spill => "#SPILL!",
            Self::Calc => "#CALC!",
        }
    }

    /// Case-insensitive lookup of an error code such as `#div/0!`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.text().eq_ignore_ascii_case(s))
    }

    /// Longest error code that prefixes `text`, compared case-insensitively.
    pub fn prefix_of(text: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .filter(|kind| {
                let code = kind.text();
                text.len() >= code.len()
                    && text.is_char_boundary(code.len())
                    && text[..code.len()].eq_ignore_ascii_case(code)
            })
            .max_by_key(|kind| kind.text().len())
    }
}

impl fmt::Display for ExcelErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// An error value with an optional explanation.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExcelError {
    pub kind: ExcelErrorKind,
    pub message: Option<String>,
}

impl From<ExcelErrorKind> for ExcelError {
    fn from(kind: ExcelErrorKind) -> Self {
        Self {
            kind,
            message: None,
        }
    }
}

impl ExcelError {
    pub fn new(kind: ExcelErrorKind) -> Self {
        kind.into()
    }

    /// Attach a human-readable explanation.
    pub fn with_message<S: Into<String>>(mut self, msg: S) -> Self {
        self.message = Some(msg.into());
        self
    }
}

impl fmt::Display for ExcelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(ref msg) = self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

impl Error for ExcelError {}

impl From<ExcelError> for LiteralValue {
    fn from(error: ExcelError) -> Self {
        LiteralValue::Error(error)
    }
}

impl PartialEq<str> for ExcelError {
    fn eq(&self, other: &str) -> bool {
        self.kind.text() == other
    }
}

impl PartialEq<&str> for ExcelError {
    fn eq(&self, other: &&str) -> bool {
        self.kind.text() == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(ExcelErrorKind::parse("#div/0!"), Some(ExcelErrorKind::Div));
        assert_eq!(ExcelErrorKind::parse(" #N/A "), Some(ExcelErrorKind::Na));
        assert_eq!(ExcelErrorKind::parse("#BOGUS!"), None);
    }

    #[test]
    fn prefix_prefers_longest_code() {
        assert_eq!(
            ExcelErrorKind::prefix_of("#NULL!+1"),
            Some(ExcelErrorKind::Null)
        );
        assert_eq!(ExcelErrorKind::prefix_of("#N/A)"), Some(ExcelErrorKind::Na));
        assert_eq!(ExcelErrorKind::prefix_of("#N/"), None);
    }

    #[test]
    fn display_includes_message() {
        let err = ExcelError::new(ExcelErrorKind::Value).with_message("bad operand");
        assert_eq!(err.to_string(), "#VALUE!: bad operand");
        assert!(err == "#VALUE!");
    }
}
