use std::fmt;

use crate::converter::ValueKind;
use crate::pattern::PatternKind;

/// Failures loading the embedded pattern grammar.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GrammarError {
    #[error("grammar syntax error at {pos}: {message}")]
    Syntax { pos: usize, message: String },
    #[error("rule {0:?} is defined more than once")]
    DuplicateRule(String),
    #[error("{0:?} is neither a rule nor a registered primitive")]
    UnknownName(String),
    #[error("grammar has no rule named {0:?}")]
    MissingRule(String),
}

/// Pattern text that does not follow the grammar.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FormatParseError {
    #[error("empty pattern")]
    Empty,
    #[error("invalid character {ch:?} at {pos} in {text:?}")]
    InvalidCharacter { ch: char, pos: usize, text: String },
    #[error("pattern {text:?} ended unexpectedly")]
    UnexpectedEnd { text: String },
    #[error("token text must not be empty")]
    EmptyToken,
}

impl FormatParseError {
    pub(crate) fn at(text: &str, pos: usize) -> Self {
        match text.get(pos..).and_then(|rest| rest.chars().next()) {
            Some(ch) => FormatParseError::InvalidCharacter {
                ch,
                pos,
                text: text.to_string(),
            },
            None => FormatParseError::UnexpectedEnd {
                text: text.to_string(),
            },
        }
    }
}

/// A pattern that parsed but cannot be used for the requested purpose.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error(transparent)]
    Parse(#[from] FormatParseError),
    #[error("{kind} pattern does not allow {token:?}")]
    InvalidToken { kind: PatternKind, token: String },
    #[error("{kind} pattern has {count} sections, at most {max} allowed")]
    SectionCount {
        kind: PatternKind,
        count: usize,
        max: usize,
    },
    #[error("{kind} pattern cannot be used as {wanted}")]
    WrongKind { kind: PatternKind, wanted: Usage },
}

/// What a pattern was asked to become.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Usage {
    Formatter,
    NumberParser,
    DateTimeParser,
}

impl fmt::Display for Usage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Usage::Formatter => "a formatter",
            Usage::NumberParser => "a number parser",
            Usage::DateTimeParser => "a date/time parser",
        })
    }
}

/// Conversion between value kinds failed.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConvertError {
    #[error("cannot convert {from} to {to}")]
    Unsupported { from: ValueKind, to: ValueKind },
    #[error("{text:?} does not match any {to} pattern")]
    NoMatch { text: String, to: ValueKind },
    #[error("{0} is outside the date range")]
    OutOfRange(f64),
    #[error(transparent)]
    Pattern(#[from] PatternError),
}
