//! Format pattern parse tree.
//!
//! Every token keeps the exact slice of pattern text it was parsed from, so a
//! parent's text is always the concatenation of its children's text and the
//! original pattern can be rebuilt from the root.

use std::fmt;
use std::hash::{Hash, Hasher};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::FormatParseError;

/// Comparison inside a `[>100]` style section condition.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionOp {
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
}

impl ConditionOp {
    /// Longest operator prefixing `text`, with its byte length.
    pub fn scan(text: &str) -> Option<(Self, usize)> {
        const OPS: [(&str, ConditionOp); 7] = [
            ("<=", ConditionOp::LessEqual),
            (">=", ConditionOp::GreaterEqual),
            ("<>", ConditionOp::NotEqual),
            ("!=", ConditionOp::NotEqual),
            ("<", ConditionOp::Less),
            (">", ConditionOp::Greater),
            ("=", ConditionOp::Equal),
        ];
        OPS.iter()
            .find(|(symbol, _)| text.starts_with(symbol))
            .map(|(symbol, op)| (*op, symbol.len()))
    }

    pub fn test(self, value: f64, target: f64) -> bool {
        match self {
            ConditionOp::Equal => value == target,
            ConditionOp::NotEqual => value != target,
            ConditionOp::Greater => value > target,
            ConditionOp::GreaterEqual => value >= target,
            ConditionOp::Less => value < target,
            ConditionOp::LessEqual => value <= target,
        }
    }
}

/// Named or numbered colour selected by a `[Red]` / `[Color12]` block.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatColor {
    Black,
    Blue,
    Cyan,
    Green,
    Magenta,
    Red,
    White,
    Yellow,
    Number(u32),
}

impl FormatColor {
    pub const NAMED: [FormatColor; 8] = [
        FormatColor::Black,
        FormatColor::Blue,
        FormatColor::Cyan,
        FormatColor::Green,
        FormatColor::Magenta,
        FormatColor::Red,
        FormatColor::White,
        FormatColor::Yellow,
    ];

    /// Highest palette index accepted by `[ColorN]`.
    pub const MAX_NUMBER: u32 = 56;

    pub fn name(self) -> Option<&'static str> {
        Some(match self {
            FormatColor::Black => "Black",
            FormatColor::Blue => "Blue",
            FormatColor::Cyan => "Cyan",
            FormatColor::Green => "Green",
            FormatColor::Magenta => "Magenta",
            FormatColor::Red => "Red",
            FormatColor::White => "White",
            FormatColor::Yellow => "Yellow",
            FormatColor::Number(_) => return None,
        })
    }
}

/// Leaf token kinds. Counted kinds record how many letters were repeated.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", content = "value"))]
#[derive(Debug, Clone, PartialEq)]
pub enum FormatLeafKind {
    Day(usize),
    Month(usize),
    MonthOrMinute(usize),
    Year(usize),
    Hour(usize),
    Second(usize),
    AmPm,
    Digit,
    DigitZero,
    DigitSpace,
    DecimalPoint,
    GroupSeparator,
    Percent,
    Currency,
    Exponent,
    TextPlaceholder,
    QuotedText(String),
    Escape(char),
    Star(char),
    Underscore(char),
    Whitespace,
    TextLiteral(String),
    FractionSymbol,
    FractionDenominator(u32),
    BracketOpen,
    BracketClose,
    ColorName(FormatColor),
    ColorNumber(u32),
    ConditionSymbol(ConditionOp),
    ConditionNumber(f64),
    Separator,
    General,
}

impl FormatLeafKind {
    /// True for `#`, `0` and `?`.
    pub fn is_digit(&self) -> bool {
        matches!(
            self,
            FormatLeafKind::Digit | FormatLeafKind::DigitZero | FormatLeafKind::DigitSpace
        )
    }

    /// True for the date and time component letters.
    pub fn is_date_time_component(&self) -> bool {
        matches!(
            self,
            FormatLeafKind::Day(_)
                | FormatLeafKind::Month(_)
                | FormatLeafKind::MonthOrMinute(_)
                | FormatLeafKind::Year(_)
                | FormatLeafKind::Hour(_)
                | FormatLeafKind::Second(_)
        )
    }

    /// Literal text this leaf contributes verbatim to formatted output.
    pub fn literal(&self, source: &str) -> Option<String> {
        match self {
            FormatLeafKind::QuotedText(text) | FormatLeafKind::TextLiteral(text) => {
                Some(text.clone())
            }
            FormatLeafKind::Escape(ch) => Some(ch.to_string()),
            FormatLeafKind::Whitespace => Some(source.to_string()),
            _ => None,
        }
    }
}

/// Parent token kinds.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", content = "value"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatParentKind {
    Color,
    Condition(ConditionOp),
    Date,
    DateTime,
    Time,
    Number,
    Fraction,
    Text,
    General,
    Expression,
}

/// A node of a parsed format pattern. Serializes as an object named by its
/// kind, e.g. `{"type": "Day", "value": 2, "text": "dd"}`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(into = "TokenRepr", from = "TokenRepr"))]
#[derive(Debug, Clone, PartialEq)]
pub enum FormatParserToken {
    Leaf {
        kind: FormatLeafKind,
        text: String,
    },
    Parent {
        kind: FormatParentKind,
        children: Vec<FormatParserToken>,
        text: String,
    },
}

#[cfg(feature = "serde")]
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum TokenRepr {
    // Parents first: a leaf object has no `children`, and some kind names are shared.
    Parent(ParentRepr),
    Leaf(LeafRepr),
}

#[cfg(feature = "serde")]
#[derive(Serialize, Deserialize)]
struct LeafRepr {
    #[serde(flatten)]
    kind: FormatLeafKind,
    text: String,
}

#[cfg(feature = "serde")]
#[derive(Serialize, Deserialize)]
struct ParentRepr {
    #[serde(flatten)]
    kind: FormatParentKind,
    children: Vec<FormatParserToken>,
    text: String,
}

#[cfg(feature = "serde")]
impl From<FormatParserToken> for TokenRepr {
    fn from(token: FormatParserToken) -> Self {
        match token {
            FormatParserToken::Leaf { kind, text } => TokenRepr::Leaf(LeafRepr { kind, text }),
            FormatParserToken::Parent {
                kind,
                children,
                text,
            } => TokenRepr::Parent(ParentRepr {
                kind,
                children,
                text,
            }),
        }
    }
}

#[cfg(feature = "serde")]
impl From<TokenRepr> for FormatParserToken {
    fn from(repr: TokenRepr) -> Self {
        match repr {
            TokenRepr::Leaf(LeafRepr { kind, text }) => FormatParserToken::Leaf { kind, text },
            TokenRepr::Parent(ParentRepr {
                kind,
                children,
                text,
            }) => FormatParserToken::Parent {
                kind,
                children,
                text,
            },
        }
    }
}

impl FormatParserToken {
    pub fn leaf(kind: FormatLeafKind, text: impl Into<String>) -> Result<Self, FormatParseError> {
        let text = text.into();
        if text.is_empty() {
            return Err(FormatParseError::EmptyToken);
        }
        Ok(FormatParserToken::Leaf { kind, text })
    }

    /// Parent whose text is rebuilt from `children`.
    pub fn parent(
        kind: FormatParentKind,
        children: Vec<FormatParserToken>,
    ) -> Result<Self, FormatParseError> {
        let text: String = children.iter().map(FormatParserToken::text).collect();
        if text.is_empty() {
            return Err(FormatParseError::EmptyToken);
        }
        Ok(FormatParserToken::Parent {
            kind,
            children,
            text,
        })
    }

    pub fn text(&self) -> &str {
        match self {
            FormatParserToken::Leaf { text, .. } | FormatParserToken::Parent { text, .. } => text,
        }
    }

    pub fn leaf_kind(&self) -> Option<&FormatLeafKind> {
        match self {
            FormatParserToken::Leaf { kind, .. } => Some(kind),
            FormatParserToken::Parent { .. } => None,
        }
    }

    pub fn parent_kind(&self) -> Option<FormatParentKind> {
        match self {
            FormatParserToken::Parent { kind, .. } => Some(*kind),
            FormatParserToken::Leaf { .. } => None,
        }
    }

    pub fn children(&self) -> &[FormatParserToken] {
        match self {
            FormatParserToken::Parent { children, .. } => children,
            FormatParserToken::Leaf { .. } => &[],
        }
    }

    /// Depth-first leaves, skipping the contents of nested parents of `skip` kinds.
    pub fn leaves_skipping<'a>(
        &'a self,
        skip: &dyn Fn(FormatParentKind) -> bool,
        out: &mut Vec<&'a FormatParserToken>,
    ) {
        match self {
            FormatParserToken::Leaf { .. } => out.push(self),
            FormatParserToken::Parent { kind, children, .. } => {
                if skip(*kind) {
                    return;
                }
                for child in children {
                    child.leaves_skipping(skip, out);
                }
            }
        }
    }

    /// All leaves in source order.
    pub fn leaves(&self) -> Vec<&FormatParserToken> {
        let mut out = Vec::new();
        self.leaves_skipping(&|_| false, &mut out);
        out
    }
}

impl Eq for FormatParserToken {}

impl Hash for FormatParserToken {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Values are derived from the text, so text plus shape identifies a token.
        match self {
            FormatParserToken::Leaf { kind, text } => {
                state.write_u8(0);
                std::mem::discriminant(kind).hash(state);
                text.hash(state);
            }
            FormatParserToken::Parent { kind, children, .. } => {
                state.write_u8(1);
                kind.hash(state);
                children.hash(state);
            }
        }
    }
}

impl fmt::Display for FormatParserToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}
