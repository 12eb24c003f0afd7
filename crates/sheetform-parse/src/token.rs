//! Formula parse tree.
//!
//! Leaves carry a typed value next to the exact source slice they came from.
//! Parents own their children and cache the concatenated text, so any tree
//! renders back to the formula it was parsed from. Whitespace and symbols stay
//! in the tree as leaves.

use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use sheetform_common::{CellReference, ExcelErrorKind, LabelName};

use crate::error::ParserError;

/// Binary operators, highest [`BinaryOperator::priority`] binds tightest.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Addition,
    Subtraction,
    Multiplication,
    Division,
    Power,
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanEquals,
    LessThan,
    LessThanEquals,
}

impl BinaryOperator {
    pub fn priority(self) -> u8 {
        match self {
            BinaryOperator::Equals
            | BinaryOperator::NotEquals
            | BinaryOperator::GreaterThan
            | BinaryOperator::GreaterThanEquals
            | BinaryOperator::LessThan
            | BinaryOperator::LessThanEquals => 1,
            BinaryOperator::Addition | BinaryOperator::Subtraction => 2,
            BinaryOperator::Multiplication | BinaryOperator::Division => 3,
            BinaryOperator::Power => 4,
        }
    }

    pub fn is_comparison(self) -> bool {
        self.priority() == 1
    }

    pub fn symbol(self) -> SymbolKind {
        match self {
            BinaryOperator::Addition => SymbolKind::Plus,
            BinaryOperator::Subtraction => SymbolKind::Minus,
            BinaryOperator::Multiplication => SymbolKind::Multiply,
            BinaryOperator::Division => SymbolKind::Divide,
            BinaryOperator::Power => SymbolKind::Power,
            BinaryOperator::Equals => SymbolKind::Equals,
            BinaryOperator::NotEquals => SymbolKind::NotEquals,
            BinaryOperator::GreaterThan => SymbolKind::GreaterThan,
            BinaryOperator::GreaterThanEquals => SymbolKind::GreaterThanEquals,
            BinaryOperator::LessThan => SymbolKind::LessThan,
            BinaryOperator::LessThanEquals => SymbolKind::LessThanEquals,
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol().text())
    }
}

/// Punctuation and operator symbols.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Plus,
    Minus,
    Multiply,
    Divide,
    Power,
    Percent,
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanEquals,
    LessThan,
    LessThanEquals,
    Between,
    ParenthesisOpen,
    ParenthesisClose,
    ValueSeparator,
}

impl SymbolKind {
    const ALL: [SymbolKind; 16] = [
        SymbolKind::GreaterThanEquals,
        SymbolKind::LessThanEquals,
        SymbolKind::NotEquals,
        SymbolKind::Plus,
        SymbolKind::Minus,
        SymbolKind::Multiply,
        SymbolKind::Divide,
        SymbolKind::Power,
        SymbolKind::Percent,
        SymbolKind::Equals,
        SymbolKind::GreaterThan,
        SymbolKind::LessThan,
        SymbolKind::Between,
        SymbolKind::ParenthesisOpen,
        SymbolKind::ParenthesisClose,
        SymbolKind::ValueSeparator,
    ];

    pub fn text(self) -> &'static str {
        match self {
            SymbolKind::Plus => "+",
            SymbolKind::Minus => "-",
            SymbolKind::Multiply => "*",
            SymbolKind::Divide => "/",
            SymbolKind::Power => "^",
            SymbolKind::Percent => "%",
            SymbolKind::Equals => "=",
            SymbolKind::NotEquals => "<>",
            SymbolKind::GreaterThan => ">",
            SymbolKind::GreaterThanEquals => ">=",
            SymbolKind::LessThan => "<",
            SymbolKind::LessThanEquals => "<=",
            SymbolKind::Between => ":",
            SymbolKind::ParenthesisOpen => "(",
            SymbolKind::ParenthesisClose => ")",
            SymbolKind::ValueSeparator => ",",
        }
    }

    /// Longest symbol prefixing `text`, with its byte length.
    pub fn scan(text: &str) -> Option<(Self, usize)> {
        // Two-character symbols come first in ALL.
        Self::ALL
            .into_iter()
            .find(|symbol| text.starts_with(symbol.text()))
            .map(|symbol| (symbol, symbol.text().len()))
    }

    /// The binary node this symbol builds once both operands are known.
    pub fn binary_operator(self) -> Option<BinaryOperator> {
        Some(match self {
            SymbolKind::Plus => BinaryOperator::Addition,
            SymbolKind::Minus => BinaryOperator::Subtraction,
            SymbolKind::Multiply => BinaryOperator::Multiplication,
            SymbolKind::Divide => BinaryOperator::Division,
            SymbolKind::Power => BinaryOperator::Power,
            SymbolKind::Equals => BinaryOperator::Equals,
            SymbolKind::NotEquals => BinaryOperator::NotEquals,
            SymbolKind::GreaterThan => BinaryOperator::GreaterThan,
            SymbolKind::GreaterThanEquals => BinaryOperator::GreaterThanEquals,
            SymbolKind::LessThan => BinaryOperator::LessThan,
            SymbolKind::LessThanEquals => BinaryOperator::LessThanEquals,
            _ => return None,
        })
    }

    /// Precedence of the binary operator this symbol stands for.
    pub fn operator_priority(self) -> Option<u8> {
        self.binary_operator().map(BinaryOperator::priority)
    }
}

/// Leaf token kinds with their parsed values.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", content = "value"))]
#[derive(Debug, Clone, PartialEq)]
pub enum ParserLeafKind {
    Number(f64),
    Text(String),
    Boolean(bool),
    Error(ExcelErrorKind),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
    CellReference(CellReference),
    Label(LabelName),
    FunctionName(String),
    Symbol(SymbolKind),
    Whitespace,
}

/// Parent token kinds.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", content = "value"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParserParentKind {
    /// `=` followed by an expression.
    Expression,
    /// A parenthesised expression.
    Group,
    Negative,
    Percentage,
    Binary(BinaryOperator),
    Range,
    FunctionCall,
}

/// A node of a parsed formula or value entry.
///
/// With the `serde` feature a token is an object named by its kind:
/// `{"type": "Number", "value": 1.0, "text": "1"}` for a leaf and
/// `{"type": "Expression", "children": [..], "text": "=1"}` for a parent.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(into = "TokenRepr", from = "TokenRepr"))]
#[derive(Debug, Clone, PartialEq)]
pub enum SpreadsheetParserToken {
    Leaf {
        kind: ParserLeafKind,
        text: String,
    },
    Parent {
        kind: ParserParentKind,
        children: Vec<SpreadsheetParserToken>,
        text: String,
    },
}

#[cfg(feature = "serde")]
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum TokenRepr {
    // Parents first: a leaf object has no `children`.
    Parent(ParentRepr),
    Leaf(LeafRepr),
}

#[cfg(feature = "serde")]
#[derive(Serialize, Deserialize)]
struct LeafRepr {
    #[serde(flatten)]
    kind: ParserLeafKind,
    text: String,
}

#[cfg(feature = "serde")]
#[derive(Serialize, Deserialize)]
struct ParentRepr {
    #[serde(flatten)]
    kind: ParserParentKind,
    children: Vec<SpreadsheetParserToken>,
    text: String,
}

#[cfg(feature = "serde")]
impl From<SpreadsheetParserToken> for TokenRepr {
    fn from(token: SpreadsheetParserToken) -> Self {
        match token {
            SpreadsheetParserToken::Leaf { kind, text } => TokenRepr::Leaf(LeafRepr { kind, text }),
            SpreadsheetParserToken::Parent {
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
impl From<TokenRepr> for SpreadsheetParserToken {
    fn from(repr: TokenRepr) -> Self {
        match repr {
            TokenRepr::Leaf(LeafRepr { kind, text }) => SpreadsheetParserToken::Leaf { kind, text },
            TokenRepr::Parent(ParentRepr {
                kind,
                children,
                text,
            }) => SpreadsheetParserToken::Parent {
                kind,
                children,
                text,
            },
        }
    }
}

impl SpreadsheetParserToken {
    pub fn leaf(kind: ParserLeafKind, text: impl Into<String>) -> Result<Self, ParserError> {
        let text = text.into();
        if text.is_empty() {
            return Err(ParserError {
                message: "empty token".to_string(),
                position: None,
            });
        }
        Ok(SpreadsheetParserToken::Leaf { kind, text })
    }

    /// Parent whose text is rebuilt from `children`.
    pub fn parent(
        kind: ParserParentKind,
        children: Vec<SpreadsheetParserToken>,
    ) -> Result<Self, ParserError> {
        let text: String = children.iter().map(SpreadsheetParserToken::text).collect();
        if text.is_empty() {
            return Err(ParserError {
                message: "empty token".to_string(),
                position: None,
            });
        }
        Ok(SpreadsheetParserToken::Parent {
            kind,
            children,
            text,
        })
    }

    pub fn symbol(symbol: SymbolKind) -> Self {
        SpreadsheetParserToken::Leaf {
            kind: ParserLeafKind::Symbol(symbol),
            text: symbol.text().to_string(),
        }
    }

    pub fn text(&self) -> &str {
        match self {
            SpreadsheetParserToken::Leaf { text, .. }
            | SpreadsheetParserToken::Parent { text, .. } => text,
        }
    }

    pub fn leaf_kind(&self) -> Option<&ParserLeafKind> {
        match self {
            SpreadsheetParserToken::Leaf { kind, .. } => Some(kind),
            SpreadsheetParserToken::Parent { .. } => None,
        }
    }

    pub fn parent_kind(&self) -> Option<ParserParentKind> {
        match self {
            SpreadsheetParserToken::Parent { kind, .. } => Some(*kind),
            SpreadsheetParserToken::Leaf { .. } => None,
        }
    }

    pub fn children(&self) -> &[SpreadsheetParserToken] {
        match self {
            SpreadsheetParserToken::Parent { children, .. } => children,
            SpreadsheetParserToken::Leaf { .. } => &[],
        }
    }

    pub fn symbol_kind(&self) -> Option<SymbolKind> {
        match self.leaf_kind() {
            Some(ParserLeafKind::Symbol(symbol)) => Some(*symbol),
            _ => None,
        }
    }

    pub fn is_whitespace(&self) -> bool {
        matches!(self.leaf_kind(), Some(ParserLeafKind::Whitespace))
    }

    /// Symbols and whitespace, which shape the tree but carry no value.
    pub fn is_noise(&self) -> bool {
        self.is_whitespace() || self.symbol_kind().is_some()
    }

    /// Children that are neither symbols nor whitespace.
    pub fn operands(&self) -> impl Iterator<Item = &SpreadsheetParserToken> {
        self.children().iter().filter(|child| !child.is_noise())
    }
}

impl Eq for SpreadsheetParserToken {}

impl Hash for SpreadsheetParserToken {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Values are derived from the text, so text plus shape identifies a token.
        match self {
            SpreadsheetParserToken::Leaf { kind, text } => {
                state.write_u8(0);
                std::mem::discriminant(kind).hash(state);
                text.hash(state);
            }
            SpreadsheetParserToken::Parent { kind, children, .. } => {
                state.write_u8(1);
                kind.hash(state);
                children.hash(state);
            }
        }
    }
}

impl fmt::Display for SpreadsheetParserToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number(text: &str) -> SpreadsheetParserToken {
        SpreadsheetParserToken::leaf(ParserLeafKind::Number(text.parse().unwrap()), text).unwrap()
    }

    #[test]
    fn parent_text_concatenates_children() {
        let sum = SpreadsheetParserToken::parent(
            ParserParentKind::Binary(BinaryOperator::Addition),
            vec![
                number("1"),
                SpreadsheetParserToken::leaf(ParserLeafKind::Whitespace, " ").unwrap(),
                SpreadsheetParserToken::symbol(SymbolKind::Plus),
                number("22"),
            ],
        )
        .unwrap();
        assert_eq!(sum.text(), "1 +22");
        assert_eq!(sum.operands().count(), 2);
    }

    #[test]
    fn empty_tokens_are_rejected() {
        assert!(SpreadsheetParserToken::leaf(ParserLeafKind::Whitespace, "").is_err());
        assert!(SpreadsheetParserToken::parent(ParserParentKind::Group, vec![]).is_err());
    }

    #[test]
    fn symbols_scan_longest_first() {
        assert_eq!(
            SymbolKind::scan("<=1"),
            Some((SymbolKind::LessThanEquals, 2))
        );
        assert_eq!(SymbolKind::scan("<>1"), Some((SymbolKind::NotEquals, 2)));
        assert_eq!(SymbolKind::scan("<1"), Some((SymbolKind::LessThan, 1)));
        assert_eq!(SymbolKind::scan("&"), None);
    }

    #[test]
    fn priorities_rank_operators() {
        let priority = |s: SymbolKind| s.operator_priority().unwrap();
        assert!(priority(SymbolKind::Power) > priority(SymbolKind::Multiply));
        assert!(priority(SymbolKind::Multiply) > priority(SymbolKind::Plus));
        assert!(priority(SymbolKind::Plus) > priority(SymbolKind::Equals));
        assert_eq!(
            priority(SymbolKind::GreaterThan),
            priority(SymbolKind::NotEquals)
        );
        assert_eq!(SymbolKind::Percent.operator_priority(), None);
        assert_eq!(SymbolKind::ParenthesisOpen.binary_operator(), None);
    }
}
