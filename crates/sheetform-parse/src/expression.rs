//! Expression trees reduced from formula tokens.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use sheetform_common::{CellRange, ExcelErrorKind, SpreadsheetSelection};

use crate::error::FormulaError;
use crate::token::{BinaryOperator, ParserLeafKind, ParserParentKind, SpreadsheetParserToken};

/// An executable formula expression.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Number(f64),
    Text(String),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
    Error(ExcelErrorKind),
    Reference(SpreadsheetSelection),
    Negative(Box<Expression>),
    Percentage(Box<Expression>),
    Binary {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Call {
        name: String,
        args: Vec<Expression>,
    },
}

impl Expression {
    pub fn binary(op: BinaryOperator, left: Expression, right: Expression) -> Self {
        Expression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Binding strength used when rendering; atoms bind tightest.
    fn priority(&self) -> u8 {
        match self {
            Expression::Binary { op, .. } => op.priority(),
            Expression::Negative(_) => 5,
            Expression::Percentage(_) => 6,
            _ => 7,
        }
    }
}

fn unexpected(token: &SpreadsheetParserToken, context: &'static str) -> FormulaError {
    FormulaError::UnexpectedToken {
        token: token.text().to_string(),
        context,
    }
}

impl SpreadsheetParserToken {
    /// Reduce this tree to an [`Expression`]. Symbols and whitespace shape
    /// the tree and contribute no nodes.
    pub fn expression(&self) -> Result<Expression, FormulaError> {
        let kind = match self {
            SpreadsheetParserToken::Leaf { kind, .. } => {
                return Ok(match kind {
                    ParserLeafKind::Number(value) => Expression::Number(*value),
                    ParserLeafKind::Text(value) => Expression::Text(value.clone()),
                    ParserLeafKind::Boolean(value) => Expression::Boolean(*value),
                    ParserLeafKind::Error(kind) => Expression::Error(*kind),
                    ParserLeafKind::Date(value) => Expression::Date(*value),
                    ParserLeafKind::DateTime(value) => Expression::DateTime(*value),
                    ParserLeafKind::Time(value) => Expression::Time(*value),
                    ParserLeafKind::CellReference(cell) => {
                        Expression::Reference(SpreadsheetSelection::Cell(*cell))
                    }
                    ParserLeafKind::Label(label) => {
                        Expression::Reference(SpreadsheetSelection::Label(label.clone()))
                    }
                    ParserLeafKind::FunctionName(_)
                    | ParserLeafKind::Symbol(_)
                    | ParserLeafKind::Whitespace => return Err(unexpected(self, "expression")),
                });
            }
            SpreadsheetParserToken::Parent { kind, .. } => *kind,
        };

        let mut operands = self.operands();
        let mut next = |context| operands.next().ok_or_else(|| unexpected(self, context));

        let expression = match kind {
            ParserParentKind::Expression | ParserParentKind::Group => {
                next("expression")?.expression()?
            }
            ParserParentKind::Negative => {
                Expression::Negative(Box::new(next("negative")?.expression()?))
            }
            ParserParentKind::Percentage => {
                Expression::Percentage(Box::new(next("percentage")?.expression()?))
            }
            ParserParentKind::Binary(op) => {
                let left = next("binary expression")?.expression()?;
                let right = next("binary expression")?.expression()?;
                Expression::binary(op, left, right)
            }
            ParserParentKind::Range => {
                let cell = |token: &SpreadsheetParserToken| match token.leaf_kind() {
                    Some(ParserLeafKind::CellReference(cell)) => Ok(*cell),
                    _ => Err(unexpected(token, "range")),
                };
                let begin = cell(next("range")?)?;
                let end = cell(next("range")?)?;
                Expression::Reference(SpreadsheetSelection::Range(CellRange::new(begin, end)))
            }
            ParserParentKind::FunctionCall => {
                let name_token = next("function call")?;
                let Some(ParserLeafKind::FunctionName(name)) = name_token.leaf_kind() else {
                    return Err(unexpected(name_token, "function call"));
                };
                let args = operands
                    .by_ref()
                    .map(SpreadsheetParserToken::expression)
                    .collect::<Result<_, _>>()?;
                return Ok(Expression::Call {
                    name: name.clone(),
                    args,
                });
            }
        };

        if let Some(extra) = operands.next() {
            return Err(unexpected(extra, "expression"));
        }
        Ok(expression)
    }
}

impl Expression {
    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, parenthesise: bool) -> fmt::Result {
        if parenthesise {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

/// Canonical formula text without the leading `=`. Parentheses are emitted
/// only where precedence or left associativity requires them.
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Number(value) => write!(f, "{value}"),
            Expression::Text(value) => write!(f, "\"{}\"", value.replace('"', "\"\"")),
            Expression::Boolean(value) => f.write_str(if *value { "TRUE" } else { "FALSE" }),
            Expression::Date(value) => write!(f, "{value}"),
            Expression::DateTime(value) => write!(f, "{value}"),
            Expression::Time(value) => write!(f, "{value}"),
            Expression::Error(kind) => f.write_str(kind.text()),
            Expression::Reference(selection) => write!(f, "{selection}"),
            Expression::Negative(operand) => {
                f.write_str("-")?;
                operand.fmt_operand(f, operand.priority() < 5)
            }
            Expression::Percentage(operand) => {
                operand.fmt_operand(f, operand.priority() < 6)?;
                f.write_str("%")
            }
            Expression::Binary { op, left, right } => {
                left.fmt_operand(f, left.priority() < op.priority())?;
                write!(f, "{op}")?;
                right.fmt_operand(f, right.priority() <= op.priority())
            }
            Expression::Call { name, args } => {
                write!(f, "{name}(")?;
                for (index, arg) in args.iter().enumerate() {
                    if index > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
        }
    }
}
