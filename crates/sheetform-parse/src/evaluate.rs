//! Single-expression evaluation.
//!
//! References and function calls are delegated to an
//! [`ExpressionEvaluationContext`]; operators are applied here with spreadsheet
//! coercion rules. Failures are returned as [`LiteralValue::Error`].

use std::cmp::Ordering;

use smallvec::SmallVec;

use sheetform_common::{ExcelError, ExcelErrorKind, LiteralValue, SpreadsheetSelection};
use sheetform_format::ValueKind;

use crate::context::ParserContext;
use crate::expression::Expression;
use crate::token::BinaryOperator;

/// Supplies reference values and functions while an [`Expression`] is evaluated.
pub trait ExpressionEvaluationContext {
    /// The value behind a cell, range or label. Unresolved by default.
    fn reference(&self, selection: &SpreadsheetSelection) -> LiteralValue {
        ExcelError::new(ExcelErrorKind::Ref)
            .with_message(format!("unresolved reference {selection}"))
            .into()
    }

    /// Call `name` with already evaluated arguments. No functions by default.
    fn function(&self, name: &str, _args: &[LiteralValue]) -> LiteralValue {
        ExcelError::new(ExcelErrorKind::Name)
            .with_message(format!("unknown function {name}"))
            .into()
    }

    /// Read a text operand as a number, using the built-in number-parse
    /// patterns.
    fn text_to_number(&self, text: &str) -> Option<f64> {
        match ParserContext::shared()
            .converter()
            .parse(text.trim(), ValueKind::Number)
        {
            Ok(LiteralValue::Number(n)) => Some(n),
            _ => None,
        }
    }
}

/// Evaluates expressions with no references and no functions.
impl ExpressionEvaluationContext for () {}

impl Expression {
    pub fn evaluate(&self, context: &dyn ExpressionEvaluationContext) -> LiteralValue {
        match self {
            Expression::Number(value) => LiteralValue::Number(*value),
            Expression::Text(value) => LiteralValue::Text(value.clone()),
            Expression::Boolean(value) => LiteralValue::Boolean(*value),
            Expression::Date(value) => LiteralValue::Date(*value),
            Expression::DateTime(value) => LiteralValue::DateTime(*value),
            Expression::Time(value) => LiteralValue::Time(*value),
            Expression::Error(kind) => LiteralValue::Error(ExcelError::new(*kind)),
            Expression::Reference(selection) => context.reference(selection),
            Expression::Negative(operand) => {
                apply_number_unary(operand.evaluate(context), context, |n| -n)
            }
            Expression::Percentage(operand) => {
                apply_number_unary(operand.evaluate(context), context, |n| n / 100.0)
            }
            Expression::Binary { op, left, right } => {
                eval_binary(*op, left.evaluate(context), right.evaluate(context), context)
            }
            Expression::Call { name, args } => {
                let values: SmallVec<[LiteralValue; 4]> =
                    args.iter().map(|arg| arg.evaluate(context)).collect();
                #[cfg(feature = "tracing")]
                tracing::trace!(function = %name, args = values.len(), "call");
                context.function(name, &values)
            }
        }
    }
}

fn coerce_number(
    value: &LiteralValue,
    context: &dyn ExpressionEvaluationContext,
) -> Result<f64, ExcelError> {
    match value {
        LiteralValue::Number(n) => Ok(*n),
        LiteralValue::Int(i) => Ok(*i as f64),
        LiteralValue::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
        LiteralValue::Text(s) => context
            .text_to_number(s)
            .filter(|n| n.is_finite())
            .ok_or_else(|| {
                ExcelError::new(ExcelErrorKind::Value)
                    .with_message(format!("Cannot convert '{s}' to number"))
            }),
        LiteralValue::Empty => Ok(0.0),
        LiteralValue::Error(e) => Err(e.clone()),
        other => other
            .as_serial_number()
            .ok_or_else(|| ExcelError::new(ExcelErrorKind::Value)),
    }
}

fn sanitize_numeric(value: f64) -> LiteralValue {
    if value.is_finite() {
        LiteralValue::Number(value)
    } else {
        ExcelError::new(ExcelErrorKind::Num).into()
    }
}

fn apply_number_unary(
    value: LiteralValue,
    context: &dyn ExpressionEvaluationContext,
    f: impl Fn(f64) -> f64,
) -> LiteralValue {
    match coerce_number(&value, context) {
        Ok(n) => sanitize_numeric(f(n)),
        Err(e) => e.into(),
    }
}

fn eval_binary(
    op: BinaryOperator,
    left: LiteralValue,
    right: LiteralValue,
    context: &dyn ExpressionEvaluationContext,
) -> LiteralValue {
    if left.is_error() {
        return left;
    }
    if right.is_error() {
        return right;
    }
    if op.is_comparison() {
        return LiteralValue::Boolean(compare(op, &left, &right));
    }

    let (a, b) = match (coerce_number(&left, context), coerce_number(&right, context)) {
        (Ok(a), Ok(b)) => (a, b),
        (Err(e), _) | (_, Err(e)) => return e.into(),
    };
    match op {
        BinaryOperator::Addition => sanitize_numeric(a + b),
        BinaryOperator::Subtraction => sanitize_numeric(a - b),
        BinaryOperator::Multiplication => sanitize_numeric(a * b),
        BinaryOperator::Division => {
            if b == 0.0 {
                return ExcelError::new(ExcelErrorKind::Div).into();
            }
            sanitize_numeric(a / b)
        }
        BinaryOperator::Power => {
            if a == 0.0 && b < 0.0 {
                return ExcelError::new(ExcelErrorKind::Div).into();
            }
            sanitize_numeric(a.powf(b))
        }
        _ => LiteralValue::Boolean(compare(op, &left, &right)),
    }
}

/// Comparable form of a value: numbers sort before text, text before booleans.
#[derive(Debug, PartialEq, PartialOrd)]
enum Comparable {
    Number(f64),
    Text(String),
    Boolean(bool),
}

fn comparable(value: &LiteralValue, other: &LiteralValue) -> Comparable {
    match value {
        LiteralValue::Text(s) => Comparable::Text(s.to_lowercase()),
        LiteralValue::Boolean(b) => Comparable::Boolean(*b),
        LiteralValue::Selection(s) => Comparable::Text(s.to_string().to_lowercase()),
        // Blank takes the other side's type.
        LiteralValue::Empty => match other {
            LiteralValue::Text(_) | LiteralValue::Selection(_) => Comparable::Text(String::new()),
            LiteralValue::Boolean(_) => Comparable::Boolean(false),
            _ => Comparable::Number(0.0),
        },
        other => Comparable::Number(other.as_serial_number().unwrap_or(0.0)),
    }
}

fn compare(op: BinaryOperator, left: &LiteralValue, right: &LiteralValue) -> bool {
    let ordering = comparable(left, right).partial_cmp(&comparable(right, left));
    match op {
        BinaryOperator::Equals => ordering == Some(Ordering::Equal),
        BinaryOperator::NotEquals => ordering != Some(Ordering::Equal),
        BinaryOperator::GreaterThan => ordering == Some(Ordering::Greater),
        BinaryOperator::GreaterThanEquals => {
            matches!(ordering, Some(Ordering::Greater | Ordering::Equal))
        }
        BinaryOperator::LessThan => ordering == Some(Ordering::Less),
        BinaryOperator::LessThanEquals => {
            matches!(ordering, Some(Ordering::Less | Ordering::Equal))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use rustc_hash::FxHashMap;

    use super::*;
    use crate::context::ParserContext;
    use crate::parser::parse_formula;

    fn eval_with(text: &str, context: &dyn ExpressionEvaluationContext) -> LiteralValue {
        parse_formula(text, &ParserContext::default())
            .unwrap()
            .expression()
            .unwrap()
            .evaluate(context)
    }

    fn eval(text: &str) -> LiteralValue {
        eval_with(text, &())
    }

    fn error_kind(value: LiteralValue) -> Option<ExcelErrorKind> {
        match value {
            LiteralValue::Error(e) => Some(e.kind),
            _ => None,
        }
    }

    #[test]
    fn arithmetic_follows_precedence() {
        assert_eq!(eval("=1+2*3"), LiteralValue::Number(7.0));
        assert_eq!(eval("=(1+2)*3"), LiteralValue::Number(9.0));
        assert_eq!(eval("=8-4-2"), LiteralValue::Number(2.0));
        assert_eq!(eval("=-2^2"), LiteralValue::Number(4.0));
        assert_eq!(eval("=50%*4"), LiteralValue::Number(2.0));
        assert_eq!(eval("=\"3\"+TRUE"), LiteralValue::Number(4.0));
    }

    #[test]
    fn errors_become_values() {
        assert_eq!(error_kind(eval("=1/0")), Some(ExcelErrorKind::Div));
        assert_eq!(error_kind(eval("=\"a\"*2")), Some(ExcelErrorKind::Value));
        assert_eq!(error_kind(eval("=#N/A+1")), Some(ExcelErrorKind::Na));
        assert_eq!(error_kind(eval("=A1")), Some(ExcelErrorKind::Ref));
        assert_eq!(error_kind(eval("=NOPE(1)")), Some(ExcelErrorKind::Name));
        assert_eq!(error_kind(eval("=10^400")), Some(ExcelErrorKind::Num));
    }

    #[test]
    fn text_operands_use_number_patterns() {
        assert_eq!(eval("=\" 1,234.5 \"+1"), LiteralValue::Number(1235.5));
        assert_eq!(eval("=\"25%\"*4"), LiteralValue::Number(1.0));
        assert_eq!(eval("=-\"-2\""), LiteralValue::Number(2.0));
        for text in ["=\"inf\"+1", "=\"NaN\"*1", "=-\"infinity\"", "=\"1e400\"+0"] {
            assert_eq!(error_kind(eval(text)), Some(ExcelErrorKind::Value), "{text}");
        }
    }

    struct Decimals;

    impl ExpressionEvaluationContext for Decimals {
        fn text_to_number(&self, text: &str) -> Option<f64> {
            text.replace(',', ".").parse::<f64>().ok().filter(|n| n.is_finite())
        }
    }

    #[test]
    fn contexts_can_read_text_numbers_their_own_way() {
        assert_eq!(eval_with("=\"2,5\"*2", &Decimals), LiteralValue::Number(5.0));
        assert_eq!(error_kind(eval_with("=\"2.5x\"*2", &Decimals)), Some(ExcelErrorKind::Value));
    }

    #[test]
    fn comparisons_mix_types() {
        assert_eq!(eval("=2>1"), LiteralValue::Boolean(true));
        assert_eq!(eval("=\"abc\"=\"ABC\""), LiteralValue::Boolean(true));
        assert_eq!(eval("=\"a\">100"), LiteralValue::Boolean(true));
        assert_eq!(eval("=TRUE>\"z\""), LiteralValue::Boolean(true));
        assert_eq!(eval("=1<>1"), LiteralValue::Boolean(false));
    }

    struct Sheet {
        cells: FxHashMap<String, LiteralValue>,
    }

    impl ExpressionEvaluationContext for Sheet {
        fn reference(&self, selection: &SpreadsheetSelection) -> LiteralValue {
            self.cells
                .get(&selection.to_string())
                .cloned()
                .unwrap_or(LiteralValue::Empty)
        }

        fn function(&self, name: &str, args: &[LiteralValue]) -> LiteralValue {
            match name.to_ascii_uppercase().as_str() {
                "SUM" => args
                    .iter()
                    .map(|arg| coerce_number(arg, self))
                    .sum::<Result<f64, _>>()
                    .map_or_else(LiteralValue::Error, LiteralValue::Number),
                _ => ExcelError::new(ExcelErrorKind::Name).into(),
            }
        }
    }

    #[test]
    fn references_and_functions_use_the_context() {
        let sheet = Sheet {
            cells: [
                ("A1".to_string(), LiteralValue::Number(2.0)),
                ("Rate".to_string(), LiteralValue::Number(0.5)),
            ]
            .into_iter()
            .collect(),
        };
        assert_eq!(
            eval_with("=sum(A1, Rate, 3) * A2", &sheet),
            LiteralValue::Number(0.0)
        );
        assert_eq!(
            eval_with("=SUM(A1,Rate,3)", &sheet),
            LiteralValue::Number(5.5)
        );
        assert_eq!(eval_with("=A2=\"\"", &sheet), LiteralValue::Boolean(true));
    }
}
