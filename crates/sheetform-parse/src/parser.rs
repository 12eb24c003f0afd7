use sheetform_common::LiteralValue;
use sheetform_format::ValueKind;

use crate::context::ParserContext;
use crate::error::ParserError;
use crate::token::{
    ParserLeafKind, ParserParentKind, SpreadsheetParserToken, SymbolKind,
};
use crate::tokenizer::Tokenizer;

/// Precedence-climbing parser over the leaves produced by [`Tokenizer`].
///
/// Whitespace is kept: it is attached to the nearest enclosing node, so the
/// resulting tree renders back to the exact formula text.
pub struct Parser {
    tokens: Vec<SpreadsheetParserToken>,
    starts: Vec<usize>,
    len: usize,
    position: usize,
}

impl Parser {
    pub fn new(tokenizer: Tokenizer<'_>) -> Self {
        let len = tokenizer.render().len();
        Parser {
            tokens: tokenizer.items,
            starts: tokenizer.starts,
            len,
            position: 0,
        }
    }

    /// Parse `=` followed by one expression into an expression node.
    pub fn parse(&mut self) -> Result<SpreadsheetParserToken, ParserError> {
        if self.peek().and_then(SpreadsheetParserToken::symbol_kind) != Some(SymbolKind::Equals) {
            return Err(self.error("Formula must start with '='"));
        }
        let mut children = vec![self.advance()];
        children.extend(self.take_whitespace());
        children.push(self.parse_expression()?);
        children.extend(self.take_whitespace());
        if let Some(token) = self.peek() {
            return Err(self.error(format!("Unexpected token {:?}", token.text())));
        }
        SpreadsheetParserToken::parent(ParserParentKind::Expression, children)
    }

    fn peek(&self) -> Option<&SpreadsheetParserToken> {
        self.tokens.get(self.position)
    }

    fn peek_symbol(&self) -> Option<SymbolKind> {
        self.peek().and_then(SpreadsheetParserToken::symbol_kind)
    }

    /// The first token at or after the cursor that is not whitespace.
    fn peek_significant(&self) -> Option<&SpreadsheetParserToken> {
        self.tokens[self.position..]
            .iter()
            .find(|token| !token.is_whitespace())
    }

    fn advance(&mut self) -> SpreadsheetParserToken {
        let token = self.tokens[self.position].clone();
        self.position += 1;
        token
    }

    fn take_whitespace(&mut self) -> Vec<SpreadsheetParserToken> {
        let mut taken = Vec::new();
        while self.peek().is_some_and(SpreadsheetParserToken::is_whitespace) {
            taken.push(self.advance());
        }
        taken
    }

    fn error(&self, message: impl Into<String>) -> ParserError {
        let position = self.starts.get(self.position).copied().unwrap_or(self.len);
        ParserError::at(message, position)
    }

    fn parse_expression(&mut self) -> Result<SpreadsheetParserToken, ParserError> {
        self.parse_binary_op(0)
    }

    fn parse_binary_op(&mut self, min_priority: u8) -> Result<SpreadsheetParserToken, ParserError> {
        let mut left = self.parse_unary_op()?;

        loop {
            let Some(operator) = self
                .peek_significant()
                .and_then(SpreadsheetParserToken::symbol_kind)
                .and_then(SymbolKind::binary_operator)
            else {
                break;
            };
            if operator.priority() < min_priority {
                break;
            }

            let mut children = vec![left];
            children.extend(self.take_whitespace());
            children.push(self.advance());
            children.extend(self.take_whitespace());
            // Left-associative: the right operand only takes tighter operators.
            children.push(self.parse_binary_op(operator.priority() + 1)?);
            left = SpreadsheetParserToken::parent(ParserParentKind::Binary(operator), children)?;
        }

        Ok(left)
    }

    fn parse_unary_op(&mut self) -> Result<SpreadsheetParserToken, ParserError> {
        if self.peek_symbol() == Some(SymbolKind::Minus) {
            let mut children = vec![self.advance()];
            children.extend(self.take_whitespace());
            children.push(self.parse_unary_op()?);
            return SpreadsheetParserToken::parent(ParserParentKind::Negative, children);
        }
        self.parse_postfix_op()
    }

    fn parse_postfix_op(&mut self) -> Result<SpreadsheetParserToken, ParserError> {
        let mut expr = self.parse_primary()?;
        while self.peek_symbol() == Some(SymbolKind::Percent) {
            let percent = self.advance();
            expr = SpreadsheetParserToken::parent(ParserParentKind::Percentage, vec![expr, percent])?;
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<SpreadsheetParserToken, ParserError> {
        let Some(token) = self.peek() else {
            return Err(self.error("Unexpected end of formula"));
        };

        match token.leaf_kind() {
            Some(
                ParserLeafKind::Number(_)
                | ParserLeafKind::Text(_)
                | ParserLeafKind::Boolean(_)
                | ParserLeafKind::Error(_)
                | ParserLeafKind::Label(_),
            ) => Ok(self.advance()),
            Some(ParserLeafKind::CellReference(_)) => self.parse_reference(),
            Some(ParserLeafKind::FunctionName(_)) => self.parse_function(),
            Some(ParserLeafKind::Symbol(SymbolKind::ParenthesisOpen)) => self.parse_group(),
            _ => Err(self.error(format!("Unexpected token {:?}", token.text()))),
        }
    }

    /// A cell, or a range when `:` and a second cell follow directly.
    fn parse_reference(&mut self) -> Result<SpreadsheetParserToken, ParserError> {
        let begin = self.advance();
        let is_range = self.peek_symbol() == Some(SymbolKind::Between)
            && matches!(
                self.tokens.get(self.position + 1).and_then(SpreadsheetParserToken::leaf_kind),
                Some(ParserLeafKind::CellReference(_))
            );
        if !is_range {
            return Ok(begin);
        }
        let between = self.advance();
        let end = self.advance();
        SpreadsheetParserToken::parent(ParserParentKind::Range, vec![begin, between, end])
    }

    fn parse_group(&mut self) -> Result<SpreadsheetParserToken, ParserError> {
        let mut children = vec![self.advance()];
        children.extend(self.take_whitespace());
        children.push(self.parse_expression()?);
        children.extend(self.take_whitespace());
        if self.peek_symbol() != Some(SymbolKind::ParenthesisClose) {
            return Err(self.error("Expected closing parenthesis"));
        }
        children.push(self.advance());
        SpreadsheetParserToken::parent(ParserParentKind::Group, children)
    }

    fn parse_function(&mut self) -> Result<SpreadsheetParserToken, ParserError> {
        let mut children = vec![self.advance()];
        if self.peek_symbol() != Some(SymbolKind::ParenthesisOpen) {
            return Err(self.error("Expected '(' after function name"));
        }
        children.push(self.advance());
        children.extend(self.take_whitespace());

        if self.peek_symbol() == Some(SymbolKind::ParenthesisClose) {
            children.push(self.advance());
            return SpreadsheetParserToken::parent(ParserParentKind::FunctionCall, children);
        }

        loop {
            children.push(self.parse_expression()?);
            children.extend(self.take_whitespace());
            match self.peek_symbol() {
                Some(SymbolKind::ValueSeparator) => {
                    children.push(self.advance());
                    children.extend(self.take_whitespace());
                }
                Some(SymbolKind::ParenthesisClose) => {
                    children.push(self.advance());
                    break;
                }
                _ => {
                    return Err(self.error("Expected ',' or ')' in function arguments"));
                }
            }
        }

        SpreadsheetParserToken::parent(ParserParentKind::FunctionCall, children)
    }
}

/// Parse formula text beginning with `=`.
pub fn parse_formula(
    text: &str,
    context: &ParserContext,
) -> Result<SpreadsheetParserToken, ParserError> {
    let tokenizer = Tokenizer::new(text, context)?;
    let token = Parser::new(tokenizer).parse()?;

    #[cfg(feature = "tracing")]
    tracing::trace!(formula = text, "parsed formula");

    Ok(token)
}

/// Parse what a user typed into a cell.
///
/// Text starting with `=` is a formula. A leading apostrophe forces text.
/// Anything else is tried as a date-time, date, time and number, in that
/// order, and otherwise kept as text.
pub fn parse_value_or_expression(
    text: &str,
    context: &ParserContext,
) -> Result<SpreadsheetParserToken, ParserError> {
    if text.is_empty() {
        return Err(ParserError::at("Empty value", 0));
    }
    if text.starts_with('=') {
        return parse_formula(text, context);
    }
    if let Some(rest) = text.strip_prefix('\'') {
        return SpreadsheetParserToken::leaf(ParserLeafKind::Text(rest.to_string()), text);
    }

    let converter = context.converter();
    let parsed = [
        ValueKind::DateTime,
        ValueKind::Date,
        ValueKind::Time,
        ValueKind::Number,
    ]
    .into_iter()
    .find_map(|kind| converter.parse(text, kind).ok());

    let kind = match parsed {
        Some(LiteralValue::DateTime(value)) => ParserLeafKind::DateTime(value),
        Some(LiteralValue::Date(value)) => ParserLeafKind::Date(value),
        Some(LiteralValue::Time(value)) => ParserLeafKind::Time(value),
        Some(LiteralValue::Number(value)) => ParserLeafKind::Number(value),
        _ => ParserLeafKind::Text(text.to_string()),
    };
    SpreadsheetParserToken::leaf(kind, text)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::token::BinaryOperator;

    fn parse(text: &str) -> SpreadsheetParserToken {
        parse_formula(text, &ParserContext::default()).unwrap()
    }

    /// The single expression under the `=` node.
    fn body(token: &SpreadsheetParserToken) -> &SpreadsheetParserToken {
        token.operands().next().unwrap()
    }

    fn binary(token: &SpreadsheetParserToken) -> BinaryOperator {
        match token.parent_kind() {
            Some(ParserParentKind::Binary(op)) => op,
            other => panic!("expected a binary node, got {other:?}"),
        }
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let tree = parse("=1+2*3");
        let top = body(&tree);
        assert_eq!(binary(top), BinaryOperator::Addition);
        let right = top.operands().nth(1).unwrap();
        assert_eq!(binary(right), BinaryOperator::Multiplication);

        let tree = parse("=1*2+3");
        let top = body(&tree);
        assert_eq!(binary(top), BinaryOperator::Addition);
        assert_eq!(
            binary(top.operands().next().unwrap()),
            BinaryOperator::Multiplication
        );
    }

    #[test]
    fn equal_priority_associates_left() {
        let tree = parse("=8-4-2");
        let top = body(&tree);
        assert_eq!(binary(top), BinaryOperator::Subtraction);
        let left = top.operands().next().unwrap();
        assert_eq!(binary(left), BinaryOperator::Subtraction);
        assert_eq!(left.text(), "8-4");

        let tree = parse("=1<2=TRUE");
        assert_eq!(binary(body(&tree)), BinaryOperator::Equals);
    }

    #[test]
    fn unary_and_postfix_operators() {
        let tree = parse("=-2^2");
        let top = body(&tree);
        assert_eq!(binary(top), BinaryOperator::Power);
        assert_eq!(
            top.operands().next().unwrap().parent_kind(),
            Some(ParserParentKind::Negative)
        );

        let tree = parse("=50%*2");
        let top = body(&tree);
        assert_eq!(
            top.operands().next().unwrap().parent_kind(),
            Some(ParserParentKind::Percentage)
        );
    }

    #[test]
    fn groups_functions_and_ranges_keep_whitespace() {
        let text = "= SUM( A1:B2 , (1 + 2) ) ";
        let tree = parse(text);
        assert_eq!(tree.text(), text);
        let call = body(&tree);
        assert_eq!(call.parent_kind(), Some(ParserParentKind::FunctionCall));
        let args: Vec<_> = call.operands().collect();
        assert_eq!(args.len(), 3);
        assert!(matches!(
            args[0].leaf_kind(),
            Some(ParserLeafKind::FunctionName(name)) if name == "SUM"
        ));
        assert_eq!(args[1].parent_kind(), Some(ParserParentKind::Range));
        assert_eq!(args[2].parent_kind(), Some(ParserParentKind::Group));
    }

    #[test]
    fn empty_argument_lists() {
        let tree = parse("=NOW()");
        assert_eq!(body(&tree).operands().count(), 1);
    }

    #[test]
    fn errors_carry_positions() {
        let context = ParserContext::default();
        let err = |text: &str| parse_formula(text, &context).unwrap_err();
        assert_eq!(err("1+2").position, Some(0));
        assert_eq!(err("=").position, Some(1));
        assert_eq!(err("=1+").position, Some(3));
        assert_eq!(err("=1 2").position, Some(3));
        assert_eq!(err("=SUM(1;2)").position, Some(6));
        assert_eq!(err("=A1:").position, Some(3));
        assert!(err("=(1").message.contains("Unmatched"));
    }

    #[test]
    fn value_entries() {
        let context = ParserContext::default();
        let kind = |text: &str| {
            parse_value_or_expression(text, &context)
                .unwrap()
                .leaf_kind()
                .cloned()
        };
        assert_eq!(kind("1,234.5"), Some(ParserLeafKind::Number(1234.5)));
        assert_eq!(
            kind("2024-01-02"),
            Some(ParserLeafKind::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()))
        );
        assert!(matches!(kind("10:30"), Some(ParserLeafKind::Time(_))));
        assert!(matches!(kind("2024-01-02 10:30"), Some(ParserLeafKind::DateTime(_))));
        assert_eq!(kind("hello"), Some(ParserLeafKind::Text("hello".into())));
        assert_eq!(kind("'123"), Some(ParserLeafKind::Text("123".into())));

        let formula = parse_value_or_expression("=1", &context).unwrap();
        assert_eq!(formula.parent_kind(), Some(ParserParentKind::Expression));
        assert!(parse_value_or_expression("", &context).is_err());
    }
}
