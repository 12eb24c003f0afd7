//! A cell's formula as it moves from typed text to a value.
//!
//! Each setter returns a new formula and drops whatever was derived from the
//! part it replaced: new text clears the token, expression and value; a new
//! token clears the expression and value; a new expression clears the value.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use sheetform_common::LiteralValue;

use crate::context::ParserContext;
use crate::error::FormulaError;
use crate::evaluate::ExpressionEvaluationContext;
use crate::expression::Expression;
use crate::parser::parse_value_or_expression;
use crate::token::SpreadsheetParserToken;

/// Longest formula text accepted, in characters.
pub const MAX_FORMULA_TEXT_LENGTH: usize = 8192;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpreadsheetFormula {
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    text: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    token: Option<SpreadsheetParserToken>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    expression: Option<Expression>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    value: Option<LiteralValue>,
}

fn check_length(text: &str) -> Result<(), FormulaError> {
    let length = text.chars().count();
    if length > MAX_FORMULA_TEXT_LENGTH {
        return Err(FormulaError::TooLong {
            length,
            max: MAX_FORMULA_TEXT_LENGTH,
        });
    }
    Ok(())
}

impl SpreadsheetFormula {
    pub const EMPTY: SpreadsheetFormula = SpreadsheetFormula {
        text: None,
        token: None,
        expression: None,
        value: None,
    };

    /// The stored text, or the token's text when only a token is held.
    pub fn text(&self) -> &str {
        match (&self.text, &self.token) {
            (Some(text), _) => text,
            (None, Some(token)) => token.text(),
            (None, None) => "",
        }
    }

    pub fn token(&self) -> Option<&SpreadsheetParserToken> {
        self.token.as_ref()
    }

    pub fn expression(&self) -> Option<&Expression> {
        self.expression.as_ref()
    }

    pub fn value(&self) -> Option<&LiteralValue> {
        self.value.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    pub fn set_text(self, text: &str) -> Result<Self, FormulaError> {
        check_length(text)?;
        if self.text() == text {
            return Ok(self);
        }
        Ok(Self {
            text: (!text.is_empty()).then(|| text.to_string()),
            ..Self::EMPTY
        })
    }

    /// Replace the token. Stored text is kept unless the token reproduces it.
    pub fn set_token(self, token: Option<SpreadsheetParserToken>) -> Result<Self, FormulaError> {
        if self.token == token {
            return Ok(self);
        }
        if let Some(token) = &token {
            check_length(token.text())?;
        }
        let text = match (&token, self.text) {
            (Some(token), Some(text)) if token.text() == text => None,
            (_, text) => text,
        };
        Ok(Self {
            text,
            token,
            ..Self::EMPTY
        })
    }

    pub fn set_expression(self, expression: Option<Expression>) -> Self {
        if self.expression == expression {
            return self;
        }
        Self {
            expression,
            value: None,
            ..self
        }
    }

    pub fn set_value(self, value: Option<LiteralValue>) -> Self {
        if self.value == value {
            return self;
        }
        Self { value, ..self }
    }

    /// Drop the expression and value, keeping text and token.
    pub fn clear(self) -> Self {
        Self {
            expression: None,
            value: None,
            ..self
        }
    }

    /// Parse the text into a token when none is held.
    pub fn parse(self, context: &ParserContext) -> Result<Self, FormulaError> {
        if self.token.is_some() || self.text().is_empty() {
            return Ok(self);
        }
        let token = parse_value_or_expression(self.text(), context)?;
        self.set_token(Some(token))
    }

    /// Parse if needed, convert the token to an expression if needed, and
    /// store the evaluated value.
    pub fn evaluate(
        self,
        parser: &ParserContext,
        context: &dyn ExpressionEvaluationContext,
    ) -> Result<Self, FormulaError> {
        let formula = self.parse(parser)?;
        let formula = match (&formula.expression, &formula.token) {
            (None, Some(token)) => {
                let expression = token.expression()?;
                formula.set_expression(Some(expression))
            }
            _ => formula,
        };
        let value = match &formula.expression {
            Some(expression) => expression.evaluate(context),
            None => LiteralValue::Empty,
        };

        #[cfg(feature = "tracing")]
        tracing::trace!(formula = formula.text(), %value, "evaluated");

        Ok(formula.set_value(Some(value)))
    }
}
