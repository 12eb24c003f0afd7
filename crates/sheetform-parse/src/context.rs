use once_cell::sync::Lazy;

use sheetform_common::DecimalNumberContext;
use sheetform_format::{
    ConverterPatterns, FormatterContext, NumberParsePattern, PatternError, PatternKind,
    SpreadsheetConverter, SpreadsheetPattern,
};

/// Number literal pattern used inside formulas. Signs are left to the
/// tokenizer so `1-2` stays a subtraction.
pub const EXPRESSION_NUMBER_PATTERN: &str = "#.#E+#;#.#";

static DEFAULT_CONTEXT: Lazy<ParserContext> = Lazy::new(|| {
    ParserContext::new(
        &ConverterPatterns::default(),
        FormatterContext::default(),
        EXPRESSION_NUMBER_PATTERN,
    )
    .unwrap_or_else(|err| panic!("built-in parser patterns failed to compile: {err}"))
});

/// Symbols and patterns used to read formulas and value entries.
#[derive(Debug, Clone)]
pub struct ParserContext {
    converter: SpreadsheetConverter,
    number_literal: NumberParsePattern,
}

impl ParserContext {
    /// `patterns` drive value entries; `number_literal` is the number-parse
    /// pattern for literals inside formulas.
    pub fn new(
        patterns: &ConverterPatterns,
        formatter: FormatterContext,
        number_literal: &str,
    ) -> Result<Self, PatternError> {
        Ok(Self {
            converter: SpreadsheetConverter::new(patterns, formatter)?,
            number_literal: SpreadsheetPattern::parse(PatternKind::NumberParse, number_literal)?
                .number_parser()?,
        })
    }

    pub fn converter(&self) -> &SpreadsheetConverter {
        &self.converter
    }

    pub fn number_literal(&self) -> &NumberParsePattern {
        &self.number_literal
    }

    pub fn decimal_number(&self) -> &DecimalNumberContext {
        &self.converter.context().number
    }

    /// The built-in context, borrowed rather than cloned.
    pub(crate) fn shared() -> &'static ParserContext {
        &DEFAULT_CONTEXT
    }
}

impl Default for ParserContext {
    fn default() -> Self {
        DEFAULT_CONTEXT.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_context_uses_expression_numbers() {
        let context = ParserContext::default();
        assert_eq!(context.number_literal().pattern().text(), EXPRESSION_NUMBER_PATTERN);
        assert_eq!(context.decimal_number().decimal_point, '.');
    }

    #[test]
    fn custom_patterns_are_validated() {
        let err = ParserContext::new(
            &ConverterPatterns::default(),
            FormatterContext::default(),
            "[Red]0",
        );
        assert!(err.is_err());
    }
}
