pub mod context;
pub mod error;
pub mod evaluate;
pub mod expression;
pub mod formula;
pub mod parser;
pub mod token;
pub mod tokenizer;

pub use context::{EXPRESSION_NUMBER_PATTERN, ParserContext};
pub use error::{FormulaError, ParserError, TokenizerError};
pub use evaluate::ExpressionEvaluationContext;
pub use expression::Expression;
pub use formula::{MAX_FORMULA_TEXT_LENGTH, SpreadsheetFormula};
pub use parser::{Parser, parse_formula, parse_value_or_expression};
pub use token::{
    BinaryOperator, ParserLeafKind, ParserParentKind, SpreadsheetParserToken, SymbolKind,
};
pub use tokenizer::Tokenizer;

// Re-export common types
pub use sheetform_common::{
    CellRange, CellReference, ExcelError, ExcelErrorKind, LabelName, LiteralValue,
    SpreadsheetSelection,
};
