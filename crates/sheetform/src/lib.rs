//! Meta crate that re-exports the sheetform building blocks. Each layer sits
//! behind a feature flag; the underlying crates stay reachable for deeper
//! integration.

pub use sheetform_common as common;

#[cfg(feature = "format")]
pub use sheetform_format as format;

#[cfg(feature = "parse")]
pub use sheetform_parse as parse;

#[cfg(feature = "store")]
pub use sheetform_store as store;

pub use sheetform_common::{
    CellRange, CellReference, DateTimeContext, DecimalNumberContext, ExcelError, ExcelErrorKind,
    LabelName, LiteralValue, SpreadsheetSelection,
};

#[cfg(feature = "format")]
pub use sheetform_format::{
    ConverterPatterns, FormattedText, FormatterContext, PatternKind, SpreadsheetConverter,
    SpreadsheetFormatter, SpreadsheetPattern, ValueKind,
};

#[cfg(feature = "parse")]
pub use sheetform_parse::{
    Expression, ExpressionEvaluationContext, FormulaError, ParserContext, SpreadsheetFormula,
    SpreadsheetParserToken, parse_formula, parse_value_or_expression,
};

#[cfg(feature = "store")]
pub use sheetform_store::{LabelStore, RangeStore, StoreError, WatcherId};

#[cfg(feature = "parse")]
pub mod doc_examples;
