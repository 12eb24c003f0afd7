pub mod converter;
pub mod date_time_parse;
pub mod ebnf;
pub mod error;
pub mod formatter;
pub mod grammar;
pub mod number_parse;
pub mod pattern;
pub mod token;

pub use converter::{ConverterPatterns, SpreadsheetConverter, ValueKind};
pub use date_time_parse::DateTimeParsePattern;
pub use error::{ConvertError, FormatParseError, GrammarError, PatternError, Usage};
pub use formatter::{FormattedText, FormatterContext, SpreadsheetFormatter, format_general};
pub use grammar::{EXPRESSION_SECTIONS, FormatGrammar, FormatParser, FormatParserKind};
pub use number_parse::{NumberParseMode, NumberParsePattern, TextCursor, is_expression_token_ender};
pub use pattern::{PatternKind, SpreadsheetPattern};
pub use token::{ConditionOp, FormatColor, FormatLeafKind, FormatParentKind, FormatParserToken};

pub use sheetform_common::{DateTimeContext, DecimalNumberContext, LiteralValue};
