//! Value conversion routed by the runtime kind of a value.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use sheetform_common::{
    ExcelError, ExcelErrorKind, LiteralValue, SpreadsheetSelection, serial_to_datetime,
};

use crate::date_time_parse::DateTimeParsePattern;
use crate::error::{ConvertError, PatternError};
use crate::formatter::{FormattedText, FormatterContext, SpreadsheetFormatter};
use crate::number_parse::NumberParsePattern;
use crate::pattern::{PatternKind, SpreadsheetPattern};

/// The dynamic kind of a [`LiteralValue`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Number,
    Text,
    Boolean,
    Date,
    DateTime,
    Time,
    Selection,
    Error,
    Empty,
}

impl ValueKind {
    pub fn of(value: &LiteralValue) -> Self {
        match value {
            LiteralValue::Int(_) | LiteralValue::Number(_) => ValueKind::Number,
            LiteralValue::Text(_) => ValueKind::Text,
            LiteralValue::Boolean(_) => ValueKind::Boolean,
            LiteralValue::Date(_) => ValueKind::Date,
            LiteralValue::DateTime(_) => ValueKind::DateTime,
            LiteralValue::Time(_) => ValueKind::Time,
            LiteralValue::Selection(_) => ValueKind::Selection,
            LiteralValue::Error(_) => ValueKind::Error,
            LiteralValue::Empty => ValueKind::Empty,
        }
    }

    fn is_temporal(self) -> bool {
        matches!(self, ValueKind::Date | ValueKind::DateTime | ValueKind::Time)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueKind::Number => "number",
            ValueKind::Text => "text",
            ValueKind::Boolean => "boolean",
            ValueKind::Date => "date",
            ValueKind::DateTime => "date-time",
            ValueKind::Time => "time",
            ValueKind::Selection => "selection",
            ValueKind::Error => "error",
            ValueKind::Empty => "empty",
        })
    }
}

/// Pattern text for every format and parse the converter performs.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConverterPatterns {
    pub number_format: String,
    pub date_format: String,
    pub date_time_format: String,
    pub time_format: String,
    pub text_format: String,
    pub number_parse: String,
    pub date_parse: String,
    pub date_time_parse: String,
    pub time_parse: String,
}

impl Default for ConverterPatterns {
    fn default() -> Self {
        Self {
            number_format: "General".to_string(),
            date_format: "yyyy-mm-dd".to_string(),
            date_time_format: "yyyy-mm-dd hh:mm:ss".to_string(),
            time_format: "hh:mm:ss".to_string(),
            text_format: "@".to_string(),
            number_parse: "#,##0.#E+0;#,##0.#;#,##0.#%;$#,##0.#".to_string(),
            date_parse: "yyyy-mm-dd;yyyy/mm/dd;d mmm yyyy;mmmm d, yyyy".to_string(),
            date_time_parse: "yyyy-mm-dd hh:mm:ss.000;yyyy-mm-dd hh:mm;yyyy/mm/dd hh:mm:ss.000;yyyy/mm/dd hh:mm"
                .to_string(),
            time_parse: "h:mm:ss AM/PM;h:mm AM/PM;hh:mm:ss.000;hh:mm".to_string(),
        }
    }
}

/// Formats, parses and converts values with a fixed set of patterns.
#[derive(Debug, Clone)]
pub struct SpreadsheetConverter {
    number_format: SpreadsheetFormatter,
    date_format: SpreadsheetFormatter,
    date_time_format: SpreadsheetFormatter,
    time_format: SpreadsheetFormatter,
    text_format: SpreadsheetFormatter,
    number_parse: NumberParsePattern,
    date_parse: DateTimeParsePattern,
    date_time_parse: DateTimeParsePattern,
    time_parse: DateTimeParsePattern,
    context: FormatterContext,
}

fn formatter(kind: PatternKind, text: &str) -> Result<SpreadsheetFormatter, PatternError> {
    SpreadsheetPattern::parse(kind, text)?.formatter()
}

fn date_time_parser(kind: PatternKind, text: &str) -> Result<DateTimeParsePattern, PatternError> {
    SpreadsheetPattern::parse(kind, text)?.date_time_parser()
}

impl SpreadsheetConverter {
    pub fn new(patterns: &ConverterPatterns, context: FormatterContext) -> Result<Self, PatternError> {
        Ok(Self {
            number_format: formatter(PatternKind::NumberFormat, &patterns.number_format)?,
            date_format: formatter(PatternKind::DateFormat, &patterns.date_format)?,
            date_time_format: formatter(PatternKind::DateTimeFormat, &patterns.date_time_format)?,
            time_format: formatter(PatternKind::TimeFormat, &patterns.time_format)?,
            text_format: formatter(PatternKind::TextFormat, &patterns.text_format)?,
            number_parse: SpreadsheetPattern::parse(PatternKind::NumberParse, &patterns.number_parse)?
                .number_parser()?,
            date_parse: date_time_parser(PatternKind::DateParse, &patterns.date_parse)?,
            date_time_parse: date_time_parser(PatternKind::DateTimeParse, &patterns.date_time_parse)?,
            time_parse: date_time_parser(PatternKind::TimeParse, &patterns.time_parse)?,
            context,
        })
    }

    pub fn context(&self) -> &FormatterContext {
        &self.context
    }

    pub fn number_parser(&self) -> &NumberParsePattern {
        &self.number_parse
    }

    /// Format with the formatter for the value's kind. Kinds without a
    /// pattern, and values a formatter rejects, print their plain text.
    pub fn format(&self, value: &LiteralValue) -> FormattedText {
        let formatter = match value {
            LiteralValue::Int(_) | LiteralValue::Number(_) => Some(&self.number_format),
            LiteralValue::Date(_) => Some(&self.date_format),
            LiteralValue::DateTime(_) => Some(&self.date_time_format),
            LiteralValue::Time(_) => Some(&self.time_format),
            LiteralValue::Text(_) => Some(&self.text_format),
            _ => None,
        };
        formatter
            .and_then(|formatter| formatter.format(value, &self.context))
            .unwrap_or_else(|| FormattedText::new(value.to_string()))
    }

    /// Parse `text` as a value of kind `to`.
    pub fn parse(&self, text: &str, to: ValueKind) -> Result<LiteralValue, ConvertError> {
        let no_match = || ConvertError::NoMatch {
            text: text.to_string(),
            to,
        };
        let names = &self.context.date_time;
        let number = &self.context.number;
        match to {
            ValueKind::Number => self
                .number_parse
                .parse(text, number)
                .map(LiteralValue::Number)
                .ok_or_else(no_match),
            ValueKind::Text => Ok(LiteralValue::Text(text.to_string())),
            ValueKind::Boolean => {
                if text.eq_ignore_ascii_case("TRUE") {
                    Ok(LiteralValue::Boolean(true))
                } else if text.eq_ignore_ascii_case("FALSE") {
                    Ok(LiteralValue::Boolean(false))
                } else {
                    Err(no_match())
                }
            }
            ValueKind::Date => self.date_parse.parse(text, names, number).ok_or_else(no_match),
            ValueKind::DateTime => self
                .date_time_parse
                .parse(text, names, number)
                .ok_or_else(no_match),
            ValueKind::Time => self.time_parse.parse(text, names, number).ok_or_else(no_match),
            ValueKind::Selection => SpreadsheetSelection::parse(text)
                .map(LiteralValue::Selection)
                .ok_or_else(no_match),
            ValueKind::Error => ExcelErrorKind::parse(text)
                .map(|kind| LiteralValue::Error(ExcelError::new(kind)))
                .ok_or_else(no_match),
            ValueKind::Empty => {
                if text.is_empty() {
                    Ok(LiteralValue::Empty)
                } else {
                    Err(no_match())
                }
            }
        }
    }

    /// Convert `value` to kind `to`.
    pub fn convert(&self, value: &LiteralValue, to: ValueKind) -> Result<LiteralValue, ConvertError> {
        let from = ValueKind::of(value);
        let unsupported = || ConvertError::Unsupported { from, to };

        #[cfg(feature = "tracing")]
        tracing::trace!(%from, %to, "convert");

        if from == to {
            return Ok(value.clone());
        }
        match (from, to) {
            (_, ValueKind::Text) => Ok(LiteralValue::Text(self.format(value).text)),
            (ValueKind::Text, _) => match value {
                LiteralValue::Text(text) => self.parse(text, to),
                _ => Err(unsupported()),
            },
            (ValueKind::Empty, ValueKind::Number) => Ok(LiteralValue::Number(0.0)),
            (ValueKind::Empty, ValueKind::Boolean) => Ok(LiteralValue::Boolean(false)),
            (ValueKind::Number | ValueKind::Boolean, ValueKind::Number) => value
                .as_serial_number()
                .map(LiteralValue::Number)
                .ok_or_else(unsupported),
            (from, ValueKind::Number) if from.is_temporal() => value
                .as_serial_number()
                .map(LiteralValue::Number)
                .ok_or_else(unsupported),
            (ValueKind::Number, ValueKind::Boolean) => {
                Ok(LiteralValue::Boolean(value.as_serial_number() != Some(0.0)))
            }
            (from, to) if to.is_temporal() && (from == ValueKind::Number || from.is_temporal()) => {
                let serial = value.as_serial_number().ok_or_else(unsupported)?;
                temporal_from_serial(serial, to)
            }
            _ => Err(unsupported()),
        }
    }
}

fn temporal_from_serial(serial: f64, to: ValueKind) -> Result<LiteralValue, ConvertError> {
    if to == ValueKind::Time {
        let fraction = serial.rem_euclid(1.0);
        let time = serial_to_datetime(fraction)
            .map(|date_time| date_time.time())
            .unwrap_or_default();
        return Ok(LiteralValue::Time(time));
    }
    let date_time = serial_to_datetime(serial).ok_or(ConvertError::OutOfRange(serial))?;
    Ok(match to {
        ValueKind::Date => LiteralValue::Date(date_time.date()),
        _ => LiteralValue::DateTime(date_time),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn converter() -> SpreadsheetConverter {
        SpreadsheetConverter::new(&ConverterPatterns::default(), FormatterContext::default())
            .unwrap()
    }

    #[test]
    fn formats_by_kind() {
        let converter = converter();
        assert_eq!(converter.format(&LiteralValue::Number(1.5)).text, "1.5");
        assert_eq!(converter.format(&LiteralValue::Int(7)).text, "7");
        assert_eq!(
            converter
                .format(&LiteralValue::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()))
                .text,
            "2024-01-02"
        );
        assert_eq!(converter.format(&LiteralValue::Boolean(true)).text, "TRUE");
        assert_eq!(converter.format(&LiteralValue::Empty).text, "");
    }

    #[test]
    fn parses_by_target_kind() {
        let converter = converter();
        assert_eq!(
            converter.parse("1,234.5", ValueKind::Number),
            Ok(LiteralValue::Number(1234.5))
        );
        assert_eq!(converter.parse("25%", ValueKind::Number), Ok(LiteralValue::Number(0.25)));
        assert_eq!(converter.parse("true", ValueKind::Boolean), Ok(LiteralValue::Boolean(true)));
        assert_eq!(
            converter.parse("#REF!", ValueKind::Error),
            Ok(LiteralValue::Error(ExcelError::new(ExcelErrorKind::Ref)))
        );
        assert_eq!(
            converter.parse("abc", ValueKind::Number),
            Err(ConvertError::NoMatch {
                text: "abc".into(),
                to: ValueKind::Number
            })
        );
    }

    #[test]
    fn converts_between_kinds() {
        let converter = converter();
        let date = NaiveDate::from_ymd_opt(2023, 3, 15).unwrap();
        assert_eq!(
            converter.convert(&LiteralValue::Number(45000.0), ValueKind::Date),
            Ok(LiteralValue::Date(date))
        );
        assert_eq!(
            converter.convert(&LiteralValue::Date(date), ValueKind::Number),
            Ok(LiteralValue::Number(45000.0))
        );
        assert_eq!(
            converter.convert(&LiteralValue::Number(0.5), ValueKind::Time),
            Ok(LiteralValue::Time(NaiveTime::from_hms_opt(12, 0, 0).unwrap()))
        );
        assert_eq!(
            converter.convert(&LiteralValue::Text("2024-02-29".into()), ValueKind::Date),
            Ok(LiteralValue::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()))
        );
        assert_eq!(
            converter.convert(&LiteralValue::Boolean(true), ValueKind::Number),
            Ok(LiteralValue::Number(1.0))
        );
        assert_eq!(
            converter.convert(&LiteralValue::Int(3), ValueKind::Text),
            Ok(LiteralValue::Text("3".into()))
        );
        assert_eq!(
            converter.convert(&LiteralValue::Boolean(true), ValueKind::Date),
            Err(ConvertError::Unsupported {
                from: ValueKind::Boolean,
                to: ValueKind::Date
            })
        );
        assert_eq!(
            converter.convert(&LiteralValue::Number(-1.0), ValueKind::Date),
            Err(ConvertError::OutOfRange(-1.0))
        );
    }
}
