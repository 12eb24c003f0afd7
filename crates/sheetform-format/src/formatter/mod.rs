//! Pattern formatters.
//!
//! A [`SpreadsheetFormatter`] is compiled once from a [`SpreadsheetPattern`]
//! and then applied to any number of values. Number patterns select one of
//! up to four sections by sign or explicit condition; date, time and text
//! patterns have a single section.

pub mod date_time;
pub mod fraction;
pub mod general;
pub mod number;
pub mod text;

use chrono::NaiveDateTime;
use sheetform_common::{DateTimeContext, DecimalNumberContext, LiteralValue, serial_to_datetime};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::PatternError;
use crate::pattern::{MAX_NUMBER_FORMAT_SECTIONS, PatternKind, SpreadsheetPattern};
use crate::token::{ConditionOp, FormatColor, FormatLeafKind, FormatParentKind, FormatParserToken};

pub use date_time::DateTimeFormatter;
pub use fraction::FractionFormatter;
pub use general::{GeneralFormatter, format_general};
pub use number::NumberFormatter;
pub use text::TextFormatter;

/// Formatted output plus the colour the section asked for.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedText {
    pub text: String,
    pub color: Option<FormatColor>,
}

impl FormattedText {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: None,
        }
    }

    pub fn with_color(mut self, color: Option<FormatColor>) -> Self {
        self.color = color;
        self
    }
}

/// Locale symbols a formatter draws on.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatterContext {
    pub number: DecimalNumberContext,
    pub date_time: DateTimeContext,
}

/// When a number section applies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SectionCondition {
    Always,
    Explicit(ConditionOp, f64),
}

impl SectionCondition {
    pub fn test(self, value: f64) -> bool {
        match self {
            SectionCondition::Always => true,
            SectionCondition::Explicit(op, target) => op.test(value, target),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum SectionBody {
    Number(NumberFormatter),
    Fraction(FractionFormatter),
    General(GeneralFormatter),
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
struct NumberSection {
    condition: SectionCondition,
    /// Synthesised negative sections print the magnitude; the pattern supplies any sign.
    absolute: bool,
    color: Option<FormatColor>,
    body: SectionBody,
}

/// Conditional number format with an optional text section.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberSectionsFormatter {
    sections: Vec<NumberSection>,
    text: Option<TextFormatter>,
}

impl NumberSectionsFormatter {
    fn compile(pattern: &SpreadsheetPattern) -> Result<Self, PatternError> {
        let mut sections = pattern.sections();
        let total = sections.len();
        if total > MAX_NUMBER_FORMAT_SECTIONS {
            return Err(PatternError::SectionCount {
                kind: pattern.kind(),
                count: total,
                max: MAX_NUMBER_FORMAT_SECTIONS,
            });
        }

        let explicit_text = sections
            .last()
            .copied()
            .flatten()
            .is_some_and(|section| section.parent_kind() == Some(FormatParentKind::Text));
        let text = if explicit_text || total == MAX_NUMBER_FORMAT_SECTIONS {
            let section = sections.pop().flatten();
            Some(section.map_or_else(TextFormatter::empty, TextFormatter::compile))
        } else if total > 1 {
            Some(TextFormatter::plain())
        } else {
            None
        };

        let numeric = sections.len();
        let any_explicit = sections
            .iter()
            .flatten()
            .any(|section| section_condition(section).is_some());

        let sections = sections
            .into_iter()
            .enumerate()
            .map(|(index, section)| {
                let explicit = section.and_then(section_condition);
                let (condition, absolute) = match explicit {
                    Some(condition) => (condition, false),
                    None if any_explicit => (SectionCondition::Always, false),
                    None => implied_condition(index, numeric),
                };
                NumberSection {
                    condition,
                    absolute,
                    color: section.and_then(section_color),
                    body: section.map_or(SectionBody::Empty, compile_body),
                }
            })
            .collect();

        Ok(Self { sections, text })
    }

    /// `None` when no section accepts the value.
    pub fn format_number(&self, value: f64, context: &FormatterContext) -> Option<FormattedText> {
        let section = self
            .sections
            .iter()
            .find(|section| section.condition.test(value))?;
        let value = if section.absolute { value.abs() } else { value };
        let text = match &section.body {
            SectionBody::Number(formatter) => formatter.format(value, &context.number),
            SectionBody::Fraction(formatter) => formatter.format(value, &context.number),
            SectionBody::General(formatter) => formatter.format(value, &context.number),
            SectionBody::Empty => String::new(),
        };
        Some(FormattedText::new(text).with_color(section.color))
    }

    pub fn format_text(&self, value: &str) -> Option<FormattedText> {
        self.text.as_ref().map(|text| text.format(value))
    }
}

fn implied_condition(index: usize, numeric: usize) -> (SectionCondition, bool) {
    use ConditionOp::*;
    match (numeric, index) {
        (2, 0) => (SectionCondition::Explicit(GreaterEqual, 0.0), false),
        (3, 0) => (SectionCondition::Explicit(Greater, 0.0), false),
        (2 | 3, 1) => (SectionCondition::Explicit(Less, 0.0), true),
        (3, 2) => (SectionCondition::Explicit(Equal, 0.0), false),
        _ => (SectionCondition::Always, false),
    }
}

fn section_condition(section: &FormatParserToken) -> Option<SectionCondition> {
    section.children().iter().find_map(|child| match child.parent_kind() {
        Some(FormatParentKind::Condition(op)) => {
            child.children().iter().find_map(|leaf| match leaf.leaf_kind() {
                Some(FormatLeafKind::ConditionNumber(target)) => {
                    Some(SectionCondition::Explicit(op, *target))
                }
                _ => None,
            })
        }
        _ => None,
    })
}

pub(crate) fn section_color(section: &FormatParserToken) -> Option<FormatColor> {
    section
        .children()
        .iter()
        .filter(|child| child.parent_kind() == Some(FormatParentKind::Color))
        .flat_map(FormatParserToken::children)
        .find_map(|leaf| match leaf.leaf_kind() {
            Some(FormatLeafKind::ColorName(color)) => Some(*color),
            Some(FormatLeafKind::ColorNumber(number)) => Some(FormatColor::Number(*number)),
            _ => None,
        })
}

/// Leaves of a section, without its colour and condition blocks.
pub(crate) fn section_leaves(section: &FormatParserToken) -> Vec<&FormatParserToken> {
    let mut leaves = Vec::new();
    for child in section.children() {
        child.leaves_skipping(
            &|kind| matches!(kind, FormatParentKind::Color | FormatParentKind::Condition(_)),
            &mut leaves,
        );
    }
    leaves
}

fn compile_body(section: &FormatParserToken) -> SectionBody {
    let leaves = section_leaves(section);
    match section.parent_kind() {
        Some(FormatParentKind::Fraction) => SectionBody::Fraction(FractionFormatter::compile(&leaves)),
        Some(FormatParentKind::General) => SectionBody::General(GeneralFormatter::compile(&leaves)),
        _ => SectionBody::Number(NumberFormatter::compile(&leaves)),
    }
}

/// A compiled format pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum SpreadsheetFormatter {
    Number(NumberSectionsFormatter),
    DateTime(DateTimeFormatter),
    Text(TextFormatter),
}

impl SpreadsheetFormatter {
    pub(crate) fn compile(pattern: &SpreadsheetPattern) -> Result<Self, PatternError> {
        Ok(match pattern.kind() {
            PatternKind::NumberFormat => {
                SpreadsheetFormatter::Number(NumberSectionsFormatter::compile(pattern)?)
            }
            PatternKind::TextFormat => SpreadsheetFormatter::Text(
                pattern
                    .sections()
                    .first()
                    .copied()
                    .flatten()
                    .map_or_else(TextFormatter::empty, TextFormatter::compile),
            ),
            kind => SpreadsheetFormatter::DateTime(DateTimeFormatter::compile(
                pattern.sections().first().copied().flatten(),
                kind == PatternKind::TimeFormat,
            )),
        })
    }

    /// Format any value this formatter understands; `None` otherwise.
    pub fn format(&self, value: &LiteralValue, context: &FormatterContext) -> Option<FormattedText> {
        match (self, value) {
            (SpreadsheetFormatter::Text(text), LiteralValue::Text(s)) => Some(text.format(s)),
            (SpreadsheetFormatter::Number(number), LiteralValue::Text(s)) => number.format_text(s),
            (SpreadsheetFormatter::Number(number), _) => {
                number.format_number(numeric_value(value)?, context)
            }
            (SpreadsheetFormatter::DateTime(formatter), _) => {
                Some(formatter.format(date_time_value(value)?, context))
            }
            (SpreadsheetFormatter::Text(_), _) => None,
        }
    }
}

fn numeric_value(value: &LiteralValue) -> Option<f64> {
    match value {
        LiteralValue::Int(_)
        | LiteralValue::Number(_)
        | LiteralValue::Date(_)
        | LiteralValue::DateTime(_)
        | LiteralValue::Time(_) => value.as_serial_number(),
        _ => None,
    }
}

fn date_time_value(value: &LiteralValue) -> Option<NaiveDateTime> {
    match value {
        LiteralValue::Date(date) => date.and_hms_opt(0, 0, 0),
        LiteralValue::DateTime(date_time) => Some(*date_time),
        LiteralValue::Time(time) => {
            chrono::NaiveDate::from_ymd_opt(1899, 12, 31).map(|date| date.and_time(*time))
        }
        LiteralValue::Int(_) | LiteralValue::Number(_) => {
            serial_to_datetime(value.as_serial_number()?)
        }
        _ => None,
    }
}
