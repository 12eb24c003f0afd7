//! Typed format and parse patterns.
//!
//! A [`SpreadsheetPattern`] is a parsed pattern tree plus the purpose it was
//! parsed for. Construction validates the tree against that purpose, so a
//! pattern that exists is always usable by the matching compiler.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::date_time_parse::DateTimeParsePattern;
use crate::error::{PatternError, Usage};
use crate::formatter::SpreadsheetFormatter;
use crate::grammar::{FormatGrammar, FormatParserKind};
use crate::number_parse::NumberParsePattern;
use crate::token::{FormatLeafKind, FormatParentKind, FormatParserToken};

/// Most sections a number format accepts (positive, negative, zero, text).
pub const MAX_NUMBER_FORMAT_SECTIONS: usize = 4;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternKind {
    DateFormat,
    DateParse,
    DateTimeFormat,
    DateTimeParse,
    NumberFormat,
    NumberParse,
    TextFormat,
    TimeFormat,
    TimeParse,
}

impl PatternKind {
    pub const ALL: [PatternKind; 9] = [
        PatternKind::DateFormat,
        PatternKind::DateParse,
        PatternKind::DateTimeFormat,
        PatternKind::DateTimeParse,
        PatternKind::NumberFormat,
        PatternKind::NumberParse,
        PatternKind::TextFormat,
        PatternKind::TimeFormat,
        PatternKind::TimeParse,
    ];

    /// Section parsers tried, in order, for each `;`-separated section.
    pub fn section_parsers(self) -> &'static [FormatParserKind] {
        match self {
            PatternKind::DateFormat | PatternKind::DateParse => &[FormatParserKind::Date],
            PatternKind::DateTimeFormat | PatternKind::DateTimeParse => {
                &[FormatParserKind::DateTime]
            }
            PatternKind::TimeFormat | PatternKind::TimeParse => &[FormatParserKind::Time],
            PatternKind::NumberFormat => &[
                FormatParserKind::General,
                FormatParserKind::Fraction,
                FormatParserKind::Number,
                FormatParserKind::Text,
            ],
            PatternKind::NumberParse => &[FormatParserKind::Number],
            PatternKind::TextFormat => &[FormatParserKind::Text],
        }
    }

    /// Parse patterns turn text into values; every section is an alternative.
    pub fn is_parse(self) -> bool {
        matches!(
            self,
            PatternKind::DateParse
                | PatternKind::DateTimeParse
                | PatternKind::NumberParse
                | PatternKind::TimeParse
        )
    }

    fn max_sections(self) -> usize {
        match self {
            PatternKind::NumberFormat => MAX_NUMBER_FORMAT_SECTIONS,
            PatternKind::DateFormat
            | PatternKind::DateTimeFormat
            | PatternKind::TimeFormat
            | PatternKind::TextFormat => 1,
            _ => usize::MAX,
        }
    }

    fn allows_section(self, kind: FormatParentKind) -> bool {
        match self {
            PatternKind::DateFormat | PatternKind::DateParse => kind == FormatParentKind::Date,
            PatternKind::DateTimeFormat | PatternKind::DateTimeParse => {
                kind == FormatParentKind::DateTime
            }
            PatternKind::TimeFormat | PatternKind::TimeParse => kind == FormatParentKind::Time,
            PatternKind::NumberFormat => matches!(
                kind,
                FormatParentKind::General
                    | FormatParentKind::Fraction
                    | FormatParentKind::Number
                    | FormatParentKind::Text
            ),
            PatternKind::NumberParse => kind == FormatParentKind::Number,
            PatternKind::TextFormat => kind == FormatParentKind::Text,
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PatternKind::DateFormat => "date-format",
            PatternKind::DateParse => "date-parse",
            PatternKind::DateTimeFormat => "date-time-format",
            PatternKind::DateTimeParse => "date-time-parse",
            PatternKind::NumberFormat => "number-format",
            PatternKind::NumberParse => "number-parse",
            PatternKind::TextFormat => "text-format",
            PatternKind::TimeFormat => "time-format",
            PatternKind::TimeParse => "time-parse",
        })
    }
}

/// A validated pattern.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpreadsheetPattern {
    kind: PatternKind,
    token: FormatParserToken,
}

impl SpreadsheetPattern {
    pub fn parse(kind: PatternKind, text: &str) -> Result<Self, PatternError> {
        let token = FormatGrammar::get().parse_sections(text, kind.section_parsers())?;
        Self::with_token(kind, token)
    }

    /// Wrap an already parsed tree, validating it for `kind`.
    pub fn with_token(kind: PatternKind, token: FormatParserToken) -> Result<Self, PatternError> {
        validate(kind, &token)?;

        #[cfg(feature = "tracing")]
        tracing::trace!(kind = %kind, pattern = token.text(), "pattern validated");

        Ok(Self { kind, token })
    }

    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    pub fn token(&self) -> &FormatParserToken {
        &self.token
    }

    pub fn text(&self) -> &str {
        self.token.text()
    }

    /// Sections in order; `None` marks an empty section such as the middle of `0;;0`.
    pub fn sections(&self) -> Vec<Option<&FormatParserToken>> {
        split_sections(&self.token)
    }

    pub fn formatter(&self) -> Result<SpreadsheetFormatter, PatternError> {
        if self.kind.is_parse() {
            return Err(PatternError::WrongKind {
                kind: self.kind,
                wanted: Usage::Formatter,
            });
        }
        SpreadsheetFormatter::compile(self)
    }

    pub fn number_parser(&self) -> Result<NumberParsePattern, PatternError> {
        if self.kind != PatternKind::NumberParse {
            return Err(PatternError::WrongKind {
                kind: self.kind,
                wanted: Usage::NumberParser,
            });
        }
        Ok(NumberParsePattern::compile(self))
    }

    pub fn date_time_parser(&self) -> Result<DateTimeParsePattern, PatternError> {
        if !matches!(
            self.kind,
            PatternKind::DateParse | PatternKind::DateTimeParse | PatternKind::TimeParse
        ) {
            return Err(PatternError::WrongKind {
                kind: self.kind,
                wanted: Usage::DateTimeParser,
            });
        }
        Ok(DateTimeParsePattern::compile(self))
    }
}

impl fmt::Display for SpreadsheetPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

fn split_sections(token: &FormatParserToken) -> Vec<Option<&FormatParserToken>> {
    let mut sections = Vec::new();
    let mut current = None;
    for child in token.children() {
        if child.leaf_kind() == Some(&FormatLeafKind::Separator) {
            sections.push(current.take());
        } else {
            current = Some(child);
        }
    }
    sections.push(current);
    sections
}

fn invalid(kind: PatternKind, token: &FormatParserToken) -> PatternError {
    PatternError::InvalidToken {
        kind,
        token: token.text().to_string(),
    }
}

/// Reject trees that do not fit `kind`.
fn validate(kind: PatternKind, token: &FormatParserToken) -> Result<(), PatternError> {
    if token.parent_kind() != Some(FormatParentKind::Expression) {
        return Err(invalid(kind, token));
    }
    let sections = split_sections(token);
    if sections.len() > kind.max_sections() {
        return Err(PatternError::SectionCount {
            kind,
            count: sections.len(),
            max: kind.max_sections(),
        });
    }

    let last = sections.len() - 1;
    for (index, section) in sections.iter().enumerate() {
        let Some(section) = section else {
            continue;
        };
        let section_kind = section.parent_kind().ok_or_else(|| invalid(kind, section))?;
        if !kind.allows_section(section_kind) {
            return Err(invalid(kind, section));
        }
        if kind == PatternKind::NumberFormat {
            let text_section = section_kind == FormatParentKind::Text
                || index == MAX_NUMBER_FORMAT_SECTIONS - 1;
            if section_kind == FormatParentKind::Text && index != last {
                return Err(invalid(kind, section));
            }
            if text_section {
                check_text_section(kind, section)?;
            }
        }
        for child in section.children() {
            check_token(kind, child)?;
        }
    }
    Ok(())
}

fn check_token(kind: PatternKind, token: &FormatParserToken) -> Result<(), PatternError> {
    match token {
        FormatParserToken::Parent {
            kind: parent,
            children,
            ..
        } => {
            if kind.is_parse()
                && matches!(parent, FormatParentKind::Color | FormatParentKind::Condition(_))
            {
                return Err(invalid(kind, token));
            }
            children.iter().try_for_each(|child| check_token(kind, child))
        }
        FormatParserToken::Leaf { kind: leaf, .. } => {
            let allowed = match leaf {
                FormatLeafKind::Star(_) | FormatLeafKind::Underscore(_) => !kind.is_parse(),
                FormatLeafKind::TextPlaceholder => {
                    matches!(kind, PatternKind::NumberFormat | PatternKind::TextFormat)
                }
                _ => true,
            };
            if allowed {
                Ok(())
            } else {
                Err(invalid(kind, token))
            }
        }
    }
}

/// The text section of a number format may not carry numeric placeholders.
fn check_text_section(kind: PatternKind, section: &FormatParserToken) -> Result<(), PatternError> {
    for leaf in section.leaves() {
        let numeric = leaf.leaf_kind().is_some_and(|leaf_kind| {
            leaf_kind.is_digit()
                || matches!(
                    leaf_kind,
                    FormatLeafKind::DecimalPoint
                        | FormatLeafKind::GroupSeparator
                        | FormatLeafKind::Percent
                        | FormatLeafKind::Exponent
                        | FormatLeafKind::General
                )
        });
        if numeric {
            return Err(invalid(kind, leaf));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_include_empty_ones() {
        let pattern = SpreadsheetPattern::parse(PatternKind::NumberFormat, "0;;0").unwrap();
        let sections = pattern.sections();
        assert_eq!(sections.len(), 3);
        assert!(sections[1].is_none());
        assert_eq!(pattern.text(), "0;;0");
    }

    #[test]
    fn number_format_rejects_five_sections() {
        assert_eq!(
            SpreadsheetPattern::parse(PatternKind::NumberFormat, "0;0;0;0;0").unwrap_err(),
            PatternError::SectionCount {
                kind: PatternKind::NumberFormat,
                count: 5,
                max: 4
            }
        );
    }

    #[test]
    fn parse_patterns_reject_colors_and_conditions() {
        assert_eq!(
            SpreadsheetPattern::parse(PatternKind::NumberParse, "[Red]0.00").unwrap_err(),
            PatternError::InvalidToken {
                kind: PatternKind::NumberParse,
                token: "[Red]".into()
            }
        );
        assert!(matches!(
            SpreadsheetPattern::parse(PatternKind::DateParse, "[>1]yyyy"),
            Err(PatternError::InvalidToken { .. })
        ));
        assert!(SpreadsheetPattern::parse(PatternKind::NumberFormat, "[Red]0.00").is_ok());
    }

    #[test]
    fn text_section_must_be_last_and_non_numeric() {
        assert!(SpreadsheetPattern::parse(PatternKind::NumberFormat, "0;@").is_ok());
        assert!(matches!(
            SpreadsheetPattern::parse(PatternKind::NumberFormat, "@;0"),
            Err(PatternError::InvalidToken { .. })
        ));
        assert!(matches!(
            SpreadsheetPattern::parse(PatternKind::NumberFormat, "0;0;0;0"),
            Err(PatternError::InvalidToken { .. })
        ));
        assert!(SpreadsheetPattern::parse(PatternKind::NumberFormat, "0;0;0;\"n/a\"").is_ok());
    }

    #[test]
    fn time_letters_are_not_dates() {
        assert!(SpreadsheetPattern::parse(PatternKind::TimeFormat, "hh:mm:ss.00 AM/PM").is_ok());
        assert!(SpreadsheetPattern::parse(PatternKind::DateFormat, "hh:mm").is_err());
    }

    #[test]
    fn wrong_usage_is_reported() {
        let pattern = SpreadsheetPattern::parse(PatternKind::DateFormat, "yyyy").unwrap();
        assert_eq!(
            pattern.number_parser().unwrap_err(),
            PatternError::WrongKind {
                kind: PatternKind::DateFormat,
                wanted: Usage::NumberParser
            }
        );
    }
}
