//! Date, time and date-time sections.

use chrono::{Datelike, NaiveDateTime, Timelike};

use super::{FormattedText, FormatterContext, section_color, section_leaves};
use crate::token::{FormatColor, FormatLeafKind, FormatParserToken};

/// A resolved date or time component. `m` letters have already been decided
/// as month or minute.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DateTimeComponent {
    Day(usize),
    Month(usize),
    Minute(usize),
    Year(usize),
    Hour(usize),
    Second(usize),
    /// Decimal point plus this many fractional second digits.
    SecondFraction(usize),
    /// Marker text as written in the pattern, e.g. `AM/PM` or `a/p`.
    AmPm(String),
    Whitespace(String),
    Literal(String),
}

impl DateTimeComponent {
    fn is_field(&self) -> bool {
        matches!(
            self,
            DateTimeComponent::Day(_)
                | DateTimeComponent::Month(_)
                | DateTimeComponent::Minute(_)
                | DateTimeComponent::Year(_)
                | DateTimeComponent::Hour(_)
                | DateTimeComponent::Second(_)
        )
    }
}

/// Components in pattern order.
///
/// An ambiguous `m` run is a minute when the nearest field before it is an
/// hour or the nearest field after it is a second. Time patterns treat every
/// `m` run as minutes.
pub(crate) fn date_time_components(
    leaves: &[&FormatParserToken],
    minutes_by_default: bool,
) -> Vec<DateTimeComponent> {
    let mut components: Vec<DateTimeComponent> = Vec::new();
    let mut ambiguous = Vec::new();

    for leaf in leaves {
        let Some(kind) = leaf.leaf_kind() else {
            continue;
        };
        let component = match kind {
            FormatLeafKind::Day(count) => DateTimeComponent::Day(*count),
            FormatLeafKind::Month(count) => DateTimeComponent::Month(*count),
            FormatLeafKind::MonthOrMinute(count) => {
                if minutes_by_default {
                    DateTimeComponent::Minute(*count)
                } else {
                    ambiguous.push(components.len());
                    DateTimeComponent::Month(*count)
                }
            }
            FormatLeafKind::Year(count) => DateTimeComponent::Year(*count),
            FormatLeafKind::Hour(count) => DateTimeComponent::Hour(*count),
            FormatLeafKind::Second(count) => DateTimeComponent::Second(*count),
            FormatLeafKind::AmPm => DateTimeComponent::AmPm(leaf.text().to_string()),
            FormatLeafKind::DecimalPoint => DateTimeComponent::SecondFraction(0),
            FormatLeafKind::DigitZero => {
                if let Some(DateTimeComponent::SecondFraction(digits)) = components.last_mut() {
                    *digits += 1;
                }
                continue;
            }
            FormatLeafKind::Whitespace => DateTimeComponent::Whitespace(leaf.text().to_string()),
            FormatLeafKind::Underscore(_) => DateTimeComponent::Literal(" ".to_string()),
            other => match other.literal(leaf.text()) {
                Some(text) => DateTimeComponent::Literal(text),
                None => continue,
            },
        };
        components.push(component);
    }

    for index in ambiguous {
        let previous = components[..index].iter().rev().find(|c| c.is_field());
        let next = components[index + 1..].iter().find(|c| c.is_field());
        let minute = matches!(previous, Some(DateTimeComponent::Hour(_)))
            || matches!(next, Some(DateTimeComponent::Second(_)));
        if minute {
            if let DateTimeComponent::Month(count) = components[index] {
                components[index] = DateTimeComponent::Minute(count);
            }
        }
    }
    components
}

/// Lower-case marker text keeps lower-case output.
pub(crate) fn am_pm_text(marker: &str, afternoon: bool, am: &str, pm: &str) -> String {
    let word = if afternoon { pm } else { am };
    let word = if marker.len() <= 3 {
        word.chars().take(1).collect::<String>()
    } else {
        word.to_string()
    };
    if marker.starts_with(|c: char| c.is_ascii_lowercase()) {
        word.to_lowercase()
    } else {
        word
    }
}

fn pad2(out: &mut String, value: u32, count: usize) {
    if count >= 2 {
        out.push_str(&format!("{value:02}"));
    } else {
        out.push_str(&value.to_string());
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DateTimeFormatter {
    components: Vec<DateTimeComponent>,
    twelve_hour: bool,
    color: Option<FormatColor>,
}

impl DateTimeFormatter {
    pub fn compile(section: Option<&FormatParserToken>, minutes_by_default: bool) -> Self {
        let Some(section) = section else {
            return Self {
                components: Vec::new(),
                twelve_hour: false,
                color: None,
            };
        };
        let components = date_time_components(&section_leaves(section), minutes_by_default);
        let twelve_hour = components
            .iter()
            .any(|c| matches!(c, DateTimeComponent::AmPm(_)));
        Self {
            components,
            twelve_hour,
            color: section_color(section),
        }
    }

    pub fn format(&self, value: NaiveDateTime, context: &FormatterContext) -> FormattedText {
        let names = &context.date_time;
        let mut out = String::new();
        for component in &self.components {
            match component {
                DateTimeComponent::Day(count) => match count {
                    1 | 2 => pad2(&mut out, value.day(), *count),
                    3 => out.push_str(
                        &names.weekday_abbreviations
                            [value.weekday().num_days_from_monday() as usize],
                    ),
                    _ => out.push_str(
                        &names.weekday_names[value.weekday().num_days_from_monday() as usize],
                    ),
                },
                DateTimeComponent::Month(count) => {
                    let index = value.month0() as usize;
                    match count {
                        1 | 2 => pad2(&mut out, value.month(), *count),
                        3 => out.push_str(&names.month_abbreviations[index]),
                        4 => out.push_str(&names.month_names[index]),
                        _ => out.extend(names.month_names[index].chars().take(1)),
                    }
                }
                DateTimeComponent::Year(count) => {
                    if *count <= 2 {
                        out.push_str(&format!("{:02}", value.year().rem_euclid(100)));
                    } else {
                        out.push_str(&format!("{:04}", value.year()));
                    }
                }
                DateTimeComponent::Hour(count) => {
                    let hour = if self.twelve_hour {
                        match value.hour() % 12 {
                            0 => 12,
                            hour => hour,
                        }
                    } else {
                        value.hour()
                    };
                    pad2(&mut out, hour, *count);
                }
                DateTimeComponent::Minute(count) => pad2(&mut out, value.minute(), *count),
                DateTimeComponent::Second(count) => pad2(&mut out, value.second(), *count),
                DateTimeComponent::SecondFraction(digits) => {
                    out.push(context.number.decimal_point);
                    let nanos = value.nanosecond() % 1_000_000_000;
                    let digits = (*digits).min(9);
                    let scaled = nanos / 10u32.pow(9 - digits as u32);
                    if digits > 0 {
                        out.push_str(&format!("{scaled:0digits$}"));
                    }
                }
                DateTimeComponent::AmPm(marker) => out.push_str(&am_pm_text(
                    marker,
                    value.hour() >= 12,
                    &names.am,
                    &names.pm,
                )),
                DateTimeComponent::Whitespace(text) | DateTimeComponent::Literal(text) => {
                    out.push_str(text)
                }
            }
        }
        FormattedText::new(out).with_color(self.color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{PatternKind, SpreadsheetPattern};
    use chrono::NaiveDate;
    use sheetform_common::LiteralValue;

    fn format(kind: PatternKind, pattern: &str, value: LiteralValue) -> String {
        SpreadsheetPattern::parse(kind, pattern)
            .unwrap()
            .formatter()
            .unwrap()
            .format(&value, &FormatterContext::default())
            .unwrap()
            .text
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> LiteralValue {
        LiteralValue::DateTime(
            NaiveDate::from_ymd_opt(y, mo, d)
                .unwrap()
                .and_hms_opt(h, mi, s)
                .unwrap(),
        )
    }

    #[test]
    fn month_or_minute_from_neighbours() {
        assert_eq!(
            format(
                PatternKind::DateTimeFormat,
                "yyyymmddhhmmss",
                at(2000, 12, 31, 12, 58, 59)
            ),
            "20001231125859"
        );
        assert_eq!(
            format(PatternKind::DateTimeFormat, "mm:ss", at(2000, 1, 2, 3, 4, 5)),
            "04:05"
        );
        assert_eq!(
            format(PatternKind::DateTimeFormat, "m/d/yy", at(2024, 3, 9, 0, 0, 0)),
            "3/9/24"
        );
    }

    #[test]
    fn names_and_years() {
        let date = LiteralValue::Date(NaiveDate::from_ymd_opt(2024, 2, 5).unwrap());
        assert_eq!(
            format(PatternKind::DateFormat, "dddd, mmmm d, yyyy", date.clone()),
            "Monday, February 5, 2024"
        );
        assert_eq!(format(PatternKind::DateFormat, "ddd mmm yy", date.clone()), "Mon Feb 24");
        assert_eq!(format(PatternKind::DateFormat, "mmmmm", date), "F");
    }

    #[test]
    fn twelve_hour_clock() {
        let value = at(2024, 1, 1, 15, 7, 0);
        assert_eq!(format(PatternKind::TimeFormat, "h:mm AM/PM", value.clone()), "3:07 PM");
        assert_eq!(format(PatternKind::TimeFormat, "h:mm am/pm", value.clone()), "3:07 pm");
        assert_eq!(format(PatternKind::TimeFormat, "hh:mm a/p", at(2024, 1, 1, 0, 5, 0)), "12:05 a");
        assert_eq!(format(PatternKind::TimeFormat, "hh:mm", value), "15:07");
    }

    #[test]
    fn fractional_seconds() {
        let value = LiteralValue::DateTime(
            NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_milli_opt(10, 20, 30, 456)
                .unwrap(),
        );
        assert_eq!(format(PatternKind::TimeFormat, "hh:mm:ss.00", value), "10:20:30.45");
    }

    #[test]
    fn serial_numbers_format_as_dates() {
        assert_eq!(
            format(PatternKind::DateFormat, "yyyy-mm-dd", LiteralValue::Number(45000.0)),
            "2023-03-15"
        );
    }
}
