//! Parsing date and time text against date, time and date-time parse patterns.

use chrono::{NaiveDate, NaiveTime};

use sheetform_common::{DateTimeContext, DecimalNumberContext, LiteralValue};

use crate::formatter::date_time::{DateTimeComponent, date_time_components};
use crate::formatter::section_leaves;
use crate::number_parse::TextCursor;
use crate::pattern::{PatternKind, SpreadsheetPattern};

/// Year used when a pattern has no year field.
const DEFAULT_YEAR: i32 = 1900;

#[derive(Debug, Default)]
struct Fields {
    year: Option<i32>,
    month: Option<u32>,
    day: Option<u32>,
    hour: u32,
    minute: u32,
    second: u32,
    nanos: u32,
    afternoon: Option<bool>,
}

impl Fields {
    fn date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(
            self.year.unwrap_or(DEFAULT_YEAR),
            self.month.unwrap_or(1),
            self.day.unwrap_or(1),
        )
    }

    fn time(&self) -> Option<NaiveTime> {
        let hour = match self.afternoon {
            Some(afternoon) => {
                if !(1..=12).contains(&self.hour) {
                    return None;
                }
                self.hour % 12 + if afternoon { 12 } else { 0 }
            }
            None => self.hour,
        };
        NaiveTime::from_hms_nano_opt(hour, self.minute, self.second, self.nanos)
    }
}

/// Up to `max` ASCII digits, at least `min`.
fn digits(cursor: &mut TextCursor<'_>, min: usize, max: usize) -> Option<u32> {
    let rest = cursor.rest();
    let len = rest
        .bytes()
        .take(max)
        .take_while(u8::is_ascii_digit)
        .count();
    if len < min {
        return None;
    }
    let value = rest[..len].parse().ok()?;
    cursor.restore(cursor.pos() + len);
    Some(value)
}

fn parse_component(
    component: &DateTimeComponent,
    cursor: &mut TextCursor<'_>,
    fields: &mut Fields,
    names: &DateTimeContext,
    decimal_point: char,
) -> Option<()> {
    match component {
        DateTimeComponent::Day(count) if *count <= 2 => fields.day = Some(digits(cursor, 1, 2)?),
        DateTimeComponent::Day(_) => {
            let len = names.match_weekday(cursor.rest())?;
            cursor.restore(cursor.pos() + len);
        }
        DateTimeComponent::Month(count) if *count <= 2 => {
            fields.month = Some(digits(cursor, 1, 2)?)
        }
        DateTimeComponent::Month(_) => {
            let (month, len) = names.match_month(cursor.rest())?;
            cursor.restore(cursor.pos() + len);
            fields.month = Some(month);
        }
        DateTimeComponent::Year(count) if *count <= 2 => {
            let year = digits(cursor, 2, 2)?;
            fields.year = Some(names.expand_two_digit_year(year));
        }
        DateTimeComponent::Year(_) => fields.year = Some(digits(cursor, 4, 4)? as i32),
        DateTimeComponent::Hour(_) => fields.hour = digits(cursor, 1, 2)?,
        DateTimeComponent::Minute(_) => fields.minute = digits(cursor, 1, 2)?,
        DateTimeComponent::Second(_) => fields.second = digits(cursor, 1, 2)?,
        DateTimeComponent::SecondFraction(_) => {
            if cursor.eat(decimal_point) {
                let rest = cursor.rest();
                let len = rest.bytes().take_while(u8::is_ascii_digit).count();
                if len == 0 {
                    return None;
                }
                let kept = &rest[..len.min(9)];
                let scaled: u32 = kept.parse().ok()?;
                fields.nanos = scaled * 10u32.pow(9 - kept.len() as u32);
                cursor.restore(cursor.pos() + len);
            }
        }
        DateTimeComponent::AmPm(marker) => {
            let short = marker.len() <= 3;
            let marker_for = |word: &str| -> String {
                if short {
                    word.chars().take(1).collect()
                } else {
                    word.to_string()
                }
            };
            if cursor.eat_str(&marker_for(&names.pm)) {
                fields.afternoon = Some(true);
            } else if cursor.eat_str(&marker_for(&names.am)) {
                fields.afternoon = Some(false);
            } else {
                return None;
            }
        }
        DateTimeComponent::Whitespace(_) => {
            if !cursor.eat(' ') {
                return None;
            }
            while cursor.eat(' ') {}
        }
        DateTimeComponent::Literal(text) => {
            if !cursor.eat_str(text) {
                return None;
            }
        }
    }
    Some(())
}

/// A compiled date, time or date-time parse pattern. Each `;` section is an
/// alternative tried in order against the whole text.
#[derive(Debug, Clone, PartialEq)]
pub struct DateTimeParsePattern {
    kind: PatternKind,
    candidates: Vec<Vec<DateTimeComponent>>,
}

impl DateTimeParsePattern {
    pub(crate) fn compile(pattern: &SpreadsheetPattern) -> Self {
        let minutes_by_default = pattern.kind() == PatternKind::TimeParse;
        let candidates = pattern
            .sections()
            .into_iter()
            .flatten()
            .map(|section| date_time_components(&section_leaves(section), minutes_by_default))
            .collect();
        Self {
            kind: pattern.kind(),
            candidates,
        }
    }

    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    /// A date, time or date-time value depending on the pattern kind.
    pub fn parse(
        &self,
        text: &str,
        names: &DateTimeContext,
        number: &DecimalNumberContext,
    ) -> Option<LiteralValue> {
        self.candidates.iter().find_map(|candidate| {
            let mut cursor = TextCursor::new(text, 0);
            let mut fields = Fields::default();
            for component in candidate {
                parse_component(component, &mut cursor, &mut fields, names, number.decimal_point)?;
            }
            if !cursor.is_at_end() {
                return None;
            }
            match self.kind {
                PatternKind::DateParse => fields.date().map(LiteralValue::Date),
                PatternKind::TimeParse => fields.time().map(LiteralValue::Time),
                _ => Some(LiteralValue::DateTime(fields.date()?.and_time(fields.time()?))),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(kind: PatternKind, pattern: &str, text: &str) -> Option<LiteralValue> {
        SpreadsheetPattern::parse(kind, pattern)
            .unwrap()
            .date_time_parser()
            .unwrap()
            .parse(text, &DateTimeContext::default(), &DecimalNumberContext::default())
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn dates_with_numbers_and_names() {
        assert_eq!(
            parse(PatternKind::DateParse, "yyyy-mm-dd", "2024-02-29"),
            Some(LiteralValue::Date(date(2024, 2, 29)))
        );
        assert_eq!(
            parse(PatternKind::DateParse, "d mmm yyyy", "5 Mar 2021"),
            Some(LiteralValue::Date(date(2021, 3, 5)))
        );
        assert_eq!(
            parse(PatternKind::DateParse, "dddd, mmmm d, yyyy", "Friday, march 5, 2021"),
            Some(LiteralValue::Date(date(2021, 3, 5)))
        );
        assert_eq!(parse(PatternKind::DateParse, "yyyy-mm-dd", "2023-02-29"), None);
    }

    #[test]
    fn two_digit_years_pivot() {
        assert_eq!(
            parse(PatternKind::DateParse, "d/m/yy", "1/2/29"),
            Some(LiteralValue::Date(date(2029, 2, 1)))
        );
        assert_eq!(
            parse(PatternKind::DateParse, "d/m/yy", "1/2/30"),
            Some(LiteralValue::Date(date(1930, 2, 1)))
        );
    }

    #[test]
    fn alternatives_are_tried_in_order() {
        let pattern = "yyyy-mm-dd;dd/mm/yyyy";
        assert_eq!(
            parse(PatternKind::DateParse, pattern, "31/12/1999"),
            Some(LiteralValue::Date(date(1999, 12, 31)))
        );
        assert_eq!(parse(PatternKind::DateParse, pattern, "1999.12.31"), None);
    }

    #[test]
    fn times_with_markers_and_fractions() {
        assert_eq!(
            parse(PatternKind::TimeParse, "h:mm AM/PM", "3:07 pm"),
            Some(LiteralValue::Time(NaiveTime::from_hms_opt(15, 7, 0).unwrap()))
        );
        assert_eq!(
            parse(PatternKind::TimeParse, "h:mm AM/PM", "12:30 AM"),
            Some(LiteralValue::Time(NaiveTime::from_hms_opt(0, 30, 0).unwrap()))
        );
        assert_eq!(
            parse(PatternKind::TimeParse, "hh:mm:ss.000", "10:20:30.5"),
            Some(LiteralValue::Time(
                NaiveTime::from_hms_milli_opt(10, 20, 30, 500).unwrap()
            ))
        );
        assert_eq!(parse(PatternKind::TimeParse, "hh:mm", "25:00"), None);
    }

    #[test]
    fn date_times_resolve_month_and_minute() {
        assert_eq!(
            parse(PatternKind::DateTimeParse, "yyyy-mm-dd hh:mm", "2000-12-31 12:58"),
            Some(LiteralValue::DateTime(
                date(2000, 12, 31).and_hms_opt(12, 58, 0).unwrap()
            ))
        );
    }
}
