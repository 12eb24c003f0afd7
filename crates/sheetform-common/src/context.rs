//! Locale symbols consumed by the number and date/time parsers and formatters.
//!
//! Nothing here is looked up from the environment; callers that need another
//! locale build their own context and pass it down.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Symbols used when reading and writing numbers.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecimalNumberContext {
    pub decimal_point: char,
    pub group_separator: char,
    pub exponent_symbol: String,
    pub negative_sign: char,
    pub positive_sign: char,
    pub percent_symbol: char,
    pub currency_symbol: String,
}

impl Default for DecimalNumberContext {
    fn default() -> Self {
        Self {
            decimal_point: '.',
            group_separator: ',',
            exponent_symbol: "E".to_string(),
            negative_sign: '-',
            positive_sign: '+',
            percent_symbol: '%',
            currency_symbol: "$".to_string(),
        }
    }
}

impl DecimalNumberContext {
    /// Case-insensitive exponent match at the start of `text`, returning its byte length.
    pub fn match_exponent(&self, text: &str) -> Option<usize> {
        let len = self.exponent_symbol.len();
        (text.len() >= len
            && text.is_char_boundary(len)
            && text[..len].eq_ignore_ascii_case(&self.exponent_symbol))
        .then_some(len)
    }
}

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Names and markers used when reading and writing dates and times.
///
/// Weekdays start on Monday, matching `chrono::Weekday::num_days_from_monday`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DateTimeContext {
    pub month_names: Vec<String>,
    pub month_abbreviations: Vec<String>,
    pub weekday_names: Vec<String>,
    pub weekday_abbreviations: Vec<String>,
    pub am: String,
    pub pm: String,
    /// Two-digit years below this value land in the 2000s, the rest in the 1900s.
    pub two_digit_year_pivot: u32,
}

impl Default for DateTimeContext {
    fn default() -> Self {
        Self {
            month_names: MONTH_NAMES.iter().map(|s| s.to_string()).collect(),
            month_abbreviations: MONTH_NAMES.iter().map(|s| s[..3].to_string()).collect(),
            weekday_names: WEEKDAY_NAMES.iter().map(|s| s.to_string()).collect(),
            weekday_abbreviations: WEEKDAY_NAMES.iter().map(|s| s[..3].to_string()).collect(),
            am: "AM".to_string(),
            pm: "PM".to_string(),
            two_digit_year_pivot: 30,
        }
    }
}

impl DateTimeContext {
    /// 1-based month whose full name or abbreviation prefixes `text`, with the
    /// matched byte length. Full names are preferred.
    pub fn match_month(&self, text: &str) -> Option<(u32, usize)> {
        match_name(&self.month_names, text)
            .or_else(|| match_name(&self.month_abbreviations, text))
            .map(|(index, len)| (index as u32 + 1, len))
    }

    /// Byte length of the weekday name or abbreviation prefixing `text`.
    pub fn match_weekday(&self, text: &str) -> Option<usize> {
        match_name(&self.weekday_names, text)
            .or_else(|| match_name(&self.weekday_abbreviations, text))
            .map(|(_, len)| len)
    }

    pub fn expand_two_digit_year(&self, year: u32) -> i32 {
        if year < self.two_digit_year_pivot {
            2000 + year as i32
        } else {
            1900 + year as i32
        }
    }
}

fn match_name(names: &[String], text: &str) -> Option<(usize, usize)> {
    names.iter().enumerate().find_map(|(index, name)| {
        let len = name.len();
        (text.len() >= len
            && text.is_char_boundary(len)
            && text[..len].eq_ignore_ascii_case(name))
        .then_some((index, len))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_names_prefer_full_form() {
        let ctx = DateTimeContext::default();
        assert_eq!(ctx.match_month("march 3"), Some((3, 5)));
        assert_eq!(ctx.match_month("Mar 3"), Some((3, 3)));
        assert_eq!(ctx.match_month("Smarch"), None);
    }

    #[test]
    fn two_digit_year_pivot() {
        let ctx = DateTimeContext::default();
        assert_eq!(ctx.expand_two_digit_year(29), 2029);
        assert_eq!(ctx.expand_two_digit_year(30), 1930);
    }

    #[test]
    fn exponent_is_case_insensitive() {
        let ctx = DecimalNumberContext::default();
        assert_eq!(ctx.match_exponent("e+5"), Some(1));
        assert_eq!(ctx.match_exponent("x"), None);
    }
}
