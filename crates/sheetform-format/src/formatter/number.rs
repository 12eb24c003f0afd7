//! Digit-placeholder number sections such as `#,##0.00`, `0%` and `##0.0E+0`.

use sheetform_common::DecimalNumberContext;

use crate::token::{FormatLeafKind, FormatParserToken};

/// What a digit placeholder prints when it has no digit of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Placeholder {
    /// `#`: nothing.
    Hash,
    /// `0`: a zero.
    Zero,
    /// `?`: a space.
    Space,
}

impl Placeholder {
    pub(crate) fn from_leaf(kind: &FormatLeafKind) -> Option<Self> {
        match kind {
            FormatLeafKind::Digit => Some(Placeholder::Hash),
            FormatLeafKind::DigitZero => Some(Placeholder::Zero),
            FormatLeafKind::DigitSpace => Some(Placeholder::Space),
            _ => None,
        }
    }

    pub(crate) fn pad(self) -> Option<char> {
        match self {
            Placeholder::Hash => None,
            Placeholder::Zero => Some('0'),
            Placeholder::Space => Some(' '),
        }
    }
}

/// Lay `digits` out over right-aligned placeholders. The leftmost placeholder
/// takes every digit that does not fit.
pub(crate) fn fill_right_aligned(digits: &str, placeholders: &[Placeholder]) -> Vec<String> {
    let digits: Vec<char> = digits.chars().collect();
    let count = placeholders.len();
    let overflow = digits.len().saturating_sub(count);
    placeholders
        .iter()
        .enumerate()
        .map(|(index, placeholder)| {
            let from_right = count - 1 - index;
            let mut out = String::new();
            if index == 0 {
                out.extend(&digits[..overflow]);
            }
            match digits.len().checked_sub(from_right + 1) {
                Some(at) => out.push(digits[at]),
                None => out.extend(placeholder.pad()),
            }
            out
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Zone {
    Integer,
    Fraction,
    Exponent,
}

#[derive(Debug, Clone, PartialEq)]
enum Item {
    Integer(usize),
    Fraction(usize),
    Exponent(usize),
    DecimalPoint,
    ExponentMarker { plus: bool },
    Percent,
    Currency,
    Literal(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumberFormatter {
    items: Vec<Item>,
    integer: Vec<Placeholder>,
    fraction: Vec<Placeholder>,
    exponent: Vec<Placeholder>,
    grouping: bool,
    /// Powers of 1000 removed by trailing group separators.
    scale: i32,
    percent: i32,
    scientific: bool,
}

impl NumberFormatter {
    pub fn compile(leaves: &[&FormatParserToken]) -> Self {
        let mut formatter = NumberFormatter {
            items: Vec::new(),
            integer: Vec::new(),
            fraction: Vec::new(),
            exponent: Vec::new(),
            grouping: false,
            scale: 0,
            percent: 0,
            scientific: false,
        };
        let mut zone = Zone::Integer;
        let mut pending_commas = 0;

        for leaf in leaves {
            let Some(kind) = leaf.leaf_kind() else {
                continue;
            };
            if let Some(placeholder) = Placeholder::from_leaf(kind) {
                match zone {
                    Zone::Integer => {
                        if pending_commas > 0 && !formatter.integer.is_empty() {
                            formatter.grouping = true;
                        }
                        pending_commas = 0;
                        formatter.items.push(Item::Integer(formatter.integer.len()));
                        formatter.integer.push(placeholder);
                    }
                    Zone::Fraction => {
                        formatter.items.push(Item::Fraction(formatter.fraction.len()));
                        formatter.fraction.push(placeholder);
                    }
                    Zone::Exponent => {
                        formatter.items.push(Item::Exponent(formatter.exponent.len()));
                        formatter.exponent.push(placeholder);
                    }
                }
                continue;
            }
            match kind {
                FormatLeafKind::DecimalPoint if zone == Zone::Integer => {
                    formatter.scale += pending_commas;
                    pending_commas = 0;
                    zone = Zone::Fraction;
                    formatter.items.push(Item::DecimalPoint);
                }
                FormatLeafKind::GroupSeparator if zone != Zone::Exponent => pending_commas += 1,
                FormatLeafKind::Exponent => {
                    formatter.scale += pending_commas;
                    pending_commas = 0;
                    zone = Zone::Exponent;
                    formatter.scientific = true;
                    formatter.items.push(Item::ExponentMarker {
                        plus: leaf.text().ends_with('+'),
                    });
                }
                FormatLeafKind::Percent => {
                    formatter.percent += 1;
                    formatter.items.push(Item::Percent);
                }
                FormatLeafKind::Currency => formatter.items.push(Item::Currency),
                FormatLeafKind::Underscore(_) => formatter.items.push(Item::Literal(" ".into())),
                FormatLeafKind::Star(_) => {}
                FormatLeafKind::DecimalPoint | FormatLeafKind::GroupSeparator => {
                    formatter.items.push(Item::Literal(leaf.text().to_string()))
                }
                other => {
                    if let Some(text) = other.literal(leaf.text()) {
                        formatter.items.push(Item::Literal(text));
                    }
                }
            }
        }
        formatter.scale += pending_commas;
        formatter
    }

    /// Exponent and mantissa for scientific sections.
    fn split_exponent(&self, value: f64) -> (f64, i32) {
        if value == 0.0 {
            return (0.0, 0);
        }
        let width = self.integer.len().max(1) as i32;
        let engineering = width > 1 && self.integer.first() == Some(&Placeholder::Hash);
        let magnitude = value.log10().floor() as i32;
        let (mut exponent, step) = if engineering {
            (magnitude.div_euclid(width) * width, width)
        } else {
            (magnitude - (width - 1), 1)
        };
        let mut mantissa = value / 10f64.powi(exponent);
        let rounded: f64 = format!("{:.*}", self.fraction.len(), mantissa)
            .parse()
            .unwrap_or(mantissa);
        if rounded >= 10f64.powi(width) {
            exponent += step;
            mantissa = value / 10f64.powi(exponent);
        }
        (mantissa, exponent)
    }

    pub fn format(&self, value: f64, context: &DecimalNumberContext) -> String {
        if !value.is_finite() {
            return value.to_string();
        }
        let negative = value < 0.0;
        let mut magnitude =
            value.abs() * 100f64.powi(self.percent) / 1000f64.powi(self.scale);
        let mut exponent = 0;
        if self.scientific {
            (magnitude, exponent) = self.split_exponent(magnitude);
        }

        let rendered = format!("{:.*}", self.fraction.len(), magnitude);
        let (whole, fraction) = rendered.split_once('.').unwrap_or((&rendered, ""));
        let whole = whole.trim_start_matches('0');

        let integer = fill_right_aligned(whole, &self.integer);
        let fraction = self.fraction_digits(fraction);
        let exponent_digits = fill_right_aligned(
            &exponent.unsigned_abs().to_string(),
            &self.exponent,
        );

        let mut remaining = integer
            .iter()
            .flat_map(|s| s.chars())
            .filter(char::is_ascii_digit)
            .count();
        let mut out = String::new();
        let mut sign_pending = negative;
        for item in &self.items {
            if sign_pending
                && matches!(item, Item::Integer(_) | Item::DecimalPoint | Item::Fraction(_))
            {
                out.push(context.negative_sign);
                sign_pending = false;
            }
            match item {
                Item::Integer(index) => {
                    for ch in integer[*index].chars() {
                        out.push(ch);
                        if ch.is_ascii_digit() {
                            remaining -= 1;
                            if self.grouping && remaining > 0 && remaining % 3 == 0 {
                                out.push(context.group_separator);
                            }
                        }
                    }
                }
                Item::DecimalPoint => {
                    if self.integer.is_empty() {
                        out.push_str(whole);
                    }
                    out.push(context.decimal_point);
                }
                Item::Fraction(index) => out.extend(fraction[*index]),
                Item::ExponentMarker { plus } => {
                    out.push_str(&context.exponent_symbol);
                    if exponent < 0 {
                        out.push(context.negative_sign);
                    } else if *plus {
                        out.push(context.positive_sign);
                    }
                }
                Item::Exponent(index) => out.push_str(&exponent_digits[*index]),
                Item::Percent => out.push(context.percent_symbol),
                Item::Currency => out.push_str(&context.currency_symbol),
                Item::Literal(text) => out.push_str(text),
            }
        }
        out
    }

    /// Fraction digits with trailing zeros dropped for `#` and blanked for `?`.
    fn fraction_digits(&self, digits: &str) -> Vec<Option<char>> {
        let mut out: Vec<Option<char>> = digits.chars().map(Some).collect();
        out.resize(self.fraction.len(), None);
        for (slot, placeholder) in out.iter_mut().zip(&self.fraction).rev() {
            if *slot != Some('0') {
                break;
            }
            match placeholder {
                Placeholder::Zero => break,
                Placeholder::Hash => *slot = None,
                Placeholder::Space => *slot = Some(' '),
            }
        }
        out
    }
}
