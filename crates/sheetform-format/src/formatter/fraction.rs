//! Fraction sections such as `# ?/?`, `?/8` and `# ??/100`.

use sheetform_common::DecimalNumberContext;

use super::general::format_general;
use super::number::{Placeholder, fill_right_aligned};
use crate::token::{FormatLeafKind, FormatParserToken};

#[derive(Debug, Clone, PartialEq)]
enum Piece {
    Literal(String),
    Currency,
}

impl Piece {
    fn render(&self, out: &mut String, context: &DecimalNumberContext) {
        match self {
            Piece::Literal(text) => out.push_str(text),
            Piece::Currency => out.push_str(&context.currency_symbol),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Zone {
    Leading,
    Whole,
    Numerator,
    Denominator,
    Trailing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FractionFormatter {
    prefix: Vec<Piece>,
    whole: Vec<Placeholder>,
    separator: String,
    numerator: Vec<Placeholder>,
    denominator: Vec<Placeholder>,
    fixed_denominator: Option<u32>,
    suffix: Vec<Piece>,
}

impl FractionFormatter {
    pub fn compile(leaves: &[&FormatParserToken]) -> Self {
        let mut formatter = FractionFormatter {
            prefix: Vec::new(),
            whole: Vec::new(),
            separator: String::new(),
            numerator: Vec::new(),
            denominator: Vec::new(),
            fixed_denominator: None,
            suffix: Vec::new(),
        };
        let mut zone = Zone::Leading;

        for leaf in leaves {
            let Some(kind) = leaf.leaf_kind() else {
                continue;
            };
            if let Some(placeholder) = Placeholder::from_leaf(kind) {
                match zone {
                    Zone::Leading | Zone::Whole => {
                        zone = Zone::Whole;
                        formatter.whole.push(placeholder);
                    }
                    Zone::Numerator => formatter.numerator.push(placeholder),
                    Zone::Denominator => formatter.denominator.push(placeholder),
                    Zone::Trailing => {}
                }
                continue;
            }
            let piece = match kind {
                FormatLeafKind::Whitespace if zone == Zone::Whole => {
                    formatter.separator.push_str(leaf.text());
                    zone = Zone::Numerator;
                    continue;
                }
                FormatLeafKind::FractionSymbol if zone != Zone::Trailing => {
                    if zone == Zone::Whole {
                        formatter.numerator = std::mem::take(&mut formatter.whole);
                    }
                    zone = Zone::Denominator;
                    continue;
                }
                FormatLeafKind::FractionDenominator(value) => {
                    formatter.fixed_denominator = Some(*value);
                    zone = Zone::Trailing;
                    continue;
                }
                FormatLeafKind::Currency => Piece::Currency,
                FormatLeafKind::Underscore(_) => Piece::Literal(" ".to_string()),
                FormatLeafKind::FractionSymbol => Piece::Literal(leaf.text().to_string()),
                other => match other.literal(leaf.text()) {
                    Some(text) => Piece::Literal(text),
                    None => continue,
                },
            };
            if zone == Zone::Leading {
                formatter.prefix.push(piece);
            } else {
                zone = Zone::Trailing;
                formatter.suffix.push(piece);
            }
        }
        formatter
    }

    fn max_denominator(&self) -> u32 {
        let digits = self.denominator.len().clamp(1, 9) as u32;
        10u32.pow(digits) - 1
    }

    pub fn format(&self, value: f64, context: &DecimalNumberContext) -> String {
        if !value.is_finite() {
            return value.to_string();
        }
        match self.parts(value.abs()) {
            Some((whole, numerator, denominator)) => {
                self.render(value, whole, numerator, denominator, context)
            }
            None => format_general(value, context),
        }
    }

    /// Whole part, numerator and denominator of `magnitude`, or `None` when
    /// they do not fit in integers.
    fn parts(&self, magnitude: f64) -> Option<(u64, u64, u64)> {
        if magnitude >= u64::MAX as f64 {
            return None;
        }
        let mut whole = magnitude.trunc() as u64;
        let part = magnitude.fract();

        let (mut numerator, denominator) = match self.fixed_denominator {
            Some(fixed) => ((part * fixed as f64).round() as u64, fixed as u64),
            None => best_fraction(part, self.max_denominator()),
        };
        if numerator == denominator {
            whole = whole.checked_add(1)?;
            numerator = 0;
        }
        if self.whole.is_empty() {
            numerator = whole.checked_mul(denominator)?.checked_add(numerator)?;
            whole = 0;
        }
        Some((whole, numerator, denominator))
    }

    fn render(
        &self,
        value: f64,
        whole: u64,
        numerator: u64,
        denominator: u64,
        context: &DecimalNumberContext,
    ) -> String {
        let mut out = String::new();
        if value < 0.0 && (whole > 0 || numerator > 0) {
            out.push(context.negative_sign);
        }
        for piece in &self.prefix {
            piece.render(&mut out, context);
        }

        let show_fraction = numerator > 0 || self.whole.is_empty();
        if !self.whole.is_empty() && (whole > 0 || !show_fraction) {
            let digits = if whole == 0 {
                "0".to_string()
            } else {
                whole.to_string()
            };
            out.extend(fill_right_aligned(&digits, &self.whole));
            if show_fraction {
                out.push_str(&self.separator);
            }
        }
        if show_fraction {
            out.extend(fill_right_aligned(&numerator.to_string(), &self.numerator));
            out.push('/');
            let rendered = denominator.to_string();
            out.push_str(&rendered);
            if self.fixed_denominator.is_none() {
                for placeholder in self.denominator.iter().skip(rendered.len()) {
                    out.extend(placeholder.pad().map(|_| ' '));
                }
            }
        }

        for piece in &self.suffix {
            piece.render(&mut out, context);
        }
        out
    }
}

/// Closest fraction to `value` in `[0, 1)` with a denominator of at most
/// `max_denominator`, from its continued fraction expansion.
fn best_fraction(value: f64, max_denominator: u32) -> (u64, u64) {
    if value <= 0.0 {
        return (0, 1);
    }
    let max_denominator = u64::from(max_denominator.max(1));
    // The last two convergents, p0/q0 then p1/q1.
    let (mut p0, mut q0, mut p1, mut q1) = (0u64, 1u64, 1u64, 0u64);
    let mut rest = value;

    loop {
        let term = rest.floor().min((max_denominator + 1) as f64) as u64;
        let q2 = q0 + term * q1;
        if q2 > max_denominator {
            break;
        }
        (p0, q0, p1, q1) = (p1, q1, p0 + term * p1, q2);
        let fract = rest - rest.floor();
        if fract < 1e-12 || (p1 as f64 / q1 as f64 - value).abs() < value * 1e-12 {
            break;
        }
        rest = 1.0 / fract;
    }

    // Largest semiconvergent that still fits the bound.
    let k = (max_denominator - q0) / q1;
    let semi = (p0 + k * p1, q0 + k * q1);
    let semi_err = (semi.0 as f64 / semi.1 as f64 - value).abs();
    let last_err = (p1 as f64 / q1 as f64 - value).abs();
    if last_err <= semi_err { (p1, q1) } else { semi }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::FormatterContext;
    use crate::pattern::{PatternKind, SpreadsheetPattern};
    use sheetform_common::LiteralValue;

    fn format(pattern: &str, value: f64) -> String {
        SpreadsheetPattern::parse(PatternKind::NumberFormat, pattern)
            .unwrap()
            .formatter()
            .unwrap()
            .format(&LiteralValue::Number(value), &FormatterContext::default())
            .unwrap()
            .text
    }

    #[test]
    fn continued_fractions_find_close_fractions() {
        assert_eq!(best_fraction(0.5, 9), (1, 2));
        assert_eq!(best_fraction(0.333, 9), (1, 3));
        assert_eq!(best_fraction(0.3125, 99), (5, 16));
        assert_eq!(best_fraction(0.0, 9), (0, 1));
        assert_eq!(best_fraction(0.7, 9), (5, 7));
        assert_eq!(best_fraction(std::f64::consts::PI - 3.0, 999), (16, 113));
    }

    #[test]
    fn nine_digit_denominators_with_tiny_values() {
        assert_eq!(best_fraction(1.0 / 700_000_000.0, 999_999_999), (1, 700_000_000));
        assert_eq!(best_fraction(1e-12, 9), (0, 1));
        let (n, d) = best_fraction(0.123_456_789, 999_999_999);
        assert!(d <= 999_999_999);
        assert!((n as f64 / d as f64 - 0.123_456_789).abs() < 1e-9);
    }

    #[test]
    fn magnitudes_beyond_integer_range_fall_back_to_general() {
        let general = |value: f64| format_general(value, &FormatterContext::default().number);
        assert_eq!(format("?/4", 1e19), general(1e19));
        assert_eq!(format("# ?/?", f64::MAX), general(f64::MAX));
        assert_eq!(format("# ?/4", 1e18), "1000000000000000000");
    }

    #[test]
    fn mixed_fractions() {
        assert_eq!(format("# ?/?", 1.5), "1 1/2");
        assert_eq!(format("# ?/?", 0.25), "1/4");
        assert_eq!(format("# ?/?", 3.0), "3");
        assert_eq!(format("# ?/?", -2.75), "-2 3/4");
        assert_eq!(format("# ??/??", 0.3125), " 5/16");
    }

    #[test]
    fn improper_and_fixed_denominators() {
        assert_eq!(format("?/?", 1.5), "3/2");
        assert_eq!(format("# ?/8", 2.26), "2 2/8");
        assert_eq!(format("# ?/8", 0.99), "1");
    }
}
