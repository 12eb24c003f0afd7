use sheetform_common::DecimalNumberContext;

use crate::token::{FormatLeafKind, FormatParserToken};

/// Largest magnitude printed without an exponent.
const GENERAL_MAX: f64 = 1e11;
/// Smallest non-zero magnitude printed without an exponent.
const GENERAL_MIN: f64 = 1e-9;
/// Significant digits kept in plain notation.
const GENERAL_DIGITS: i32 = 10;

/// The `General` number display.
pub fn format_general(value: f64, context: &DecimalNumberContext) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let magnitude = value.abs();
    let plain = if value.fract() == 0.0 && magnitude < GENERAL_MAX {
        format!("{}", magnitude as i64)
    } else if magnitude >= GENERAL_MAX || magnitude < GENERAL_MIN {
        let exponent = magnitude.log10().floor() as i32;
        let mut mantissa = magnitude / 10f64.powi(exponent);
        let mut exponent = exponent;
        let mut rendered = format!("{mantissa:.5}");
        if rendered.starts_with("10") {
            mantissa /= 10.0;
            exponent += 1;
            rendered = format!("{mantissa:.5}");
        }
        let rendered = trim_fraction(&rendered);
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}{}{}{:02}",
            rendered.replace('.', &context.decimal_point.to_string()),
            context.exponent_symbol,
            sign,
            exponent.unsigned_abs()
        )
    } else {
        let whole_digits = (magnitude.log10().floor() as i32 + 1).max(1);
        let decimals = (GENERAL_DIGITS - whole_digits).clamp(0, GENERAL_DIGITS) as usize;
        trim_fraction(&format!("{magnitude:.decimals$}"))
            .replace('.', &context.decimal_point.to_string())
    };

    if value < 0.0 {
        format!("{}{plain}", context.negative_sign)
    } else {
        plain
    }
}

fn trim_fraction(text: &str) -> String {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text.to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Piece {
    General,
    Literal(String),
}

/// A `General` section, possibly wrapped in literal text.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneralFormatter {
    pieces: Vec<Piece>,
}

impl GeneralFormatter {
    pub fn compile(leaves: &[&FormatParserToken]) -> Self {
        let pieces = leaves
            .iter()
            .filter_map(|leaf| match leaf.leaf_kind()? {
                FormatLeafKind::General => Some(Piece::General),
                FormatLeafKind::Underscore(_) => Some(Piece::Literal(" ".to_string())),
                kind => kind.literal(leaf.text()).map(Piece::Literal),
            })
            .collect();
        Self { pieces }
    }

    pub fn format(&self, value: f64, context: &DecimalNumberContext) -> String {
        self.pieces
            .iter()
            .map(|piece| match piece {
                Piece::General => format_general(value, context),
                Piece::Literal(text) => text.clone(),
            })
            .collect()
    }
}
