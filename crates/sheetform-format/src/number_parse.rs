//! Parsing numeric text against number parse patterns.
//!
//! Each `;`-separated section of a [`PatternKind::NumberParse`] pattern is a
//! candidate. A candidate is a chain of components run left to right over a
//! shared [`TextCursor`], accumulating into a [`NumberParseRequest`]. The
//! first candidate that matches wins; a failed candidate restores the cursor
//! so the next one starts from the same place.

use smallvec::SmallVec;

use sheetform_common::DecimalNumberContext;

use crate::formatter::number::Placeholder;
use crate::pattern::{PatternKind, SpreadsheetPattern};
use crate::token::{FormatLeafKind, FormatParserToken};

/// Whether a match must consume the whole text or may stop before a formula token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberParseMode {
    /// The number is the entire text.
    Value,
    /// The number is a literal inside a formula and must be followed by the
    /// end of text or a character that can start the next formula token.
    Expression,
}

/// Characters that may directly follow a number literal inside a formula.
pub fn is_expression_token_ender(c: char) -> bool {
    c.is_whitespace() || matches!(c, '+' | '-' | '*' | '/' | '^' | '&' | '=' | '<' | '>' | '%' | ')' | ',' | ';' | ':' | '}')
}

/// A position inside text with explicit snapshot and restore.
#[derive(Debug, Clone)]
pub struct TextCursor<'t> {
    text: &'t str,
    pos: usize,
}

impl<'t> TextCursor<'t> {
    pub fn new(text: &'t str, pos: usize) -> Self {
        Self { text, pos }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn rest(&self) -> &'t str {
        &self.text[self.pos..]
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    pub fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    /// Consume `prefix`, ignoring ASCII case.
    pub fn eat_str(&mut self, prefix: &str) -> bool {
        let rest = self.rest();
        let matched = rest.len() >= prefix.len()
            && rest.is_char_boundary(prefix.len())
            && rest[..prefix.len()].eq_ignore_ascii_case(prefix);
        if matched {
            self.pos += prefix.len();
        }
        matched
    }

    pub fn snapshot(&self) -> usize {
        self.pos
    }

    pub fn restore(&mut self, snapshot: usize) {
        self.pos = snapshot;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Zone {
    Integer,
    Fraction,
    Exponent,
}

type Digits = SmallVec<[u8; 24]>;

/// Everything collected while one candidate runs.
#[derive(Debug, Clone, Default)]
pub struct NumberParseRequest {
    negative: bool,
    sign_seen: bool,
    allow_sign: bool,
    integer: Digits,
    fraction: Digits,
    exponent: Digits,
    decimal_seen: bool,
    exponent_seen: bool,
    exponent_negative: bool,
    percent: i32,
}

impl NumberParseRequest {
    fn digits(&mut self, zone: Zone) -> &mut Digits {
        match zone {
            Zone::Integer => &mut self.integer,
            Zone::Fraction => &mut self.fraction,
            Zone::Exponent => &mut self.exponent,
        }
    }

    fn capture_sign(&mut self, cursor: &mut TextCursor<'_>, context: &DecimalNumberContext) {
        if !self.allow_sign || self.sign_seen {
            return;
        }
        if cursor.eat(context.negative_sign) {
            self.negative = true;
            self.sign_seen = true;
        } else if cursor.eat(context.positive_sign) {
            self.sign_seen = true;
        }
    }

    fn value(&self, scale: i32) -> Option<f64> {
        if self.integer.is_empty() && self.fraction.is_empty() {
            return None;
        }
        if self.exponent_seen && self.exponent.is_empty() {
            return None;
        }
        let mut text = String::with_capacity(self.integer.len() + self.fraction.len() + 8);
        if self.integer.is_empty() {
            text.push('0');
        }
        text.extend(self.integer.iter().map(|&b| b as char));
        if !self.fraction.is_empty() {
            text.push('.');
            text.extend(self.fraction.iter().map(|&b| b as char));
        }
        if self.exponent_seen {
            text.push('e');
            if self.exponent_negative {
                text.push('-');
            }
            text.extend(self.exponent.iter().map(|&b| b as char));
        }
        let magnitude = text.parse::<f64>().ok()? / 100f64.powi(self.percent)
            * 1000f64.powi(scale);
        Some(if self.negative { -magnitude } else { magnitude })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Component {
    Digit {
        placeholder: Placeholder,
        zone: Zone,
        /// The last digit of its zone consumes every remaining digit.
        last: bool,
    },
    DecimalPoint,
    Exponent,
    Currency,
    Percent,
    Whitespace,
    Literal(String),
}

impl Component {
    fn parse(
        &self,
        cursor: &mut TextCursor<'_>,
        request: &mut NumberParseRequest,
        grouping: bool,
        context: &DecimalNumberContext,
    ) -> Option<()> {
        match self {
            Component::Digit {
                placeholder,
                zone,
                last,
            } => {
                if *zone == Zone::Fraction && !request.decimal_seen {
                    return Some(());
                }
                if *zone == Zone::Integer && request.integer.is_empty() {
                    request.capture_sign(cursor, context);
                }
                if *last {
                    loop {
                        match cursor.peek() {
                            Some(c) if c.is_ascii_digit() => {
                                cursor.bump();
                                request.digits(*zone).push(c as u8);
                            }
                            Some(c)
                                if grouping
                                    && *zone == Zone::Integer
                                    && c == context.group_separator
                                    && !request.integer.is_empty()
                                    && cursor.rest()[c.len_utf8()..]
                                        .starts_with(|d: char| d.is_ascii_digit()) =>
                            {
                                cursor.bump();
                            }
                            _ => break,
                        }
                    }
                } else {
                    match cursor.peek() {
                        Some(c) if c.is_ascii_digit() => {
                            cursor.bump();
                            request.digits(*zone).push(c as u8);
                        }
                        Some(' ') if *placeholder == Placeholder::Space => {
                            cursor.bump();
                        }
                        _ => {}
                    }
                }
                Some(())
            }
            Component::DecimalPoint => {
                if cursor.eat(context.decimal_point) {
                    request.decimal_seen = true;
                }
                Some(())
            }
            Component::Exponent => {
                if !cursor.eat_str(&context.exponent_symbol) {
                    return None;
                }
                request.exponent_seen = true;
                if cursor.eat(context.negative_sign) {
                    request.exponent_negative = true;
                } else {
                    cursor.eat(context.positive_sign);
                }
                Some(())
            }
            Component::Currency => cursor.eat_str(&context.currency_symbol).then_some(()),
            Component::Percent => {
                cursor.eat(context.percent_symbol).then_some(())?;
                request.percent += 1;
                Some(())
            }
            Component::Whitespace => {
                while cursor.eat(' ') {}
                Some(())
            }
            Component::Literal(text) => cursor.eat_str(text).then_some(()),
        }
    }
}

/// One `;` section compiled into a component chain.
#[derive(Debug, Clone, PartialEq)]
struct Candidate {
    components: Vec<Component>,
    grouping: bool,
    /// Powers of 1000 added back for trailing group separators.
    scale: i32,
}

impl Candidate {
    fn compile(section: &FormatParserToken) -> Self {
        let mut components = Vec::new();
        let mut grouping = false;
        let mut scale = 0;
        let mut pending_commas = 0;
        let mut zone = Zone::Integer;
        let mut seen_integer_digit = false;

        for leaf in section.leaves() {
            let Some(kind) = leaf.leaf_kind() else {
                continue;
            };
            if let Some(placeholder) = Placeholder::from_leaf(kind) {
                if zone == Zone::Integer {
                    if pending_commas > 0 && seen_integer_digit {
                        grouping = true;
                    }
                    pending_commas = 0;
                    seen_integer_digit = true;
                }
                components.push(Component::Digit {
                    placeholder,
                    zone,
                    last: false,
                });
                continue;
            }
            let component = match kind {
                FormatLeafKind::DecimalPoint if zone == Zone::Integer => {
                    scale += pending_commas;
                    pending_commas = 0;
                    zone = Zone::Fraction;
                    Component::DecimalPoint
                }
                FormatLeafKind::GroupSeparator if zone != Zone::Exponent => {
                    pending_commas += 1;
                    continue;
                }
                FormatLeafKind::Exponent => {
                    scale += pending_commas;
                    pending_commas = 0;
                    zone = Zone::Exponent;
                    Component::Exponent
                }
                FormatLeafKind::Currency => Component::Currency,
                FormatLeafKind::Percent => Component::Percent,
                FormatLeafKind::Whitespace => Component::Whitespace,
                other => match other.literal(leaf.text()) {
                    Some(text) => Component::Literal(text),
                    None => Component::Literal(leaf.text().to_string()),
                },
            };
            components.push(component);
        }
        scale += pending_commas;

        for wanted in [Zone::Integer, Zone::Fraction, Zone::Exponent] {
            let last = components.iter_mut().rev().find_map(|component| match component {
                Component::Digit { zone, last, .. } if *zone == wanted => Some(last),
                _ => None,
            });
            if let Some(last) = last {
                *last = true;
            }
        }

        Candidate {
            components,
            grouping,
            scale,
        }
    }

    fn parse(
        &self,
        cursor: &mut TextCursor<'_>,
        mode: NumberParseMode,
        context: &DecimalNumberContext,
    ) -> Option<f64> {
        let mut request = NumberParseRequest {
            allow_sign: mode == NumberParseMode::Value,
            ..NumberParseRequest::default()
        };
        request.capture_sign(cursor, context);
        for component in &self.components {
            component.parse(cursor, &mut request, self.grouping, context)?;
        }
        let complete = match mode {
            NumberParseMode::Value => cursor.is_at_end(),
            NumberParseMode::Expression => cursor.peek().is_none_or(is_expression_token_ender),
        };
        if !complete {
            return None;
        }
        request.value(self.scale)
    }
}

/// A compiled [`PatternKind::NumberParse`] pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberParsePattern {
    pattern: SpreadsheetPattern,
    candidates: Vec<Candidate>,
}

impl NumberParsePattern {
    pub(crate) fn compile(pattern: &SpreadsheetPattern) -> Self {
        debug_assert_eq!(pattern.kind(), PatternKind::NumberParse);
        let candidates = pattern
            .sections()
            .into_iter()
            .flatten()
            .map(Candidate::compile)
            .collect();
        Self {
            pattern: pattern.clone(),
            candidates,
        }
    }

    pub fn pattern(&self) -> &SpreadsheetPattern {
        &self.pattern
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    /// Parse the whole of `text`.
    pub fn parse(&self, text: &str, context: &DecimalNumberContext) -> Option<f64> {
        self.parse_prefix(text, 0, NumberParseMode::Value, context)
            .map(|(value, _)| value)
    }

    /// Parse a number starting at byte `pos`, returning it with its end offset.
    pub fn parse_prefix(
        &self,
        text: &str,
        pos: usize,
        mode: NumberParseMode,
        context: &DecimalNumberContext,
    ) -> Option<(f64, usize)> {
        let mut cursor = TextCursor::new(text, pos);
        for candidate in &self.candidates {
            let snapshot = cursor.snapshot();
            if let Some(value) = candidate.parse(&mut cursor, mode, context) {
                #[cfg(feature = "tracing")]
                tracing::trace!(pattern = self.pattern.text(), value, "number parsed");
                return Some((value, cursor.pos()));
            }
            cursor.restore(snapshot);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(text: &str) -> NumberParsePattern {
        SpreadsheetPattern::parse(PatternKind::NumberParse, text)
            .unwrap()
            .number_parser()
            .unwrap()
    }

    fn parse(pattern_text: &str, text: &str) -> Option<f64> {
        pattern(pattern_text).parse(text, &DecimalNumberContext::default())
    }

    #[test]
    fn first_matching_candidate_wins() {
        assert_eq!(parse("#.##;0.00", "3.5"), Some(3.5));
        assert_eq!(pattern("#.##;0.00").candidate_count(), 2);
    }

    #[test]
    fn grouping_is_accepted_only_when_the_pattern_groups() {
        assert_eq!(parse("#,##0.#", "1,234.5"), Some(1234.5));
        assert_eq!(parse("#,##0", "12,345,678"), Some(12_345_678.0));
        assert_eq!(parse("#0", "1,234"), None);
    }

    #[test]
    fn signs_percent_and_currency() {
        assert_eq!(parse("#.#", "-2.5"), Some(-2.5));
        assert_eq!(parse("#.#", "+2"), Some(2.0));
        assert_eq!(parse("0%", "50%"), Some(0.5));
        assert_eq!(parse("$#,##0.00", "$1,000.25"), Some(1000.25));
        assert_eq!(parse("$#,##0.00", "1000.25"), None);
    }

    #[test]
    fn exponent_takes_its_own_sign() {
        assert_eq!(parse("0.0E+0", "1.5E3"), Some(1500.0));
        assert_eq!(parse("0.0E+0", "2e-2"), Some(0.02));
        assert_eq!(parse("0.0E+0", "2E"), None);
        assert_eq!(parse("0.0E+0", "2"), None);
    }

    #[test]
    fn needs_at_least_one_digit() {
        assert_eq!(parse("#.#", "."), None);
        assert_eq!(parse("#.#", ""), None);
        assert_eq!(parse("#.#", ".25"), Some(0.25));
    }

    #[test]
    fn trailing_text_fails_value_mode() {
        assert_eq!(parse("#.#", "1.5x"), None);
        assert_eq!(parse("#\" kg\"", "12 kg"), Some(12.0));
    }

    #[test]
    fn expression_mode_stops_before_operators() {
        let pattern = pattern("#.#E+#;#.#");
        let context = DecimalNumberContext::default();
        assert_eq!(
            pattern.parse_prefix("=1+2", 1, NumberParseMode::Expression, &context),
            Some((1.0, 2))
        );
        assert_eq!(
            pattern.parse_prefix("1.5E3*2", 0, NumberParseMode::Expression, &context),
            Some((1500.0, 5))
        );
        assert_eq!(
            pattern.parse_prefix("12A", 0, NumberParseMode::Expression, &context),
            None
        );
        assert_eq!(
            pattern.parse_prefix("-1", 0, NumberParseMode::Expression, &context),
            None
        );
    }

    #[test]
    fn failed_candidates_do_not_consume() {
        let mut cursor = TextCursor::new("1.5", 0);
        let snapshot = cursor.snapshot();
        cursor.bump();
        cursor.restore(snapshot);
        assert_eq!(cursor.pos(), 0);
        assert_eq!(
            pattern("0.0E+0;0.0").parse("1.5", &DecimalNumberContext::default()),
            Some(1.5)
        );
    }
}
