//! The format pattern grammar.
//!
//! Primitive scanners are registered by name, the embedded EBNF in
//! `format.grammar` is read against them, and the result is interpreted
//! directly: each rule walks the input with ordered choice, producing
//! [`FormatParserToken`]s. The loaded grammar is a process-wide singleton.

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

use crate::ebnf::{Expr, ExprId, Grammar, RuleId};
use crate::error::{FormatParseError, GrammarError};
use crate::token::{
    ConditionOp, FormatColor, FormatLeafKind, FormatParentKind, FormatParserToken,
};

const GRAMMAR_SOURCE: &str = include_str!("format.grammar");

/// Characters that may appear unquoted as literal text.
const TEXT_LITERAL_CHARS: &str = "$-+/():!^&'~{}<>=";

static FORMAT_GRAMMAR: Lazy<FormatGrammar> = Lazy::new(|| {
    FormatGrammar::load(GRAMMAR_SOURCE)
        .unwrap_or_else(|err| panic!("embedded format grammar is invalid: {err}"))
});

/// Parsers available from the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatParserKind {
    Color,
    Condition,
    Date,
    DateTime,
    General,
    Number,
    Text,
    Time,
    Expression,
    Fraction,
    ExpressionSeparator,
}

impl FormatParserKind {
    fn rule_name(self) -> &'static str {
        match self {
            FormatParserKind::Color => "COLOR",
            FormatParserKind::Condition => "CONDITION",
            FormatParserKind::Date => "DATE",
            FormatParserKind::DateTime => "DATE_TIME",
            FormatParserKind::General => "GENERAL",
            FormatParserKind::Number => "NUMBER",
            FormatParserKind::Text => "TEXT",
            FormatParserKind::Time => "TIME",
            FormatParserKind::Fraction => "FRACTION",
            FormatParserKind::ExpressionSeparator => "EXPRESSION_SEPARATOR",
            // Built from the section rules rather than a rule of its own.
            FormatParserKind::Expression => "",
        }
    }
}

/// Sections tried, in order, by the [`FormatParserKind::Expression`] parser.
pub const EXPRESSION_SECTIONS: [FormatParserKind; 5] = [
    FormatParserKind::General,
    FormatParserKind::Fraction,
    FormatParserKind::Number,
    FormatParserKind::DateTime,
    FormatParserKind::Text,
];

const SECTION_RULES: [FormatParserKind; 10] = [
    FormatParserKind::Color,
    FormatParserKind::Condition,
    FormatParserKind::Date,
    FormatParserKind::DateTime,
    FormatParserKind::General,
    FormatParserKind::Number,
    FormatParserKind::Text,
    FormatParserKind::Time,
    FormatParserKind::Fraction,
    FormatParserKind::ExpressionSeparator,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Primitive {
    BracketOpen,
    BracketClose,
    Whitespace,
    ColorNumber,
    ColorName,
    ConditionSymbol,
    ConditionNumber,
    QuotedText,
    Escape,
    Star,
    Underscore,
    TextLiteral,
    GeneralSymbol,
    Digit,
    DigitZero,
    DigitSpace,
    DecimalPoint,
    GroupSeparator,
    Percent,
    Currency,
    Exponent,
    TextPlaceholder,
    FractionSymbol,
    FractionDenominator,
    Day,
    Month,
    MonthOrMinute,
    Year,
    Hour,
    Second,
    AmPm,
    Separator,
}

fn primitive_table() -> FxHashMap<&'static str, Primitive> {
    use Primitive::*;
    [
        ("BRACKET_OPEN", BracketOpen),
        ("BRACKET_CLOSE", BracketClose),
        ("WHITESPACE", Whitespace),
        ("COLOR_NUMBER", ColorNumber),
        ("COLOR_NAME", ColorName),
        ("CONDITION_SYMBOL", ConditionSymbol),
        ("CONDITION_NUMBER", ConditionNumber),
        ("QUOTED_TEXT", QuotedText),
        ("ESCAPE", Escape),
        ("STAR", Star),
        ("UNDERSCORE", Underscore),
        ("TEXT_LITERAL", TextLiteral),
        ("GENERAL_SYMBOL", GeneralSymbol),
        ("DIGIT", Digit),
        ("DIGIT_ZERO", DigitZero),
        ("DIGIT_SPACE", DigitSpace),
        ("DECIMAL_POINT", DecimalPoint),
        ("GROUP_SEPARATOR", GroupSeparator),
        ("PERCENT", Percent),
        ("CURRENCY", Currency),
        ("EXPONENT", Exponent),
        ("TEXT_PLACEHOLDER", TextPlaceholder),
        ("FRACTION_SYMBOL", FractionSymbol),
        ("FRACTION_DENOMINATOR", FractionDenominator),
        ("DAY", Day),
        ("MONTH", Month),
        ("MONTH_OR_MINUTE", MonthOrMinute),
        ("YEAR", Year),
        ("HOUR", Hour),
        ("SECOND", Second),
        ("AMPM", AmPm),
        ("SEPARATOR", Separator),
    ]
    .into_iter()
    .collect()
}

impl Primitive {
    /// Match at byte `pos`, returning the leaf kind and the end offset.
    fn scan(self, text: &str, pos: usize) -> Option<(FormatLeafKind, usize)> {
        let rest = &text[pos..];
        let first = rest.chars().next()?;
        let single = |expected: char, kind: FormatLeafKind| {
            (first == expected).then_some((kind, pos + expected.len_utf8()))
        };
        match self {
            Primitive::BracketOpen => single('[', FormatLeafKind::BracketOpen),
            Primitive::BracketClose => single(']', FormatLeafKind::BracketClose),
            Primitive::Digit => single('#', FormatLeafKind::Digit),
            Primitive::DigitZero => single('0', FormatLeafKind::DigitZero),
            Primitive::DigitSpace => single('?', FormatLeafKind::DigitSpace),
            Primitive::DecimalPoint => single('.', FormatLeafKind::DecimalPoint),
            Primitive::GroupSeparator => single(',', FormatLeafKind::GroupSeparator),
            Primitive::Percent => single('%', FormatLeafKind::Percent),
            Primitive::Currency => single('$', FormatLeafKind::Currency),
            Primitive::TextPlaceholder => single('@', FormatLeafKind::TextPlaceholder),
            Primitive::FractionSymbol => single('/', FormatLeafKind::FractionSymbol),
            Primitive::Separator => single(';', FormatLeafKind::Separator),
            Primitive::Whitespace => {
                let len = rest.len() - rest.trim_start_matches(' ').len();
                (len > 0).then_some((FormatLeafKind::Whitespace, pos + len))
            }
            Primitive::TextLiteral => TEXT_LITERAL_CHARS.contains(first).then(|| {
                (
                    FormatLeafKind::TextLiteral(first.to_string()),
                    pos + first.len_utf8(),
                )
            }),
            Primitive::QuotedText => {
                let inner = rest.strip_prefix('"')?;
                let len = inner.find('"')?;
                Some((
                    FormatLeafKind::QuotedText(inner[..len].to_string()),
                    pos + len + 2,
                ))
            }
            Primitive::Escape => marked(rest, pos, '\\').map(|(ch, end)| (FormatLeafKind::Escape(ch), end)),
            Primitive::Star => marked(rest, pos, '*').map(|(ch, end)| (FormatLeafKind::Star(ch), end)),
            Primitive::Underscore => {
                marked(rest, pos, '_').map(|(ch, end)| (FormatLeafKind::Underscore(ch), end))
            }
            Primitive::GeneralSymbol => {
                starts_with_ignore_case(rest, "General").then_some((FormatLeafKind::General, pos + 7))
            }
            Primitive::Exponent => {
                let bytes = rest.as_bytes();
                (bytes.len() >= 2
                    && matches!(bytes[0], b'E' | b'e')
                    && matches!(bytes[1], b'+' | b'-'))
                .then_some((FormatLeafKind::Exponent, pos + 2))
            }
            Primitive::FractionDenominator => {
                let len = rest.bytes().take_while(u8::is_ascii_digit).count();
                if len == 0 || rest.starts_with('0') {
                    return None;
                }
                let value = rest[..len].parse().ok()?;
                Some((FormatLeafKind::FractionDenominator(value), pos + len))
            }
            Primitive::ConditionSymbol => ConditionOp::scan(rest)
                .map(|(op, len)| (FormatLeafKind::ConditionSymbol(op), pos + len)),
            Primitive::ConditionNumber => {
                let bytes = rest.as_bytes();
                let mut len = usize::from(bytes.first() == Some(&b'-'));
                let digits_start = len;
                while bytes.get(len).is_some_and(u8::is_ascii_digit) {
                    len += 1;
                }
                if bytes.get(len) == Some(&b'.') {
                    len += 1;
                    while bytes.get(len).is_some_and(u8::is_ascii_digit) {
                        len += 1;
                    }
                }
                if len == digits_start {
                    return None;
                }
                let value = rest[..len].parse().ok()?;
                Some((FormatLeafKind::ConditionNumber(value), pos + len))
            }
            Primitive::ColorNumber => {
                if !starts_with_ignore_case(rest, "Color") {
                    return None;
                }
                let digits = rest[5..].bytes().take_while(u8::is_ascii_digit).count();
                let value: u32 = rest[5..5 + digits].parse().ok()?;
                (1..=FormatColor::MAX_NUMBER)
                    .contains(&value)
                    .then_some((FormatLeafKind::ColorNumber(value), pos + 5 + digits))
            }
            Primitive::ColorName => FormatColor::NAMED.into_iter().find_map(|color| {
                let name = color.name()?;
                starts_with_ignore_case(rest, name)
                    .then_some((FormatLeafKind::ColorName(color), pos + name.len()))
            }),
            Primitive::Day => repeated(rest, pos, 'd').map(|(n, end)| (FormatLeafKind::Day(n), end)),
            Primitive::Month => {
                repeated(rest, pos, 'm').map(|(n, end)| (FormatLeafKind::Month(n), end))
            }
            Primitive::MonthOrMinute => {
                repeated(rest, pos, 'm').map(|(n, end)| (FormatLeafKind::MonthOrMinute(n), end))
            }
            Primitive::Year => repeated(rest, pos, 'y').map(|(n, end)| (FormatLeafKind::Year(n), end)),
            Primitive::Hour => repeated(rest, pos, 'h').map(|(n, end)| (FormatLeafKind::Hour(n), end)),
            Primitive::Second => {
                repeated(rest, pos, 's').map(|(n, end)| (FormatLeafKind::Second(n), end))
            }
            Primitive::AmPm => ["AM/PM", "A/P"].into_iter().find_map(|marker| {
                starts_with_ignore_case(rest, marker)
                    .then_some((FormatLeafKind::AmPm, pos + marker.len()))
            }),
        }
    }
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.len() >= prefix.len()
        && text.is_char_boundary(prefix.len())
        && text[..prefix.len()].eq_ignore_ascii_case(prefix)
}

/// `letter` repeated one or more times, ignoring case.
fn repeated(text: &str, pos: usize, letter: char) -> Option<(usize, usize)> {
    let count = text
        .bytes()
        .take_while(|b| b.eq_ignore_ascii_case(&(letter as u8)))
        .count();
    (count > 0).then_some((count, pos + count))
}

/// A marker character followed by exactly one character of payload.
fn marked(text: &str, pos: usize, marker: char) -> Option<(char, usize)> {
    let mut chars = text.chars();
    if chars.next()? != marker {
        return None;
    }
    let payload = chars.next()?;
    Some((payload, pos + marker.len_utf8() + payload.len_utf8()))
}

/// How a rule's output is attached to the tree.
#[derive(Debug, Clone, Copy)]
enum Shape {
    Parent(FormatParentKind),
    Condition,
}

fn shape_for(rule: &str) -> Option<Shape> {
    Some(match rule {
        "COLOR" => Shape::Parent(FormatParentKind::Color),
        "CONDITION" => Shape::Condition,
        "DATE" => Shape::Parent(FormatParentKind::Date),
        "DATE_TIME" => Shape::Parent(FormatParentKind::DateTime),
        "TIME" => Shape::Parent(FormatParentKind::Time),
        "NUMBER" => Shape::Parent(FormatParentKind::Number),
        "FRACTION" => Shape::Parent(FormatParentKind::Fraction),
        "TEXT" => Shape::Parent(FormatParentKind::Text),
        "GENERAL" => Shape::Parent(FormatParentKind::General),
        _ => return None,
    })
}

/// Walk state shared by one parse attempt.
struct Scan<'t> {
    text: &'t str,
    /// Furthest byte offset any terminal reached, for error reporting.
    furthest: usize,
}

/// The loaded grammar and its named parsers.
#[derive(Debug)]
pub struct FormatGrammar {
    grammar: Grammar<Primitive>,
    shapes: FxHashMap<RuleId, Shape>,
    parsers: FxHashMap<FormatParserKind, RuleId>,
}

impl FormatGrammar {
    /// The grammar built from the embedded source, loaded on first use.
    pub fn get() -> &'static FormatGrammar {
        &FORMAT_GRAMMAR
    }

    /// Build a grammar from EBNF `source` using the registered primitives.
    pub fn load(source: &str) -> Result<Self, GrammarError> {
        let primitives = primitive_table();
        let grammar = Grammar::parse(source, |name| primitives.get(name).copied())?;

        let shapes = grammar
            .rules()
            .iter()
            .enumerate()
            .filter_map(|(index, rule)| {
                shape_for(&rule.name).map(|shape| (RuleId(index as u32), shape))
            })
            .collect();

        let mut parsers = FxHashMap::default();
        for kind in SECTION_RULES {
            let name = kind.rule_name();
            let id = grammar
                .rule(name)
                .ok_or_else(|| GrammarError::MissingRule(name.to_string()))?;
            parsers.insert(kind, id);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(rules = grammar.rules().len(), "format grammar loaded");

        Ok(FormatGrammar {
            grammar,
            shapes,
            parsers,
        })
    }

    pub fn parser(&self, kind: FormatParserKind) -> FormatParser<'_> {
        FormatParser {
            grammar: self,
            kind,
        }
    }

    /// Parse `;`-separated sections, each matching one of `alternatives`.
    ///
    /// An alternative is only accepted when it ends at a separator or at the
    /// end of the text, so a section that merely prefixes the input falls
    /// through to the next alternative. Empty sections are allowed and
    /// produce no token.
    pub fn parse_sections(
        &self,
        text: &str,
        alternatives: &[FormatParserKind],
    ) -> Result<FormatParserToken, FormatParseError> {
        if text.is_empty() {
            return Err(FormatParseError::Empty);
        }
        let mut scan = Scan { text, furthest: 0 };
        let separator = self.parsers[&FormatParserKind::ExpressionSeparator];
        let at_boundary = |end: usize| end == text.len() || text[end..].starts_with(';');

        let mut children = Vec::new();
        let mut pos = 0;
        loop {
            if !at_boundary(pos) {
                let section = alternatives.iter().find_map(|kind| {
                    let (token, end) = self.parse_rule(*kind, &mut scan, pos)?;
                    at_boundary(end).then_some((token, end))
                });
                let Some((token, end)) = section else {
                    return Err(FormatParseError::at(text, scan.furthest.max(pos)));
                };
                children.push(token);
                pos = end;
            }
            if pos == text.len() {
                break;
            }
            let mut out = Vec::new();
            pos = self
                .eval_rule(separator, &mut scan, pos, &mut out)
                .ok_or_else(|| FormatParseError::at(text, pos))?;
            children.extend(out);
        }
        FormatParserToken::parent(FormatParentKind::Expression, children)
    }

    fn parse_rule(
        &self,
        kind: FormatParserKind,
        scan: &mut Scan<'_>,
        pos: usize,
    ) -> Option<(FormatParserToken, usize)> {
        let rule = *self.parsers.get(&kind)?;
        let mut out = Vec::new();
        let end = self.eval_rule(rule, scan, pos, &mut out)?;
        match <[FormatParserToken; 1]>::try_from(out) {
            Ok([token]) => Some((token, end)),
            Err(_) => None,
        }
    }

    fn eval_rule(
        &self,
        rule: RuleId,
        scan: &mut Scan<'_>,
        pos: usize,
        out: &mut Vec<FormatParserToken>,
    ) -> Option<usize> {
        let body = self.grammar.get_rule(rule).body;
        let Some(shape) = self.shapes.get(&rule) else {
            return self.eval(body, scan, pos, out);
        };
        let mut children = Vec::new();
        let end = self.eval(body, scan, pos, &mut children)?;
        let kind = match shape {
            Shape::Parent(kind) => *kind,
            Shape::Condition => FormatParentKind::Condition(children.iter().find_map(|child| {
                match child.leaf_kind() {
                    Some(FormatLeafKind::ConditionSymbol(op)) => Some(*op),
                    _ => None,
                }
            })?),
        };
        out.push(FormatParserToken::parent(kind, children).ok()?);
        Some(end)
    }

    fn eval(
        &self,
        expr: ExprId,
        scan: &mut Scan<'_>,
        pos: usize,
        out: &mut Vec<FormatParserToken>,
    ) -> Option<usize> {
        let mark = out.len();
        let result = match self.grammar.get_expr(expr) {
            Expr::Literal(literal) => scan.text[pos..].starts_with(literal.as_str()).then(|| {
                out.push(FormatParserToken::Leaf {
                    kind: FormatLeafKind::TextLiteral(literal.clone()),
                    text: literal.clone(),
                });
                pos + literal.len()
            }),
            Expr::Terminal(primitive) => primitive.scan(scan.text, pos).map(|(kind, end)| {
                out.push(FormatParserToken::Leaf {
                    kind,
                    text: scan.text[pos..end].to_string(),
                });
                end
            }),
            Expr::Rule(rule) => self.eval_rule(*rule, scan, pos, out),
            Expr::Sequence(items) => items
                .iter()
                .try_fold(pos, |at, item| self.eval(*item, scan, at, out)),
            Expr::Choice(alternatives) => alternatives
                .iter()
                .find_map(|alternative| self.eval(*alternative, scan, pos, out)),
            Expr::Optional(inner) => Some(self.eval(*inner, scan, pos, out).unwrap_or(pos)),
            Expr::Repeat(inner) => {
                let mut at = pos;
                while let Some(next) = self.eval(*inner, scan, at, out) {
                    if next == at {
                        break;
                    }
                    at = next;
                }
                Some(at)
            }
        };
        match result {
            Some(end) => scan.furthest = scan.furthest.max(end),
            None => out.truncate(mark),
        }
        result
    }
}

/// A parser for one [`FormatParserKind`].
#[derive(Debug, Clone, Copy)]
pub struct FormatParser<'g> {
    grammar: &'g FormatGrammar,
    kind: FormatParserKind,
}

impl FormatParser<'_> {
    pub fn kind(&self) -> FormatParserKind {
        self.kind
    }

    /// Match a prefix of `text` starting at byte `pos`.
    pub fn parse_prefix(&self, text: &str, pos: usize) -> Option<(FormatParserToken, usize)> {
        if self.kind == FormatParserKind::Expression {
            let end = text[pos..].find(';').map_or(text.len(), |i| pos + i);
            let mut scan = Scan { text, furthest: pos };
            return EXPRESSION_SECTIONS.iter().find_map(|kind| {
                let (token, at) = self.grammar.parse_rule(*kind, &mut scan, pos)?;
                (at == end).then_some((token, at))
            });
        }
        let mut scan = Scan { text, furthest: pos };
        self.grammar.parse_rule(self.kind, &mut scan, pos)
    }

    /// Parse all of `text`. The expression parser accepts several sections.
    pub fn parse(&self, text: &str) -> Result<FormatParserToken, FormatParseError> {
        if self.kind == FormatParserKind::Expression {
            return self.grammar.parse_sections(text, &EXPRESSION_SECTIONS);
        }
        if text.is_empty() {
            return Err(FormatParseError::Empty);
        }
        let mut scan = Scan { text, furthest: 0 };
        match self.grammar.parse_rule(self.kind, &mut scan, 0) {
            Some((token, end)) if end == text.len() => Ok(token),
            Some((_, end)) => Err(FormatParseError::at(text, end)),
            None => Err(FormatParseError::at(text, scan.furthest)),
        }
    }
}
