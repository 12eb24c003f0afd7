use sheetform_common::{CellReference, ExcelErrorKind, LabelName};
use sheetform_format::NumberParseMode;

use crate::context::ParserContext;
use crate::error::TokenizerError;
use crate::token::{ParserLeafKind, SpreadsheetParserToken, SymbolKind};

/// Splits formula text into leaf tokens, keeping whitespace.
///
/// Parentheses are checked for balance here so the parser only ever sees
/// well-nested groups.
pub struct Tokenizer<'c> {
    formula: String,
    pub items: Vec<SpreadsheetParserToken>,
    /// Byte offset of each item in `formula`.
    pub starts: Vec<usize>,
    context: &'c ParserContext,
    open_parens: Vec<usize>,
    offset: usize,
}

impl<'c> Tokenizer<'c> {
    /// Create a new tokenizer and immediately tokenize the formula.
    pub fn new(formula: &str, context: &'c ParserContext) -> Result<Self, TokenizerError> {
        let mut tokenizer = Tokenizer {
            formula: formula.to_string(),
            items: Vec::with_capacity(formula.len() / 2),
            starts: Vec::with_capacity(formula.len() / 2),
            context,
            open_parens: Vec::new(),
            offset: 0,
        };
        tokenizer.parse()?;
        Ok(tokenizer)
    }

    #[inline]
    fn rest(&self) -> &str {
        &self.formula[self.offset..]
    }

    fn push(&mut self, kind: ParserLeafKind, end: usize) {
        self.items.push(SpreadsheetParserToken::Leaf {
            kind,
            text: self.formula[self.offset..end].to_string(),
        });
        self.starts.push(self.offset);
        self.offset = end;
    }

    fn parse(&mut self) -> Result<(), TokenizerError> {
        let decimal_point = self.context.decimal_number().decimal_point;
        while let Some(c) = self.rest().chars().next() {
            match c {
                '"' => self.parse_string()?,
                '#' => self.parse_error()?,
                c if c.is_whitespace() => self.parse_whitespace(),
                c if c.is_ascii_digit() || c == decimal_point => self.parse_number()?,
                c if c == '$' || LabelName::is_start(c) => self.parse_name()?,
                _ => self.parse_symbol()?,
            }
        }

        if let Some(&pos) = self.open_parens.last() {
            return Err(TokenizerError::new("Unmatched opening parenthesis", pos));
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(formula = %self.formula, tokens = self.items.len(), "tokenized");

        Ok(())
    }

    /// Parse a double-quoted text literal where `""` stands for one quote.
    fn parse_string(&mut self) -> Result<(), TokenizerError> {
        let bytes = self.formula.as_bytes();
        let mut value = String::new();
        let mut i = self.offset + 1;
        let mut run = i;
        while i < bytes.len() {
            if bytes[i] == b'"' {
                value.push_str(&self.formula[run..i]);
                if bytes.get(i + 1) == Some(&b'"') {
                    value.push('"');
                    i += 2;
                    run = i;
                    continue;
                }
                self.push(ParserLeafKind::Text(value), i + 1);
                return Ok(());
            }
            i += 1;
        }
        Err(TokenizerError::new(
            "Reached end of formula while parsing string",
            self.offset,
        ))
    }

    fn parse_error(&mut self) -> Result<(), TokenizerError> {
        match ExcelErrorKind::prefix_of(self.rest()) {
            Some(kind) => {
                let end = self.offset + kind.text().len();
                self.push(ParserLeafKind::Error(kind), end);
                Ok(())
            }
            None => Err(TokenizerError::new(
                format!("Invalid error code at position {}", self.offset),
                self.offset,
            )),
        }
    }

    fn parse_whitespace(&mut self) {
        let len = self
            .rest()
            .find(|c: char| !c.is_whitespace())
            .unwrap_or(self.rest().len());
        self.push(ParserLeafKind::Whitespace, self.offset + len);
    }

    fn parse_number(&mut self) -> Result<(), TokenizerError> {
        let context = self.context;
        match context.number_literal().parse_prefix(
            &self.formula,
            self.offset,
            NumberParseMode::Expression,
            context.decimal_number(),
        ) {
            Some((value, end)) => {
                self.push(ParserLeafKind::Number(value), end);
                Ok(())
            }
            None => Err(TokenizerError::new(
                format!("Invalid number at position {}", self.offset),
                self.offset,
            )),
        }
    }

    /// Cell references, function names, booleans and labels.
    fn parse_name(&mut self) -> Result<(), TokenizerError> {
        let continues_name =
            |c: Option<char>| c.is_some_and(|c| LabelName::is_part(c) || c == '(');

        if let Ok(Some((cell, end))) = CellReference::scan(&self.formula, self.offset) {
            if !continues_name(self.formula[end..].chars().next()) {
                self.push(ParserLeafKind::CellReference(cell), end);
                return Ok(());
            }
        }

        let rest = self.rest();
        let len = rest
            .char_indices()
            .skip(1)
            .find(|&(_, c)| !LabelName::is_part(c))
            .map_or(rest.len(), |(i, _)| i);
        let name = &rest[..len];
        let end = self.offset + len;

        if name.starts_with('$') {
            return Err(TokenizerError::new(
                format!("Invalid reference {name:?}"),
                self.offset,
            ));
        }
        if rest[len..].starts_with('(') {
            let name = name.to_string();
            self.push(ParserLeafKind::FunctionName(name), end);
            return Ok(());
        }
        if name.eq_ignore_ascii_case("TRUE") {
            self.push(ParserLeafKind::Boolean(true), end);
            return Ok(());
        }
        if name.eq_ignore_ascii_case("FALSE") {
            self.push(ParserLeafKind::Boolean(false), end);
            return Ok(());
        }
        match LabelName::new(name) {
            Ok(label) => {
                self.push(ParserLeafKind::Label(label), end);
                Ok(())
            }
            Err(err) => Err(TokenizerError::new(err.to_string(), self.offset)),
        }
    }

    fn parse_symbol(&mut self) -> Result<(), TokenizerError> {
        let Some((symbol, len)) = SymbolKind::scan(self.rest()) else {
            let ch = self.rest().chars().next().unwrap_or('\0');
            return Err(TokenizerError::new(
                format!("Unexpected character {ch:?} at position {}", self.offset),
                self.offset,
            ));
        };
        match symbol {
            SymbolKind::ParenthesisOpen => self.open_parens.push(self.offset),
            SymbolKind::ParenthesisClose => {
                if self.open_parens.pop().is_none() {
                    return Err(TokenizerError::new(
                        format!("No matching opener for closer at position {}", self.offset),
                        self.offset,
                    ));
                }
            }
            _ => {}
        }
        self.push(ParserLeafKind::Symbol(symbol), self.offset + len);
        Ok(())
    }

    /// Reconstruct the formula from the tokens.
    pub fn render(&self) -> String {
        self.items.iter().map(SpreadsheetParserToken::text).collect()
    }
}
