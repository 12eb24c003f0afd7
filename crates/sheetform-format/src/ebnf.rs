//! A small EBNF reader.
//!
//! Supported notation:
//!
//! ```text
//! NAME = alternative | alternative ;     (* a rule *)
//! a , b                                   sequence
//! [ a ]                                   optional
//! { a }                                   zero or more
//! ( a )                                   grouping
//! "text"                                  literal
//! ```
//!
//! Names that are not defined as rules are handed to a resolver which turns
//! them into caller-defined terminals. Expressions live in a flat arena and
//! are referenced by [`ExprId`].

use rustc_hash::FxHashMap;

use crate::error::GrammarError;

/// Index into the grammar's rule list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleId(pub u32);

/// Index into the grammar's expression arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub enum Expr<T> {
    Literal(String),
    Rule(RuleId),
    Terminal(T),
    Sequence(Vec<ExprId>),
    Choice(Vec<ExprId>),
    Optional(ExprId),
    Repeat(ExprId),
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub body: ExprId,
}

/// An immutable grammar with terminals of type `T`.
#[derive(Debug, Clone)]
pub struct Grammar<T> {
    rules: Vec<Rule>,
    exprs: Vec<Expr<T>>,
    names: FxHashMap<String, RuleId>,
}

impl<T> Grammar<T> {
    /// Parse `source`, resolving names without a rule through `terminal`.
    pub fn parse(
        source: &str,
        mut terminal: impl FnMut(&str) -> Option<T>,
    ) -> Result<Self, GrammarError> {
        let mut reader = Reader {
            source,
            pos: 0,
            exprs: Vec::new(),
        };
        let mut rules = Vec::new();
        let mut names = FxHashMap::default();

        reader.skip_blank()?;
        while !reader.at_end() {
            let name = reader.name()?;
            reader.expect(b'=')?;
            let body = reader.alternatives()?;
            reader.expect(b';')?;
            let id = RuleId(rules.len() as u32);
            if names.insert(name.clone(), id).is_some() {
                return Err(GrammarError::DuplicateRule(name));
            }
            rules.push(Rule { name, body });
            reader.skip_blank()?;
        }

        let exprs = reader
            .exprs
            .into_iter()
            .map(|raw| {
                Ok(match raw {
                    Raw::Name(name) => match names.get(&name) {
                        Some(id) => Expr::Rule(*id),
                        None => Expr::Terminal(
                            terminal(&name).ok_or(GrammarError::UnknownName(name))?,
                        ),
                    },
                    Raw::Literal(text) => Expr::Literal(text),
                    Raw::Sequence(items) => Expr::Sequence(items),
                    Raw::Choice(items) => Expr::Choice(items),
                    Raw::Optional(inner) => Expr::Optional(inner),
                    Raw::Repeat(inner) => Expr::Repeat(inner),
                })
            })
            .collect::<Result<Vec<_>, GrammarError>>()?;

        Ok(Grammar {
            rules,
            exprs,
            names,
        })
    }

    pub fn rule(&self, name: &str) -> Option<RuleId> {
        self.names.get(name).copied()
    }

    pub fn get_rule(&self, id: RuleId) -> &Rule {
        &self.rules[id.0 as usize]
    }

    pub fn get_expr(&self, id: ExprId) -> &Expr<T> {
        &self.exprs[id.0 as usize]
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }
}

/// Expression before rule names are resolved.
enum Raw {
    Name(String),
    Literal(String),
    Sequence(Vec<ExprId>),
    Choice(Vec<ExprId>),
    Optional(ExprId),
    Repeat(ExprId),
}

struct Reader<'s> {
    source: &'s str,
    pos: usize,
    exprs: Vec<Raw>,
}

impl Reader<'_> {
    fn at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn peek(&self) -> Option<u8> {
        self.source.as_bytes().get(self.pos).copied()
    }

    fn error(&self, message: impl Into<String>) -> GrammarError {
        GrammarError::Syntax {
            pos: self.pos,
            message: message.into(),
        }
    }

    fn push(&mut self, raw: Raw) -> ExprId {
        self.exprs.push(raw);
        ExprId(self.exprs.len() as u32 - 1)
    }

    /// Skip whitespace and `(* comments *)`.
    fn skip_blank(&mut self) -> Result<(), GrammarError> {
        loop {
            while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
                self.pos += 1;
            }
            if self.source[self.pos..].starts_with("(*") {
                match self.source[self.pos + 2..].find("*)") {
                    Some(offset) => self.pos += offset + 4,
                    None => return Err(self.error("unterminated comment")),
                }
            } else {
                return Ok(());
            }
        }
    }

    fn expect(&mut self, byte: u8) -> Result<(), GrammarError> {
        self.skip_blank()?;
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", byte as char)))
        }
    }

    fn name(&mut self) -> Result<String, GrammarError> {
        self.skip_blank()?;
        let start = self.pos;
        match self.peek() {
            Some(b) if b.is_ascii_alphabetic() || b == b'_' => self.pos += 1,
            _ => return Err(self.error("expected a rule name")),
        }
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            self.pos += 1;
        }
        Ok(self.source[start..self.pos].to_string())
    }

    fn alternatives(&mut self) -> Result<ExprId, GrammarError> {
        let mut items = vec![self.sequence()?];
        loop {
            self.skip_blank()?;
            if self.peek() != Some(b'|') {
                break;
            }
            self.pos += 1;
            items.push(self.sequence()?);
        }
        Ok(if items.len() == 1 {
            items[0]
        } else {
            self.push(Raw::Choice(items))
        })
    }

    fn sequence(&mut self) -> Result<ExprId, GrammarError> {
        let mut items = vec![self.factor()?];
        loop {
            self.skip_blank()?;
            if self.peek() != Some(b',') {
                break;
            }
            self.pos += 1;
            items.push(self.factor()?);
        }
        Ok(if items.len() == 1 {
            items[0]
        } else {
            self.push(Raw::Sequence(items))
        })
    }

    fn factor(&mut self) -> Result<ExprId, GrammarError> {
        self.skip_blank()?;
        match self.peek() {
            Some(b'"') => {
                let start = self.pos + 1;
                match self.source[start..].find('"') {
                    Some(0) => Err(self.error("empty literal")),
                    Some(len) => {
                        self.pos = start + len + 1;
                        let text = self.source[start..start + len].to_string();
                        Ok(self.push(Raw::Literal(text)))
                    }
                    None => Err(self.error("unterminated literal")),
                }
            }
            Some(b'[') => {
                self.pos += 1;
                let inner = self.alternatives()?;
                self.expect(b']')?;
                Ok(self.push(Raw::Optional(inner)))
            }
            Some(b'{') => {
                self.pos += 1;
                let inner = self.alternatives()?;
                self.expect(b'}')?;
                Ok(self.push(Raw::Repeat(inner)))
            }
            Some(b'(') => {
                self.pos += 1;
                let inner = self.alternatives()?;
                self.expect(b')')?;
                Ok(inner)
            }
            _ => {
                let name = self.name()?;
                Ok(self.push(Raw::Name(name)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letters(name: &str) -> Option<char> {
        match name {
            "A" => Some('a'),
            "B" => Some('b'),
            _ => None,
        }
    }

    #[test]
    fn parses_rules_and_resolves_forward_references() {
        let grammar = Grammar::parse(
            "(* two rules *)\nTOP = PAIR, { PAIR } | \"x\" ;\nPAIR = A, [ B ] ;",
            letters,
        )
        .unwrap();
        assert_eq!(grammar.rules().len(), 2);
        let top = grammar.get_rule(grammar.rule("TOP").unwrap());
        let Expr::Choice(alts) = grammar.get_expr(top.body) else {
            panic!("expected a choice");
        };
        assert_eq!(alts.len(), 2);
        assert_eq!(
            grammar.get_expr(alts[1]),
            &Expr::Literal("x".to_string())
        );
        let Expr::Sequence(items) = grammar.get_expr(alts[0]) else {
            panic!("expected a sequence");
        };
        assert_eq!(grammar.get_expr(items[0]), &Expr::Rule(grammar.rule("PAIR").unwrap()));
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert_eq!(
            Grammar::parse("TOP = C ;", letters).unwrap_err(),
            GrammarError::UnknownName("C".to_string())
        );
    }

    #[test]
    fn syntax_errors_carry_position() {
        let err = Grammar::parse("TOP = A", letters).unwrap_err();
        assert_eq!(
            err,
            GrammarError::Syntax {
                pos: 7,
                message: "expected ';'".to_string()
            }
        );
        assert!(matches!(
            Grammar::parse("TOP = A ; TOP = B ;", letters),
            Err(GrammarError::DuplicateRule(_))
        ));
        assert!(matches!(
            Grammar::parse("(* open", letters),
            Err(GrammarError::Syntax { .. })
        ));
    }
}
