use super::{FormattedText, section_color, section_leaves};
use crate::token::{FormatColor, FormatLeafKind, FormatParserToken};

#[derive(Debug, Clone, PartialEq)]
enum Piece {
    Value,
    Literal(String),
}

/// Text sections: `@` is replaced by the value, everything else is literal.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFormatter {
    pieces: Vec<Piece>,
    color: Option<FormatColor>,
}

impl TextFormatter {
    pub fn compile(section: &FormatParserToken) -> Self {
        let pieces = section_leaves(section)
            .into_iter()
            .filter_map(|leaf| match leaf.leaf_kind()? {
                FormatLeafKind::TextPlaceholder => Some(Piece::Value),
                FormatLeafKind::Underscore(_) => Some(Piece::Literal(" ".to_string())),
                kind => kind.literal(leaf.text()).map(Piece::Literal),
            })
            .collect();
        Self {
            pieces,
            color: section_color(section),
        }
    }

    /// Echo the value unchanged.
    pub fn plain() -> Self {
        Self {
            pieces: vec![Piece::Value],
            color: None,
        }
    }

    /// Print nothing.
    pub fn empty() -> Self {
        Self {
            pieces: Vec::new(),
            color: None,
        }
    }

    pub fn format(&self, value: &str) -> FormattedText {
        let text = self
            .pieces
            .iter()
            .map(|piece| match piece {
                Piece::Value => value,
                Piece::Literal(text) => text.as_str(),
            })
            .collect::<String>();
        FormattedText::new(text).with_color(self.color)
    }
}

#[cfg(test)]
mod tests {
    use crate::formatter::FormatterContext;
    use crate::pattern::{PatternKind, SpreadsheetPattern};
    use crate::token::FormatColor;
    use sheetform_common::LiteralValue;

    #[test]
    fn placeholder_repeats_and_literals_stay() {
        let formatter = SpreadsheetPattern::parse(PatternKind::TextFormat, "[Blue]\"(\"@\") \"@")
            .unwrap()
            .formatter()
            .unwrap();
        let formatted = formatter
            .format(&LiteralValue::Text("ab".into()), &FormatterContext::default())
            .unwrap();
        assert_eq!(formatted.text, "(ab) ab");
        assert_eq!(formatted.color, Some(FormatColor::Blue));
    }

    #[test]
    fn numbers_are_not_text() {
        let formatter = SpreadsheetPattern::parse(PatternKind::TextFormat, "@")
            .unwrap()
            .formatter()
            .unwrap();
        assert_eq!(
            formatter.format(&LiteralValue::Number(1.0), &FormatterContext::default()),
            None
        );
    }
}
