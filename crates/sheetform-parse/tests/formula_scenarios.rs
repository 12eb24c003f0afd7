use proptest::prelude::*;
use sheetform_parse::{
    BinaryOperator, CellRange, CellReference, ExcelErrorKind, Expression, FormulaError,
    LabelName, LiteralValue, ParserContext, ParserLeafKind, SpreadsheetFormula,
    SpreadsheetSelection, parse_formula, parse_value_or_expression,
};

fn evaluate(text: &str) -> LiteralValue {
    let formula = SpreadsheetFormula::EMPTY
        .set_text(text)
        .unwrap()
        .evaluate(&ParserContext::default(), &())
        .unwrap();
    formula.value().cloned().unwrap()
}

#[test]
fn precedence_scenarios() {
    let cases = [
        ("=1+2*3", 7.0),
        ("=2*3+1", 7.0),
        ("=(1+2)*3", 9.0),
        ("=10-4-3", 3.0),
        ("=2^3^2", 64.0),
        ("=12/2/3", 2.0),
        ("=-3^2", 9.0),
        ("=2*-3", -6.0),
        ("=200%+1", 3.0),
        ("= 1 +  2 ", 3.0),
    ];
    for (text, expected) in cases {
        assert_eq!(evaluate(text), LiteralValue::Number(expected), "{text}");
    }
    assert_eq!(evaluate("=1+1=2"), LiteralValue::Boolean(true));
    assert_eq!(evaluate("=1<2=TRUE"), LiteralValue::Boolean(true));
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let context = ParserContext::default();
    let expression = |text: &str| parse_formula(text, &context).unwrap().expression().unwrap();
    let number = Expression::Number;

    assert_eq!(
        expression("=1+2*3"),
        Expression::binary(
            BinaryOperator::Addition,
            number(1.0),
            Expression::binary(BinaryOperator::Multiplication, number(2.0), number(3.0)),
        )
    );
    assert_eq!(
        expression("=1*2+3"),
        Expression::binary(
            BinaryOperator::Addition,
            Expression::binary(BinaryOperator::Multiplication, number(1.0), number(2.0)),
            number(3.0),
        )
    );
}

#[test]
fn whitespace_is_preserved_in_the_token() {
    let text = "=  SUM( A1 ,  B2:C3 ) * 2 ";
    let token = parse_formula(text, &ParserContext::default()).unwrap();
    assert_eq!(token.text(), text);
    assert_eq!(token.to_string(), text);
}

#[test]
fn parse_errors_report_positions() {
    let context = ParserContext::default();
    let err = parse_formula("=1+", &context).unwrap_err();
    assert_eq!(err.position, Some(3));
    let err = parse_formula("1+2", &context).unwrap_err();
    assert_eq!(err.position, Some(0));
    let err = parse_formula("=(1+2", &context).unwrap_err();
    assert_eq!(err.position, Some(1));

    let formula = SpreadsheetFormula::EMPTY.set_text("=1*").unwrap();
    assert!(matches!(
        formula.parse(&context),
        Err(FormulaError::Parser(_))
    ));
}

#[test]
fn value_entries() {
    let context = ParserContext::default();
    let leaf = |text: &str| {
        parse_value_or_expression(text, &context)
            .unwrap()
            .leaf_kind()
            .cloned()
    };
    assert_eq!(leaf("12.5"), Some(ParserLeafKind::Number(12.5)));
    assert_eq!(leaf("'12.5"), Some(ParserLeafKind::Text("12.5".into())));
    assert_eq!(leaf("hello"), Some(ParserLeafKind::Text("hello".into())));
    assert!(parse_value_or_expression("", &context).is_err());
}

#[test]
fn mutation_algebra() {
    let context = ParserContext::default();
    let empty = SpreadsheetFormula::EMPTY;

    assert_eq!(
        empty.clone().set_text("=1+1").unwrap().set_text("").unwrap(),
        empty
    );
    assert_eq!(empty.clone().set_token(None).unwrap(), empty);
    assert_eq!(empty.clone().set_expression(None), empty);
    assert_eq!(empty.clone().set_value(None), empty);

    let parsed = empty.clone().set_text("=A1").unwrap().parse(&context).unwrap();
    let reparsed = parsed.clone().parse(&context).unwrap();
    assert_eq!(parsed, reparsed);

    let evaluated = parsed.evaluate(&context, &()).unwrap();
    assert!(matches!(
        evaluated.value(),
        Some(LiteralValue::Error(e)) if e.kind == ExcelErrorKind::Ref
    ));
    assert_eq!(
        evaluated.expression(),
        Some(&Expression::Reference(SpreadsheetSelection::Cell(
            CellReference::parse("A1").unwrap()
        )))
    );
    assert_eq!(evaluated.clone().set_token(None).unwrap().value(), None);
}

#[cfg(feature = "serde")]
#[test]
fn formula_serializes_only_present_parts() {
    let formula = SpreadsheetFormula::EMPTY.set_text("=1").unwrap();
    let json = serde_json::to_value(&formula).unwrap();
    assert_eq!(json, serde_json::json!({ "text": "=1" }));
    let back: SpreadsheetFormula = serde_json::from_value(json).unwrap();
    assert_eq!(back, formula);
}

#[cfg(feature = "serde")]
#[test]
fn tokens_serialize_as_kind_named_objects() {
    use sheetform_parse::SpreadsheetParserToken;

    let token = parse_formula("=1", &ParserContext::default()).unwrap();
    let json = serde_json::to_value(&token).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "type": "Expression",
            "children": [
                { "type": "Symbol", "value": "Equals", "text": "=" },
                { "type": "Number", "value": 1.0, "text": "1" },
            ],
            "text": "=1",
        })
    );
    let back: SpreadsheetParserToken = serde_json::from_value(json).unwrap();
    assert_eq!(back, token);

    let space = SpreadsheetParserToken::leaf(ParserLeafKind::Whitespace, " ").unwrap();
    assert_eq!(
        serde_json::to_value(&space).unwrap(),
        serde_json::json!({ "type": "Whitespace", "text": " " })
    );

    let token = parse_formula("=SUM(A1, 2) >= 3", &ParserContext::default()).unwrap();
    let back: SpreadsheetParserToken =
        serde_json::from_str(&serde_json::to_string(&token).unwrap()).unwrap();
    assert_eq!(back, token);
}

fn leaf() -> impl Strategy<Value = Expression> {
    let cell = ("[A-H]", 1u32..60).prop_map(|(column, row)| {
        let cell = CellReference::parse(&format!("{column}{row}")).unwrap();
        Expression::Reference(SpreadsheetSelection::Cell(cell))
    });
    let label = prop_oneof![Just("Total"), Just("tax_rate"), Just("Interest")].prop_map(|name| {
        Expression::Reference(SpreadsheetSelection::Label(LabelName::new(name).unwrap()))
    });
    prop_oneof![
        (0u32..10_000).prop_map(|n| Expression::Number(n as f64)),
        (0u32..1_000).prop_map(|n| Expression::Number(n as f64 + 0.5)),
        "[a-z \"]{0,6}".prop_map(Expression::Text),
        any::<bool>().prop_map(Expression::Boolean),
        Just(Expression::Error(ExcelErrorKind::Na)),
        Just(Expression::Reference(SpreadsheetSelection::Range(
            CellRange::parse("A1:C3").unwrap()
        ))),
        cell,
        label,
    ]
}

fn operator() -> impl Strategy<Value = BinaryOperator> {
    prop_oneof![
        Just(BinaryOperator::Addition),
        Just(BinaryOperator::Subtraction),
        Just(BinaryOperator::Multiplication),
        Just(BinaryOperator::Division),
        Just(BinaryOperator::Power),
        Just(BinaryOperator::Equals),
        Just(BinaryOperator::NotEquals),
        Just(BinaryOperator::LessThan),
        Just(BinaryOperator::GreaterThanEquals),
    ]
}

fn expression() -> impl Strategy<Value = Expression> {
    leaf().prop_recursive(4, 32, 3, |inner| {
        prop_oneof![
            inner.clone().prop_map(|e| Expression::Negative(Box::new(e))),
            inner.clone().prop_map(|e| Expression::Percentage(Box::new(e))),
            (operator(), inner.clone(), inner.clone())
                .prop_map(|(op, left, right)| Expression::binary(op, left, right)),
            (
                prop_oneof![Just("SUM"), Just("IF")],
                prop::collection::vec(inner, 0..3)
            )
                .prop_map(|(name, args)| Expression::Call {
                    name: name.to_string(),
                    args,
                }),
        ]
    })
}

proptest! {
    #[test]
    fn rendered_expressions_parse_back(expression in expression()) {
        let text = format!("={expression}");
        let token = parse_formula(&text, &ParserContext::default()).unwrap();
        prop_assert_eq!(token.text(), text.as_str());
        prop_assert_eq!(token.expression().unwrap(), expression);
    }
}
