use crate::{LiteralValue, ParserContext, SpreadsheetFormula};

/// Parse and evaluate cell input with no references or functions and return
/// the resulting value.
///
/// This helper is intended for documentation examples to avoid repetitive setup.
///
/// # Example
///
/// ```rust
/// # use sheetform::doc_examples::eval_scalar;
/// let value = eval_scalar("=(1+2)*3")?;
/// assert_eq!(value, sheetform::LiteralValue::Number(9.0));
/// # Ok::<(), Box<dyn std::error::Error + Send + Sync>>(())
/// ```
pub fn eval_scalar(input: &str) -> Result<LiteralValue, Box<dyn std::error::Error + Send + Sync>> {
    let formula = SpreadsheetFormula::EMPTY
        .set_text(input)?
        .evaluate(&ParserContext::default(), &())?;
    Ok(formula.value().cloned().unwrap_or(LiteralValue::Empty))
}
