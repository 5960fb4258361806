//! Evaluation of whitespace-separated expression lists (`:echo 1 'a' $HOME`).

use thiserror::Error;

use crate::script::expr::{EvalOutcome, ParseError};

/// Where evaluation of an argument list stopped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid expression at offset {offset}")]
pub struct ArgListError {
    /// Byte offset of the first character that was not consumed.
    pub offset: usize,
    /// What the evaluator reported there, if anything.
    pub cause: Option<ParseError>,
}

impl ArgListError {
    /// Status line text for a failure while evaluating `args`.
    pub fn describe(&self, args: &str) -> String {
        match &self.cause {
            Some(ParseError::Eval(msg)) => msg.clone(),
            _ => format!("Invalid expression: {}", args.get(self.offset..).unwrap_or(args)),
        }
    }
}

/// Evaluate every expression in `args` and join the results with spaces.
///
/// An expression that is followed by whitespace and more text is taken as
/// complete (`1 2` is two expressions); any other failure stops the list and
/// reports the offset where the failing expression starts.
pub fn eval_arg_list(
    args: &str,
    mut evaluate: impl FnMut(&str) -> EvalOutcome,
) -> Result<String, ArgListError> {
    debug_assert!(!args.is_empty(), "empty expression list");

    let mut out = String::new();
    let mut first = true;
    let mut pos = skip_blanks(args, 0);
    let mut cause = None;

    while pos < args.len() {
        let EvalOutcome {
            value,
            error,
            ends_with_whitespace,
            consumed,
        } = evaluate(&args[pos..]);

        let soft_stop = error == Some(ParseError::InvalidExpression) && ends_with_whitespace;
        let value = match value {
            Some(v) if error.is_none() || soft_stop => v,
            _ => {
                cause = error;
                break;
            }
        };
        if consumed == 0 {
            break;
        }

        if !first {
            out.push(' ');
        }
        first = false;
        out.push_str(&value.to_string());
        pos = skip_blanks(args, pos + consumed);
    }

    if pos < args.len() {
        return Err(ArgListError { offset: pos, cause });
    }
    Ok(out)
}

fn skip_blanks(s: &str, from: usize) -> usize {
    from + s[from..].len() - s[from..].trim_start().len()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::value::Value;

    /// Evaluator accepting space-free words, stopping at the first blank.
    fn words(text: &str) -> EvalOutcome {
        let end = text.find(' ').unwrap_or(text.len());
        let word = &text[..end];
        if word == "bad" {
            return EvalOutcome::failed(ParseError::InvalidExpression, 0);
        }
        let error = (end < text.len()).then_some(ParseError::InvalidExpression);
        EvalOutcome {
            value: Some(Value::Str(word.to_owned())),
            error,
            ends_with_whitespace: end < text.len(),
            consumed: end + usize::from(end < text.len()),
        }
    }

    #[test]
    fn values_are_joined_with_one_space() {
        assert_eq!(eval_arg_list("a   b c", words).unwrap(), "a b c");
        assert_eq!(eval_arg_list("  a", words).unwrap(), "a");
    }

    #[test]
    fn failure_reports_offset_of_failing_expression() {
        let err = eval_arg_list("a bad c", words).unwrap_err();
        assert_eq!(err.offset, 2);
        assert_eq!(err.cause, Some(ParseError::InvalidExpression));
        assert_eq!(err.describe("a bad c"), "Invalid expression: bad c");
    }

    #[test]
    fn hard_error_with_value_is_not_a_soft_stop() {
        let err = eval_arg_list("x", |_| EvalOutcome {
            value: Some(Value::Int(1)),
            error: Some(ParseError::MissingParen),
            ends_with_whitespace: true,
            consumed: 1,
        })
        .unwrap_err();
        assert_eq!(err.offset, 0);
    }
}
