use miette::{Diagnostic, SourceOffset, SourceSpan};

use crate::{ast::error::ParseError, eval::error::EvalError, lexer::error::LexerError, lexer::token::Token};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum InnerError {
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error(transparent)]
    Lexer(#[from] LexerError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Represents a high-level error with diagnostic information for the user.
#[derive(PartialEq, Debug, thiserror::Error)]
#[error("{cause}")]
pub struct Error {
    /// The underlying cause of the error.
    pub cause: InnerError,
    /// The expression text the error refers to.
    pub source_code: String,
    /// The location in the source code for diagnostics.
    pub location: SourceSpan,
}

impl Error {
    pub fn from_error(source_code: impl Into<String>, cause: InnerError) -> Self {
        let source_code = source_code.into();

        let token = match &cause {
            InnerError::Lexer(err) => err.token(),
            InnerError::Parse(err) => err.token(),
            InnerError::Eval(_) => None,
        };

        let location = match token {
            Some(token) => token_span(&source_code, token),
            None => match expression_of(&cause) {
                Some(expr) => source_code
                    .find(expr)
                    .map(|offset| SourceSpan::new(offset.into(), expr.len().max(1)))
                    .unwrap_or_else(|| SourceSpan::new(SourceOffset::from(0), source_code.len().max(1))),
                None if is_eof(&cause) => SourceSpan::new(source_code.len().into(), 1),
                None => SourceSpan::new(SourceOffset::from(0), 1),
            },
        };

        Self {
            cause,
            source_code,
            location,
        }
    }

    #[inline]
    pub fn from_eval(source_code: impl Into<String>, err: EvalError) -> Self {
        Self::from_error(source_code, InnerError::Eval(err))
    }

    #[inline]
    pub fn from_parse(source_code: impl Into<String>, err: ParseError) -> Self {
        Self::from_error(source_code, InnerError::Parse(err))
    }

    #[inline]
    pub fn from_lexer(source_code: impl Into<String>, err: LexerError) -> Self {
        Self::from_error(source_code, InnerError::Lexer(err))
    }

    /// The evaluation error, if this error happened while evaluating.
    pub fn eval_error(&self) -> Option<&EvalError> {
        match &self.cause {
            InnerError::Eval(err) => Some(err),
            _ => None,
        }
    }
}

fn token_span(source_code: &str, token: &Token) -> SourceSpan {
    let start = token.range.start.offset.min(source_code.len());
    SourceSpan::new(start.into(), token.range.len().max(1))
}

fn expression_of(cause: &InnerError) -> Option<&str> {
    match cause {
        InnerError::Parse(err) => err.expression_source(),
        InnerError::Eval(EvalError::NotScalar(expr) | EvalError::IndexNotNumber(expr)) => Some(expr.as_str()),
        InnerError::Eval(EvalError::NoRootDocument(field)) if !field.is_empty() => Some(field.as_str()),
        _ => None,
    }
}

fn is_eof(cause: &InnerError) -> bool {
    matches!(
        cause,
        InnerError::Lexer(LexerError::UnexpectedEOFDetected) | InnerError::Parse(ParseError::UnexpectedEOFDetected(_))
    )
}

impl Diagnostic for Error {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let c = match &self.cause {
            InnerError::Lexer(LexerError::UnexpectedToken(_)) => "LexerError::UnexpectedToken",
            InnerError::Lexer(LexerError::UnterminatedString(_)) => "LexerError::UnterminatedString",
            InnerError::Lexer(LexerError::UnexpectedEOFDetected) => "LexerError::UnexpectedEOFDetected",
            InnerError::Parse(ParseError::UnexpectedToken(_)) => "ParseError::UnexpectedToken",
            InnerError::Parse(ParseError::UnexpectedTokenExpected { .. }) => "ParseError::UnexpectedTokenExpected",
            InnerError::Parse(ParseError::UnexpectedEOFDetected(_)) => "ParseError::UnexpectedEOFDetected",
            InnerError::Parse(ParseError::UnknownFunction { .. }) => "ParseError::UnknownFunction",
            InnerError::Parse(ParseError::LeftNotScalar { .. }) => "ParseError::LeftNotScalar",
            InnerError::Parse(ParseError::RightNotScalar { .. }) => "ParseError::RightNotScalar",
            InnerError::Parse(ParseError::NotScalar { .. }) => "ParseError::NotScalar",
            InnerError::Parse(ParseError::InvalidNumber(_)) => "ParseError::InvalidNumber",
            InnerError::Eval(EvalError::NotScalar(_)) => "EvalError::NotScalar",
            InnerError::Eval(EvalError::NoRootDocument(_)) => "EvalError::NoRootDocument",
            InnerError::Eval(EvalError::InvalidTypes { .. }) => "EvalError::InvalidTypes",
            InnerError::Eval(EvalError::ZeroDivision) => "EvalError::ZeroDivision",
            InnerError::Eval(EvalError::IndexNotNumber(_)) => "EvalError::IndexNotNumber",
            InnerError::Eval(EvalError::InvalidArgument { .. }) => "EvalError::InvalidArgument",
            InnerError::Eval(EvalError::Unsupported(_)) => "EvalError::Unsupported",
            InnerError::Eval(EvalError::JsonError(_)) => "EvalError::JsonError",
        };

        Some(Box::new(c))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let msg = match &self.cause {
            InnerError::Lexer(LexerError::UnexpectedToken(_)) => {
                Some("Check for unexpected or misplaced characters in the expression.".to_string())
            }
            InnerError::Lexer(LexerError::UnterminatedString(_)) => {
                Some("Close the string literal with the same quote it was opened with.".to_string())
            }
            InnerError::Parse(ParseError::UnexpectedToken(_)) => {
                Some("Check for syntax errors or misplaced tokens.".to_string())
            }
            InnerError::Parse(ParseError::UnexpectedTokenExpected { expected, .. }) => {
                Some(format!("Expected {expected} here."))
            }
            InnerError::Parse(ParseError::UnexpectedEOFDetected(_)) | InnerError::Lexer(LexerError::UnexpectedEOFDetected) => {
                Some("Input ended unexpectedly. Check for missing closing brackets or incomplete expressions.".to_string())
            }
            InnerError::Parse(ParseError::UnknownFunction { name, arity, .. }) => Some(format!(
                "No function '{name}' takes {arity} argument(s). Check the name and the number of arguments."
            )),
            InnerError::Parse(ParseError::LeftNotScalar { .. }) => {
                Some("Use ANY or ALL before the operator to compare every element.".to_string())
            }
            InnerError::Parse(ParseError::RightNotScalar { .. }) | InnerError::Parse(ParseError::NotScalar { .. }) => {
                Some("Wrap the expression with ARRAY(...) or pick a single element with [n].".to_string())
            }
            InnerError::Parse(ParseError::InvalidNumber(_)) => {
                Some("Numbers must fit in a 64-bit integer or a finite double.".to_string())
            }
            InnerError::Eval(EvalError::NoRootDocument(_)) => {
                Some("Aggregate expressions have no `$`; read fields through `*` instead.".to_string())
            }
            InnerError::Eval(EvalError::InvalidTypes { .. }) => {
                Some("Type mismatch. Check the types of the arguments.".to_string())
            }
            InnerError::Eval(EvalError::ZeroDivision) => Some("Division by zero is not allowed.".to_string()),
            InnerError::Eval(EvalError::IndexNotNumber(_)) => {
                Some("Bind the index parameter to an integer.".to_string())
            }
            InnerError::Eval(EvalError::Unsupported(_)) => {
                Some("Switch to the op-tree backend to evaluate this expression.".to_string())
            }
            _ => None,
        };

        msg.map(|m| Box::new(m) as Box<dyn std::fmt::Display>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = miette::LabeledSpan> + '_>> {
        Some(Box::new(std::iter::once(miette::LabeledSpan::new_with_span(
            Some(format!("{}", self.cause)),
            self.location,
        ))))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.source_code)
    }
}
