use smol_str::SmolStr;
use thiserror::Error;

use crate::lexer::token::Token;

fn describe(token: &Token) -> String {
    if token.is_eof() { "EOF".to_string() } else { token.to_string() }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token `{}`", describe(.0))]
    UnexpectedToken(Token),
    #[error("Unexpected token `{}`, expected {}", describe(.token), .expected)]
    UnexpectedTokenExpected { token: Token, expected: SmolStr },
    #[error("Unexpected EOF detected")]
    UnexpectedEOFDetected(Token),
    #[error("Method '{name}' does not exist or contains invalid parameters ({arity} given)")]
    UnknownFunction { token: Token, name: SmolStr, arity: usize },
    #[error("Left expression `{expr}` returns more than one result. Try use ANY or ALL before operant.")]
    LeftNotScalar { expr: String },
    #[error("Right expression `{expr}` must return a single value")]
    RightNotScalar { expr: String },
    #[error("Expression `{expr}` must be a scalar expression")]
    NotScalar { expr: String },
    #[error("Invalid number `{}`", describe(.0))]
    InvalidNumber(Token),
}

impl ParseError {
    #[cold]
    pub fn token(&self) -> Option<&Token> {
        match self {
            ParseError::UnexpectedToken(token)
            | ParseError::UnexpectedTokenExpected { token, .. }
            | ParseError::UnexpectedEOFDetected(token)
            | ParseError::UnknownFunction { token, .. }
            | ParseError::InvalidNumber(token) => Some(token),
            ParseError::LeftNotScalar { .. } | ParseError::RightNotScalar { .. } | ParseError::NotScalar { .. } => None,
        }
    }

    /// Source text of the offending sub-expression for type errors.
    pub fn expression_source(&self) -> Option<&str> {
        match self {
            ParseError::LeftNotScalar { expr } | ParseError::RightNotScalar { expr } | ParseError::NotScalar { expr } => {
                Some(expr)
            }
            _ => None,
        }
    }
}
