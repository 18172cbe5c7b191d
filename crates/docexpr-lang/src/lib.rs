//! `docexpr-lang` provides the expression language of an embedded document
//! database: paths, literals, document/array construction, operators and
//! built-in functions, compiled by one of two interchangeable backends.
//!
//! ## Examples
//!
//! ```rust
//! use docexpr_lang::{Collation, DocumentScope, Engine, Value};
//!
//! let engine = Engine::default();
//! let expr = engine.compile("$.a.b[@ > 15]").unwrap();
//! let doc: Value = serde_json::json!({"a": {"b": [10, 20, 30]}}).into();
//!
//! assert!(!expr.is_scalar());
//! assert_eq!(
//!     expr.execute_document(&doc, &Collation::default()).unwrap(),
//!     vec![Value::Int32(20), Value::Int32(30)]
//! );
//!
//! // Parse without compiling
//! let node = docexpr_lang::parse("{ a, a }", DocumentScope::Root).unwrap();
//! assert_eq!(node.source, "{a:$.a,a1:$.a}");
//! ```
mod ast;
mod compiler;
mod engine;
mod error;
mod eval;
mod lexer;
mod optree;
mod range;
mod value;

use lexer::Lexer;

pub use ast::error::ParseError;
pub use ast::node::{ExprType, Node, NodeKind, PathRoot, PathStep};
pub use ast::operator::{BinaryOp, LogicOp, Quantifier};
pub use ast::{DocumentScope, Fields, ParseMode, ParseOptions, Parser};
pub use compiler::{ClosureBackend, CompiledExpr, Compiler};
pub use engine::{Backend, Engine, Executable, ExprBackend, Expression, Options, UnknownBackend};
pub use error::{Error, InnerError};
pub use eval::builtin::{BUILTINS, Builtin};
pub use eval::{EvalContext, EvalError, ValueIter};
pub use lexer::Options as LexerOptions;
pub use lexer::TokenStream;
pub use lexer::error::LexerError;
pub use lexer::token::{Token, TokenKind};
pub use optree::{OpTreeBackend, OpTreeEvaluator};
pub use range::{Position, Range};
pub use value::collation::UnknownCollation;
pub use value::{Array, Collation, Decimal, Document, ObjectId, Value};

#[allow(clippy::result_large_err)]
pub fn tokenize(code: &str, options: LexerOptions) -> Result<Vec<Token>, Error> {
    Lexer::new(options)
        .tokenize(code)
        .map_err(|e| Error::from_lexer(code, e))
}

/// Parses a whole expression against `scope`.
#[allow(clippy::result_large_err)]
pub fn parse(code: &str, scope: DocumentScope) -> Result<Node, Error> {
    parse_with(
        code,
        &ParseOptions {
            scope,
            ..Default::default()
        },
    )
}

#[allow(clippy::result_large_err)]
pub fn parse_with(code: &str, options: &ParseOptions) -> Result<Node, Error> {
    let mut tokens = TokenStream::new(code).map_err(|e| Error::from_lexer(code, e))?;
    let mut parser = Parser::new(&mut tokens);

    let node = match options.mode {
        ParseMode::Full => parser.parse_full(options.scope),
        ParseMode::Single => parser.parse_single(options.scope),
    }
    .map_err(|e| Error::from_parse(code, e))?;

    if options.mode == ParseMode::Full && !tokens.is_exhausted() {
        return Err(Error::from_parse(
            code,
            ParseError::UnexpectedToken(tokens.peek(true).clone()),
        ));
    }

    tracing::trace!(source = %node.source, ty = %node.ty, "parsed expression");
    Ok(node)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_tokenize() {
        let tokens = tokenize("$.a + 1", LexerOptions::default()).unwrap();
        let kinds = tokens.iter().map(|t| t.kind.clone()).collect::<Vec<_>>();

        assert_eq!(
            kinds,
            vec![
                TokenKind::Dollar,
                TokenKind::Period,
                TokenKind::Word("a".into()),
                TokenKind::Plus,
                TokenKind::Int("1".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_error() {
        let err = tokenize("'abc", LexerOptions::default()).unwrap_err();
        assert!(matches!(err.cause, InnerError::Lexer(LexerError::UnterminatedString(_))));
        assert_eq!(err.location.offset(), 0);
    }

    #[rstest]
    #[case::full(ParseMode::Full, "1 + 2", "1+2")]
    #[case::single(ParseMode::Single, "1 + 2", "1")]
    fn test_parse_mode(#[case] mode: ParseMode, #[case] code: &str, #[case] expected: &str) {
        let node = parse_with(
            code,
            &ParseOptions {
                mode,
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(node.source, expected);
    }

    #[test]
    fn test_parse_trailing_token() {
        let err = parse("1 + 2 )", DocumentScope::Root).unwrap_err();

        assert!(matches!(err.cause, InnerError::Parse(ParseError::UnexpectedToken(_))));
        assert_eq!(err.location.offset(), 6);
    }
}
