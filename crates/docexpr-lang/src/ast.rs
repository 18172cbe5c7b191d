pub mod error;
pub mod fields;
pub mod node;
pub mod operator;
pub mod parser;

pub use fields::Fields;
pub use node::{ExprType, Node, NodeKind, PathRoot, PathStep};
pub use parser::Parser;

use crate::value::Document;

/// What a bare field name or sigil resolves against while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DocumentScope {
    /// The whole input document.
    #[default]
    Root,
    /// The element bound by an enclosing MAP, FILTER or array filter.
    Current,
    /// The aggregate sequence of documents.
    Source,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParseMode {
    /// Terms joined by operators.
    #[default]
    Full,
    /// One term, leaving any following operator unconsumed.
    Single,
}

#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    pub scope: DocumentScope,
    pub mode: ParseMode,
    /// Default parameter values attached to the compiled expression.
    pub parameters: Document,
}
