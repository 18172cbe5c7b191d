//! Compiled expression types.

use std::{fmt, sync::Arc};

use crate::{
    eval::{EvalContext, EvalError, ValueIter},
    value::Value,
};

/// Evaluates a scalar node to exactly one value.
pub type ScalarExpr = Arc<dyn for<'a> Fn(EvalContext<'a>) -> Result<Value, EvalError> + Send + Sync>;

/// Evaluates an enumerable node to a lazy sequence.
///
/// The returned iterator borrows only from the context, so a caller that
/// stops early skips the remaining work.
pub type EnumerableExpr = Arc<dyn for<'a> Fn(EvalContext<'a>) -> ValueIter<'a> + Send + Sync>;

/// A node compiled into a closure tree.
#[derive(Clone)]
pub enum CompiledExpr {
    Scalar(ScalarExpr),
    Enumerable(EnumerableExpr),
}

impl CompiledExpr {
    #[inline]
    pub fn is_scalar(&self) -> bool {
        matches!(self, CompiledExpr::Scalar(_))
    }

    /// Runs the expression as a sequence; a scalar yields one item.
    pub fn values<'a>(&self, ctx: EvalContext<'a>) -> ValueIter<'a> {
        match self {
            CompiledExpr::Scalar(f) => Box::new(std::iter::once(f(ctx))),
            CompiledExpr::Enumerable(f) => f(ctx),
        }
    }
}

impl fmt::Debug for CompiledExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompiledExpr::Scalar(_) => write!(f, "CompiledExpr::Scalar(..)"),
            CompiledExpr::Enumerable(_) => write!(f, "CompiledExpr::Enumerable(..)"),
        }
    }
}
