pub mod builtin;
pub mod context;
pub mod error;
pub mod ops;

pub use context::EvalContext;
pub use error::EvalError;

use crate::value::Value;

/// Lazily produced result of an enumerable expression.
pub type ValueIter<'a> = Box<dyn Iterator<Item = Result<Value, EvalError>> + 'a>;
