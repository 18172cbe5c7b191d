//! Closure-tree backend.
//!
//! Each node is compiled into a closure that evaluates it directly against an
//! [`EvalContext`](crate::EvalContext), composing the closures of its
//! children. There is no intermediate representation and no lookup by name at
//! evaluation time.
//!
//! Scalar nodes compile to `Fn(ctx) -> Result<Value, _>` and enumerable nodes
//! to `Fn(ctx) -> ValueIter`, so sequences are produced lazily.
//!
//! ## Example
//!
//! ```rust
//! use docexpr_lang::{Backend, Collation, Engine, Value};
//!
//! let mut engine = Engine::default();
//! engine.set_backend(Backend::Closure);
//!
//! let expr = engine.compile("UPPER($.name)").unwrap();
//! let doc: Value = serde_json::json!({"name": "john"}).into();
//! let result = expr.execute_document(&doc, &Collation::default()).unwrap();
//! assert_eq!(result, vec![Value::from("JOHN")]);
//! ```

mod compile;
pub(crate) mod compiled;

pub use compile::Compiler;
pub use compiled::CompiledExpr;

use crate::{
    ast::Node,
    engine::{Executable, ExprBackend},
    error::Error,
};

/// Builds [`Executable::Closure`] programs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClosureBackend;

impl ExprBackend for ClosureBackend {
    fn build(&self, node: &Node) -> Result<Executable, Error> {
        let compiled = Compiler::new()
            .compile(node)
            .map_err(|err| Error::from_eval(&node.source, err))?;
        tracing::trace!(source = %node.source, scalar = compiled.is_scalar(), "built closure tree");

        Ok(Executable::Closure(compiled))
    }
}
