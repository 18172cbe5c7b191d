//! OpTree backend.
//!
//! The node tree is flattened into a contiguous instruction pool that uses
//! 32-bit indices instead of pointers. Evaluation dispatches on each
//! instruction against the fixed built-in table. Enumerable instructions
//! are pulled one element at a time, so quantifiers and consumers stop at
//! the first element that decides their result.
//!
//! ```text
//! Source Code
//!     ↓
//! Parser
//!     ↓
//! Node (tree of Arc<Node>)
//!     ↓
//! OpTreeTransformer
//!     ↓
//! OpPool + SourceMap
//!     ↓
//! OpTreeEvaluator
//!     ↓
//! Value
//! ```

mod eval;
mod instruction;
mod transform;

use std::sync::Arc;

pub use eval::OpTreeEvaluator;
pub use instruction::{Op, OpPool, OpRef, SourceMap, Step};
pub use transform::OpTreeTransformer;

use crate::{
    ast::Node,
    engine::{Executable, ExprBackend},
    error::Error,
};

/// Builds [`Executable::OpTree`] programs.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpTreeBackend;

impl ExprBackend for OpTreeBackend {
    fn build(&self, node: &Node) -> Result<Executable, Error> {
        let (pool, source_map, root) = OpTreeTransformer::with_capacity(node.size()).transform(node);
        tracing::trace!(source = %node.source, instructions = pool.len(), "built op-tree program");

        Ok(Executable::OpTree(Arc::new(OpTreeEvaluator::new(pool, source_map, root))))
    }
}
