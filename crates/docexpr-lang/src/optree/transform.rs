//! Node tree to OpTree transformation.

use smallvec::SmallVec;
use smol_str::SmolStr;

use super::{Op, OpPool, OpRef, SourceMap, Step};
use crate::{
    ast::{Node, NodeKind, PathStep, operator::BinaryOp},
    eval::ops::LikePattern,
    value::Value,
};

/// Flattens a [`Node`] tree into an [`OpPool`].
///
/// Children are allocated before their parent, so the root instruction is
/// always the last one in the pool.
pub struct OpTreeTransformer {
    pool: OpPool,
    source_map: SourceMap,
}

impl Default for OpTreeTransformer {
    fn default() -> Self {
        Self::new()
    }
}

impl OpTreeTransformer {
    pub fn new() -> Self {
        Self {
            pool: OpPool::new(),
            source_map: SourceMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pool: OpPool::with_capacity(capacity),
            source_map: SourceMap::with_capacity(capacity),
        }
    }

    pub fn transform(mut self, node: &Node) -> (OpPool, SourceMap, OpRef) {
        let root = self.transform_node(node);
        (self.pool, self.source_map, root)
    }

    fn transform_node(&mut self, node: &Node) -> OpRef {
        let op = match &node.kind {
            NodeKind::Constant(value) => Op::Constant(value.clone()),
            NodeKind::Parameter(name) => Op::Parameter(name.clone()),
            NodeKind::Source => Op::Source,
            NodeKind::Document(entries) => Op::Document(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), self.transform_node(value)))
                    .collect(),
            ),
            NodeKind::Array(items) => Op::Array(items.iter().map(|item| self.transform_node(item)).collect()),
            NodeKind::Path { root, steps } => {
                let field = match steps.first() {
                    Some(PathStep::Member(name)) => name.clone(),
                    _ => SmolStr::default(),
                };
                let steps: SmallVec<[Step; 4]> = steps
                    .iter()
                    .map(|step| match step {
                        PathStep::Member(name) => Step::Member(name.clone()),
                        PathStep::Index(index) => Step::Index(*index),
                        PathStep::IndexOf(node) => Step::IndexOf(self.transform_node(node)),
                        PathStep::All => Step::All,
                        PathStep::Filter(node) => Step::Filter(self.transform_node(node)),
                        PathStep::Items => Step::Items,
                    })
                    .collect();

                Op::Path {
                    root: *root,
                    field,
                    steps,
                }
            }
            NodeKind::Map { source, selector } => Op::Map {
                source: self.transform_node(source),
                selector: self.transform_node(selector),
            },
            NodeKind::Filter { source, predicate } => Op::Filter {
                source: self.transform_node(source),
                predicate: self.transform_node(predicate),
            },
            NodeKind::Sort { source, key, order } => Op::Sort {
                source: self.transform_node(source),
                key: self.transform_node(key),
                order: order.as_ref().map(|order| self.transform_node(order)),
            },
            NodeKind::Call { function, args } => Op::Call {
                function: *function,
                args: args.iter().map(|arg| self.transform_node(arg)).collect(),
            },
            NodeKind::Binary {
                op,
                quantifier,
                left,
                right,
            } => match (op, &right.kind) {
                (BinaryOp::Like, NodeKind::Constant(Value::String(pattern))) => Op::Like {
                    quantifier: *quantifier,
                    left: self.transform_node(left),
                    pattern: LikePattern::new(pattern),
                },
                _ => Op::Binary {
                    op: *op,
                    quantifier: *quantifier,
                    left: self.transform_node(left),
                    right: self.transform_node(right),
                },
            },
            NodeKind::Logic { op, left, right } => Op::Logic {
                op: *op,
                left: self.transform_node(left),
                right: self.transform_node(right),
            },
            NodeKind::Conditional {
                test,
                if_true,
                if_false,
            } => Op::Conditional {
                test: self.transform_node(test),
                if_true: self.transform_node(if_true),
                if_false: self.transform_node(if_false),
            },
        };

        let _ = self.source_map.register(&node.source);
        self.pool.alloc(op, node.is_scalar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DocumentScope, parse};

    #[test]
    fn test_root_is_last() {
        let node = parse("$.a + 1", DocumentScope::Root).unwrap();
        let (pool, source_map, root) = OpTreeTransformer::new().transform(&node);

        assert_eq!(pool.len(), 3);
        assert_eq!(root.id() as usize, pool.len() - 1);
        assert_eq!(source_map.len(), pool.len());
        assert_eq!(source_map.get(root), "$.a+1");
        assert!(matches!(pool.get(root).op, Op::Binary { .. }));
    }

    #[test]
    fn test_path_steps() {
        let node = parse("$.a.b[@p][-1]", DocumentScope::Root).unwrap();
        let (pool, _, root) = OpTreeTransformer::with_capacity(4).transform(&node);

        let Op::Path { field, steps, .. } = &pool.get(root).op else {
            panic!("expected path");
        };
        assert_eq!(field, "a");
        assert_eq!(steps.len(), 4);
        assert!(matches!(steps[2], Step::IndexOf(_)));
        assert!(matches!(steps[3], Step::Index(-1)));
    }

    #[test]
    fn test_cardinality_is_kept() {
        let node = parse("MAP($.a[*] => @.b)", DocumentScope::Root).unwrap();
        let (pool, _, root) = OpTreeTransformer::new().transform(&node);

        assert!(!pool.get(root).is_scalar);
        let Op::Map { source, selector } = pool.get(root).op else {
            panic!("expected map");
        };
        assert!(!pool.get(source).is_scalar);
        assert!(pool.get(selector).is_scalar);
    }
}
