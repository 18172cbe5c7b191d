//! Node tree to closure-tree compilation.

use std::{iter, sync::Arc};

use smallvec::SmallVec;
use smol_str::SmolStr;

use super::compiled::{CompiledExpr, EnumerableExpr, ScalarExpr};
use crate::{
    ast::{
        Node, NodeKind, PathRoot, PathStep,
        operator::{BinaryOp, LogicOp, Quantifier},
    },
    eval::{
        EvalContext, EvalError, ValueIter,
        builtin::{Builtin, CallResult, pack},
        ops::{self, LikePattern},
    },
    value::{Array, Value},
};

fn scalar_fn<F>(f: F) -> ScalarExpr
where
    F: for<'a> Fn(EvalContext<'a>) -> Result<Value, EvalError> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn enumerable_fn<F>(f: F) -> EnumerableExpr
where
    F: for<'a> Fn(EvalContext<'a>) -> ValueIter<'a> + Send + Sync + 'static,
{
    Arc::new(f)
}

#[inline]
fn scalar<F>(f: F) -> Result<CompiledExpr, EvalError>
where
    F: for<'a> Fn(EvalContext<'a>) -> Result<Value, EvalError> + Send + Sync + 'static,
{
    Ok(CompiledExpr::Scalar(scalar_fn(f)))
}

#[inline]
fn enumerable<F>(f: F) -> Result<CompiledExpr, EvalError>
where
    F: for<'a> Fn(EvalContext<'a>) -> ValueIter<'a> + Send + Sync + 'static,
{
    Ok(CompiledExpr::Enumerable(enumerable_fn(f)))
}

#[inline]
fn failed<'a>(err: EvalError) -> ValueIter<'a> {
    Box::new(iter::once(Err(err)))
}

/// Element filter shared by `[predicate]` path steps and `FILTER`.
#[inline]
fn keep_if(predicate: &ScalarExpr, ctx: EvalContext<'_>, value: Value) -> Option<Result<Value, EvalError>> {
    match predicate(ctx.with_current(&value)) {
        Ok(matched) if matched.is_truthy() => Some(Ok(value)),
        Ok(_) => None,
        Err(err) => Some(Err(err)),
    }
}

enum CompiledStep {
    Member(SmolStr),
    Index(i64),
    IndexOf(ScalarExpr, String),
}

/// The scalar prefix of a path.
struct PathResolver {
    root: PathRoot,
    field: SmolStr,
    steps: Vec<CompiledStep>,
}

impl PathResolver {
    fn resolve(&self, ctx: EvalContext<'_>) -> Result<Value, EvalError> {
        let mut value = ops::path_root(&ctx, self.root, &self.field)?.clone();

        for step in &self.steps {
            value = match step {
                CompiledStep::Member(name) => ops::member(&value, name),
                CompiledStep::Index(index) => ops::array_index(&value, *index),
                CompiledStep::IndexOf(index, source) => ops::array_index_by(&value, &index(ctx)?, source)?,
            };
        }

        Ok(value)
    }
}

struct CompiledCall {
    function: &'static Builtin,
    args: SmallVec<[CompiledExpr; 4]>,
}

impl CompiledCall {
    fn invoke(&self, ctx: EvalContext<'_>) -> Result<CallResult, EvalError> {
        let args = self
            .args
            .iter()
            .map(|arg| match arg {
                CompiledExpr::Scalar(f) => f(ctx),
                CompiledExpr::Enumerable(f) => ops::collect_values(f(ctx)),
            })
            .collect::<Result<SmallVec<[Value; 4]>, _>>()?;

        ops::call(self.function, ctx.collation, &args)
    }
}

/// Compiles a [`Node`] into closures that call the shared evaluation
/// primitives directly.
///
/// `SORT` has no closure form and fails to compile with
/// [`EvalError::Unsupported`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Compiler;

impl Compiler {
    pub fn new() -> Self {
        Self
    }

    pub fn compile(&self, node: &Node) -> Result<CompiledExpr, EvalError> {
        self.compile_node(node)
    }

    fn compile_scalar(&self, node: &Node) -> Result<ScalarExpr, EvalError> {
        match self.compile_node(node)? {
            CompiledExpr::Scalar(f) => Ok(f),
            CompiledExpr::Enumerable(_) => {
                let source = node.source.clone();
                Ok(scalar_fn(move |_| Err(EvalError::NotScalar(source.clone()))))
            }
        }
    }

    fn compile_enumerable(&self, node: &Node) -> Result<EnumerableExpr, EvalError> {
        match self.compile_node(node)? {
            CompiledExpr::Enumerable(f) => Ok(f),
            CompiledExpr::Scalar(f) => Ok(enumerable_fn(move |ctx| Box::new(iter::once(f(ctx))))),
        }
    }

    fn compile_node(&self, node: &Node) -> Result<CompiledExpr, EvalError> {
        match &node.kind {
            NodeKind::Constant(value) => {
                let value = value.clone();
                scalar(move |_| Ok(value.clone()))
            }
            NodeKind::Parameter(name) => {
                let name = name.clone();
                scalar(move |ctx| Ok(ctx.parameter(&name)))
            }
            NodeKind::Source => enumerable(|ctx| Box::new(ctx.source.iter().cloned().map(Ok))),
            NodeKind::Document(entries) => {
                let entries = entries
                    .iter()
                    .map(|(key, value)| Ok((key.clone(), self.compile_scalar(value)?)))
                    .collect::<Result<Vec<_>, EvalError>>()?;

                scalar(move |ctx| {
                    entries
                        .iter()
                        .map(|(key, value)| Ok((key.clone(), value(ctx)?)))
                        .collect::<Result<Vec<_>, EvalError>>()
                        .map(ops::document_init)
                })
            }
            NodeKind::Array(items) => {
                let items = items
                    .iter()
                    .map(|item| self.compile_scalar(item))
                    .collect::<Result<Vec<_>, _>>()?;

                scalar(move |ctx| {
                    items
                        .iter()
                        .map(|item| item(ctx))
                        .collect::<Result<Vec<_>, _>>()
                        .map(|values| Value::Array(Array::from(values)))
                })
            }
            NodeKind::Path { root, steps } => self.compile_path(&node.source, *root, steps),
            NodeKind::Map { source, selector } => self.compile_map(source, selector),
            NodeKind::Filter { source, predicate } => {
                let source = self.compile_enumerable(source)?;
                let predicate = self.compile_scalar(predicate)?;

                enumerable(move |ctx| {
                    let predicate = Arc::clone(&predicate);
                    Box::new(source(ctx).filter_map(move |value| match value {
                        Ok(value) => keep_if(&predicate, ctx, value),
                        Err(err) => Some(Err(err)),
                    }))
                })
            }
            NodeKind::Sort { .. } => Err(EvalError::Unsupported("SORT".into())),
            NodeKind::Call { function, args } => self.compile_call(*function, args),
            NodeKind::Binary {
                op,
                quantifier,
                left,
                right,
            } => self.compile_binary(*op, *quantifier, left, right),
            NodeKind::Logic { op, left, right } => {
                let op = *op;
                let left = self.compile_scalar(left)?;
                let right = self.compile_scalar(right)?;

                scalar(move |ctx| {
                    let left = left(ctx)?.is_truthy();
                    let result = match op {
                        LogicOp::And if !left => false,
                        LogicOp::Or if left => true,
                        _ => right(ctx)?.is_truthy(),
                    };
                    Ok(Value::Boolean(result))
                })
            }
            NodeKind::Conditional {
                test,
                if_true,
                if_false,
            } => {
                let test = self.compile_scalar(test)?;

                if node.is_scalar {
                    let if_true = self.compile_scalar(if_true)?;
                    let if_false = self.compile_scalar(if_false)?;
                    scalar(move |ctx| {
                        if test(ctx)?.is_truthy() {
                            if_true(ctx)
                        } else {
                            if_false(ctx)
                        }
                    })
                } else {
                    let if_true = self.compile_enumerable(if_true)?;
                    let if_false = self.compile_enumerable(if_false)?;
                    enumerable(move |ctx| match test(ctx) {
                        Ok(matched) if matched.is_truthy() => if_true(ctx),
                        Ok(_) => if_false(ctx),
                        Err(err) => failed(err),
                    })
                }
            }
        }
    }

    fn compile_path(&self, source: &str, root: PathRoot, steps: &[PathStep]) -> Result<CompiledExpr, EvalError> {
        let field = match steps.first() {
            Some(PathStep::Member(name)) => name.clone(),
            _ => SmolStr::default(),
        };
        let (prefix, last) = match steps.split_last() {
            Some((last, prefix)) if last.is_enumerable() => (prefix, Some(last)),
            _ => (steps, None),
        };

        let resolver = Arc::new(PathResolver {
            root,
            field,
            steps: prefix
                .iter()
                .map(|step| {
                    Ok(match step {
                        PathStep::Member(name) => CompiledStep::Member(name.clone()),
                        PathStep::Index(index) => CompiledStep::Index(*index as i64),
                        PathStep::IndexOf(node) => CompiledStep::IndexOf(self.compile_scalar(node)?, node.source.clone()),
                        PathStep::All | PathStep::Filter(_) | PathStep::Items => {
                            return Err(EvalError::NotScalar(source.to_string()));
                        }
                    })
                })
                .collect::<Result<_, EvalError>>()?,
        });

        match last {
            None => scalar(move |ctx| resolver.resolve(ctx)),
            Some(PathStep::Filter(predicate)) => {
                let predicate = self.compile_scalar(predicate)?;
                enumerable(move |ctx| match resolver.resolve(ctx) {
                    Ok(value) => {
                        let predicate = Arc::clone(&predicate);
                        Box::new(
                            ops::elements(&value)
                                .into_iter()
                                .filter_map(move |element| keep_if(&predicate, ctx, element)),
                        )
                    }
                    Err(err) => failed(err),
                })
            }
            Some(PathStep::Items) => enumerable(move |ctx| match resolver.resolve(ctx) {
                Ok(value) => Box::new(ops::items(&value).into_iter().map(Ok)),
                Err(err) => failed(err),
            }),
            Some(_) => enumerable(move |ctx| match resolver.resolve(ctx) {
                Ok(value) => Box::new(ops::elements(&value).into_iter().map(Ok)),
                Err(err) => failed(err),
            }),
        }
    }

    fn compile_map(&self, source: &Node, selector: &Node) -> Result<CompiledExpr, EvalError> {
        let source = self.compile_enumerable(source)?;

        match self.compile_node(selector)? {
            CompiledExpr::Scalar(selector) => enumerable(move |ctx| {
                let selector = Arc::clone(&selector);
                Box::new(
                    source(ctx).map(move |value| value.and_then(|value| selector(ctx.with_current(&value)))),
                )
            }),
            CompiledExpr::Enumerable(selector) => enumerable(move |ctx| {
                let selector = Arc::clone(&selector);
                Box::new(source(ctx).flat_map(move |value| -> Vec<Result<Value, EvalError>> {
                    match value {
                        Ok(value) => selector(ctx.with_current(&value)).collect(),
                        Err(err) => vec![Err(err)],
                    }
                }))
            }),
        }
    }

    fn compile_call(&self, function: &'static Builtin, args: &[Arc<Node>]) -> Result<CompiledExpr, EvalError> {
        let call = Arc::new(CompiledCall {
            function,
            args: args
                .iter()
                .map(|arg| self.compile_node(arg))
                .collect::<Result<_, _>>()?,
        });

        if function.is_scalar() {
            scalar(move |ctx| match call.invoke(ctx)? {
                CallResult::Scalar(value) => Ok(value),
                CallResult::Values(values) => Ok(pack(values)),
            })
        } else {
            enumerable(move |ctx| match call.invoke(ctx) {
                Ok(CallResult::Values(values)) => Box::new(values.into_iter().map(Ok)),
                Ok(CallResult::Scalar(value)) => Box::new(iter::once(Ok(value))),
                Err(err) => failed(err),
            })
        }
    }

    fn compile_binary(
        &self,
        op: BinaryOp,
        quantifier: Option<Quantifier>,
        left: &Node,
        right: &Node,
    ) -> Result<CompiledExpr, EvalError> {
        if let (BinaryOp::Like, NodeKind::Constant(Value::String(pattern))) = (op, &right.kind) {
            return self.compile_like(quantifier, left, LikePattern::new(pattern));
        }

        let right = self.compile_scalar(right)?;

        match quantifier {
            Some(quantifier) => {
                let left = self.compile_enumerable(left)?;
                scalar(move |ctx| {
                    let right = right(ctx)?;
                    ops::quantified(op, quantifier, left(ctx), &right, ctx.collation)
                })
            }
            None => {
                let left = self.compile_scalar(left)?;
                scalar(move |ctx| {
                    let left = left(ctx)?;
                    ops::binary(op, &left, &right(ctx)?, ctx.collation)
                })
            }
        }
    }

    fn compile_like(
        &self,
        quantifier: Option<Quantifier>,
        left: &Node,
        pattern: LikePattern,
    ) -> Result<CompiledExpr, EvalError> {
        match quantifier {
            Some(quantifier) => {
                let left = self.compile_enumerable(left)?;
                scalar(move |ctx| {
                    ops::quantified_by(quantifier, left(ctx), |value| Ok(pattern.matches(value, ctx.collation)))
                })
            }
            None => {
                let left = self.compile_scalar(left)?;
                scalar(move |ctx| Ok(Value::Boolean(pattern.matches(&left(ctx)?, ctx.collation))))
            }
        }
    }
}
