//! OpTree evaluator: walks the instruction pool.

use std::{cmp::Ordering, iter};

use smallvec::SmallVec;

use super::{Op, OpPool, OpRef, SourceMap, Step};
use crate::{
    ast::{PathRoot, operator::LogicOp},
    eval::{
        EvalContext, EvalError, ValueIter,
        builtin::{CallResult, pack},
        ops,
    },
    value::{Array, Collation, Value},
};

#[inline]
fn failed<'a>(err: EvalError) -> ValueIter<'a> {
    Box::new(iter::once(Err(err)))
}

/// Executes one flattened expression.
///
/// Enumerable instructions produce their elements on demand. `SORT` is the
/// only instruction that drains its source before yielding.
#[derive(Debug, Clone)]
pub struct OpTreeEvaluator {
    pool: OpPool,
    source_map: SourceMap,
    root: OpRef,
}

impl OpTreeEvaluator {
    pub fn new(pool: OpPool, source_map: SourceMap, root: OpRef) -> Self {
        Self { pool, source_map, root }
    }

    #[inline]
    pub fn pool(&self) -> &OpPool {
        &self.pool
    }

    #[inline]
    pub fn root(&self) -> OpRef {
        self.root
    }

    pub fn eval_scalar(&self, ctx: &EvalContext<'_>) -> Result<Value, EvalError> {
        self.scalar(self.root, ctx)
    }

    pub fn eval_values<'a>(&'a self, ctx: EvalContext<'a>) -> ValueIter<'a> {
        self.values(self.root, ctx)
    }

    fn scalar(&self, op_ref: OpRef, ctx: &EvalContext<'_>) -> Result<Value, EvalError> {
        let instruction = self.pool.get(op_ref);

        if !instruction.is_scalar {
            return Err(EvalError::NotScalar(self.source_map.get(op_ref).to_string()));
        }

        match &instruction.op {
            Op::Constant(value) => Ok(value.clone()),
            Op::Parameter(name) => Ok(ctx.parameter(name)),
            Op::Document(entries) => entries
                .iter()
                .map(|(key, value)| Ok((key.clone(), self.scalar(*value, ctx)?)))
                .collect::<Result<Vec<_>, EvalError>>()
                .map(ops::document_init),
            Op::Array(items) => items
                .iter()
                .map(|item| self.scalar(*item, ctx))
                .collect::<Result<Vec<_>, _>>()
                .map(|values| Value::Array(Array::from(values))),
            Op::Path { root, field, steps } => self.resolve(op_ref, ctx, *root, field, steps),
            Op::Call { function, args } => {
                let args = self.args(args, ctx)?;
                match ops::call(function, ctx.collation, &args)? {
                    CallResult::Scalar(value) => Ok(value),
                    CallResult::Values(values) => Ok(pack(values)),
                }
            }
            Op::Binary {
                op,
                quantifier: Some(quantifier),
                left,
                right,
            } => {
                let right = self.scalar(*right, ctx)?;
                ops::quantified(*op, *quantifier, self.values(*left, *ctx), &right, ctx.collation)
            }
            Op::Binary {
                op,
                quantifier: None,
                left,
                right,
            } => {
                let left = self.scalar(*left, ctx)?;
                let right = self.scalar(*right, ctx)?;
                ops::binary(*op, &left, &right, ctx.collation)
            }
            Op::Like {
                quantifier: Some(quantifier),
                left,
                pattern,
            } => ops::quantified_by(*quantifier, self.values(*left, *ctx), |value| {
                Ok(pattern.matches(value, ctx.collation))
            }),
            Op::Like {
                quantifier: None,
                left,
                pattern,
            } => {
                let left = self.scalar(*left, ctx)?;
                Ok(Value::Boolean(pattern.matches(&left, ctx.collation)))
            }
            Op::Logic { op, left, right } => {
                let left = self.scalar(*left, ctx)?.is_truthy();
                let result = match op {
                    LogicOp::And if !left => false,
                    LogicOp::Or if left => true,
                    _ => self.scalar(*right, ctx)?.is_truthy(),
                };
                Ok(Value::Boolean(result))
            }
            Op::Conditional {
                test,
                if_true,
                if_false,
            } => {
                if self.scalar(*test, ctx)?.is_truthy() {
                    self.scalar(*if_true, ctx)
                } else {
                    self.scalar(*if_false, ctx)
                }
            }
            Op::Source | Op::Map { .. } | Op::Filter { .. } | Op::Sort { .. } => {
                Err(EvalError::NotScalar(self.source_map.get(op_ref).to_string()))
            }
        }
    }

    fn values<'a>(&'a self, op_ref: OpRef, ctx: EvalContext<'a>) -> ValueIter<'a> {
        let instruction = self.pool.get(op_ref);

        if instruction.is_scalar {
            return Box::new(iter::once(self.scalar(op_ref, &ctx)));
        }

        match &instruction.op {
            Op::Source => Box::new(ctx.source.iter().cloned().map(Ok)),
            Op::Path { root, field, steps } => {
                let (prefix, last) = match steps.split_last() {
                    Some((last, prefix)) if last.is_enumerable() => (prefix, Some(last)),
                    _ => (&steps[..], None),
                };
                let value = match self.resolve(op_ref, &ctx, *root, field, prefix) {
                    Ok(value) => value,
                    Err(err) => return failed(err),
                };

                match last {
                    Some(Step::Filter(predicate)) => {
                        let predicate = *predicate;
                        Box::new(
                            ops::elements(&value)
                                .into_iter()
                                .filter_map(move |element| self.keep_if(predicate, ctx, element)),
                        )
                    }
                    Some(Step::Items) => Box::new(ops::items(&value).into_iter().map(Ok)),
                    Some(_) => Box::new(ops::elements(&value).into_iter().map(Ok)),
                    None => Box::new(iter::once(Ok(value))),
                }
            }
            Op::Map { source, selector } => {
                let selector = *selector;

                if self.pool.get(selector).is_scalar {
                    Box::new(self.values(*source, ctx).map(move |value| {
                        value.and_then(|value| self.scalar(selector, &ctx.with_current(&value)))
                    }))
                } else {
                    Box::new(self.values(*source, ctx).flat_map(move |value| -> Vec<Result<Value, EvalError>> {
                        match value {
                            Ok(value) => self.values(selector, ctx.with_current(&value)).collect(),
                            Err(err) => vec![Err(err)],
                        }
                    }))
                }
            }
            Op::Filter { source, predicate } => {
                let predicate = *predicate;
                Box::new(self.values(*source, ctx).filter_map(move |value| match value {
                    Ok(value) => self.keep_if(predicate, ctx, value),
                    Err(err) => Some(Err(err)),
                }))
            }
            Op::Sort { source, key, order } => match self.sort(*source, *key, *order, ctx) {
                Ok(sorted) => Box::new(sorted.into_iter().map(Ok)),
                Err(err) => failed(err),
            },
            Op::Call { function, args } => {
                let result = self
                    .args(args, &ctx)
                    .and_then(|args| ops::call(function, ctx.collation, &args));

                match result {
                    Ok(CallResult::Values(values)) => Box::new(values.into_iter().map(Ok)),
                    Ok(CallResult::Scalar(value)) => Box::new(iter::once(Ok(value))),
                    Err(err) => failed(err),
                }
            }
            Op::Conditional {
                test,
                if_true,
                if_false,
            } => match self.scalar(*test, &ctx) {
                Ok(matched) if matched.is_truthy() => self.values(*if_true, ctx),
                Ok(_) => self.values(*if_false, ctx),
                Err(err) => failed(err),
            },
            Op::Constant(_)
            | Op::Parameter(_)
            | Op::Document(_)
            | Op::Array(_)
            | Op::Binary { .. }
            | Op::Like { .. }
            | Op::Logic { .. } => Box::new(iter::once(self.scalar(op_ref, &ctx))),
        }
    }

    /// Walks the scalar steps of a path from its root binding.
    fn resolve(
        &self,
        path: OpRef,
        ctx: &EvalContext<'_>,
        root: PathRoot,
        field: &str,
        steps: &[Step],
    ) -> Result<Value, EvalError> {
        let mut value = ops::path_root(ctx, root, field)?.clone();

        for step in steps {
            value = match step {
                Step::Member(name) => ops::member(&value, name),
                Step::Index(index) => ops::array_index(&value, *index as i64),
                Step::IndexOf(index) => {
                    let index_value = self.scalar(*index, ctx)?;
                    ops::array_index_by(&value, &index_value, self.source_map.get(*index))?
                }
                Step::All | Step::Filter(_) | Step::Items => {
                    return Err(EvalError::NotScalar(self.source_map.get(path).to_string()));
                }
            };
        }

        Ok(value)
    }

    #[inline]
    fn keep_if(&self, predicate: OpRef, ctx: EvalContext<'_>, value: Value) -> Option<Result<Value, EvalError>> {
        match self.scalar(predicate, &ctx.with_current(&value)) {
            Ok(matched) if matched.is_truthy() => Some(Ok(value)),
            Ok(_) => None,
            Err(err) => Some(Err(err)),
        }
    }

    fn sort(&self, source: OpRef, key: OpRef, order: Option<OpRef>, ctx: EvalContext<'_>) -> Result<Vec<Value>, EvalError> {
        let descending = match order {
            Some(order) => self.scalar(order, &ctx)?.as_i64() == Some(-1),
            None => false,
        };
        let mut keyed = self
            .values(source, ctx)
            .map(|value| {
                let value = value?;
                Ok((self.scalar(key, &ctx.with_current(&value))?, value))
            })
            .collect::<Result<Vec<_>, EvalError>>()?;

        keyed.sort_by(|(a, _), (b, _)| sort_order(a, b, descending, ctx.collation));

        Ok(keyed.into_iter().map(|(_, value)| value).collect())
    }

    /// Enumerable arguments arrive packed into one array value.
    fn args(&self, args: &[OpRef], ctx: &EvalContext<'_>) -> Result<SmallVec<[Value; 4]>, EvalError> {
        args.iter()
            .map(|arg| {
                if self.pool.get(*arg).is_scalar {
                    self.scalar(*arg, ctx)
                } else {
                    ops::collect_values(self.values(*arg, *ctx))
                }
            })
            .collect()
    }
}

fn sort_order(a: &Value, b: &Value, descending: bool, collation: &Collation) -> Ordering {
    let ordering = a.compare(b, collation);
    if descending { ordering.reverse() } else { ordering }
}
