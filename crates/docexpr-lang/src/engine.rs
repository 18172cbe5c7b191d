use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
    sync::{Arc, OnceLock},
};

use dashmap::{DashMap, mapref::entry::Entry};
use rustc_hash::FxBuildHasher;

use crate::{
    ast::{DocumentScope, ExprType, Fields, Node, ParseMode, ParseOptions},
    compiler::{ClosureBackend, CompiledExpr},
    error::Error,
    eval::{EvalContext, EvalError, ValueIter},
    optree::{OpTreeBackend, OpTreeEvaluator},
    parse_with,
    value::{Collation, Document, Value},
};

/// Turns a parsed [`Node`] into something that can be evaluated.
pub trait ExprBackend {
    #[allow(clippy::result_large_err)]
    fn build(&self, node: &Node) -> Result<Executable, Error>;
}

/// The evaluable form of one compiled expression.
#[derive(Debug, Clone)]
pub enum Executable {
    OpTree(Arc<OpTreeEvaluator>),
    Closure(CompiledExpr),
}

/// Which [`ExprBackend`] an [`Engine`] compiles with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    OpTree,
    Closure,
}

impl Default for Backend {
    #[cfg(feature = "closure")]
    fn default() -> Self {
        Backend::Closure
    }

    #[cfg(not(feature = "closure"))]
    fn default() -> Self {
        Backend::OpTree
    }
}

impl Backend {
    fn builder(&self) -> &'static dyn ExprBackend {
        match self {
            Backend::OpTree => &OpTreeBackend,
            Backend::Closure => &ClosureBackend,
        }
    }
}

impl Display for Backend {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Backend::OpTree => write!(f, "optree"),
            Backend::Closure => write!(f, "closure"),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Unknown backend `{0}`, expected `optree` or `closure`")]
pub struct UnknownBackend(pub String);

impl FromStr for Backend {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "optree" | "op-tree" => Ok(Backend::OpTree),
            "closure" => Ok(Backend::Closure),
            _ => Err(UnknownBackend(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Options {
    pub backend: Backend,
    pub cache: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            cache: true,
        }
    }
}

/// A parsed expression together with its backend program.
///
/// Immutable once built and safe to share across threads.
#[derive(Debug)]
pub struct Expression {
    node: Node,
    backend: Backend,
    executable: Executable,
    parameters: Document,
}

impl Expression {
    #[inline]
    pub fn ty(&self) -> ExprType {
        self.node.ty
    }

    #[inline]
    pub fn is_scalar(&self) -> bool {
        self.node.is_scalar
    }

    #[inline]
    pub fn is_immutable(&self) -> bool {
        self.node.is_immutable
    }

    #[inline]
    pub fn use_source(&self) -> bool {
        self.node.use_source
    }

    #[inline]
    pub fn fields(&self) -> &Fields {
        &self.node.fields
    }

    #[inline]
    pub fn source(&self) -> &str {
        &self.node.source
    }

    #[inline]
    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Default parameter values given at compile time.
    #[inline]
    pub fn parameters(&self) -> &Document {
        &self.parameters
    }

    #[inline]
    pub fn backend(&self) -> Backend {
        self.backend
    }

    #[inline]
    pub fn executable(&self) -> &Executable {
        &self.executable
    }

    /// Evaluates a scalar expression to its single value.
    #[allow(clippy::result_large_err)]
    pub fn execute_scalar(&self, ctx: EvalContext<'_>) -> Result<Value, Error> {
        if !self.is_scalar() {
            return Err(self.error(EvalError::NotScalar(self.node.source.clone())));
        }

        let value = match &self.executable {
            Executable::OpTree(evaluator) => evaluator.eval_scalar(&ctx),
            Executable::Closure(CompiledExpr::Scalar(f)) => f(ctx),
            Executable::Closure(CompiledExpr::Enumerable(_)) => {
                Err(EvalError::NotScalar(self.node.source.clone()))
            }
        };

        value.map_err(|err| self.error(err))
    }

    /// Evaluates the expression as a sequence. A scalar expression yields
    /// exactly one item.
    pub fn execute<'a>(&'a self, ctx: EvalContext<'a>) -> ValueIter<'a> {
        match &self.executable {
            Executable::OpTree(evaluator) if self.is_scalar() => Box::new(std::iter::once(evaluator.eval_scalar(&ctx))),
            Executable::OpTree(evaluator) => evaluator.eval_values(ctx),
            Executable::Closure(compiled) => compiled.values(ctx),
        }
    }

    /// Evaluates against one document bound as both `$` and `@`, using the
    /// compile-time parameters.
    #[allow(clippy::result_large_err)]
    pub fn execute_document(&self, document: &Value, collation: &Collation) -> Result<Vec<Value>, Error> {
        let ctx = EvalContext::document(document, &self.parameters, collation);
        self.collect(ctx)
    }

    /// Evaluates once over the whole sequence of documents. `$` and `@` are
    /// unbound.
    #[allow(clippy::result_large_err)]
    pub fn execute_source(&self, documents: &[Value], collation: &Collation) -> Result<Vec<Value>, Error> {
        let ctx = EvalContext::aggregate(documents, &self.parameters, collation);
        self.collect(ctx)
    }

    #[allow(clippy::result_large_err)]
    fn collect(&self, ctx: EvalContext<'_>) -> Result<Vec<Value>, Error> {
        self.execute(ctx)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| self.error(err))
    }

    #[inline]
    fn error(&self, err: EvalError) -> Error {
        Error::from_eval(&self.node.source, err)
    }
}

type CacheKey = (String, DocumentScope, ParseMode, Backend);

/// Compiles expressions and caches them by source text.
///
/// Clones share one cache.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    pub(crate) options: Options,
    cache: Arc<DashMap<CacheKey, Arc<Expression>, FxBuildHasher>>,
    predefined: Predefined,
}

#[derive(Debug, Clone, Default)]
struct Predefined {
    count: Arc<OnceLock<Arc<Expression>>>,
    exists: Arc<OnceLock<Arc<Expression>>>,
    id_key: Arc<OnceLock<Arc<Expression>>>,
}

impl Engine {
    pub fn new(options: Options) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    pub fn set_backend(&mut self, backend: Backend) {
        self.options.backend = backend;
        self.predefined = Predefined::default();
    }

    pub fn set_cache(&mut self, cache: bool) {
        self.options.cache = cache;
    }

    #[inline]
    pub fn backend(&self) -> Backend {
        self.options.backend
    }

    /// Number of cached expressions.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    #[allow(clippy::result_large_err)]
    pub fn compile(&self, code: &str) -> Result<Arc<Expression>, Error> {
        self.compile_with(code, &ParseOptions::default())
    }

    /// Compiles `code`, reusing a cached expression for the same text,
    /// scope, mode and backend.
    ///
    /// Expressions carrying default parameters are never cached.
    #[allow(clippy::result_large_err)]
    pub fn compile_with(&self, code: &str, options: &ParseOptions) -> Result<Arc<Expression>, Error> {
        let backend = self.options.backend;

        if !self.options.cache || !options.parameters.is_empty() {
            tracing::debug!(source = code, %backend, "compiling expression without cache");
            return self.build(code, options).map(Arc::new);
        }

        match self
            .cache
            .entry((code.to_string(), options.scope, options.mode, backend))
        {
            Entry::Occupied(entry) => {
                tracing::debug!(source = code, %backend, "expression cache hit");
                Ok(Arc::clone(entry.get()))
            }
            Entry::Vacant(entry) => {
                tracing::debug!(source = code, %backend, "expression cache miss");
                let expression = Arc::new(self.build(code, options)?);
                entry.insert(Arc::clone(&expression));
                Ok(expression)
            }
        }
    }

    /// `{count:COUNT(*._id)}`
    #[allow(clippy::result_large_err)]
    pub fn count_expression(&self) -> Result<Arc<Expression>, Error> {
        self.predefined(&self.predefined.count, "{count:COUNT(*._id)}")
    }

    /// `{exists:ANY(*._id)}`
    #[allow(clippy::result_large_err)]
    pub fn exists_expression(&self) -> Result<Arc<Expression>, Error> {
        self.predefined(&self.predefined.exists, "{exists:ANY(*._id)}")
    }

    /// `{i:_id}`
    #[allow(clippy::result_large_err)]
    pub fn id_key_expression(&self) -> Result<Arc<Expression>, Error> {
        self.predefined(&self.predefined.id_key, "{i:_id}")
    }

    #[allow(clippy::result_large_err)]
    fn predefined(&self, slot: &OnceLock<Arc<Expression>>, code: &str) -> Result<Arc<Expression>, Error> {
        if let Some(expression) = slot.get() {
            return Ok(Arc::clone(expression));
        }

        let expression = Arc::new(self.build(code, &ParseOptions::default())?);
        Ok(Arc::clone(slot.get_or_init(|| expression)))
    }

    #[allow(clippy::result_large_err)]
    fn build(&self, code: &str, options: &ParseOptions) -> Result<Expression, Error> {
        let node = parse_with(code, options)?;
        let backend = self.options.backend;
        let executable = backend.builder().build(&node)?;

        Ok(Expression {
            node,
            backend,
            executable,
            parameters: options.parameters.clone(),
        })
    }

    pub const fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::error::InnerError;

    fn doc(json: serde_json::Value) -> Value {
        json.into()
    }

    fn engine(backend: Backend) -> Engine {
        let mut engine = Engine::default();
        engine.set_backend(backend);
        engine
    }

    #[test]
    fn test_engine_default() {
        let engine = Engine::default();
        assert!(engine.options.cache);
        assert_eq!(engine.backend(), Backend::default());
    }

    #[test]
    fn test_set_cache() {
        let mut engine = Engine::default();
        engine.set_cache(false);

        let first = engine.compile("1 + 2").unwrap();
        let second = engine.compile("1 + 2").unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(engine.cached(), 0);
    }

    #[test]
    fn test_cache_reuses_expression() {
        let engine = Engine::default();

        let first = engine.compile("$.a + 1").unwrap();
        let second = engine.compile("$.a + 1").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(engine.cached(), 1);

        engine.clear_cache();
        assert_eq!(engine.cached(), 0);
    }

    #[test]
    fn test_cache_keyed_by_backend() {
        let mut engine = engine(Backend::OpTree);
        let optree = engine.compile("1").unwrap();
        engine.set_backend(Backend::Closure);
        let closure = engine.compile("1").unwrap();

        assert_eq!(optree.backend(), Backend::OpTree);
        assert_eq!(closure.backend(), Backend::Closure);
        assert_eq!(engine.cached(), 2);
    }

    #[test]
    fn test_concurrent_compile_yields_one_entry() {
        let engine = Engine::default();

        let expressions = std::thread::scope(|scope| {
            let handles = (0..8)
                .map(|_| scope.spawn(|| engine.compile("UPPER($.name)").unwrap()))
                .collect::<Vec<_>>();
            handles.into_iter().map(|h| h.join().unwrap()).collect::<Vec<_>>()
        });

        assert_eq!(engine.cached(), 1);
        assert!(expressions.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[rstest]
    #[case::optree(Backend::OpTree)]
    #[case::closure(Backend::Closure)]
    fn test_execute_document(#[case] backend: Backend) {
        let expr = engine(backend).compile("$.a.b[@ > 15]").unwrap();
        let result = expr
            .execute_document(&doc(serde_json::json!({"a": {"b": [10, 20, 30]}})), &Collation::default())
            .unwrap();

        assert!(!expr.is_scalar());
        assert_eq!(result, vec![Value::Int32(20), Value::Int32(30)]);
    }

    #[rstest]
    #[case::optree(Backend::OpTree)]
    #[case::closure(Backend::Closure)]
    fn test_execute_scalar_rejects_enumerable(#[case] backend: Backend) {
        let expr = engine(backend).compile("$.a[*]").unwrap();
        let document = doc(serde_json::json!({"a": [1]}));
        let parameters = Document::new();
        let collation = Collation::default();

        let err = expr
            .execute_scalar(EvalContext::document(&document, &parameters, &collation))
            .unwrap_err();

        assert_eq!(err.cause, InnerError::Eval(EvalError::NotScalar("$.a[*]".to_string())));
    }

    #[rstest]
    #[case::optree(Backend::OpTree)]
    #[case::closure(Backend::Closure)]
    fn test_execute_stops_early(#[case] backend: Backend) {
        let expr = engine(backend).compile("MAP($.a[*] => @ * 2)").unwrap();
        let document = doc(serde_json::json!({"a": [1, 2, 3]}));
        let parameters = Document::new();
        let collation = Collation::default();

        let first = expr
            .execute(EvalContext::document(&document, &parameters, &collation))
            .next()
            .unwrap()
            .unwrap();

        assert_eq!(first, Value::Int32(2));
    }

    #[rstest]
    #[case::optree(Backend::OpTree)]
    #[case::closure(Backend::Closure)]
    fn test_predefined_expressions(#[case] backend: Backend) {
        let engine = engine(backend);
        let documents = vec![
            doc(serde_json::json!({"_id": 1})),
            doc(serde_json::json!({"_id": 2})),
        ];
        let collation = Collation::default();

        let count = engine.count_expression().unwrap();
        assert!(Arc::ptr_eq(&count, &engine.count_expression().unwrap()));
        assert_eq!(
            count.execute_source(&documents, &collation).unwrap(),
            vec![Value::Document(vec![("count", Value::Int32(2))].into_iter().collect())]
        );

        let exists = engine.exists_expression().unwrap();
        assert_eq!(
            exists.execute_source(&[], &collation).unwrap(),
            vec![Value::Document(vec![("exists", Value::Boolean(false))].into_iter().collect())]
        );

        let id_key = engine.id_key_expression().unwrap();
        assert_eq!(id_key.source(), "{i:$._id}");
        assert_eq!(
            id_key.execute_document(&documents[1], &collation).unwrap(),
            vec![Value::Document(vec![("i", Value::Int32(2))].into_iter().collect())]
        );
    }

    #[test]
    fn test_compile_with_parameters() {
        let engine = Engine::default();
        let options = ParseOptions {
            parameters: vec![("0", Value::Int32(5))].into_iter().collect(),
            ..Default::default()
        };

        let expr = engine.compile_with("@0 + 1", &options).unwrap();

        assert_eq!(engine.cached(), 0);
        assert!(!expr.is_immutable());
        assert_eq!(
            expr.execute_document(&Value::Null, &Collation::default()).unwrap(),
            vec![Value::Int32(6)]
        );
    }

    #[test]
    fn test_closure_backend_rejects_sort() {
        let err = engine(Backend::Closure).compile("SORT($.a[*] => @)").unwrap_err();
        assert_eq!(err.cause, InnerError::Eval(EvalError::Unsupported("SORT".into())));
    }

    #[rstest]
    #[case::optree("optree", Ok(Backend::OpTree))]
    #[case::op_tree("OP-TREE", Ok(Backend::OpTree))]
    #[case::closure("closure", Ok(Backend::Closure))]
    #[case::unknown("jit", Err(UnknownBackend("jit".to_string())))]
    fn test_backend_from_str(#[case] input: &str, #[case] expected: Result<Backend, UnknownBackend>) {
        assert_eq!(input.parse::<Backend>(), expected);
    }

    #[test]
    fn test_version() {
        assert!(!Engine::version().is_empty());
    }
}
