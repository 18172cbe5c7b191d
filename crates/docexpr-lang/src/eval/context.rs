use crate::value::{Collation, Document, Value};

/// Bindings one evaluation runs against.
///
/// `source` is the aggregate sequence of documents, `root` the document `$`
/// resolves to and `current` the value `@` resolves to. Aggregate evaluation
/// leaves `root` and `current` unset.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub source: &'a [Value],
    pub root: Option<&'a Value>,
    pub current: Option<&'a Value>,
    pub parameters: &'a Document,
    pub collation: &'a Collation,
}

impl<'a> EvalContext<'a> {
    pub fn new(
        source: &'a [Value],
        root: Option<&'a Value>,
        current: Option<&'a Value>,
        parameters: &'a Document,
        collation: &'a Collation,
    ) -> Self {
        Self {
            source,
            root,
            current,
            parameters,
            collation,
        }
    }

    /// Per-document evaluation: `$` and `@` both bind to `document`.
    pub fn document(document: &'a Value, parameters: &'a Document, collation: &'a Collation) -> Self {
        Self::new(
            std::slice::from_ref(document),
            Some(document),
            Some(document),
            parameters,
            collation,
        )
    }

    /// Aggregate evaluation over `source`.
    pub fn aggregate(source: &'a [Value], parameters: &'a Document, collation: &'a Collation) -> Self {
        Self::new(source, None, None, parameters, collation)
    }

    /// Rebinds `@`; every other binding is kept.
    #[inline]
    pub fn with_current<'b>(&self, current: &'b Value) -> EvalContext<'b>
    where
        'a: 'b,
    {
        EvalContext {
            source: self.source,
            root: self.root,
            current: Some(current),
            parameters: self.parameters,
            collation: self.collation,
        }
    }

    /// Unbound parameters read as null.
    #[inline]
    pub fn parameter(&self, name: &str) -> Value {
        self.parameters.get(name).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_current_keeps_root() {
        let root = Value::from("root");
        let current = Value::from("current");
        let parameters = Document::new();
        let collation = Collation::default();
        let ctx = EvalContext::document(&root, &parameters, &collation);
        let inner = ctx.with_current(&current);

        assert_eq!(inner.root, Some(&root));
        assert_eq!(inner.current, Some(&current));
        assert_eq!(inner.source.len(), 1);
    }

    #[test]
    fn test_missing_parameter_is_null() {
        let parameters: Document = vec![("0", Value::Int32(1))].into_iter().collect();
        let collation = Collation::default();
        let ctx = EvalContext::aggregate(&[], &parameters, &collation);

        assert_eq!(ctx.parameter("0"), Value::Int32(1));
        assert_eq!(ctx.parameter("name"), Value::Null);
    }
}
