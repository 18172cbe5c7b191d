use std::{
    fmt::{self, Display, Formatter},
    sync::Arc,
};

use smol_str::SmolStr;

use super::{
    fields::Fields,
    operator::{BinaryOp, LogicOp, Quantifier},
};
use crate::{eval::builtin::Builtin, value::Value};

pub type Child = Arc<Node>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExprType {
    Double,
    Int,
    Boolean,
    Null,
    String,
    Array,
    Document,
    Parameter,
    Path,
    Map,
    Filter,
    Sort,
    Call,
    And,
    Or,
    Source,
    Modulo,
    Divide,
    Multiply,
    Add,
    Subtract,
    Like,
    Between,
    In,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    NotEqual,
    Equal,
}

impl Display for ExprType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Which binding a path starts from: `$` or `@`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathRoot {
    Root,
    Current,
}

impl PathRoot {
    pub fn sigil(&self) -> &'static str {
        match self {
            PathRoot::Root => "$",
            PathRoot::Current => "@",
        }
    }
}

#[derive(Debug, Clone)]
pub enum PathStep {
    Member(SmolStr),
    Index(i32),
    /// `[@param]`: index taken from a parameter at evaluation time.
    IndexOf(Child),
    /// `[*]`
    All,
    /// `[predicate]`
    Filter(Child),
    /// A scalar path read as a sequence. Renders as `[*]` but follows
    /// `ITEMS`: a non-array value becomes a one-element sequence.
    Items,
}

impl PathStep {
    #[inline]
    pub fn is_enumerable(&self) -> bool {
        matches!(self, PathStep::All | PathStep::Filter(_) | PathStep::Items)
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Constant(Value),
    Parameter(SmolStr),
    Source,
    Document(Vec<(SmolStr, Child)>),
    Array(Vec<Child>),
    Path {
        root: PathRoot,
        steps: Vec<PathStep>,
    },
    Map {
        source: Child,
        selector: Child,
    },
    Filter {
        source: Child,
        predicate: Child,
    },
    Sort {
        source: Child,
        key: Child,
        order: Option<Child>,
    },
    Call {
        function: &'static Builtin,
        args: Vec<Child>,
    },
    Binary {
        op: BinaryOp,
        quantifier: Option<Quantifier>,
        left: Child,
        right: Child,
    },
    Logic {
        op: LogicOp,
        left: Child,
        right: Child,
    },
    Conditional {
        test: Child,
        if_true: Child,
        if_false: Child,
    },
}

/// A parsed expression.
///
/// Flags are computed bottom-up while parsing and never change afterwards.
#[derive(Debug, Clone)]
pub struct Node {
    pub ty: ExprType,
    pub is_scalar: bool,
    pub is_immutable: bool,
    pub use_source: bool,
    pub fields: Fields,
    pub source: String,
    pub kind: NodeKind,
}

impl Node {
    pub(crate) fn constant(ty: ExprType, value: Value, source: impl Into<String>) -> Self {
        Self {
            ty,
            is_scalar: true,
            is_immutable: true,
            use_source: false,
            fields: Fields::new(),
            source: source.into(),
            kind: NodeKind::Constant(value),
        }
    }

    /// Direct sub-expressions in evaluation order.
    pub fn children(&self) -> Vec<&Node> {
        match &self.kind {
            NodeKind::Constant(_) | NodeKind::Parameter(_) | NodeKind::Source => Vec::new(),
            NodeKind::Document(entries) => entries.iter().map(|(_, value)| value.as_ref()).collect(),
            NodeKind::Array(items) => items.iter().map(AsRef::as_ref).collect(),
            NodeKind::Path { steps, .. } => steps
                .iter()
                .filter_map(|step| match step {
                    PathStep::IndexOf(node) | PathStep::Filter(node) => Some(node.as_ref()),
                    _ => None,
                })
                .collect(),
            NodeKind::Map { source, selector } => vec![source.as_ref(), selector.as_ref()],
            NodeKind::Filter { source, predicate } => vec![source.as_ref(), predicate.as_ref()],
            NodeKind::Sort { source, key, order } => [Some(source), Some(key), order.as_ref()]
                .into_iter()
                .flatten()
                .map(AsRef::as_ref)
                .collect(),
            NodeKind::Call { args, .. } => args.iter().map(AsRef::as_ref).collect(),
            NodeKind::Binary { left, right, .. } | NodeKind::Logic { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            NodeKind::Conditional {
                test,
                if_true,
                if_false,
            } => vec![test.as_ref(), if_true.as_ref(), if_false.as_ref()],
        }
    }

    /// Number of nodes in this tree, including `self`.
    pub fn size(&self) -> usize {
        1 + self.children().iter().map(|child| child.size()).sum::<usize>()
    }
}

impl Display for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}
